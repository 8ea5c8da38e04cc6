use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use crate::device::{BjtPolarity, DiodeKind, ModelOverride, MosChannel};

/// SPICE model card type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModelKind {
    D,
    Npn,
    Pnp,
    Nmos,
    Pmos,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelKind::D => "D",
            ModelKind::Npn => "NPN",
            ModelKind::Pnp => "PNP",
            ModelKind::Nmos => "NMOS",
            ModelKind::Pmos => "PMOS",
        })
    }
}

/// Built-in model used when a device names none.
#[derive(Debug, Clone, Copy)]
pub struct DefaultModel {
    pub kind: ModelKind,
    pub name: &'static str,
    pub params: &'static [(&'static str, &'static str)],
}

pub const DIODE_DEFAULT: DefaultModel = DefaultModel {
    kind: ModelKind::D,
    name: "DDEFAULT",
    params: &[("IS", "1e-14"), ("N", "1")],
};

pub const LED_DEFAULT: DefaultModel = DefaultModel {
    kind: ModelKind::D,
    name: "LED",
    params: &[("IS", "1e-14"), ("N", "2")],
};

pub const ZENER_DEFAULT: DefaultModel = DefaultModel {
    kind: ModelKind::D,
    name: "DZEN",
    params: &[("IS", "5e-12"), ("N", "1.5"), ("BV", "5.1"), ("IBV", "5m")],
};

pub const NPN_DEFAULT: DefaultModel = DefaultModel {
    kind: ModelKind::Npn,
    name: "NPN_DEFAULT",
    params: &[("IS", "1e-14"), ("BF", "100")],
};

pub const PNP_DEFAULT: DefaultModel = DefaultModel {
    kind: ModelKind::Pnp,
    name: "PNP_DEFAULT",
    params: &[("IS", "1e-14"), ("BF", "100")],
};

pub const NMOS_DEFAULT: DefaultModel = DefaultModel {
    kind: ModelKind::Nmos,
    name: "NMOS_DEFAULT",
    params: &[("LEVEL", "1"), ("VTO", "1"), ("KP", "1e-3"), ("LAMBDA", "0.02")],
};

pub const PMOS_DEFAULT: DefaultModel = DefaultModel {
    kind: ModelKind::Pmos,
    name: "PMOS_DEFAULT",
    params: &[("LEVEL", "1"), ("VTO", "-1"), ("KP", "1e-3"), ("LAMBDA", "0.02")],
};

impl DefaultModel {
    pub fn for_diode(kind: DiodeKind) -> Self {
        match kind {
            DiodeKind::Diode => DIODE_DEFAULT,
            DiodeKind::Led => LED_DEFAULT,
            DiodeKind::Zener => ZENER_DEFAULT,
        }
    }

    pub fn for_bjt(polarity: BjtPolarity) -> Self {
        match polarity {
            BjtPolarity::Npn => NPN_DEFAULT,
            BjtPolarity::Pnp => PNP_DEFAULT,
        }
    }

    pub fn for_mosfet(channel: MosChannel) -> Self {
        match channel {
            MosChannel::N => NMOS_DEFAULT,
            MosChannel::P => PMOS_DEFAULT,
        }
    }

    /// Apply a user override: a supplied name replaces the default name, and
    /// supplied parameters replace the default parameter list. A name without
    /// parameters keeps the default parameters.
    pub fn resolve(&self, user: &ModelOverride) -> ModelRecord {
        let name = user.name.clone().unwrap_or_else(|| self.name.to_string());
        let parameters = match &user.params {
            Some(params) => params.clone(),
            None => self
                .params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        ModelRecord {
            kind: self.kind,
            name,
            parameters,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelRecord {
    pub kind: ModelKind,
    pub name: String,
    pub parameters: Vec<(String, String)>,
}

impl fmt::Display for ModelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .parameters
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .join(" ");
        write!(f, ".model {} {}({params})", self.name, self.kind)
    }
}

/// Models referenced by one netlist, in first-registration order.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    records: Vec<ModelRecord>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `record` unless a model of the same kind and name is already
    /// present; the first registration wins. Returns the model name to
    /// reference from the device line.
    pub fn register(&mut self, record: ModelRecord) -> String {
        let name = record.name.clone();
        let existing = self
            .records
            .iter()
            .find(|r| r.kind == record.kind && r.name == record.name);
        match existing {
            Some(existing) if existing.parameters != record.parameters => {
                log::warn!(
                    "Model {} registered again with different parameters, keeping the first",
                    record.name
                );
            }
            Some(_) => {}
            None => self.records.push(record),
        }
        name
    }

    pub fn lines(&self) -> Vec<String> {
        self.records.iter().map(ToString::to_string).collect()
    }
}
