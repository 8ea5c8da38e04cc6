//! Type-specific device fields.
//!
//! The editor stores a flat bag of camelCase fields on every component. This
//! module turns that bag into a closed [`Device`] variant carrying only the
//! fields its family uses. Values are kept as SPICE text: strings verbatim,
//! numbers rendered with their JSON representation, empty strings treated as
//! absent.

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Device {
    Ground,
    Resistor {
        value: Option<String>,
    },
    Capacitor {
        value: Option<String>,
        polarized: bool,
    },
    Inductor {
        value: Option<String>,
    },
    VoltageSource {
        waveform: Waveform,
    },
    CurrentSource {
        waveform: Waveform,
    },
    Diode {
        kind: DiodeKind,
        model: ModelOverride,
    },
    Bjt {
        polarity: BjtPolarity,
        model: ModelOverride,
    },
    Mosfet {
        channel: MosChannel,
        body: Option<String>,
        model: ModelOverride,
    },
    Transformer {
        primary: Option<String>,
        secondary: Option<String>,
        coupling: Option<String>,
    },
    OpAmp {
        gain: Option<String>,
    },
    /// A type the symbol table knows but no stamping rule covers.
    Other {
        type_name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiodeKind {
    Diode,
    Led,
    Zener,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BjtPolarity {
    Npn,
    Pnp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MosChannel {
    N,
    P,
}

/// User override of a semiconductor model. Either part may be absent; the
/// family default fills the gap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelOverride {
    pub name: Option<String>,
    pub params: Option<Vec<(String, String)>>,
}

impl ModelOverride {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            params: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }
}

/// Source excitation. Every parameter is optional; missing ones take the
/// per-source defaults at stamping time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Waveform {
    /// No `waveType` given. Renders as `DC <dc>` or `DC 0`.
    Unspecified {
        dc: Option<String>,
    },
    Dc {
        value: Option<String>,
    },
    Ac {
        magnitude: Option<String>,
        phase: Option<String>,
    },
    Sin {
        offset: Option<String>,
        amplitude: Option<String>,
        frequency: Option<String>,
        delay: Option<String>,
        theta: Option<String>,
        phase: Option<String>,
    },
    Pulse {
        v1: Option<String>,
        v2: Option<String>,
        delay: Option<String>,
        rise: Option<String>,
        fall: Option<String>,
        width: Option<String>,
        period: Option<String>,
    },
    Exp {
        v1: Option<String>,
        v2: Option<String>,
        td1: Option<String>,
        tau1: Option<String>,
        td2: Option<String>,
        tau2: Option<String>,
    },
    Pwl {
        points: Option<String>,
    },
    /// A `waveType` nobody recognizes. Renders as `DC 0`.
    Unknown {
        kind: String,
    },
}

impl Default for Waveform {
    fn default() -> Self {
        Waveform::Unspecified { dc: None }
    }
}

impl Waveform {
    pub fn dc(value: impl Into<String>) -> Self {
        Waveform::Dc {
            value: Some(value.into()),
        }
    }

    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let Some(kind) = text(fields.get("waveType").or_else(|| fields.get("wave"))) else {
            return Waveform::Unspecified {
                dc: field(fields, &["dc"]),
            };
        };

        match kind.to_ascii_uppercase().as_str() {
            "DC" => Waveform::Dc {
                value: field(fields, &["dc", "value"]),
            },
            "AC" => Waveform::Ac {
                magnitude: field(fields, &["ac", "acMag"]),
                phase: field(fields, &["acPhase"]),
            },
            "SIN" => {
                let sin = nested(fields, "sin");
                Waveform::Sin {
                    offset: nested_field(sin, &["vo", "io", "offset"]),
                    amplitude: nested_field(sin, &["va", "ia", "amp", "amplitude"]),
                    frequency: nested_field(sin, &["freq", "frequency"]),
                    delay: nested_field(sin, &["td", "delay"]),
                    theta: nested_field(sin, &["theta"]),
                    phase: nested_field(sin, &["phi", "phase"]),
                }
            }
            "PULSE" => {
                let pulse = nested(fields, "pulse");
                Waveform::Pulse {
                    v1: nested_field(pulse, &["v1", "i1"]),
                    v2: nested_field(pulse, &["v2", "i2"]),
                    delay: nested_field(pulse, &["td"]),
                    rise: nested_field(pulse, &["tr"]),
                    fall: nested_field(pulse, &["tf"]),
                    width: nested_field(pulse, &["pw"]),
                    period: nested_field(pulse, &["per"]),
                }
            }
            "EXP" => {
                let exp = nested(fields, "exp");
                Waveform::Exp {
                    v1: nested_field(exp, &["v1", "i1"]),
                    v2: nested_field(exp, &["v2", "i2"]),
                    td1: nested_field(exp, &["td1"]),
                    tau1: nested_field(exp, &["tau1"]),
                    td2: nested_field(exp, &["td2"]),
                    tau2: nested_field(exp, &["tau2"]),
                }
            }
            "PWL" => Waveform::Pwl {
                points: fields.get("pwl").and_then(pwl_points),
            },
            _ => Waveform::Unknown { kind },
        }
    }
}

impl Device {
    /// Build the device variant for `type_name` from the component's extra
    /// fields. Unknown type names become [`Device::Other`].
    pub fn from_fields(type_name: &str, fields: &Map<String, Value>) -> Self {
        let value = || field(fields, &["value"]);
        let model = || ModelOverride {
            name: field(fields, &["model"]),
            params: fields.get("params").and_then(params),
        };

        match type_name.to_ascii_lowercase().as_str() {
            "ground" => Device::Ground,
            "resistor" => Device::Resistor { value: value() },
            "capacitor" => Device::Capacitor {
                value: value(),
                polarized: false,
            },
            "capacitor_polarized" => Device::Capacitor {
                value: value(),
                polarized: true,
            },
            "inductor" => Device::Inductor { value: value() },
            "vsource" => Device::VoltageSource {
                waveform: Waveform::from_fields(fields),
            },
            "isource" => Device::CurrentSource {
                waveform: Waveform::from_fields(fields),
            },
            "diode" => Device::Diode {
                kind: DiodeKind::Diode,
                model: model(),
            },
            "led" => Device::Diode {
                kind: DiodeKind::Led,
                model: model(),
            },
            "zener" => Device::Diode {
                kind: DiodeKind::Zener,
                model: model(),
            },
            "npn" => Device::Bjt {
                polarity: BjtPolarity::Npn,
                model: model(),
            },
            "pnp" => Device::Bjt {
                polarity: BjtPolarity::Pnp,
                model: model(),
            },
            "nmos" => Device::Mosfet {
                channel: MosChannel::N,
                body: field(fields, &["body"]),
                model: model(),
            },
            "pmos" => Device::Mosfet {
                channel: MosChannel::P,
                body: field(fields, &["body"]),
                model: model(),
            },
            "transformer" => Device::Transformer {
                primary: field(fields, &["lp"]),
                secondary: field(fields, &["ls"]),
                coupling: field(fields, &["k"]),
            },
            "opamp" => Device::OpAmp {
                gain: field(fields, &["gain"]),
            },
            other => Device::Other {
                type_name: other.to_string(),
            },
        }
    }

    pub fn is_ground(&self) -> bool {
        matches!(self, Device::Ground)
    }
}

/// SPICE text of a scalar JSON value.
pub(crate) fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-empty value among `keys`.
fn field(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| text(fields.get(*key)))
}

fn nested<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    fields.get(key).and_then(Value::as_object)
}

fn nested_field(map: Option<&Map<String, Value>>, keys: &[&str]) -> Option<String> {
    map.and_then(|map| field(map, keys))
}

fn params(value: &Value) -> Option<Vec<(String, String)>> {
    let Value::Object(map) = value else {
        return None;
    };
    let pairs: Vec<(String, String)> = map
        .iter()
        .filter_map(|(k, v)| text(Some(v)).map(|v| (k.clone(), v)))
        .collect();
    (!pairs.is_empty()).then_some(pairs)
}

/// `pwl` may be raw text or a (possibly nested) array of time/value numbers.
fn pwl_points(value: &Value) -> Option<String> {
    fn flatten(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Array(items) => items.iter().for_each(|item| flatten(item, out)),
            other => out.extend(text(Some(other))),
        }
    }

    match value {
        Value::Array(_) => {
            let mut points = Vec::new();
            flatten(value, &mut points);
            (!points.is_empty()).then(|| points.join(" "))
        }
        other => text(Some(other)),
    }
}
