//! Per-device stamping rules.
//!
//! A stamp turns one placed instance into netlist text: a primary device line,
//! or for transformers and op-amps a group of extra lines emitted after every
//! primary line. Semiconductor stamps also register the model card their line
//! refers to.

use itertools::Itertools;

use crate::connectivity::{physically_first, Connectivity, PlacedInstance, GROUND_NODE};
use crate::designator::{DesignatorAllocator, Family};
use crate::device::{Device, Waveform};
use crate::diagnostics::Diagnostic;
use crate::models::{DefaultModel, ModelRegistry};

const DEFAULT_RESISTANCE: &str = "1k";
const DEFAULT_CAPACITANCE: &str = "1u";
const DEFAULT_INDUCTANCE: &str = "1m";
const DEFAULT_WINDING: &str = "10m";
const DEFAULT_COUPLING: &str = "0.99";
const DEFAULT_OPAMP_GAIN: &str = "1e6";

/// Fallback waveform parameters for one kind of source.
#[derive(Debug, Clone, Copy)]
pub struct SourceDefaults {
    pub dc: &'static str,
    pub ac: [&'static str; 2],
    pub sin: [&'static str; 6],
    pub pulse: [&'static str; 7],
    pub exp: [&'static str; 6],
    pub pwl: &'static str,
}

pub const VOLTAGE_DEFAULTS: SourceDefaults = SourceDefaults {
    dc: "5",
    ac: ["1", "0"],
    sin: ["0", "5", "1k", "0", "0", "0"],
    pulse: ["0", "5", "0", "1n", "1n", "0.5m", "1m"],
    exp: ["0", "5", "0", "1m", "2m", "1m"],
    pwl: "0 0 1m 5",
};

pub const CURRENT_DEFAULTS: SourceDefaults = SourceDefaults {
    dc: "1m",
    ac: ["1", "0"],
    sin: ["0", "1m", "1k", "0", "0", "0"],
    pulse: ["0", "1m", "0", "1n", "1n", "0.5m", "1m"],
    exp: ["0", "1m", "0", "1m", "2m", "1m"],
    pwl: "0 0 1m 1m",
};

/// One emitted line and the nodes it connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampLine {
    pub text: String,
    pub nodes: Vec<String>,
}

impl StampLine {
    fn new(text: String, nodes: Vec<String>) -> Self {
        Self { text, nodes }
    }
}

/// The lines one instance contributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stamp {
    pub devices: Vec<StampLine>,
    pub extras: Vec<StampLine>,
}

impl Stamp {
    fn device(line: StampLine) -> Self {
        Self {
            devices: vec![line],
            extras: Vec::new(),
        }
    }

    fn extras(lines: Vec<StampLine>) -> Self {
        Self {
            devices: Vec::new(),
            extras: lines,
        }
    }
}

/// `SIN(…)`-style clause with per-field fallbacks.
fn fill<const N: usize>(values: [&Option<String>; N], defaults: &[&str; N]) -> String {
    values
        .iter()
        .zip(defaults)
        .map(|(value, &default)| value.as_deref().unwrap_or(default))
        .join(" ")
}

/// Waveform clause appended to a source line.
pub fn waveform_clause(waveform: &Waveform, defaults: &SourceDefaults) -> String {
    match waveform {
        Waveform::Unspecified { dc } => format!("DC {}", dc.as_deref().unwrap_or("0")),
        Waveform::Dc { value } => format!("DC {}", value.as_deref().unwrap_or(defaults.dc)),
        Waveform::Ac { magnitude, phase } => {
            format!("AC {}", fill([magnitude, phase], &defaults.ac))
        }
        Waveform::Sin {
            offset,
            amplitude,
            frequency,
            delay,
            theta,
            phase,
        } => format!(
            "SIN({})",
            fill(
                [offset, amplitude, frequency, delay, theta, phase],
                &defaults.sin
            )
        ),
        Waveform::Pulse {
            v1,
            v2,
            delay,
            rise,
            fall,
            width,
            period,
        } => format!(
            "PULSE({})",
            fill([v1, v2, delay, rise, fall, width, period], &defaults.pulse)
        ),
        Waveform::Exp {
            v1,
            v2,
            td1,
            tau1,
            td2,
            tau2,
        } => format!(
            "EXP({})",
            fill([v1, v2, td1, tau1, td2, tau2], &defaults.exp)
        ),
        Waveform::Pwl { points } => {
            format!("PWL({})", points.as_deref().unwrap_or(defaults.pwl))
        }
        Waveform::Unknown { kind } => {
            log::warn!("Unknown waveform '{kind}', emitting DC 0");
            "DC 0".to_string()
        }
    }
}

/// Node names of one instance's ports, in symbol order.
struct PortNodes<'a> {
    id: &'a str,
    nodes: Vec<(&'a str, String)>,
}

pub struct Stamper<'c> {
    conn: &'c mut Connectivity,
    designators: DesignatorAllocator,
    models: ModelRegistry,
    diagnostics: Vec<Diagnostic>,
}

impl<'c> Stamper<'c> {
    pub fn new(conn: &'c mut Connectivity) -> Self {
        Self {
            conn,
            designators: DesignatorAllocator::new(),
            models: ModelRegistry::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Registered models and the diagnostics raised while stamping.
    pub fn finish(self) -> (ModelRegistry, Vec<Diagnostic>) {
        (self.models, self.diagnostics)
    }

    pub fn stamp(&mut self, placed: &PlacedInstance<'_>) -> Stamp {
        let device = &placed.instance.device;
        if device.is_ground() {
            return Stamp::default();
        }

        let ports = self.resolve_ports(placed);
        let id = placed.id();
        match device {
            Device::Ground => Stamp::default(),
            Device::Resistor { value } => {
                self.two_terminal(&ports, Family::Resistor, value, DEFAULT_RESISTANCE)
            }
            Device::Capacitor { value, .. } => {
                self.two_terminal(&ports, Family::Capacitor, value, DEFAULT_CAPACITANCE)
            }
            Device::Inductor { value } => {
                self.two_terminal(&ports, Family::Inductor, value, DEFAULT_INDUCTANCE)
            }
            Device::VoltageSource { waveform } => {
                let (first, second) = self.source_polarity(placed, &ports);
                let name = self.designators.designator(id, Family::VoltageSource);
                let clause = waveform_clause(waveform, &VOLTAGE_DEFAULTS);
                Stamp::device(StampLine::new(
                    format!("{name} {first} {second} {clause}"),
                    vec![first, second],
                ))
            }
            Device::CurrentSource { waveform } => {
                let p = self.port(&ports, "p");
                let n = self.port(&ports, "n");
                let name = self.designators.designator(id, Family::CurrentSource);
                let clause = waveform_clause(waveform, &CURRENT_DEFAULTS);
                Stamp::device(StampLine::new(
                    format!("{name} {p} {n} {clause}"),
                    vec![p, n],
                ))
            }
            Device::Diode { kind, model } => {
                let a = self.port(&ports, "A");
                let k = self.port(&ports, "K");
                let name = self.designators.designator(id, Family::Diode);
                let model = self
                    .models
                    .register(DefaultModel::for_diode(*kind).resolve(model));
                Stamp::device(StampLine::new(
                    format!("{name} {a} {k} {model}"),
                    vec![a, k],
                ))
            }
            Device::Bjt { polarity, model } => {
                let c = self.port(&ports, "C");
                let b = self.port(&ports, "B");
                let e = self.port(&ports, "E");
                let name = self.designators.designator(id, Family::Bjt);
                let model = self
                    .models
                    .register(DefaultModel::for_bjt(*polarity).resolve(model));
                Stamp::device(StampLine::new(
                    format!("{name} {c} {b} {e} {model}"),
                    vec![c, b, e],
                ))
            }
            Device::Mosfet {
                channel,
                body,
                model,
            } => {
                let d = self.port(&ports, "D");
                let g = self.port(&ports, "G");
                let s = self.port(&ports, "S");
                let b = match body {
                    Some(body) => self.port(&ports, body),
                    None if placed.symbol.has_port("B") => self.port(&ports, "B"),
                    None => s.clone(),
                };
                let name = self.designators.designator(id, Family::Mosfet);
                let model = self
                    .models
                    .register(DefaultModel::for_mosfet(*channel).resolve(model));
                Stamp::device(StampLine::new(
                    format!("{name} {d} {g} {s} {b} {model}"),
                    vec![d, g, s, b],
                ))
            }
            Device::Transformer {
                primary,
                secondary,
                coupling,
            } => {
                let pa = self.port(&ports, "P_A");
                let pb = self.port(&ports, "P_B");
                let sa = self.port(&ports, "S_A");
                let sb = self.port(&ports, "S_B");
                let lp = self
                    .designators
                    .designator(&format!("{id}.primary"), Family::Inductor);
                let ls = self
                    .designators
                    .designator(&format!("{id}.secondary"), Family::Inductor);
                let k = self.designators.designator(id, Family::Coupling);
                let primary = primary.as_deref().unwrap_or(DEFAULT_WINDING);
                let secondary = secondary.as_deref().unwrap_or(DEFAULT_WINDING);
                let coupling = coupling.as_deref().unwrap_or(DEFAULT_COUPLING);
                Stamp::extras(vec![
                    StampLine::new(format!("{lp} {pa} {pb} {primary}"), vec![pa, pb]),
                    StampLine::new(format!("{ls} {sa} {sb} {secondary}"), vec![sa, sb]),
                    StampLine::new(format!("{k} {lp} {ls} {coupling}"), Vec::new()),
                ])
            }
            Device::OpAmp { gain } => {
                let vn = self.port(&ports, "IN-");
                let vp = self.port(&ports, "IN+");
                let out = self.port(&ports, "OUT");
                let name = self.designators.designator(id, Family::ControlledSource);
                let gain = gain.as_deref().unwrap_or(DEFAULT_OPAMP_GAIN);
                Stamp::extras(vec![StampLine::new(
                    format!("{name} {out} {GROUND_NODE} {vp} {vn} {gain}"),
                    vec![out, GROUND_NODE.to_string(), vp, vn],
                )])
            }
            Device::Other { type_name } => match ports.nodes.as_slice() {
                [(_, n0), (_, n1), ..] => {
                    let (n0, n1) = (n0.clone(), n1.clone());
                    let name = self.designators.designator(id, Family::Subcircuit);
                    Stamp::device(StampLine::new(
                        format!("{name} {n0} {n1} {type_name}"),
                        vec![n0, n1],
                    ))
                }
                _ => {
                    log::warn!("Cannot stamp {id} ({type_name}): fewer than two ports");
                    self.diagnostics.push(Diagnostic::UnstampableDevice {
                        id: id.to_string(),
                        type_name: type_name.clone(),
                    });
                    Stamp::default()
                }
            },
        }
    }

    /// Ask for every port's node in symbol order so node numbering follows
    /// the device list.
    fn resolve_ports<'p>(&mut self, placed: &PlacedInstance<'p>) -> PortNodes<'p> {
        let id = placed.id();
        let nodes = placed
            .symbol
            .ports
            .iter()
            .map(|port| {
                let node = self
                    .conn
                    .node(id, &port.id)
                    .unwrap_or_else(|| GROUND_NODE.to_string());
                (port.id.as_str(), node)
            })
            .collect();
        PortNodes { id, nodes }
    }

    /// Node of `port`, or ground plus a diagnostic when the symbol lacks it.
    fn port(&mut self, ports: &PortNodes<'_>, port: &str) -> String {
        if let Some((_, node)) = ports.nodes.iter().find(|(id, _)| *id == port) {
            return node.clone();
        }
        log::warn!("{} has no port '{port}', using ground", ports.id);
        self.diagnostics.push(Diagnostic::MissingPort {
            id: ports.id.to_string(),
            port: port.to_string(),
        });
        GROUND_NODE.to_string()
    }

    fn two_terminal(
        &mut self,
        ports: &PortNodes<'_>,
        family: Family,
        value: &Option<String>,
        default: &str,
    ) -> Stamp {
        let n1 = self.port(ports, "1");
        let n2 = self.port(ports, "2");
        let name = self.designators.designator(ports.id, family);
        let value = value.as_deref().unwrap_or(default);
        Stamp::device(StampLine::new(
            format!("{name} {n1} {n2} {value}"),
            vec![n1, n2],
        ))
    }

    /// Source terminals ordered by where the ports land on the canvas: the
    /// higher one first at 0/180 degrees, the one further right first at
    /// 90/270 degrees. Ties keep `+` first.
    fn source_polarity(
        &mut self,
        placed: &PlacedInstance<'_>,
        ports: &PortNodes<'_>,
    ) -> (String, String) {
        let plus = self.port(ports, "+");
        let minus = self.port(ports, "-");
        if let (Some(p), Some(m)) = (placed.symbol.port("+"), placed.symbol.port("-")) {
            let rotation = placed.instance.rotation;
            if physically_first(rotation, placed.port_position(m), placed.port_position(p)) {
                log::debug!("{}: '-' leads '+' on the canvas, swapping terminals", placed.id());
                return (minus, plus);
            }
        }
        (plus, minus)
    }
}
