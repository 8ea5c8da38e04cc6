use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::device::Device;
use crate::diagnostics::{Diagnostic, SynthesisError};

/// Literal node reference that always means ground.
pub const GROUND_REFERENCE: &str = "0";
/// Splits a `component.port` reference.
pub const PORT_SEPARATOR: char = '.';

/// Whether `id` can appear on the left of a `component.port` reference.
pub fn is_usable_id(id: &str) -> bool {
    !id.contains(PORT_SEPARATOR)
}

/// One of the four axis-aligned orientations a symbol can be placed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Parse clockwise degrees. Any multiple of 90 is accepted, negative
    /// values included; anything else is `None`.
    pub fn from_degrees(degrees: f64) -> Option<Self> {
        if !degrees.is_finite() || degrees.fract() != 0.0 {
            return None;
        }
        match (degrees as i64).rem_euclid(360) {
            0 => Some(Rotation::R0),
            90 => Some(Rotation::R90),
            180 => Some(Rotation::R180),
            270 => Some(Rotation::R270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }
}

/// A placed component. Immutable for the duration of one synthesis pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentInstance {
    pub id: String,
    pub type_name: String,
    pub x: f64,
    pub y: f64,
    pub rotation: Rotation,
    pub device: Device,
}

impl ComponentInstance {
    /// New instance at the origin with the default fields for `type_name`.
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let device = Device::from_fields(&type_name, &Map::new());
        Self {
            id: id.into(),
            type_name,
            x: 0.0,
            y: 0.0,
            rotation: Rotation::R0,
            device,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn rotated(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }
}

/// One side of a wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Endpoint {
    Terminal { component: String, port: String },
    /// The bare `0` reference.
    Ground,
}

impl Endpoint {
    pub fn terminal(component: impl Into<String>, port: impl Into<String>) -> Self {
        Endpoint::Terminal {
            component: component.into(),
            port: port.into(),
        }
    }

    /// Parse a dotted `component.port` reference. A reference without a dot
    /// (other than `0`) yields a terminal with an empty port, which never
    /// validates.
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();
        if reference == GROUND_REFERENCE {
            return Endpoint::Ground;
        }
        match reference.split_once(PORT_SEPARATOR) {
            Some((component, port)) => Endpoint::terminal(component.trim(), port.trim()),
            None => Endpoint::terminal(reference, ""),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Terminal { component, port } => write!(f, "{component}.{port}"),
            Endpoint::Ground => f.write_str(GROUND_REFERENCE),
        }
    }
}

/// A user-drawn connection between two named terminals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireEdge {
    pub id: String,
    pub a: Endpoint,
    pub b: Endpoint,
}

impl WireEdge {
    pub fn new(id: impl Into<String>, a: Endpoint, b: Endpoint) -> Self {
        Self { id: id.into(), a, b }
    }

    /// Wire between two dotted references.
    pub fn between(id: impl Into<String>, from: &str, to: &str) -> Self {
        Self::new(id, Endpoint::parse(from), Endpoint::parse(to))
    }
}

/// Everything one synthesis pass consumes apart from the symbol table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Circuit {
    pub components: Vec<ComponentInstance>,
    pub wires: Vec<WireEdge>,
    /// Problems found while reading the input, reported with the netlist.
    #[serde(skip)]
    pub diagnostics: Vec<Diagnostic>,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, component: ComponentInstance) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_wire(mut self, from: &str, to: &str) -> Self {
        let id = format!("w{}", self.wires.len() + 1);
        self.wires.push(WireEdge::between(id, from, to));
        self
    }

    /// Parse the editor's circuit JSON.
    pub fn from_json(json: &str) -> Result<Self, SynthesisError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, SynthesisError> {
        if !value.get("components").is_some_and(Value::is_array)
            && !value.get("elements").is_some_and(Value::is_array)
        {
            return Err(SynthesisError::InvalidShape);
        }
        let raw: RawCircuit = serde_json::from_value(value)?;

        let mut diagnostics = Vec::new();
        let components = raw
            .components
            .into_iter()
            .map(|raw| raw.into_instance(&mut diagnostics))
            .collect();
        let wires = raw
            .connections
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let id = raw.id.unwrap_or_else(|| format!("w{}", index + 1));
                WireEdge::between(id, &raw.from, &raw.to)
            })
            .collect();

        Ok(Self {
            components,
            wires,
            diagnostics,
        })
    }
}

#[derive(Deserialize)]
struct RawCircuit {
    #[serde(alias = "elements")]
    components: Vec<RawComponent>,
    #[serde(default, alias = "wires")]
    connections: Vec<RawConnection>,
}

#[derive(Deserialize)]
struct RawComponent {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default, alias = "rot")]
    rotation: Option<f64>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl RawComponent {
    fn into_instance(self, diagnostics: &mut Vec<Diagnostic>) -> ComponentInstance {
        let degrees = self.rotation.unwrap_or(0.0);
        let rotation = Rotation::from_degrees(degrees).unwrap_or_else(|| {
            log::warn!("Component {} has rotation {degrees}, using 0", self.id);
            diagnostics.push(Diagnostic::InvalidRotation {
                id: self.id.clone(),
                degrees,
            });
            Rotation::R0
        });

        ComponentInstance {
            device: Device::from_fields(&self.type_name, &self.fields),
            id: self.id,
            type_name: self.type_name,
            x: self.x,
            y: self.y,
            rotation,
        }
    }
}

#[derive(Deserialize)]
struct RawConnection {
    #[serde(deserialize_with = "id_string")]
    from: String,
    #[serde(deserialize_with = "id_string")]
    to: String,
    #[serde(default, deserialize_with = "optional_id_string")]
    id: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    String(String),
    Number(serde_json::Number),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::String(s) => s.trim().to_string(),
            RawId::Number(n) => n.to_string(),
        }
    }
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

fn optional_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}
