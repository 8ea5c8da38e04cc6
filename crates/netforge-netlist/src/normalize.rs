//! Canonicalization of generated circuit JSON.
//!
//! Circuits written by a generator (or by hand) use loose vocabulary: `cap`
//! for capacitor, `anode` for port `A`, unsnapped coordinates, connections
//! to a ground that was never placed. [`normalize_circuit`] rewrites such a
//! document into the shape the synthesizer and the editor expect. Items that
//! cannot be repaired are dropped and reported as [`Diagnostic`]s.

use std::collections::HashSet;

use netforge_symbols::SymbolTable;
use serde_json::{json, Map, Value};

use crate::circuit::{is_usable_id, GROUND_REFERENCE, PORT_SEPARATOR};
use crate::connectivity::snap;
use crate::device::text;
use crate::diagnostics::{Diagnostic, SynthesisError};
use crate::options::DEFAULT_GRID;

/// Coordinate used when a component has none.
const DEFAULT_PLACEMENT: f64 = 200.0;
/// Where an inserted ground symbol is placed.
const INSERTED_GROUND_AT: f64 = 120.0;
const INSERTED_GROUND_ID: &str = "GND1";
const GROUND_PORT: &str = "GND";

/// Canonical type name for a loose one, if it is a known alias.
pub fn canonical_type(raw: &str) -> Option<&'static str> {
    let canonical = match raw.trim().to_ascii_lowercase().as_str() {
        "resistor" | "r" => "resistor",
        "capacitor" | "c" | "cap" => "capacitor",
        "capacitor_polarized" | "electrolytic" => "capacitor_polarized",
        "inductor" | "l" => "inductor",
        "diode" | "d" => "diode",
        "led" => "led",
        "zener" | "zenerdiode" => "zener",
        "vsource" | "vs" | "voltage" | "v" => "vsource",
        "isource" | "is" | "current" => "isource",
        "ground" | "gnd" | "0" => "ground",
        "npn" => "npn",
        "pnp" => "pnp",
        "nmos" => "nmos",
        "pmos" => "pmos",
        "opamp" | "opa" | "ua741" => "opamp",
        "transformer" | "xfmr" => "transformer",
        "crystal" | "xtal" => "crystal",
        _ => return None,
    };
    Some(canonical)
}

/// Canonical port id for a loose one on a canonical type. Unknown aliases
/// come back unchanged.
pub fn canonical_port(type_name: &str, raw: &str) -> String {
    let raw = raw.trim();
    let key = raw.to_ascii_lowercase();
    let alias = match (type_name, key.as_str()) {
        ("resistor" | "capacitor" | "capacitor_polarized" | "inductor" | "crystal", port) => {
            match port {
                "1" | "a" | "p" | "+" => Some("1"),
                "2" | "b" | "n" | "-" => Some("2"),
                _ => None,
            }
        }
        ("diode" | "led" | "zener", port) => match port {
            "a" | "anode" | "1" | "+" => Some("A"),
            "k" | "cathode" | "2" | "-" => Some("K"),
            _ => None,
        },
        ("vsource", port) => match port {
            "+" | "p" | "pos" => Some("+"),
            "-" | "n" | "neg" => Some("-"),
            _ => None,
        },
        ("isource", port) => match port {
            "p" | "+" | "pos" => Some("p"),
            "n" | "-" | "neg" => Some("n"),
            _ => None,
        },
        ("npn" | "pnp", port) => match port {
            "b" | "base" => Some("B"),
            "c" | "collector" => Some("C"),
            "e" | "emitter" => Some("E"),
            _ => None,
        },
        ("nmos" | "pmos", port) => match port {
            "g" | "gate" => Some("G"),
            "d" | "drain" => Some("D"),
            "s" | "source" => Some("S"),
            "b" | "body" | "bulk" => Some("B"),
            _ => None,
        },
        ("opamp", port) => match port {
            "in+" | "vin+" | "noninv" => Some("IN+"),
            "in-" | "vin-" | "inv" => Some("IN-"),
            "out" | "o" => Some("OUT"),
            _ => None,
        },
        ("transformer", port) => match port {
            "p_a" | "pa" => Some("P_A"),
            "p_b" | "pb" => Some("P_B"),
            "s_a" | "sa" => Some("S_A"),
            "s_b" | "sb" => Some("S_B"),
            _ => None,
        },
        ("ground", port) => match port {
            "0" | "gnd" | "g" | "ground" => Some(GROUND_PORT),
            _ => None,
        },
        _ => None,
    };
    alias.map(str::to_string).unwrap_or_else(|| raw.to_string())
}

struct Placed {
    id: String,
    type_name: String,
}

/// A canonical circuit document and the items dropped to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub circuit: Value,
    pub diagnostics: Vec<Diagnostic>,
}

/// Rewrite `input` (`{components, connections}`) into canonical form.
///
/// - types are mapped through [`canonical_type`]; types the symbol table does
///   not know are dropped, as are components without an id, ids holding a
///   `.` and repeated ids;
/// - positions are snapped to the default grid (missing ones become 200) and
///   a missing rotation becomes 0;
/// - resistors, capacitors and inductors get a default value, sources a
///   default waveform;
/// - when connections use `0` but no ground is placed, a `GND1` ground is
///   inserted first and the `0` references are redirected to it;
/// - ports are mapped through [`canonical_port`]; connections naming missing
///   components or ports, self-loops and repeats (in either direction) are
///   dropped.
///
/// Every dropped component or connection, apart from entries with no id at
/// all, is reported in [`Normalized::diagnostics`].
pub fn normalize_circuit(
    input: &Value,
    symbols: &SymbolTable,
) -> Result<Normalized, SynthesisError> {
    let Some(object) = input.as_object() else {
        return Err(SynthesisError::InvalidShape);
    };
    let empty = Vec::new();
    let raw_components = match object.get("components").or_else(|| object.get("elements")) {
        Some(Value::Array(items)) => items,
        None => &empty,
        Some(_) => return Err(SynthesisError::InvalidShape),
    };
    let raw_connections = match object.get("connections").or_else(|| object.get("wires")) {
        Some(Value::Array(items)) => items,
        None => &empty,
        Some(_) => return Err(SynthesisError::InvalidShape),
    };

    let mut diagnostics = Vec::new();
    let mut components: Vec<Value> = Vec::new();
    let mut placed: Vec<Placed> = Vec::new();
    for raw in raw_components {
        let Some(fields) = raw.as_object() else {
            log::warn!("Dropping component that is not an object: {raw}");
            continue;
        };
        if let Some((component, entry)) =
            normalize_component(fields, symbols, &placed, &mut diagnostics)
        {
            components.push(component);
            placed.push(entry);
        }
    }

    let mut ground_id = placed
        .iter()
        .find(|p| p.type_name == "ground")
        .map(|p| p.id.clone());
    if ground_id.is_none() && raw_connections.iter().any(uses_ground_reference) {
        let id = unused_id(INSERTED_GROUND_ID, &placed);
        log::debug!("Connections reference ground but none is placed, inserting {id}");
        components.insert(
            0,
            json!({
                "id": id,
                "type": "ground",
                "x": snap(INSERTED_GROUND_AT, DEFAULT_GRID),
                "y": snap(INSERTED_GROUND_AT, DEFAULT_GRID),
                "rotation": 0,
            }),
        );
        placed.insert(
            0,
            Placed {
                id: id.clone(),
                type_name: "ground".to_string(),
            },
        );
        ground_id = Some(id);
    }

    let mut connections = Vec::new();
    let mut seen = HashSet::new();
    for (index, raw) in raw_connections.iter().enumerate() {
        let wire = text(raw.get("id")).unwrap_or_else(|| format!("w{}", index + 1));
        let mut reject = |reference: String, reason: &str| {
            log::warn!("Dropping connection {wire}: {reference} {reason}");
            diagnostics.push(Diagnostic::InvalidWireReference {
                wire: wire.clone(),
                reference,
                reason: reason.to_string(),
            });
        };

        let from = text(raw.get("from"));
        let to = text(raw.get("to"));
        let (from, to) = match (from, to) {
            (Some(from), Some(to)) => (from, to),
            (Some(end), None) | (None, Some(end)) => {
                reject(end, "has no other end");
                continue;
            }
            (None, None) => {
                reject(raw.to_string(), "has no endpoints");
                continue;
            }
        };

        let a = normalize_endpoint(&from, &placed, ground_id.as_deref(), symbols);
        let b = normalize_endpoint(&to, &placed, ground_id.as_deref(), symbols);
        let (a, b) = match (a, b) {
            (Ok(a), Ok(b)) => (a, b),
            (a, b) => {
                for (reference, result) in [(from, a), (to, b)] {
                    if let Err(reason) = result {
                        reject(reference, reason);
                    }
                }
                continue;
            }
        };
        if a == b {
            reject(from, "connects a terminal to itself");
            continue;
        }
        let key = if a < b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        if !seen.insert(key) {
            reject(from, "repeats an earlier connection");
            continue;
        }
        connections.push(json!({"from": a, "to": b}));
    }

    log::debug!(
        "Normalized circuit: {} component(s), {} connection(s)",
        components.len(),
        connections.len()
    );
    Ok(Normalized {
        circuit: json!({"components": components, "connections": connections}),
        diagnostics,
    })
}

fn normalize_component(
    fields: &Map<String, Value>,
    symbols: &SymbolTable,
    placed: &[Placed],
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<(Value, Placed)> {
    let Some(id) = text(fields.get("id")) else {
        log::warn!("Dropping component without an id");
        return None;
    };
    if !is_usable_id(&id) {
        log::warn!("Dropping {id}: component ids cannot contain '.'");
        diagnostics.push(Diagnostic::InvalidComponentId { id });
        return None;
    }
    let raw_type = text(fields.get("type")).unwrap_or_default();
    let type_name = match canonical_type(&raw_type) {
        Some(canonical) => canonical.to_string(),
        None => raw_type.to_ascii_lowercase(),
    };
    if !symbols.contains(&type_name) {
        log::warn!("Dropping {id}: unknown type '{raw_type}'");
        diagnostics.push(Diagnostic::UnknownType {
            id,
            type_name: raw_type,
        });
        return None;
    }
    if placed.iter().any(|p| p.id == id) {
        log::warn!("Dropping repeated component id {id}");
        diagnostics.push(Diagnostic::DuplicateComponent { id });
        return None;
    }

    let mut out = fields.clone();
    out.remove("rot");
    let coordinate = |key: &str| {
        let value = fields.get(key).and_then(Value::as_f64);
        snap(value.unwrap_or(DEFAULT_PLACEMENT), DEFAULT_GRID)
    };
    let rotation = fields
        .get("rotation")
        .or_else(|| fields.get("rot"))
        .and_then(Value::as_f64)
        .filter(|r| r.is_finite())
        .unwrap_or(0.0);

    out.insert("id".into(), json!(id));
    out.insert("type".into(), json!(type_name));
    out.insert("x".into(), json!(coordinate("x")));
    out.insert("y".into(), json!(coordinate("y")));
    out.insert("rotation".into(), json!(rotation));

    let default_value = match type_name.as_str() {
        "resistor" => Some("1k"),
        "capacitor" => Some("1u"),
        "inductor" => Some("1m"),
        _ => None,
    };
    if let Some(default_value) = default_value {
        if text(fields.get("value")).is_none() {
            out.insert("value".into(), json!(default_value));
        }
    }

    match type_name.as_str() {
        "vsource" => default_waveform(
            &mut out,
            "5",
            json!({"vo": "0", "va": "5", "freq": "1k", "td": "0", "theta": "0", "phi": "0"}),
        ),
        "isource" => default_waveform(
            &mut out,
            "1m",
            json!({"io": "0", "ia": "1m", "freq": "1k", "td": "0", "theta": "0", "phi": "0"}),
        ),
        _ => {}
    }

    Some((Value::Object(out), Placed { id, type_name }))
}

fn default_waveform(out: &mut Map<String, Value>, dc: &str, sin: Value) {
    let wave = text(out.get("waveType"))
        .unwrap_or_else(|| "DC".to_string())
        .to_ascii_uppercase();
    match wave.as_str() {
        "DC" if text(out.get("dc")).is_none() => {
            out.insert("dc".into(), json!(dc));
        }
        "AC" if text(out.get("ac")).is_none() => {
            out.insert("ac".into(), json!("1"));
        }
        "SIN" if !out.get("sin").is_some_and(Value::is_object) => {
            out.insert("sin".into(), sin);
        }
        _ => {}
    }
    out.insert("waveType".into(), json!(wave));
}

fn uses_ground_reference(connection: &Value) -> bool {
    ["from", "to"].iter().any(|key| {
        connection
            .get(*key)
            .and_then(|v| text(Some(v)))
            .is_some_and(|reference| match reference.split_once('.') {
                Some((_, port)) => port.trim() == GROUND_REFERENCE,
                None => reference == GROUND_REFERENCE,
            })
    })
}

fn unused_id(base: &str, placed: &[Placed]) -> String {
    let taken = |id: &str| placed.iter().any(|p| p.id == id);
    if !taken(base) {
        return base.to_string();
    }
    let stem = base.trim_end_matches(|c: char| c.is_ascii_digit());
    (2..)
        .map(|n| format!("{stem}{n}"))
        .find(|id| !taken(id))
        .unwrap_or_else(|| base.to_string())
}

/// Canonical `component.port` for one reference, or why it cannot be
/// resolved against the placed components.
fn normalize_endpoint(
    reference: &str,
    placed: &[Placed],
    ground_id: Option<&str>,
    symbols: &SymbolTable,
) -> Result<String, &'static str> {
    let reference = reference.trim();
    let (component, port) = match reference.split_once(PORT_SEPARATOR) {
        Some((component, port)) => (component.trim(), port.trim()),
        None if reference == GROUND_REFERENCE => {
            return Ok(match ground_id {
                Some(ground) => format!("{ground}.{GROUND_PORT}"),
                None => GROUND_REFERENCE.to_string(),
            });
        }
        None => return Err("is not a component.port reference"),
    };

    let Some(entry) = placed.iter().find(|p| p.id == component) else {
        return Err("names no placed component");
    };
    let Some(symbol) = symbols.get(&entry.type_name) else {
        return Err("names no placed component");
    };
    let canonical = canonical_port(&entry.type_name, port);
    if symbol.has_port(&canonical) {
        return Ok(format!("{component}.{canonical}"));
    }
    if port == GROUND_REFERENCE {
        // `R1.0` means ground, not a port of R1.
        return Ok(match ground_id {
            Some(ground) => format!("{ground}.{GROUND_PORT}"),
            None => format!("{component}.{GROUND_REFERENCE}"),
        });
    }
    Err("names a port the symbol does not have")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(input: Value) -> Value {
        normalize_circuit(&input, &SymbolTable::builtin()).unwrap().circuit
    }

    fn dropped(input: Value) -> Vec<Diagnostic> {
        normalize_circuit(&input, &SymbolTable::builtin())
            .unwrap()
            .diagnostics
    }

    fn wire(wire: &str, reference: &str, reason: &str) -> Diagnostic {
        Diagnostic::InvalidWireReference {
            wire: wire.into(),
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    #[test]
    fn aliases_resolve() {
        assert_eq!(canonical_type("Cap"), Some("capacitor"));
        assert_eq!(canonical_type("0"), Some("ground"));
        assert_eq!(canonical_type("fuse"), None);
        assert_eq!(canonical_port("diode", "Anode"), "A");
        assert_eq!(canonical_port("opamp", "in+"), "IN+");
        assert_eq!(canonical_port("vsource", "pos"), "+");
        assert_eq!(canonical_port("npn", "X"), "X");
    }

    #[test]
    fn components_are_canonicalized() {
        let input = json!({
            "components": [
                {"id": " R1 ", "type": "r", "x": 104, "y": 96},
                {"id": "R1", "type": "resistor"},
                {"id": "F1", "type": "fuse"},
                {"type": "resistor"},
                {"id": "V1", "type": "vs", "rot": 90, "x": 0, "y": 0},
                {"id": "Q1", "type": "npn", "model": "2N3904", "x": 300, "y": 0},
                {"id": "X.1", "type": "resistor"},
                {"id": "U1"}
            ],
            "connections": []
        });
        assert_eq!(
            dropped(input.clone()),
            vec![
                Diagnostic::DuplicateComponent { id: "R1".into() },
                Diagnostic::UnknownType {
                    id: "F1".into(),
                    type_name: "fuse".into()
                },
                Diagnostic::InvalidComponentId { id: "X.1".into() },
                Diagnostic::UnknownType {
                    id: "U1".into(),
                    type_name: String::new()
                },
            ]
        );
        let out = normalize(input);
        assert_eq!(
            out,
            json!({
                "components": [
                    {"id": "R1", "type": "resistor", "x": 100.0, "y": 100.0, "rotation": 0.0, "value": "1k"},
                    {"id": "V1", "type": "vsource", "x": 0.0, "y": 0.0, "rotation": 90.0, "waveType": "DC", "dc": "5"},
                    {"id": "Q1", "type": "npn", "model": "2N3904", "x": 300.0, "y": 0.0, "rotation": 0.0}
                ],
                "connections": []
            })
        );
    }

    #[test]
    fn ground_is_inserted_for_zero_references() {
        let out = normalize(json!({
            "components": [{"id": "R1", "type": "resistor", "x": 0, "y": 0, "value": "10k"}],
            "connections": [
                {"from": "R1.a", "to": "R1.0"},
                {"from": "R1.2", "to": "0"}
            ]
        }));
        assert_eq!(out["components"][0]["id"], "GND1");
        assert_eq!(out["components"][0]["x"], 120.0);
        assert_eq!(
            out["connections"],
            json!([
                {"from": "R1.1", "to": "GND1.GND"},
                {"from": "R1.2", "to": "GND1.GND"}
            ])
        );
    }

    #[test]
    fn existing_ground_receives_zero_references() {
        let out = normalize(json!({
            "components": [
                {"id": "G", "type": "gnd"},
                {"id": "GND1", "type": "resistor"}
            ],
            "connections": [{"from": "GND1.1", "to": "0"}]
        }));
        assert_eq!(out["components"].as_array().unwrap().len(), 2);
        assert_eq!(out["connections"], json!([{"from": "GND1.1", "to": "G.GND"}]));
    }

    #[test]
    fn inserted_ground_avoids_taken_ids() {
        let out = normalize(json!({
            "components": [{"id": "GND1", "type": "resistor"}],
            "connections": [{"from": "GND1.2", "to": "GND1.0"}]
        }));
        assert_eq!(out["components"][0]["id"], "GND2");
        assert_eq!(out["connections"], json!([{"from": "GND1.2", "to": "GND2.GND"}]));
    }

    #[test]
    fn duplicate_and_degenerate_connections_are_dropped() {
        let input = json!({
            "components": [
                {"id": "D1", "type": "diode"},
                {"id": "R1", "type": "resistor", "x": 300}
            ],
            "connections": [
                {"from": "D1.anode", "to": "R1.2"},
                {"from": "R1.b", "to": "D1.A"},
                {"from": "D1.K", "to": "D1.cathode"},
                {"from": "D1.K", "to": "R9.1"},
                {"from": "D1.Z", "to": "R1.1"},
                {"from": "D1.K"}
            ]
        });
        assert_eq!(
            dropped(input.clone()),
            vec![
                wire("w2", "R1.b", "repeats an earlier connection"),
                wire("w3", "D1.K", "connects a terminal to itself"),
                wire("w4", "R9.1", "names no placed component"),
                wire("w5", "D1.Z", "names a port the symbol does not have"),
                wire("w6", "D1.K", "has no other end"),
            ]
        );
        let out = normalize(input);
        assert_eq!(out["connections"], json!([{"from": "D1.A", "to": "R1.2"}]));
    }

    #[test]
    fn connection_ids_name_dropped_wires() {
        let diagnostics = dropped(json!({
            "components": [{"id": "R1", "type": "resistor"}],
            "connections": [
                {"id": "bus", "from": "R1.1", "to": "R1"},
                {"from": "R1.2", "to": "0"}
            ]
        }));
        assert_eq!(
            diagnostics,
            vec![wire("bus", "R1", "is not a component.port reference")]
        );
    }

    #[test]
    fn clean_input_reports_nothing() {
        assert!(dropped(json!({
            "components": [{"id": "R1", "type": "resistor"}],
            "connections": [{"from": "R1.1", "to": "0"}]
        }))
        .is_empty());
    }

    #[test]
    fn source_waveforms_get_defaults() {
        let out = normalize(json!({
            "components": [
                {"id": "I1", "type": "current", "waveType": "sin"},
                {"id": "V1", "type": "vsource", "waveType": "ac"}
            ]
        }));
        assert_eq!(out["components"][0]["waveType"], "SIN");
        assert_eq!(out["components"][0]["sin"]["ia"], "1m");
        assert_eq!(out["components"][1]["ac"], "1");
    }

    #[test]
    fn rejects_non_object_input() {
        assert!(normalize_circuit(&json!([]), &SymbolTable::builtin()).is_err());
        assert!(normalize_circuit(&json!({"components": 3}), &SymbolTable::builtin()).is_err());
    }
}
