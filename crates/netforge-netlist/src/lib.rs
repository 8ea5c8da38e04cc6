//! Connectivity resolution and SPICE netlist synthesis.
//!
//! [`synthesize`] is a pure function of a placed [`Circuit`], an immutable
//! [`SymbolTable`] and [`SynthesisOptions`]. It works in four steps:
//!
//! * instances whose type the table knows are accepted, others are reported;
//! * [`connectivity`] folds coincident ports, wires and ground references into
//!   nodes;
//! * [`stamp`] turns every accepted instance, in input order, into netlist
//!   lines and registers the models they use;
//! * [`spice_netlist`] assembles the deck.
//!
//! Nothing is fatal once the input parses. Dropped or patched items come
//! back as [`Diagnostic`]s next to the netlist.
//!
//! ```rust
//! use netforge_netlist::{synthesize, Circuit, ComponentInstance, SynthesisOptions};
//! use netforge_symbols::SymbolTable;
//!
//! let circuit = Circuit::new()
//!     .with_component(ComponentInstance::new("R1", "resistor"))
//!     .with_component(ComponentInstance::new("G1", "ground").at(100.0, 100.0))
//!     .with_wire("R1.2", "G1.GND");
//! let result = synthesize(&circuit, &SymbolTable::builtin(), &SynthesisOptions::default())?;
//! assert_eq!(result.netlist.devices(), ["R1 N1 0 1k"]);
//! # Ok::<(), netforge_netlist::SynthesisError>(())
//! ```

pub mod circuit;
pub mod connectivity;
pub mod designator;
pub mod device;
pub mod diagnostics;
pub mod models;
pub mod normalize;
pub mod options;
pub mod spice_netlist;
pub mod stamp;
pub mod union_find;

use std::collections::HashSet;

use netforge_symbols::SymbolTable;
use serde::Serialize;

pub use circuit::{Circuit, ComponentInstance, Endpoint, Rotation, WireEdge};
pub use device::{Device, ModelOverride, Waveform};
pub use diagnostics::{Diagnostic, SynthesisError};
pub use normalize::{normalize_circuit, Normalized};
pub use options::{AcVariation, Analysis, SynthesisOptions};
pub use spice_netlist::Netlist;

use circuit::is_usable_id;
use connectivity::{floating_nodes, Connectivity, PlacedInstance};
use stamp::Stamper;

/// Output of one synthesis pass.
#[derive(Debug, Clone, Serialize)]
pub struct Synthesis {
    pub netlist: Netlist,
    pub diagnostics: Vec<Diagnostic>,
    /// Every tracked terminal (`component.port`) with its node, in placement
    /// order.
    pub terminal_nodes: Vec<(String, String)>,
}

impl Synthesis {
    /// Node of one terminal, if it was tracked.
    pub fn node_of(&self, terminal: &str) -> Option<&str> {
        self.terminal_nodes
            .iter()
            .find(|(key, _)| key == terminal)
            .map(|(_, node)| node.as_str())
    }
}

/// Synthesize a netlist for `circuit`.
pub fn synthesize(
    circuit: &Circuit,
    symbols: &SymbolTable,
    options: &SynthesisOptions,
) -> Result<Synthesis, SynthesisError> {
    if !(options.grid.is_finite() && options.grid > 0.0) {
        return Err(SynthesisError::InvalidGrid(options.grid));
    }

    let mut diagnostics = circuit.diagnostics.clone();
    let placed = accept_instances(circuit, symbols, &mut diagnostics);
    log::debug!(
        "Accepted {} of {} component(s)",
        placed.len(),
        circuit.components.len()
    );

    let mut conn = Connectivity::resolve(&placed, &circuit.wires, options.grid, &mut diagnostics);

    let mut devices = Vec::new();
    let mut extras = Vec::new();
    let mut stamper = Stamper::new(&mut conn);
    for inst in &placed {
        let stamp = stamper.stamp(inst);
        devices.extend(stamp.devices);
        extras.extend(stamp.extras);
    }
    let (models, stamp_diagnostics) = stamper.finish();
    diagnostics.extend(stamp_diagnostics);

    let terminal_nodes = conn.terminal_nodes();
    let floating = floating_nodes(
        devices.iter().chain(&extras).map(|line| line.nodes.as_slice()),
        terminal_nodes.iter().map(|(_, node)| node.as_str()),
    );
    for node in floating {
        log::debug!("Node {node} has no path to ground");
        diagnostics.push(Diagnostic::FloatingNode { node });
    }

    let netlist = Netlist::new(
        &options.title,
        models.lines(),
        devices.into_iter().map(|line| line.text).collect(),
        extras.into_iter().map(|line| line.text).collect(),
        &options.effective_analyses(),
    );

    Ok(Synthesis {
        netlist,
        diagnostics,
        terminal_nodes,
    })
}

/// Parse editor JSON and synthesize it in one step.
pub fn synthesize_json(
    json: &str,
    symbols: &SymbolTable,
    options: &SynthesisOptions,
) -> Result<Synthesis, SynthesisError> {
    let circuit = Circuit::from_json(json)?;
    synthesize(&circuit, symbols, options)
}

/// Instances that take part in synthesis: known type, first of their id.
fn accept_instances<'a>(
    circuit: &'a Circuit,
    symbols: &'a SymbolTable,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<PlacedInstance<'a>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut placed = Vec::with_capacity(circuit.components.len());

    for instance in &circuit.components {
        if !is_usable_id(&instance.id) {
            log::warn!("Dropping {}: component ids cannot contain '.'", instance.id);
            diagnostics.push(Diagnostic::InvalidComponentId {
                id: instance.id.clone(),
            });
            continue;
        }
        if seen.contains(instance.id.as_str()) {
            log::warn!("Dropping duplicate component id {}", instance.id);
            diagnostics.push(Diagnostic::DuplicateComponent {
                id: instance.id.clone(),
            });
            continue;
        }
        let Some(symbol) = symbols.get(&instance.type_name) else {
            log::warn!(
                "Dropping {}: no symbol for type '{}'",
                instance.id,
                instance.type_name
            );
            diagnostics.push(Diagnostic::UnknownType {
                id: instance.id.clone(),
                type_name: instance.type_name.clone(),
            });
            continue;
        };
        seen.insert(&instance.id);
        placed.push(PlacedInstance::new(instance, symbol));
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_grid() {
        let options = SynthesisOptions::default().with_grid(0.0);
        let err = synthesize(&Circuit::new(), &SymbolTable::builtin(), &options).unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidGrid(_)));
    }

    #[test]
    fn unknown_and_duplicate_components_are_dropped() {
        let circuit = Circuit::new()
            .with_component(ComponentInstance::new("R1", "resistor"))
            .with_component(ComponentInstance::new("R1", "capacitor").at(200.0, 0.0))
            .with_component(ComponentInstance::new("U7", "flux_capacitor"))
            .with_wire("U7.1", "R1.1");
        let result =
            synthesize(&circuit, &SymbolTable::builtin(), &SynthesisOptions::default()).unwrap();

        assert_eq!(result.netlist.devices(), ["R1 N1 N2 1k"]);
        assert_eq!(
            result.diagnostics,
            vec![
                Diagnostic::DuplicateComponent { id: "R1".into() },
                Diagnostic::UnknownType {
                    id: "U7".into(),
                    type_name: "flux_capacitor".into()
                },
                Diagnostic::InvalidWireReference {
                    wire: "w1".into(),
                    reference: "U7.1".into(),
                    reason: "names no placed component".into()
                },
                Diagnostic::FloatingNode { node: "N1".into() },
                Diagnostic::FloatingNode { node: "N2".into() },
            ]
        );
    }

    #[test]
    fn dotted_component_ids_are_rejected() {
        let circuit = Circuit::new()
            .with_component(ComponentInstance::new("R.1", "resistor"))
            .with_component(ComponentInstance::new("R", "resistor").at(200.0, 0.0))
            .with_wire("R.1.1", "0");
        let result =
            synthesize(&circuit, &SymbolTable::builtin(), &SynthesisOptions::default()).unwrap();

        assert_eq!(result.netlist.devices(), ["R1 N1 N2 1k"]);
        assert_eq!(
            result.diagnostics[..2],
            [
                Diagnostic::InvalidComponentId { id: "R.1".into() },
                Diagnostic::InvalidWireReference {
                    wire: "w1".into(),
                    reference: "R.1.1".into(),
                    reason: "names a port the symbol does not have".into()
                },
            ]
        );
        assert_eq!(result.node_of("R.1.1"), None);
    }

    #[test]
    fn terminal_map_lists_every_terminal() {
        let circuit = Circuit::new()
            .with_component(ComponentInstance::new("R1", "resistor"))
            .with_component(ComponentInstance::new("R2", "resistor").at(60.0, 0.0));
        let result =
            synthesize(&circuit, &SymbolTable::builtin(), &SynthesisOptions::default()).unwrap();
        assert_eq!(result.node_of("R1.2"), Some("N2"));
        assert_eq!(result.node_of("R2.1"), Some("N2"));
        assert_eq!(result.node_of("R2.2"), Some("N3"));
        assert_eq!(result.node_of("R3.1"), None);
        assert_eq!(result.terminal_nodes.len(), 4);
    }
}
