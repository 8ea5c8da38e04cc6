//! Terminal connectivity: which terminals form one electrical node.
//!
//! Three passes feed one union-find over interned terminal keys:
//!
//! 1. *Geometry*: every port of every placed instance is rotated into canvas
//!    coordinates and snapped to the grid. Terminals sharing a grid cell are
//!    joined, wire or no wire.
//! 2. *Wires*: each wire joins its two terminals after both are validated.
//! 3. *Ground*: the terminal of every ground instance and every literal `0`
//!    reference is joined with a synthetic anchor.
//!
//! Nodes are then named lazily: the anchor's class is `0`, every other class
//! gets `N1`, `N2`, … in the order it is first asked for.

use std::collections::{HashMap, HashSet};

use netforge_symbols::{Port, SymbolDefinition};

use crate::circuit::{ComponentInstance, Endpoint, Rotation, WireEdge};
use crate::diagnostics::Diagnostic;
use crate::union_find::{Interner, UnionFind};

pub const GROUND_ANCHOR: &str = "#gnd";
pub const GROUND_NODE: &str = "0";

/// Port name a ground symbol is anchored by, when it has one.
const GROUND_PORT: &str = "GND";

/// Index of a grid cell, in grid units.
pub fn quantize(value: f64, grid: f64) -> i64 {
    // Halves round toward +inf, like the canvas does.
    (value / grid + 0.5).floor() as i64
}

/// `value` moved to the nearest grid line.
pub fn snap(value: f64, grid: f64) -> f64 {
    quantize(value, grid) as f64 * grid
}

/// An instance accepted for synthesis together with its symbol.
#[derive(Debug, Clone, Copy)]
pub struct PlacedInstance<'a> {
    pub instance: &'a ComponentInstance,
    pub symbol: &'a SymbolDefinition,
}

impl<'a> PlacedInstance<'a> {
    pub fn new(instance: &'a ComponentInstance, symbol: &'a SymbolDefinition) -> Self {
        Self { instance, symbol }
    }

    pub fn id(&self) -> &'a str {
        &self.instance.id
    }

    /// Absolute canvas position of `port` after rotation about the symbol box.
    pub fn port_position(&self, port: &Port) -> (f64, f64) {
        let (x, y) = (self.instance.x, self.instance.y);
        let (w, h) = (self.symbol.width, self.symbol.height);
        let (px, py) = (port.x, port.y);
        match self.instance.rotation {
            Rotation::R0 => (x + px, y + py),
            Rotation::R90 => (x + py, y + (w - px)),
            Rotation::R180 => (x + (w - px), y + (h - py)),
            Rotation::R270 => (x + (h - py), y + px),
        }
    }

    /// The port that anchors a ground symbol: `GND`, else the first port.
    pub fn ground_port(&self) -> Option<&'a Port> {
        self.symbol
            .port(GROUND_PORT)
            .or_else(|| self.symbol.ports.first())
    }
}

/// Interned key of a terminal. Accepted ids never hold the separator, so
/// keys cannot collide.
pub fn terminal_key(component: &str, port: &str) -> String {
    format!("{component}.{port}")
}

/// `true` when canvas position `a` strictly outranks `b` as a source's first
/// terminal. At 0 and 180 degrees the higher port wins (smaller y, canvas y
/// grows downward). At 90 and 270 degrees the port further right wins
/// (larger x). Ties return `false`.
pub fn physically_first(rotation: Rotation, a: (f64, f64), b: (f64, f64)) -> bool {
    match rotation {
        Rotation::R0 | Rotation::R180 => a.1 < b.1,
        Rotation::R90 | Rotation::R270 => a.0 > b.0,
    }
}

#[derive(Debug)]
pub struct Connectivity {
    sets: UnionFind,
    keys: Interner,
    anchor: usize,
    ground_root: usize,
    names: HashMap<usize, String>,
    next_node: u32,
}

impl Connectivity {
    /// Run the geometry, wire and ground passes over `placed`.
    pub fn resolve(
        placed: &[PlacedInstance<'_>],
        wires: &[WireEdge],
        grid: f64,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Self {
        let mut conn = Self {
            sets: UnionFind::new(),
            keys: Interner::new(),
            anchor: 0,
            ground_root: 0,
            names: HashMap::new(),
            next_node: 1,
        };
        conn.anchor = conn.intern(GROUND_ANCHOR);

        conn.join_coincident(placed, grid);
        conn.join_wires(placed, wires, diagnostics);
        conn.bind_ground(placed);
        conn.ground_root = conn.sets.find(conn.anchor);

        log::debug!(
            "Resolved {} terminal(s) from {} instance(s) and {} wire(s)",
            conn.keys.len() - 1,
            placed.len(),
            wires.len()
        );
        conn
    }

    fn intern(&mut self, key: &str) -> usize {
        let (index, added) = self.keys.intern(key);
        if added {
            self.sets.make_set();
        }
        index
    }

    fn join_coincident(&mut self, placed: &[PlacedInstance<'_>], grid: f64) {
        let mut cells: HashMap<(i64, i64), usize> = HashMap::new();
        for inst in placed {
            for port in &inst.symbol.ports {
                let index = self.intern(&terminal_key(inst.id(), &port.id));
                let (x, y) = inst.port_position(port);
                let cell = (quantize(x, grid), quantize(y, grid));
                match cells.get(&cell) {
                    Some(&first) => {
                        self.sets.union(first, index);
                    }
                    None => {
                        cells.insert(cell, index);
                    }
                }
            }
        }
    }

    fn join_wires(
        &mut self,
        placed: &[PlacedInstance<'_>],
        wires: &[WireEdge],
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let placed_ids: HashSet<&str> = placed.iter().map(|inst| inst.id()).collect();

        for wire in wires {
            let a = self.endpoint(&wire.a, &placed_ids);
            let b = self.endpoint(&wire.b, &placed_ids);
            match (a, b) {
                (Ok(a), Ok(b)) => {
                    self.sets.union(a, b);
                }
                (a, b) => {
                    for (endpoint, result) in [(&wire.a, a), (&wire.b, b)] {
                        if let Err(reason) = result {
                            log::warn!("Dropping wire {}: {endpoint} {reason}", wire.id);
                            diagnostics.push(Diagnostic::InvalidWireReference {
                                wire: wire.id.clone(),
                                reference: endpoint.to_string(),
                                reason: reason.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }

    fn endpoint(
        &self,
        endpoint: &Endpoint,
        placed_ids: &HashSet<&str>,
    ) -> Result<usize, &'static str> {
        let (component, port) = match endpoint {
            Endpoint::Ground => return Ok(self.anchor),
            Endpoint::Terminal { component, port } => (component, port),
        };
        if !placed_ids.contains(component.as_str()) {
            return Err("names no placed component");
        }
        if let Some(index) = self.terminal(component, port) {
            return Ok(index);
        }
        // `<id>.0` means ground unless the symbol really has a port `0`.
        if port == GROUND_NODE {
            return Ok(self.anchor);
        }
        Err("names a port the symbol does not have")
    }

    fn bind_ground(&mut self, placed: &[PlacedInstance<'_>]) {
        for inst in placed.iter().filter(|inst| inst.instance.device.is_ground()) {
            match inst.ground_port() {
                Some(port) => {
                    if let Some(index) = self.terminal(inst.id(), &port.id) {
                        self.sets.union(index, self.anchor);
                    }
                }
                None => log::warn!("Ground {} has no ports to anchor", inst.id()),
            }
        }
    }

    /// Interned index of a tracked terminal.
    pub fn terminal(&self, component: &str, port: &str) -> Option<usize> {
        self.keys.get(&terminal_key(component, port))
    }

    pub fn is_ground_class(&mut self, index: usize) -> bool {
        self.sets.find(index) == self.ground_root
    }

    /// Node name of the class holding terminal `index`, minting one if the
    /// class has not been named yet.
    pub fn node_of(&mut self, index: usize) -> String {
        if self.is_ground_class(index) {
            return GROUND_NODE.to_string();
        }
        let root = self.sets.find(index);
        if let Some(name) = self.names.get(&root) {
            return name.clone();
        }
        let name = format!("N{}", self.next_node);
        self.next_node += 1;
        self.names.insert(root, name.clone());
        name
    }

    /// Node name of `component.port`, or `None` when that terminal is not
    /// tracked.
    pub fn node(&mut self, component: &str, port: &str) -> Option<String> {
        let index = self.terminal(component, port)?;
        Some(self.node_of(index))
    }

    /// Every tracked terminal with its node, in placement order. Classes no
    /// device asked for are named here, after all device nodes.
    pub fn terminal_nodes(&mut self) -> Vec<(String, String)> {
        let anchor = self.anchor;
        (0..self.keys.len())
            .filter(|&index| index != anchor)
            .map(|index| {
                let node = self.node_of(index);
                (self.keys.key(index).to_string(), node)
            })
            .collect()
    }
}

/// Nodes with no path to ground.
///
/// `groups` are the node lists of the emitted netlist lines; every line
/// connects all the nodes it names. `nodes` is the full node list to check,
/// in report order.
pub fn floating_nodes<'a, G>(groups: G, nodes: impl IntoIterator<Item = &'a str>) -> Vec<String>
where
    G: IntoIterator<Item = &'a [String]>,
{
    let mut keys = Interner::new();
    let mut sets = UnionFind::new();
    let mut index_of = |name: &str, sets: &mut UnionFind| {
        let (index, added) = keys.intern(name);
        if added {
            sets.make_set();
        }
        index
    };

    let ground = index_of(GROUND_NODE, &mut sets);
    for group in groups {
        let members: Vec<usize> = group.iter().map(|name| index_of(name, &mut sets)).collect();
        if let Some((&first, rest)) = members.split_first() {
            for &member in rest {
                sets.union(member, first);
            }
        }
    }

    let mut floating: Vec<String> = Vec::new();
    for node in nodes {
        if node == GROUND_NODE || floating.iter().any(|f| f == node) {
            continue;
        }
        let index = index_of(node, &mut sets);
        if !sets.same(index, ground) {
            floating.push(node.to_string());
        }
    }
    floating
}

#[cfg(test)]
mod tests {
    use super::*;
    use netforge_symbols::SymbolTable;

    fn resolve(
        components: &[ComponentInstance],
        wires: &[WireEdge],
    ) -> (Connectivity, Vec<Diagnostic>) {
        let symbols = SymbolTable::builtin();
        let placed: Vec<PlacedInstance<'_>> = components
            .iter()
            .map(|c| PlacedInstance::new(c, symbols.get(&c.type_name).unwrap()))
            .collect();
        let mut diagnostics = Vec::new();
        let conn = Connectivity::resolve(&placed, wires, 10.0, &mut diagnostics);
        (conn, diagnostics)
    }

    #[test]
    fn quantize_rounds_halves_up() {
        assert_eq!(quantize(14.9, 10.0), 1);
        assert_eq!(quantize(15.0, 10.0), 2);
        assert_eq!(quantize(-15.0, 10.0), -1);
        assert_eq!(snap(204.0, 10.0), 200.0);
    }

    #[test]
    fn rotation_moves_ports_around_the_box() {
        let symbols = SymbolTable::builtin();
        let def = symbols.get("resistor").unwrap();
        let port = def.port("1").unwrap();
        let at = |rotation| {
            let inst = ComponentInstance::new("R1", "resistor")
                .at(100.0, 100.0)
                .rotated(rotation);
            PlacedInstance::new(&inst, def).port_position(port)
        };
        assert_eq!(at(Rotation::R0), (100.0, 110.0));
        assert_eq!(at(Rotation::R90), (110.0, 160.0));
        assert_eq!(at(Rotation::R180), (160.0, 110.0));
        assert_eq!(at(Rotation::R270), (110.0, 100.0));
    }

    #[test]
    fn touching_terminals_share_a_node() {
        let components = [
            ComponentInstance::new("R1", "resistor").at(0.0, 0.0),
            ComponentInstance::new("R2", "resistor").at(60.0, 0.0),
        ];
        let (mut conn, diagnostics) = resolve(&components, &[]);
        assert!(diagnostics.is_empty());
        assert_eq!(conn.node("R1", "2"), conn.node("R2", "1"));
        assert_ne!(conn.node("R1", "1"), conn.node("R1", "2"));
    }

    #[test]
    fn near_misses_snap_together() {
        let components = [
            ComponentInstance::new("R1", "resistor").at(0.0, 0.0),
            ComponentInstance::new("R2", "resistor").at(63.0, 2.0),
        ];
        let (mut conn, _) = resolve(&components, &[]);
        assert_eq!(conn.node("R1", "2"), conn.node("R2", "1"));
    }

    #[test]
    fn ground_absorbs_everything_it_touches() {
        let components = [
            ComponentInstance::new("R1", "resistor").at(0.0, 0.0),
            ComponentInstance::new("R2", "resistor").at(0.0, 100.0),
            ComponentInstance::new("G1", "ground").at(500.0, 500.0),
        ];
        let wires = [
            WireEdge::between("w1", "R1.2", "G1.GND"),
            WireEdge::between("w2", "R2.1", "0"),
            WireEdge::between("w3", "R2.2", "R1.0"),
        ];
        let (mut conn, diagnostics) = resolve(&components, &wires);
        assert!(diagnostics.is_empty());
        assert_eq!(conn.node("R1", "2").as_deref(), Some("0"));
        assert_eq!(conn.node("R2", "1").as_deref(), Some("0"));
        assert_eq!(conn.node("R2", "2").as_deref(), Some("0"));
        assert_eq!(conn.node("R1", "1").as_deref(), Some("N1"));
    }

    #[test]
    fn ground_class_names_no_numbered_node() {
        let components = [ComponentInstance::new("R1", "resistor")];
        let (mut conn, _) = resolve(&components, &[WireEdge::between("w1", "R1.1", "0")]);
        let grounded = conn.terminal("R1", "1").unwrap();
        let open = conn.terminal("R1", "2").unwrap();

        assert!(conn.is_ground_class(grounded));
        assert!(!conn.is_ground_class(open));
        assert_eq!(conn.node_of(grounded), "0");
        assert_eq!(conn.node_of(open), "N1");
    }

    #[test]
    fn nodes_are_numbered_in_request_order() {
        let components = [
            ComponentInstance::new("R1", "resistor").at(0.0, 0.0),
            ComponentInstance::new("R2", "resistor").at(0.0, 100.0),
        ];
        let (mut conn, _) = resolve(&components, &[]);
        assert_eq!(conn.node("R2", "2").as_deref(), Some("N1"));
        assert_eq!(conn.node("R1", "1").as_deref(), Some("N2"));
        assert_eq!(conn.node("R2", "2").as_deref(), Some("N1"));
        assert_eq!(conn.node("R3", "1"), None);
    }

    #[test]
    fn bad_wire_endpoints_are_reported_and_skipped() {
        let components = [
            ComponentInstance::new("Q1", "npn").at(0.0, 0.0),
            ComponentInstance::new("R1", "resistor").at(200.0, 0.0),
        ];
        let wires = [
            WireEdge::between("w1", "Q1.Z", "R1.1"),
            WireEdge::between("w2", "R9.1", "R1.2"),
        ];
        let (mut conn, diagnostics) = resolve(&components, &wires);
        assert_eq!(
            diagnostics,
            vec![
                Diagnostic::InvalidWireReference {
                    wire: "w1".into(),
                    reference: "Q1.Z".into(),
                    reason: "names a port the symbol does not have".into(),
                },
                Diagnostic::InvalidWireReference {
                    wire: "w2".into(),
                    reference: "R9.1".into(),
                    reason: "names no placed component".into(),
                },
            ]
        );
        assert_ne!(conn.node("R1", "1"), conn.node("Q1", "B"));
    }

    #[test]
    fn terminal_map_covers_unrequested_terminals() {
        let components = [
            ComponentInstance::new("G1", "ground").at(0.0, 0.0),
            ComponentInstance::new("R1", "resistor").at(100.0, 0.0),
        ];
        let (mut conn, _) = resolve(&components, &[WireEdge::between("w1", "R1.1", "G1.GND")]);
        assert_eq!(conn.node("R1", "2").as_deref(), Some("N1"));
        assert_eq!(
            conn.terminal_nodes(),
            vec![
                ("G1.GND".to_string(), "0".to_string()),
                ("R1.1".to_string(), "0".to_string()),
                ("R1.2".to_string(), "N1".to_string()),
            ]
        );
    }

    #[test]
    fn polarity_comparison_uses_canvas_position() {
        let top = (20.0, 0.0);
        let bottom = (20.0, 60.0);
        assert!(physically_first(Rotation::R0, top, bottom));
        assert!(physically_first(Rotation::R180, top, bottom));
        assert!(!physically_first(Rotation::R180, bottom, top));

        let left = (0.0, 20.0);
        let right = (60.0, 20.0);
        assert!(physically_first(Rotation::R90, right, left));
        assert!(physically_first(Rotation::R270, right, left));
        assert!(!physically_first(Rotation::R90, left, right));

        assert!(!physically_first(Rotation::R0, top, top));
        assert!(!physically_first(Rotation::R90, left, left));
    }

    #[test]
    fn floating_nodes_are_those_without_a_ground_path() {
        let lines: Vec<Vec<String>> = vec![
            vec!["N1".into(), "0".into()],
            vec!["N2".into(), "N3".into()],
            vec![],
        ];
        let floating = floating_nodes(
            lines.iter().map(Vec::as_slice),
            ["N1", "N2", "N3", "0", "N2"],
        );
        assert_eq!(floating, vec!["N2", "N3"]);
    }
}
