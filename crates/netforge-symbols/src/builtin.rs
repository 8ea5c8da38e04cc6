use crate::SymbolDefinition;

// Two-terminal parts are drawn horizontally, 60x20, with ports on the short
// edges. Sources and transistors are drawn vertically. All port offsets sit on
// the 10-unit canvas grid.
fn two_terminal(name: &str, prefix: &str, a: &str, b: &str) -> SymbolDefinition {
    SymbolDefinition::new(name, 60.0, 20.0)
        .with_port(a, 0.0, 10.0)
        .with_port(b, 60.0, 10.0)
        .with_prefix(prefix)
}

fn vertical_source(name: &str, prefix: &str, top: &str, bottom: &str) -> SymbolDefinition {
    SymbolDefinition::new(name, 40.0, 60.0)
        .with_port(top, 20.0, 0.0)
        .with_port(bottom, 20.0, 60.0)
        .with_prefix(prefix)
}

fn three_terminal(name: &str, prefix: &str, top: &str, side: &str, bottom: &str) -> SymbolDefinition {
    SymbolDefinition::new(name, 40.0, 60.0)
        .with_port(top, 40.0, 0.0)
        .with_port(side, 0.0, 30.0)
        .with_port(bottom, 40.0, 60.0)
        .with_prefix(prefix)
}

pub(crate) fn builtin_symbols() -> Vec<(&'static str, SymbolDefinition)> {
    vec![
        ("resistor", two_terminal("resistor", "R", "1", "2")),
        ("capacitor", two_terminal("capacitor", "C", "1", "2")),
        (
            "capacitor_polarized",
            two_terminal("capacitor_polarized", "C", "1", "2"),
        ),
        ("inductor", two_terminal("inductor", "L", "1", "2")),
        ("crystal", two_terminal("crystal", "X", "1", "2")),
        ("diode", two_terminal("diode", "D", "A", "K")),
        ("led", two_terminal("led", "D", "A", "K")),
        ("zener", two_terminal("zener", "D", "A", "K")),
        ("vsource", vertical_source("vsource", "V", "+", "-")),
        ("isource", vertical_source("isource", "I", "p", "n")),
        (
            "ground",
            SymbolDefinition::new("ground", 20.0, 20.0)
                .with_port("GND", 10.0, 0.0)
                .with_prefix("G"),
        ),
        ("npn", three_terminal("npn", "Q", "C", "B", "E")),
        ("pnp", three_terminal("pnp", "Q", "C", "B", "E")),
        ("nmos", three_terminal("nmos", "M", "D", "G", "S")),
        ("pmos", three_terminal("pmos", "M", "D", "G", "S")),
        (
            "opamp",
            SymbolDefinition::new("opamp", 60.0, 40.0)
                .with_port("IN-", 0.0, 10.0)
                .with_port("IN+", 0.0, 30.0)
                .with_port("OUT", 60.0, 20.0)
                .with_prefix("E"),
        ),
        (
            "transformer",
            SymbolDefinition::new("transformer", 60.0, 60.0)
                .with_port("P_A", 0.0, 0.0)
                .with_port("P_B", 0.0, 60.0)
                .with_port("S_A", 60.0, 0.0)
                .with_port("S_B", 60.0, 60.0)
                .with_prefix("K"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ports_sit_on_grid() {
        for (type_name, def) in builtin_symbols() {
            for port in &def.ports {
                assert_eq!(port.x % 10.0, 0.0, "{type_name}.{} x off grid", port.id);
                assert_eq!(port.y % 10.0, 0.0, "{type_name}.{} y off grid", port.id);
                assert!(port.x <= def.width && port.y <= def.height);
            }
        }
    }
}
