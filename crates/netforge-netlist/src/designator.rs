use std::collections::HashMap;

/// Reference-designator family. Each family has its own counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Resistor,
    Capacitor,
    Inductor,
    VoltageSource,
    CurrentSource,
    Diode,
    Bjt,
    Mosfet,
    Coupling,
    ControlledSource,
    Subcircuit,
}

impl Family {
    pub fn prefix(self) -> &'static str {
        match self {
            Family::Resistor => "R",
            Family::Capacitor => "C",
            Family::Inductor => "L",
            Family::VoltageSource => "V",
            Family::CurrentSource => "I",
            Family::Diode => "D",
            Family::Bjt => "Q",
            Family::Mosfet => "M",
            Family::Coupling => "K",
            Family::ControlledSource => "E",
            Family::Subcircuit => "X",
        }
    }
}

/// Hands out `prefix + counter` names, memoized per key.
#[derive(Debug, Default)]
pub struct DesignatorAllocator {
    assigned: HashMap<String, String>,
    counters: HashMap<Family, u32>,
}

impl DesignatorAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Designator for `key`. The first request assigns the family's next
    /// number; later requests for the same key return the same name.
    pub fn designator(&mut self, key: &str, family: Family) -> String {
        if let Some(name) = self.assigned.get(key) {
            return name.clone();
        }
        let counter = self.counters.entry(family).or_default();
        *counter += 1;
        let name = format!("{}{}", family.prefix(), *counter);
        self.assigned.insert(key.to_string(), name.clone());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_per_family() {
        let mut refs = DesignatorAllocator::new();
        assert_eq!(refs.designator("a", Family::Resistor), "R1");
        assert_eq!(refs.designator("b", Family::Capacitor), "C1");
        assert_eq!(refs.designator("c", Family::Resistor), "R2");
    }

    #[test]
    fn repeated_key_is_memoized() {
        let mut refs = DesignatorAllocator::new();
        let first = refs.designator("R_load", Family::Resistor);
        refs.designator("R_bias", Family::Resistor);
        assert_eq!(refs.designator("R_load", Family::Resistor), first);
        assert_eq!(refs.designator("R_next", Family::Resistor), "R3");
    }

    #[test]
    fn transformer_windings_share_inductor_numbering() {
        let mut refs = DesignatorAllocator::new();
        assert_eq!(refs.designator("L1", Family::Inductor), "L1");
        assert_eq!(refs.designator("T1.primary", Family::Inductor), "L2");
        assert_eq!(refs.designator("T1.secondary", Family::Inductor), "L3");
        assert_eq!(refs.designator("T1", Family::Coupling), "K1");
    }
}
