use serde::Serialize;

/// Hard failures: the input cannot be traversed at all.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("Malformed circuit JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Circuit JSON must be an object with a `components` array")]
    InvalidShape,

    #[error("Grid unit must be a positive number, got {0}")]
    InvalidGrid(f64),
}

/// Recoverable problems found while synthesizing a netlist.
///
/// None of these abort the pass. The offending item is dropped, or rendered
/// with a placeholder, and the diagnostic is returned alongside the netlist.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    #[error("Component {id} has unknown type '{type_name}' and was dropped")]
    UnknownType { id: String, type_name: String },

    #[error("Duplicate component id {id}, later definition dropped")]
    DuplicateComponent { id: String },

    #[error("Component id '{id}' contains '.' and was dropped")]
    InvalidComponentId { id: String },

    #[error("Component {id} has rotation {degrees}, treated as 0")]
    InvalidRotation { id: String, degrees: f64 },

    #[error("Wire {wire} dropped: {reference} {reason}")]
    InvalidWireReference {
        wire: String,
        reference: String,
        reason: String,
    },

    #[error("Component {id} has no port '{port}', connected to ground instead")]
    MissingPort { id: String, port: String },

    #[error("Component {id} of type '{type_name}' has fewer than two ports and was not stamped")]
    UnstampableDevice { id: String, type_name: String },

    #[error("Node {node} has no path to ground")]
    FloatingNode { node: String },
}

impl Diagnostic {
    /// The component this diagnostic is about, if any.
    pub fn component(&self) -> Option<&str> {
        match self {
            Diagnostic::UnknownType { id, .. }
            | Diagnostic::DuplicateComponent { id }
            | Diagnostic::InvalidComponentId { id }
            | Diagnostic::InvalidRotation { id, .. }
            | Diagnostic::MissingPort { id, .. }
            | Diagnostic::UnstampableDevice { id, .. } => Some(id),
            Diagnostic::InvalidWireReference { .. } | Diagnostic::FloatingNode { .. } => None,
        }
    }

    /// Short stable name of the variant, used as a report code.
    pub fn code(&self) -> &'static str {
        match self {
            Diagnostic::UnknownType { .. } => "unknown_type",
            Diagnostic::DuplicateComponent { .. } => "duplicate_component",
            Diagnostic::InvalidComponentId { .. } => "invalid_component_id",
            Diagnostic::InvalidRotation { .. } => "invalid_rotation",
            Diagnostic::InvalidWireReference { .. } => "invalid_wire_reference",
            Diagnostic::MissingPort { .. } => "missing_port",
            Diagnostic::UnstampableDevice { .. } => "unstampable_device",
            Diagnostic::FloatingNode { .. } => "floating_node",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_kind_tag() {
        let diag = Diagnostic::MissingPort {
            id: "V1".into(),
            port: "+".into(),
        };
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["kind"], "missing_port");
        assert_eq!(json["port"], "+");
        assert_eq!(diag.code(), "missing_port");
        assert_eq!(diag.component(), Some("V1"));
    }

    #[test]
    fn messages_name_the_offender() {
        let diag = Diagnostic::InvalidWireReference {
            wire: "w3".into(),
            reference: "Q1.Z".into(),
            reason: "names a port the symbol does not have".into(),
        };
        assert_eq!(
            diag.to_string(),
            "Wire w3 dropped: Q1.Z names a port the symbol does not have"
        );
    }
}
