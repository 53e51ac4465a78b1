use serde::{Deserialize, Serialize};

/// An action type. The core stores and exposes it; execution belongs to an
/// external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionTypeDefinition {
    pub name: String,
    pub input_schema: serde_json::Value,
    /// Checks run by the executor, in order.
    pub preconditions: Vec<serde_json::Value>,
    /// Scope key of the policy governing execution.
    pub policy: Option<String>,
}
