use oms_policy::{MatchedRule, PolicyDecision, RequestedAction};
use oms_schema::AccessLevel;
use oms_types::{Role, Subject};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a facade read. Denied and not-found are ordinary results and
/// are kept apart so callers can answer them differently.
#[derive(Debug, Clone, PartialEq)]
pub enum Access<T> {
    Granted(T),
    NotFound,
    Denied(Denial),
}

impl<T> Access<T> {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn granted(self) -> Option<T> {
        match self {
            Self::Granted(value) => Some(value),
            Self::NotFound | Self::Denied(_) => None,
        }
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Self::Denied(denial) => Some(denial),
            Self::Granted(_) | Self::NotFound => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Access<U> {
        match self {
            Self::Granted(value) => Access::Granted(f(value)),
            Self::NotFound => Access::NotFound,
            Self::Denied(denial) => Access::Denied(denial),
        }
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denial {
    pub scope_key: String,
    pub action: RequestedAction,
    pub role: Option<Role>,
    pub access_level: AccessLevel,
    /// `None` when no rule applied to the subject at all.
    pub matched_rule: Option<MatchedRule>,
    /// A hidden field the request filtered or sorted on.
    pub field: Option<String>,
}

impl Denial {
    pub(crate) fn new(decision: &PolicyDecision, subject: &Subject) -> Self {
        Self {
            scope_key: decision.scope_key.clone(),
            action: decision.action,
            role: subject.role().cloned(),
            access_level: decision.access_level,
            matched_rule: decision.matched_rule.clone(),
            field: None,
        }
    }

    /// The decision allows the scope but not `field`.
    pub(crate) fn hidden_field(decision: &PolicyDecision, subject: &Subject, field: &str) -> Self {
        Self {
            field: Some(field.to_string()),
            ..Self::new(decision, subject)
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = self.role.as_ref().map_or("<none>", Role::as_str);
        match &self.field {
            Some(field) => write!(
                f,
                "role '{role}' may not {} {}.{field}",
                self.action, self.scope_key
            ),
            None => write!(f, "role '{role}' may not {} {}", self.action, self.scope_key),
        }
    }
}
