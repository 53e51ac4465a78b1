//! Security policy definitions.
//!
//! A [`SecurityPolicy`] governs one object, link or action (its scope key)
//! and holds an ordered list of [`PolicyRule`]s. Rules are ranked by
//! [`Specificity`]; the ranking itself lives in the policy engine.

use oms_types::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Role enumeration used when a document does not declare its own.
pub const DEFAULT_ROLES: &[&str] = &["admin", "manager", "scout", "analyst", "viewer"];

/// Property bound to the subject identity when a rule does not name one.
pub const DEFAULT_OWNER_FIELD: &str = "ownerId";

/// Property bound to the subject team when a rule does not name one.
pub const DEFAULT_TEAM_FIELD: &str = "teamId";

/// Access granted by a rule, from least to most permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    None,
    #[serde(rename = "self")]
    SelfOnly,
    Team,
    Read,
    Full,
}

impl AccessLevel {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "deny" => Some(Self::None),
            "self" => Some(Self::SelfOnly),
            "team" => Some(Self::Team),
            "read" => Some(Self::Read),
            "full" | "write" => Some(Self::Full),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SelfOnly => "self",
            Self::Team => "team",
            Self::Read => "read",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of definition a policy governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Object,
    Link,
    Action,
}

/// Which roles a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleMatcher {
    /// `*`: applies to every role (an explicit default rule).
    Any,
    Named(Role),
}

impl RoleMatcher {
    pub fn matches(&self, role: &Role) -> bool {
        match self {
            Self::Any => true,
            Self::Named(r) => r == role,
        }
    }
}

impl fmt::Display for RoleMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Named(r) => write!(f, "{r}"),
        }
    }
}

/// Field restriction carried by a rule. Allow and deny are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRule {
    Allow(BTreeSet<String>),
    Deny(BTreeSet<String>),
}

/// Subject attribute a row filter binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectAttribute {
    Identity,
    Team,
}

/// One `field = <subject attribute>` binding of a rule's row filter template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeBinding {
    pub field: String,
    pub source: SubjectAttribute,
}

/// Rank of a rule. Higher wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specificity {
    Default,
    Role,
    Team,
    SelfScoped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub role: RoleMatcher,
    pub self_scope: bool,
    pub team_scope: bool,
    pub access_level: AccessLevel,
    pub columns: Option<ColumnRule>,
    /// Row filter template, filled from the subject at evaluation time.
    pub row_template: Vec<ScopeBinding>,
    /// Position in the policy's rule list (storage order).
    pub position: usize,
    /// True for the deny-all rule appended when no explicit default exists.
    pub implicit: bool,
}

impl PolicyRule {
    /// The `accessLevel = none` rule every policy falls back to.
    pub fn implicit_default(position: usize) -> Self {
        Self {
            role: RoleMatcher::Any,
            self_scope: false,
            team_scope: false,
            access_level: AccessLevel::None,
            columns: None,
            row_template: Vec::new(),
            position,
            implicit: true,
        }
    }

    pub fn specificity(&self) -> Specificity {
        if self.self_scope {
            Specificity::SelfScoped
        } else if self.team_scope {
            Specificity::Team
        } else if self.role == RoleMatcher::Any {
            Specificity::Default
        } else {
            Specificity::Role
        }
    }

    /// True for an unscoped wildcard rule.
    pub fn is_default(&self) -> bool {
        self.specificity() == Specificity::Default
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub scope_key: String,
    pub scope_kind: ScopeKind,
    /// Storage order; always ends with a default rule.
    pub rules: Vec<PolicyRule>,
}

impl SecurityPolicy {
    pub fn has_explicit_default(&self) -> bool {
        self.rules.iter().any(|r| r.is_default() && !r.implicit)
    }
}
