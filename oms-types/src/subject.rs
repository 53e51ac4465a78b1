//! The caller on whose behalf a read is evaluated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A role name. Roles compare case-insensitively, so the name is stored
/// lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Role(String);

impl Role {
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}

/// Subject context: role plus the optional identity and team used by
/// self- and team-scoped rules.
///
/// A subject without a role is malformed; the policy engine reports it as a
/// caller error rather than a deny.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Subject {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
}

impl Subject {
    /// Creates a subject holding only a role.
    pub fn new(role: impl Into<Role>) -> Self {
        Self {
            role: Some(role.into()),
            identity: None,
            team: None,
        }
    }

    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    #[must_use]
    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    /// Identity, ignoring blank strings.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Team, ignoring blank strings.
    #[must_use]
    pub fn team(&self) -> Option<&str> {
        self.team.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Role, ignoring an empty name.
    #[must_use]
    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref().filter(|r| !r.as_str().is_empty())
    }
}
