//! Role-based policy evaluation.
//!
//! [`PolicyEngine::evaluate_access`] picks the most specific rule that applies
//! to a subject and turns it into a [`PolicyDecision`]: whether the action is
//! allowed, the row filter to push into the resolver, and the column filter
//! to apply to its results.
//!
//! Rules rank as self-scoped > team-scoped > role > default. Ties at equal
//! specificity go to the lower access level, then storage order. Column deny
//! sets from every matching rule are unioned, so a field denied anywhere in
//! the matching set is never served.

mod decision;
mod engine;
mod error;

pub use decision::{ColumnFilter, MatchedRule, PolicyDecision, RequestedAction};
pub use engine::{rank_rules, PolicyEngine};
pub use error::{PolicyError, PolicyResult};
