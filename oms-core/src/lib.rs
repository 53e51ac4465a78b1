//! Ontology metadata service core.
//!
//! [`OntologyFacade`] is the entry point for the outer transport layer. It
//! ties together the schema registry ([`oms_schema`]), the policy engine
//! ([`oms_policy`]) and the data resolvers ([`oms_resolver`]):
//!
//! ```text
//! request ─► schema lookup ─► policy decision ─► resolver (cached) ─► column filter ─► result
//!                                   │                    │
//!                                   └─► audit event      └─► query metric
//! ```
//!
//! Denials and missing records are ordinary [`Access`] values; only real
//! failures come back as [`FacadeError`].

mod access;
mod audit;
mod config;
mod error;
mod facade;

pub use access::{Access, Denial};
pub use audit::{AuditEvent, AuditSink, TracingAuditSink};
pub use config::{AuditSection, OmsConfig, RelationalSection, ResolverSection, TabularSection};
pub use error::{ConfigError, FacadeError, FacadeResult};
pub use facade::{ExpansionError, LinkExpansion, LinkedRecords, OntologyFacade, OntologyFacadeBuilder};
