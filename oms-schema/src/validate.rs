//! Document validation. Turns a loosely typed [`SchemaDocument`] into typed,
//! name-indexed [`Definitions`], collecting every violation on the way.

use crate::action::ActionTypeDefinition;
use crate::document::{
    ActionDocument, LinkDocument, ObjectDocument, PolicyDocument, ResolutionDocument,
    RuleDocument, SchemaDocument,
};
use crate::error::{DefinitionKind, SchemaValidationError, SchemaViolation};
use crate::link::{Cardinality, LinkResolution, LinkTypeDefinition};
use crate::object::{BackendKind, ObjectTypeDefinition, PrimitiveType, PropertyDefinition};
use crate::policy::{
    AccessLevel, ColumnRule, PolicyRule, RoleMatcher, ScopeBinding, ScopeKind, SecurityPolicy,
    SubjectAttribute, DEFAULT_OWNER_FIELD, DEFAULT_ROLES, DEFAULT_TEAM_FIELD,
};
use crate::snapshot::Definitions;
use oms_types::Role;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

const WILDCARD_ROLE: &str = "*";

pub(crate) fn validate_document(doc: &SchemaDocument) -> Result<Definitions, SchemaValidationError> {
    let mut v = Validator::default();

    if doc.namespace.trim().is_empty() {
        v.push(SchemaViolation::MissingField {
            context: "schema".into(),
            field: "namespace",
        });
    }
    if doc.version.trim().is_empty() {
        v.push(SchemaViolation::MissingField {
            context: "schema".into(),
            field: "version",
        });
    }

    v.defs.roles = match &doc.roles {
        Some(roles) => roles
            .iter()
            .filter(|r| !r.trim().is_empty())
            .map(Role::new)
            .collect(),
        None => DEFAULT_ROLES.iter().map(Role::new).collect(),
    };

    for object in &doc.objects {
        v.object(object);
    }
    for link in &doc.links {
        v.link(link);
    }
    let policy_keys: HashSet<&str> = doc.policies.iter().map(|p| p.scope_key.as_str()).collect();
    for action in &doc.actions {
        v.action(action, &policy_keys);
    }
    for policy in &doc.policies {
        v.policy(policy);
    }

    if v.violations.is_empty() {
        Ok(v.defs)
    } else {
        Err(SchemaValidationError {
            version: doc.version.clone(),
            violations: v.violations,
        })
    }
}

#[derive(Default)]
struct Validator {
    defs: Definitions,
    names: HashMap<String, DefinitionKind>,
    violations: Vec<SchemaViolation>,
}

impl Validator {
    fn push(&mut self, violation: SchemaViolation) {
        self.violations.push(violation);
    }

    /// Registers a definition name. Names share one namespace across
    /// objects, links and actions so scope keys stay unambiguous.
    fn claim_name(&mut self, kind: DefinitionKind, name: &str) -> bool {
        if name.trim().is_empty() {
            self.push(SchemaViolation::MissingField {
                context: format!("{kind} definition"),
                field: "name",
            });
            return false;
        }
        if let Some(existing) = self.names.get(name) {
            let existing = *existing;
            self.push(SchemaViolation::DuplicateName {
                kind,
                name: name.to_string(),
                existing,
            });
            return false;
        }
        self.names.insert(name.to_string(), kind);
        true
    }

    fn object(&mut self, doc: &ObjectDocument) {
        let claimed = self.claim_name(DefinitionKind::Object, &doc.name);
        let mut properties = Vec::with_capacity(doc.properties.len());
        let mut seen = HashSet::new();
        let mut ok = claimed;

        for prop in &doc.properties {
            if prop.name.trim().is_empty() {
                self.push(SchemaViolation::MissingField {
                    context: format!("object '{}'", doc.name),
                    field: "property name",
                });
                ok = false;
                continue;
            }
            if !seen.insert(prop.name.as_str()) {
                self.push(SchemaViolation::DuplicateProperty {
                    object: doc.name.clone(),
                    property: prop.name.clone(),
                });
                ok = false;
                continue;
            }
            match PrimitiveType::parse(&prop.property_type) {
                Some(primitive) => properties.push(PropertyDefinition {
                    name: prop.name.clone(),
                    primitive,
                    nullable: prop.nullable,
                }),
                None => {
                    self.push(SchemaViolation::UnknownPrimitiveType {
                        object: doc.name.clone(),
                        property: prop.name.clone(),
                        type_name: prop.property_type.clone(),
                    });
                    ok = false;
                }
            }
        }

        if doc.primary_key_property.trim().is_empty() {
            self.push(SchemaViolation::MissingField {
                context: format!("object '{}'", doc.name),
                field: "primaryKeyProperty",
            });
            ok = false;
        } else if !seen.contains(doc.primary_key_property.as_str()) {
            self.push(SchemaViolation::MissingPrimaryKey {
                object: doc.name.clone(),
                property: doc.primary_key_property.clone(),
            });
            ok = false;
        }

        let backend = BackendKind::parse(&doc.resolver_backend);
        if doc.resolver_backend.trim().is_empty() {
            self.push(SchemaViolation::MissingField {
                context: format!("object '{}'", doc.name),
                field: "resolverBackend",
            });
        } else if backend.is_none() {
            self.push(SchemaViolation::UnknownBackend {
                object: doc.name.clone(),
                backend: doc.resolver_backend.clone(),
            });
        }
        if doc.backend_locator.trim().is_empty() {
            self.push(SchemaViolation::MissingField {
                context: format!("object '{}'", doc.name),
                field: "backendLocator",
            });
            ok = false;
        }

        if let (true, Some(backend)) = (ok, backend) {
            self.defs.objects.insert(
                doc.name.clone(),
                Arc::new(ObjectTypeDefinition {
                    name: doc.name.clone(),
                    properties,
                    primary_key: doc.primary_key_property.clone(),
                    backend,
                    locator: doc.backend_locator.clone(),
                }),
            );
        }
    }

    fn link(&mut self, doc: &LinkDocument) {
        let claimed = self.claim_name(DefinitionKind::Link, &doc.name);
        let mut ok = claimed;

        for (endpoint, target) in [("fromType", &doc.from_type), ("toType", &doc.to_type)] {
            if !self.names.get(target.as_str()).is_some_and(|k| *k == DefinitionKind::Object) {
                self.push(SchemaViolation::DanglingLinkEndpoint {
                    link: doc.name.clone(),
                    endpoint,
                    target: target.clone(),
                });
                ok = false;
            }
        }

        let cardinality = Cardinality::parse(&doc.cardinality);
        if doc.cardinality.trim().is_empty() {
            self.push(SchemaViolation::MissingField {
                context: format!("link '{}'", doc.name),
                field: "cardinality",
            });
        } else if cardinality.is_none() {
            self.push(SchemaViolation::UnknownCardinality {
                link: doc.name.clone(),
                cardinality: doc.cardinality.clone(),
            });
        }
        let resolution = self.resolution(&doc.name, &doc.resolution);

        if let (Some(cardinality), Some(resolution)) = (cardinality, resolution.as_ref()) {
            let expected = match (cardinality, resolution) {
                (Cardinality::OneToMany, LinkResolution::JoinTable { .. }) => Some("foreignKey"),
                (Cardinality::ManyToMany, LinkResolution::ForeignKey { .. }) => Some("joinTable"),
                _ => None,
            };
            if let Some(expected) = expected {
                self.push(SchemaViolation::ResolutionMismatch {
                    link: doc.name.clone(),
                    cardinality,
                    expected,
                });
                ok = false;
            }
        }

        // The foreign key column lives on the target type.
        if let Some(LinkResolution::ForeignKey { to_field }) = &resolution {
            let target = self.defs.objects.get(&doc.to_type).cloned();
            if let Some(target) = target {
                if !target.has_property(to_field) {
                    self.push(SchemaViolation::UnknownProperty {
                        owner: format!("link '{}'", doc.name),
                        object: target.name.clone(),
                        property: to_field.clone(),
                    });
                    ok = false;
                }
            }
        }

        if let (true, Some(cardinality), Some(resolution)) = (ok, cardinality, resolution) {
            self.defs.links.insert(
                doc.name.clone(),
                Arc::new(LinkTypeDefinition {
                    name: doc.name.clone(),
                    from_type: doc.from_type.clone(),
                    to_type: doc.to_type.clone(),
                    cardinality,
                    resolution,
                }),
            );
        }
    }

    fn resolution(&mut self, link: &str, doc: &ResolutionDocument) -> Option<LinkResolution> {
        let kind: String = doc
            .kind
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match kind.as_str() {
            "" => {
                self.push(SchemaViolation::MissingField {
                    context: format!("link '{link}'"),
                    field: "resolution",
                });
                None
            }
            "foreignkey" | "fk" => match non_blank(&doc.to_field) {
                Some(to_field) => Some(LinkResolution::ForeignKey {
                    to_field: to_field.to_string(),
                }),
                None => {
                    self.push(SchemaViolation::InvalidResolution {
                        link: link.to_string(),
                        detail: "foreignKey resolution requires toField".into(),
                    });
                    None
                }
            },
            "jointable" => {
                match (
                    non_blank(&doc.table_name),
                    non_blank(&doc.from_field),
                    non_blank(&doc.to_field),
                ) {
                    (Some(table_name), Some(from_field), Some(to_field)) => {
                        Some(LinkResolution::JoinTable {
                            table_name: table_name.to_string(),
                            from_field: from_field.to_string(),
                            to_field: to_field.to_string(),
                        })
                    }
                    _ => {
                        self.push(SchemaViolation::InvalidResolution {
                            link: link.to_string(),
                            detail: "joinTable resolution requires tableName, fromField and toField"
                                .into(),
                        });
                        None
                    }
                }
            }
            _ => {
                self.push(SchemaViolation::InvalidResolution {
                    link: link.to_string(),
                    detail: format!("unknown resolution kind '{}'", doc.kind),
                });
                None
            }
        }
    }

    fn action(&mut self, doc: &ActionDocument, policy_keys: &HashSet<&str>) {
        let mut ok = self.claim_name(DefinitionKind::Action, &doc.name);
        if let Some(policy) = &doc.policy {
            if !policy_keys.contains(policy.as_str()) {
                self.push(SchemaViolation::UnresolvedActionPolicy {
                    action: doc.name.clone(),
                    policy: policy.clone(),
                });
                ok = false;
            }
        }
        if ok {
            self.defs.actions.insert(
                doc.name.clone(),
                Arc::new(ActionTypeDefinition {
                    name: doc.name.clone(),
                    input_schema: doc.input_schema.clone(),
                    preconditions: doc.preconditions.clone(),
                    policy: doc.policy.clone(),
                }),
            );
        }
    }

    fn policy(&mut self, doc: &PolicyDocument) {
        let scope_key = doc.scope_key.as_str();
        let scope_kind = match self.names.get(scope_key) {
            Some(DefinitionKind::Object) => ScopeKind::Object,
            Some(DefinitionKind::Link) => ScopeKind::Link,
            Some(DefinitionKind::Action) => ScopeKind::Action,
            None => {
                self.push(SchemaViolation::UnresolvedScopeKey {
                    scope_key: scope_key.to_string(),
                });
                return;
            }
        };
        if self.defs.policies.contains_key(scope_key) {
            self.push(SchemaViolation::DuplicatePolicy {
                scope_key: scope_key.to_string(),
            });
            return;
        }

        // Records served under this scope: the object itself, or a link's target.
        let governed: Option<Arc<ObjectTypeDefinition>> = match scope_kind {
            ScopeKind::Object => self.defs.objects.get(scope_key).cloned(),
            ScopeKind::Link => self
                .defs
                .links
                .get(scope_key)
                .and_then(|l| self.defs.objects.get(&l.to_type))
                .cloned(),
            ScopeKind::Action => None,
        };

        let mut rules = Vec::with_capacity(doc.rules.len() + 1);
        let mut ok = true;
        for (index, rule) in doc.rules.iter().enumerate() {
            match self.rule(scope_key, index, rule, governed.as_deref()) {
                Some(rule) => rules.push(rule),
                None => ok = false,
            }
        }
        if !ok {
            return;
        }

        if !rules.iter().any(PolicyRule::is_default) {
            rules.push(PolicyRule::implicit_default(rules.len()));
        }
        self.defs.policies.insert(
            scope_key.to_string(),
            Arc::new(SecurityPolicy {
                scope_key: scope_key.to_string(),
                scope_kind,
                rules,
            }),
        );
    }

    fn rule(
        &mut self,
        scope_key: &str,
        index: usize,
        doc: &RuleDocument,
        governed: Option<&ObjectTypeDefinition>,
    ) -> Option<PolicyRule> {
        let before = self.violations.len();

        let role = if doc.role.trim() == WILDCARD_ROLE {
            Some(RoleMatcher::Any)
        } else {
            let role = Role::new(&doc.role);
            if self.defs.roles.contains(&role) {
                Some(RoleMatcher::Named(role))
            } else {
                self.push(SchemaViolation::UnknownRole {
                    scope_key: scope_key.to_string(),
                    rule: index,
                    role: doc.role.clone(),
                });
                None
            }
        };

        let access_level = AccessLevel::parse(&doc.access_level);
        match access_level {
            None if doc.access_level.trim().is_empty() => {
                self.push(SchemaViolation::MissingField {
                    context: format!("policy '{scope_key}' rule {index}"),
                    field: "accessLevel",
                })
            }
            None => self.push(SchemaViolation::UnknownAccessLevel {
                scope_key: scope_key.to_string(),
                rule: index,
                level: doc.access_level.clone(),
            }),
            Some(AccessLevel::SelfOnly) if !doc.self_scope => {
                self.push(SchemaViolation::ScopeLevelMismatch {
                    scope_key: scope_key.to_string(),
                    rule: index,
                    level: doc.access_level.clone(),
                    flag: "selfScope",
                })
            }
            Some(AccessLevel::Team) if !doc.team_scope => {
                self.push(SchemaViolation::ScopeLevelMismatch {
                    scope_key: scope_key.to_string(),
                    rule: index,
                    level: doc.access_level.clone(),
                    flag: "teamScope",
                })
            }
            Some(_) => {}
        }

        let columns = match (&doc.column_allow, &doc.column_deny) {
            (Some(_), Some(_)) => {
                self.push(SchemaViolation::ConflictingColumnFilter {
                    scope_key: scope_key.to_string(),
                    rule: index,
                });
                None
            }
            (Some(allow), None) => Some(ColumnRule::Allow(allow.iter().cloned().collect())),
            (None, Some(deny)) => Some(ColumnRule::Deny(deny.iter().cloned().collect())),
            (None, None) => None,
        };

        let mut row_template = Vec::new();
        if doc.self_scope {
            row_template.push(ScopeBinding {
                field: doc.owner_field.clone().unwrap_or_else(|| DEFAULT_OWNER_FIELD.into()),
                source: SubjectAttribute::Identity,
            });
        }
        if doc.team_scope {
            row_template.push(ScopeBinding {
                field: doc.team_field.clone().unwrap_or_else(|| DEFAULT_TEAM_FIELD.into()),
                source: SubjectAttribute::Team,
            });
        }

        if let Some(object) = governed {
            let owner = format!("policy '{scope_key}' rule {index}");
            let mut referenced: BTreeSet<&str> = row_template.iter().map(|b| b.field.as_str()).collect();
            if let Some(ColumnRule::Allow(cols) | ColumnRule::Deny(cols)) = &columns {
                referenced.extend(cols.iter().map(String::as_str));
            }
            for property in referenced {
                if !object.has_property(property) {
                    self.push(SchemaViolation::UnknownProperty {
                        owner: owner.clone(),
                        object: object.name.clone(),
                        property: property.to_string(),
                    });
                }
            }
        }

        if self.violations.len() != before {
            return None;
        }
        Some(PolicyRule {
            role: role?,
            self_scope: doc.self_scope,
            team_scope: doc.team_scope,
            access_level: access_level?,
            columns,
            row_template,
            position: index,
            implicit: false,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
