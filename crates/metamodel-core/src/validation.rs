//! Metamodel validation.
//!
//! Validators run once every class is introspected and collect failures
//! rather than stopping at the first one, so a boot reports everything that is
//! wrong with the model at once.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::facetapi::HasFacetHolder;
use crate::facets::object::LogicalTypeFacet;
use crate::methods::ConflictingAnnotations;
use crate::reflect::{TypeRef, TypeRegistry};
use crate::spec::{ObjectFeature, ObjectSpecification};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationKind {
    ConflictingAnnotations,
    OrphanedSupportMethod,
    UnknownMemberType,
    DuplicateLogicalTypeName,
    DuplicateMemberId,
    MissingLogicalTypeName,
    IntrospectionFailed,
}

impl ValidationKind {
    pub fn name(self) -> &'static str {
        match self {
            ValidationKind::ConflictingAnnotations => "conflicting-annotations",
            ValidationKind::OrphanedSupportMethod => "orphaned-support-method",
            ValidationKind::UnknownMemberType => "unknown-member-type",
            ValidationKind::DuplicateLogicalTypeName => "duplicate-logical-type-name",
            ValidationKind::DuplicateMemberId => "duplicate-member-id",
            ValidationKind::MissingLogicalTypeName => "missing-logical-type-name",
            ValidationKind::IntrospectionFailed => "introspection-failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Type, member or method the failure is about.
    pub origin: String,
    pub kind: ValidationKind,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(origin: impl Into<String>, kind: ValidationKind, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind.name(), self.origin, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationFailures(Vec<ValidationFailure>);

impl ValidationFailures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, failure: ValidationFailure) {
        self.0.push(failure);
    }

    pub fn extend(&mut self, failures: impl IntoIterator<Item = ValidationFailure>) {
        self.0.extend(failures);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationFailure> {
        self.0.iter()
    }

    pub fn of_kind(&self, kind: ValidationKind) -> impl Iterator<Item = &ValidationFailure> {
        self.0.iter().filter(move |f| f.kind == kind)
    }

    pub fn into_vec(self) -> Vec<ValidationFailure> {
        self.0
    }
}

impl fmt::Display for ValidationFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {failure}")?;
        }
        Ok(())
    }
}

impl IntoIterator for ValidationFailures {
    type Item = ValidationFailure;
    type IntoIter = std::vec::IntoIter<ValidationFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// ============================================================================
// Validators
// ============================================================================

pub trait MetaModelValidator: Send + Sync {
    fn name(&self) -> &'static str;

    fn validate(
        &self,
        specs: &[Arc<ObjectSpecification>],
        registry: &TypeRegistry,
        failures: &mut ValidationFailures,
    );
}

pub fn default_validators() -> Vec<Box<dyn MetaModelValidator>> {
    vec![
        Box::new(IntrospectionFailuresValidator),
        Box::new(SupportMethodValidator),
        Box::new(MemberTypeValidator),
        Box::new(LogicalTypeNameValidator),
    ]
}

/// Runs `validators` in order over `specs`.
pub fn run_validators(
    validators: &[Box<dyn MetaModelValidator>],
    specs: &[Arc<ObjectSpecification>],
    registry: &TypeRegistry,
) -> ValidationFailures {
    let mut failures = ValidationFailures::new();
    for validator in validators {
        let before = failures.len();
        validator.validate(specs, registry, &mut failures);
        tracing::debug!(
            validator = validator.name(),
            failures = failures.len() - before,
            "validator finished"
        );
    }
    failures
}

/// Failures recorded while members were discovered (duplicate ids).
pub struct IntrospectionFailuresValidator;

impl MetaModelValidator for IntrospectionFailuresValidator {
    fn name(&self) -> &'static str {
        "IntrospectionFailuresValidator"
    }

    fn validate(
        &self,
        specs: &[Arc<ObjectSpecification>],
        _registry: &TypeRegistry,
        failures: &mut ValidationFailures,
    ) {
        for spec in specs {
            failures.extend(spec.introspection_failures().iter().cloned());
        }
    }
}

/// Support methods no factory consumed: conflicting annotations when the
/// marker sits next to a prohibited annotation, orphaned otherwise.
pub struct SupportMethodValidator;

impl MetaModelValidator for SupportMethodValidator {
    fn name(&self) -> &'static str {
        "SupportMethodValidator"
    }

    fn validate(
        &self,
        specs: &[Arc<ObjectSpecification>],
        registry: &TypeRegistry,
        failures: &mut ValidationFailures,
    ) {
        let rules = [
            ConflictingAnnotations::MEMBER_SUPPORT,
            ConflictingAnnotations::OBJECT_SUPPORT,
            ConflictingAnnotations::OBJECT_LIFECYCLE,
        ];
        for spec in specs {
            for method in spec.unconsumed_methods() {
                let conflict = rules.iter().find_map(|rule| {
                    let conflicting = rule.conflicting_on(method, registry);
                    (registry.method_has_annotation(method, rule.marker) && !conflicting.is_empty())
                        .then_some((rule.marker, conflicting))
                });
                let failure = match conflict {
                    Some((marker, conflicting)) => ValidationFailure::new(
                        method.signature(),
                        ValidationKind::ConflictingAnnotations,
                        format!("@{marker:?} cannot be combined with {conflicting:?}"),
                    ),
                    None => ValidationFailure::new(
                        method.signature(),
                        ValidationKind::OrphanedSupportMethod,
                        "support method does not match any member or is not supported",
                    ),
                };
                failures.push(failure);
            }
        }
    }
}

/// Property, collection, action and parameter types must be registered
/// classes or known value types.
pub struct MemberTypeValidator;

impl MemberTypeValidator {
    fn check(
        registry: &TypeRegistry,
        origin: impl FnOnce() -> String,
        ty: &TypeRef,
        failures: &mut ValidationFailures,
    ) {
        if let Some(name) = ty.type_name() {
            if !registry.is_known_type(name) {
                failures.push(ValidationFailure::new(
                    origin(),
                    ValidationKind::UnknownMemberType,
                    format!("type `{name}` is neither a registered class nor a value type"),
                ));
            }
        }
    }
}

impl MetaModelValidator for MemberTypeValidator {
    fn name(&self) -> &'static str {
        "MemberTypeValidator"
    }

    fn validate(
        &self,
        specs: &[Arc<ObjectSpecification>],
        registry: &TypeRegistry,
        failures: &mut ValidationFailures,
    ) {
        for spec in specs {
            let origin = |id: &str| format!("{}#{id}", spec.type_name());
            for member in spec.members() {
                Self::check(
                    registry,
                    || origin(member.id()),
                    &member.method().return_type,
                    failures,
                );
            }
            for action in spec.actions() {
                for param in action.parameters() {
                    Self::check(
                        registry,
                        || format!("{}#{}({})", spec.type_name(), action.method().name, param.index()),
                        param.ty(),
                        failures,
                    );
                }
            }
        }
    }
}

/// Logical type names are unique, and entities and view models have one.
pub struct LogicalTypeNameValidator;

impl MetaModelValidator for LogicalTypeNameValidator {
    fn name(&self) -> &'static str {
        "LogicalTypeNameValidator"
    }

    fn validate(
        &self,
        specs: &[Arc<ObjectSpecification>],
        _registry: &TypeRegistry,
        failures: &mut ValidationFailures,
    ) {
        let mut by_name: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for spec in specs {
            let needs_name = spec.is_entity() || spec.is_view_model();
            let declared = spec
                .facet::<LogicalTypeFacet>()
                .is_some_and(|f| !f.logical_type_name.trim().is_empty());
            if needs_name && !declared {
                failures.push(ValidationFailure::new(
                    spec.type_name(),
                    ValidationKind::MissingLogicalTypeName,
                    format!("{} requires a logical type name", spec.sort()),
                ));
            }
            if spec.sort().is_abstract() {
                continue;
            }
            by_name
                .entry(spec.logical_type_name())
                .or_default()
                .push(spec.type_name());
        }
        for (logical_type_name, types) in by_name {
            if types.len() > 1 {
                failures.push(ValidationFailure::new(
                    logical_type_name,
                    ValidationKind::DuplicateLogicalTypeName,
                    format!("shared by {}", types.join(", ")),
                ));
            }
        }
    }
}
