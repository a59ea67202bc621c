use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::config::{EncapsulationPolicy, IntrospectionPolicy, MemberAnnotationPolicy};
use crate::reflect::{AnnotationKind, MethodKey, MethodMeta, TypeRef, TypeRegistry};

// ============================================================================
// Conflicting annotations
// ============================================================================

/// A support role's marker annotation and the annotations that must not
/// appear next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictingAnnotations {
    pub marker: AnnotationKind,
    pub prohibits: &'static [AnnotationKind],
}

impl ConflictingAnnotations {
    pub const OBJECT_SUPPORT: ConflictingAnnotations = ConflictingAnnotations {
        marker: AnnotationKind::ObjectSupport,
        prohibits: &[
            AnnotationKind::Action,
            AnnotationKind::Property,
            AnnotationKind::Collection,
            AnnotationKind::MemberSupport,
            AnnotationKind::ObjectLifecycle,
            AnnotationKind::Programmatic,
            AnnotationKind::Exclude,
        ],
    };

    pub const OBJECT_LIFECYCLE: ConflictingAnnotations = ConflictingAnnotations {
        marker: AnnotationKind::ObjectLifecycle,
        prohibits: &[
            AnnotationKind::Action,
            AnnotationKind::Property,
            AnnotationKind::Collection,
            AnnotationKind::MemberSupport,
            AnnotationKind::ObjectSupport,
            AnnotationKind::Programmatic,
            AnnotationKind::Exclude,
        ],
    };

    pub const MEMBER_SUPPORT: ConflictingAnnotations = ConflictingAnnotations {
        marker: AnnotationKind::MemberSupport,
        prohibits: &[
            AnnotationKind::Action,
            AnnotationKind::Property,
            AnnotationKind::Collection,
            AnnotationKind::ObjectSupport,
            AnnotationKind::ObjectLifecycle,
            AnnotationKind::Programmatic,
            AnnotationKind::Exclude,
        ],
    };

    /// Carries the role marker or the generic `@Include`, on the method or
    /// on a concrete method it overrides.
    pub fn is_marked(&self, method: &MethodMeta, registry: &TypeRegistry) -> bool {
        registry.method_has_any_annotation(method, &[self.marker, AnnotationKind::Include])
    }

    pub fn conflicting_on(&self, method: &MethodMeta, registry: &TypeRegistry) -> Vec<AnnotationKind> {
        self.prohibits
            .iter()
            .copied()
            .filter(|k| registry.method_has_annotation(method, *k))
            .collect()
    }

    pub fn has_conflict(&self, method: &MethodMeta, registry: &TypeRegistry) -> bool {
        self.is_marked(method, registry)
            && registry.method_has_any_annotation(method, self.prohibits)
    }

    /// The decision table for support methods:
    ///
    /// | member annotations | method     | qualifies when            |
    /// |--------------------|------------|---------------------------|
    /// | required           | any        | marked                    |
    /// | optional           | public     | always                    |
    /// | optional           | non-public | marked                    |
    ///
    /// A marked method that also carries a prohibited annotation never qualifies.
    pub fn qualifies(
        &self,
        method: &MethodMeta,
        registry: &TypeRegistry,
        policy: MemberAnnotationPolicy,
    ) -> bool {
        let marked = self.is_marked(method, registry);
        if marked && self.has_conflict(method, registry) {
            return false;
        }
        if policy.is_member_annotations_required() {
            marked
        } else {
            method.is_public() || marked
        }
    }
}

// ============================================================================
// Options
// ============================================================================

/// Expected return type of a looked-up method.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReturnExpectation {
    #[default]
    Any,
    Void,
    NonVoid,
    Boolean,
    String,
    Exactly(TypeRef),
}

impl ReturnExpectation {
    pub fn matches(&self, ty: &TypeRef) -> bool {
        match self {
            ReturnExpectation::Any => true,
            ReturnExpectation::Void => ty.is_void(),
            ReturnExpectation::NonVoid => !ty.is_void(),
            ReturnExpectation::Boolean => ty.is_boolean(),
            ReturnExpectation::String => ty.is_string(),
            ReturnExpectation::Exactly(expected) => expected == ty,
        }
    }
}

type MethodPredicate = Arc<dyn Fn(&MethodMeta, &TypeRegistry) -> bool + Send + Sync>;

/// Immutable query for methods of a class. Built fresh per lookup.
#[derive(Clone)]
pub struct MethodFinderOptions {
    names: Vec<String>,
    encapsulation: EncapsulationPolicy,
    must_satisfy: MethodPredicate,
    param_types: Option<Vec<TypeRef>>,
    returns: ReturnExpectation,
}

impl fmt::Debug for MethodFinderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodFinderOptions")
            .field("names", &self.names)
            .field("encapsulation", &self.encapsulation)
            .field("param_types", &self.param_types)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

impl MethodFinderOptions {
    fn new(names: Vec<String>, encapsulation: EncapsulationPolicy, must_satisfy: MethodPredicate) -> Self {
        Self {
            names,
            encapsulation,
            must_satisfy,
            param_types: None,
            returns: ReturnExpectation::Any,
        }
    }

    /// Any visibility the policy allows, no further predicate.
    pub fn not_necessarily_public<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        policy: IntrospectionPolicy,
    ) -> Self {
        Self::new(
            names.into_iter().map(Into::into).collect(),
            policy.encapsulation_policy(),
            Arc::new(|_, _| true),
        )
    }

    pub fn public_only<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self::new(
            names.into_iter().map(Into::into).collect(),
            EncapsulationPolicy::OnlyPublicMembersSupported,
            Arc::new(|_, _| true),
        )
    }

    /// Property or collection accessors: when member annotations are required
    /// the accessor must carry `@Property`, `@Collection` or `@Include`.
    pub fn accessor<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        policy: IntrospectionPolicy,
    ) -> Self {
        let required = policy.member_annotation_policy().is_member_annotations_required();
        Self::new(
            names.into_iter().map(Into::into).collect(),
            policy.encapsulation_policy(),
            Arc::new(move |m: &MethodMeta, registry: &TypeRegistry| {
                !required
                    || registry.method_has_any_annotation(m, &[
                        AnnotationKind::Property,
                        AnnotationKind::Collection,
                        AnnotationKind::Include,
                    ])
            }),
        )
        .returning(ReturnExpectation::NonVoid)
        .with_params(Vec::new())
    }

    pub fn object_support<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        policy: IntrospectionPolicy,
    ) -> Self {
        Self::support(names, policy, ConflictingAnnotations::OBJECT_SUPPORT)
    }

    pub fn lifecycle_callback<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        policy: IntrospectionPolicy,
    ) -> Self {
        Self::support(names, policy, ConflictingAnnotations::OBJECT_LIFECYCLE)
    }

    pub fn member_support<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        policy: IntrospectionPolicy,
    ) -> Self {
        Self::support(names, policy, ConflictingAnnotations::MEMBER_SUPPORT)
    }

    /// Support methods may always be non-public; the decision table decides.
    fn support<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        policy: IntrospectionPolicy,
        conflicting: ConflictingAnnotations,
    ) -> Self {
        let annotation_policy = policy.member_annotation_policy();
        Self::new(
            names.into_iter().map(Into::into).collect(),
            EncapsulationPolicy::EncapsulatedMembersSupported,
            Arc::new(move |m: &MethodMeta, registry: &TypeRegistry| {
                conflicting.qualifies(m, registry, annotation_policy)
            }),
        )
    }

    pub fn with_params(mut self, param_types: Vec<TypeRef>) -> Self {
        self.param_types = Some(param_types);
        self
    }

    pub fn returning(mut self, returns: ReturnExpectation) -> Self {
        self.returns = returns;
        self
    }

    pub fn and_also(mut self, predicate: impl Fn(&MethodMeta) -> bool + Send + Sync + 'static) -> Self {
        let previous = self.must_satisfy.clone();
        self.must_satisfy = Arc::new(move |m: &MethodMeta, registry: &TypeRegistry| {
            previous(m, registry) && predicate(m)
        });
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn encapsulation(&self) -> EncapsulationPolicy {
        self.encapsulation
    }

    fn name_rank(&self, name: &str) -> Option<usize> {
        if self.names.is_empty() {
            Some(0)
        } else {
            self.names.iter().position(|n| n == name)
        }
    }

    /// Annotations are read through `registry`, so overrides see the
    /// annotations of the concrete methods they override.
    pub fn matches(&self, method: &MethodMeta, registry: &TypeRegistry) -> bool {
        if method.is_static || self.name_rank(&method.name).is_none() {
            return false;
        }
        if !method.is_public() && !self.encapsulation.is_encapsulated_members_supported() {
            return false;
        }
        if let Some(expected) = &self.param_types {
            if &method.param_types() != expected {
                return false;
            }
        }
        self.returns.matches(&method.return_type) && (self.must_satisfy)(method, registry)
    }
}

// ============================================================================
// Method remover
// ============================================================================

/// Methods of one class consumed by factories during introspection.
#[derive(Debug, Default)]
pub struct MethodRemover {
    consumed: HashSet<MethodKey>,
}

impl MethodRemover {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove_method(&mut self, method: &MethodMeta) {
        self.consumed.insert(method.key());
    }

    pub fn is_consumed(&self, method: &MethodMeta) -> bool {
        self.consumed.contains(&method.key())
    }

    pub fn consumed_count(&self) -> usize {
        self.consumed.len()
    }
}

// ============================================================================
// Finder
// ============================================================================

pub struct MethodFinder;

impl MethodFinder {
    /// All unconsumed methods matching `options`, ordered by name candidate
    /// then declaration order.
    pub fn find_methods(
        methods: &[Arc<MethodMeta>],
        registry: &TypeRegistry,
        remover: &MethodRemover,
        options: &MethodFinderOptions,
    ) -> Vec<Arc<MethodMeta>> {
        let mut found: Vec<(usize, Arc<MethodMeta>)> = methods
            .iter()
            .filter(|m| !remover.is_consumed(m))
            .filter(|m| options.matches(m, registry))
            .filter_map(|m| options.name_rank(&m.name).map(|rank| (rank, m.clone())))
            .collect();
        found.sort_by_key(|(rank, _)| *rank);
        found.into_iter().map(|(_, m)| m).collect()
    }

    pub fn find_single(
        methods: &[Arc<MethodMeta>],
        registry: &TypeRegistry,
        remover: &MethodRemover,
        options: &MethodFinderOptions,
    ) -> Option<Arc<MethodMeta>> {
        Self::find_methods(methods, registry, remover, options).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{Annotation, ClassMeta};

    fn methods(list: Vec<MethodMeta>) -> Vec<Arc<MethodMeta>> {
        list.into_iter().map(Arc::new).collect()
    }

    fn no_classes() -> TypeRegistry {
        TypeRegistry::builder().build().expect("registry")
    }

    #[test]
    fn optional_policy_accepts_public_and_marked_private() {
        let ms = methods(vec![
            MethodMeta::new("hideName").returns(TypeRef::scalar("boolean")),
            MethodMeta::new("hideEmail")
                .private()
                .returns(TypeRef::scalar("boolean")),
            MethodMeta::new("hideAge")
                .private()
                .returns(TypeRef::scalar("boolean"))
                .annotated(Annotation::MemberSupport),
        ]);
        let options = MethodFinderOptions::member_support(
            ["hideName", "hideEmail", "hideAge"],
            IntrospectionPolicy::AnnotationOptional,
        );
        let found: Vec<String> =
            MethodFinder::find_methods(&ms, &no_classes(), &MethodRemover::new(), &options)
                .iter()
                .map(|m| m.name.clone())
                .collect();
        assert_eq!(found, vec!["hideName".to_string(), "hideAge".to_string()]);
    }

    #[test]
    fn required_policy_accepts_only_marked() {
        let ms = methods(vec![
            MethodMeta::new("title").returns(TypeRef::scalar("String")),
            MethodMeta::new("iconName")
                .returns(TypeRef::scalar("String"))
                .annotated(Annotation::Include),
        ]);
        let options = MethodFinderOptions::object_support(
            ["title", "iconName"],
            IntrospectionPolicy::AnnotationRequired,
        );
        let found = MethodFinder::find_methods(&ms, &no_classes(), &MethodRemover::new(), &options);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "iconName");
    }

    #[test]
    fn marker_with_conflicting_annotation_is_excluded() {
        let method = MethodMeta::new("disableName")
            .annotated(Annotation::MemberSupport)
            .annotated(Annotation::Programmatic);
        let registry = no_classes();
        assert!(ConflictingAnnotations::MEMBER_SUPPORT.has_conflict(&method, &registry));
        assert!(!ConflictingAnnotations::MEMBER_SUPPORT.qualifies(
            &method,
            &registry,
            MemberAnnotationPolicy::MemberAnnotationsOptional
        ));
    }

    #[test]
    fn static_and_consumed_methods_never_qualify() {
        let ms = methods(vec![
            MethodMeta::new("created").static_(),
            MethodMeta::new("loaded"),
        ]);
        let mut remover = MethodRemover::new();
        remover.remove_method(&ms[1]);
        let options = MethodFinderOptions::lifecycle_callback(
            ["created", "loaded"],
            IntrospectionPolicy::AnnotationOptional,
        );
        assert!(MethodFinder::find_methods(&ms, &no_classes(), &remover, &options).is_empty());
    }

    #[test]
    fn results_follow_name_candidate_order() {
        let ms = methods(vec![
            MethodMeta::new("getName").returns(TypeRef::scalar("String")),
            MethodMeta::new("isName").returns(TypeRef::scalar("boolean")),
        ]);
        let options = MethodFinderOptions::accessor(
            ["isName", "getName"],
            IntrospectionPolicy::AnnotationOptional,
        );
        let found = MethodFinder::find_single(&ms, &no_classes(), &MethodRemover::new(), &options);
        assert_eq!(found.map(|m| m.name.clone()), Some("isName".to_string()));
    }

    #[test]
    fn parameter_and_return_expectations_filter() {
        let ms = methods(vec![
            MethodMeta::new("validateName")
                .param("name", TypeRef::scalar("String"))
                .returns(TypeRef::scalar("String")),
            MethodMeta::new("validateName").returns(TypeRef::scalar("String")),
        ]);
        let options = MethodFinderOptions::member_support(
            ["validateName"],
            IntrospectionPolicy::AnnotationOptional,
        )
        .with_params(vec![TypeRef::scalar("String")])
        .returning(ReturnExpectation::String);
        let found = MethodFinder::find_methods(&ms, &no_classes(), &MethodRemover::new(), &options);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].param_count(), 1);
    }

    #[test]
    fn override_inherits_marker_of_concrete_superclass_method() {
        let registry = TypeRegistry::builder()
            .class(
                ClassMeta::new("t.Base").method(
                    MethodMeta::new("hideName")
                        .private()
                        .returns(TypeRef::scalar("boolean"))
                        .annotated(Annotation::MemberSupport),
                ),
            )
            .class(
                ClassMeta::new("t.Sub")
                    .extends("t.Base")
                    .method(MethodMeta::new("hideName").private().returns(TypeRef::scalar("boolean"))),
            )
            .build()
            .expect("registry");
        let ms = registry.methods_of("t.Sub");
        assert_eq!(ms.len(), 1);
        assert_eq!(ms[0].declaring_type, "t.Sub");

        let options = MethodFinderOptions::member_support(
            ["hideName"],
            IntrospectionPolicy::AnnotationRequired,
        );
        let found = MethodFinder::find_methods(&ms, &registry, &MethodRemover::new(), &options);
        assert_eq!(found.len(), 1);
        assert!(MethodFinder::find_methods(&ms, &no_classes(), &MethodRemover::new(), &options)
            .is_empty());
    }
}
