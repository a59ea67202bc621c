//! Builds an [`ObjectSpecification`] for one class: class facets, member
//! discovery, member and parameter facets, then the leftover support methods.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::IntrospectionConfig;
use crate::error::{MetaModelError, Result};
use crate::facetapi::{FacetHolder, FeatureType};
use crate::facets::object::{LogicalTypeFacet, ObjectNatureFacet};
use crate::facets::{
    FacetProcessor, IntrospectionScope, ProcessClassContext, ProcessMethodContext,
    ProcessParameterContext,
};
use crate::methods::{naming, MethodRemover};
use crate::reflect::{Annotation, AnnotationKind, MethodMeta, TypeRef, TypeRegistry};
use crate::validation::{ValidationFailure, ValidationKind};

use super::{
    BeanSort, ObjectAction, ObjectActionParameter, ObjectSpecification, OneToManyAssociation,
    OneToOneAssociation, SpecRef,
};

const SUPPORT_ROLE_MARKERS: &[AnnotationKind] = &[
    AnnotationKind::MemberSupport,
    AnnotationKind::ObjectSupport,
    AnnotationKind::ObjectLifecycle,
];

const MEMBER_MARKERS: &[AnnotationKind] = &[
    AnnotationKind::Property,
    AnnotationKind::Collection,
    AnnotationKind::Action,
    AnnotationKind::Include,
];

struct Candidate {
    id: String,
    feature_type: FeatureType,
    method: Arc<MethodMeta>,
}

fn invalid_member(type_name: &str, method: &MethodMeta, message: &str) -> MetaModelError {
    MetaModelError::Introspection {
        type_name: type_name.to_string(),
        message: format!("{}: {message}", method.signature()),
    }
}

/// Property id when the method has accessor shape: no parameters, non-void,
/// `getX`, or `isX` returning a boolean.
fn accessor_shape(method: &MethodMeta) -> Option<String> {
    if method.param_count() != 0 || method.return_type.is_void() {
        return None;
    }
    naming::strip_prefix(&method.name, naming::GET_PREFIX)
        .or_else(|| {
            naming::strip_prefix(&method.name, naming::IS_PREFIX)
                .filter(|_| method.return_type.is_boolean())
        })
        .map(naming::decapitalize)
}

fn classify(scope: &IntrospectionScope<'_>, method: &Arc<MethodMeta>) -> Result<Candidate> {
    let type_name = scope.class.name.as_str();
    let annotated = |kind| scope.registry.method_has_annotation(method, kind);
    let candidate = |id: String, feature_type| Candidate {
        id,
        feature_type,
        method: method.clone(),
    };
    if annotated(AnnotationKind::Action) {
        return Ok(candidate(method.name.clone(), FeatureType::Action));
    }
    if annotated(AnnotationKind::Property) {
        if method.param_count() != 0 || method.return_type.is_void() {
            return Err(invalid_member(
                type_name,
                method,
                "@Property requires a no-argument, non-void accessor",
            ));
        }
        let id = accessor_shape(method).unwrap_or_else(|| method.name.clone());
        return Ok(candidate(id, FeatureType::Property));
    }
    if annotated(AnnotationKind::Collection) {
        if method.param_count() != 0 || !method.return_type.is_collection() {
            return Err(invalid_member(
                type_name,
                method,
                "@Collection requires a no-argument accessor returning a collection",
            ));
        }
        let id = accessor_shape(method).unwrap_or_else(|| method.name.clone());
        return Ok(candidate(id, FeatureType::Collection));
    }
    Ok(match accessor_shape(method) {
        Some(id) if method.return_type.is_collection() => candidate(id, FeatureType::Collection),
        Some(id) => candidate(id, FeatureType::Property),
        None => candidate(method.name.clone(), FeatureType::Action),
    })
}

/// Methods that become members under `policy`, in declaration order.
fn discover_members(
    scope: &IntrospectionScope<'_>,
    remover: &MethodRemover,
    failures: &mut Vec<ValidationFailure>,
) -> Result<Vec<Candidate>> {
    let encapsulated = scope.policy.encapsulation_policy().is_encapsulated_members_supported();
    let required = scope
        .policy
        .member_annotation_policy()
        .is_member_annotations_required();

    let registry = scope.registry;
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut members = Vec::new();
    for method in scope.methods {
        if method.is_static
            || remover.is_consumed(method)
            || registry.method_has_any_annotation(
                method,
                &[AnnotationKind::Programmatic, AnnotationKind::Exclude],
            )
            || registry.method_has_any_annotation(method, SUPPORT_ROLE_MARKERS)
        {
            continue;
        }
        let annotated = registry.method_has_any_annotation(method, MEMBER_MARKERS);
        if naming::is_support_method_name(&method.name) && !annotated {
            continue;
        }
        if !method.is_public() && !(encapsulated && annotated) {
            continue;
        }
        if required && !annotated {
            continue;
        }
        let candidate = classify(scope, method)?;
        if !seen_ids.insert(candidate.id.clone()) {
            failures.push(ValidationFailure::new(
                format!("{}#{}", scope.class.name, candidate.id),
                ValidationKind::DuplicateMemberId,
                format!(
                    "{} clashes with another member of the same id",
                    method.signature()
                ),
            ));
            continue;
        }
        members.push(candidate);
    }
    Ok(members)
}

/// Unconsumed methods that look like support methods: they carry a support
/// marker, or (annotations optional) they are public and follow a support
/// naming convention.
fn leftover_support_methods(
    scope: &IntrospectionScope<'_>,
    remover: &MethodRemover,
) -> Vec<Arc<MethodMeta>> {
    let optional = !scope
        .policy
        .member_annotation_policy()
        .is_member_annotations_required();
    scope
        .methods
        .iter()
        .filter(|m| !m.is_static && !remover.is_consumed(m))
        .filter(|m| {
            scope.registry.method_has_any_annotation(m, SUPPORT_ROLE_MARKERS)
                || (optional && m.is_public() && naming::is_support_method_name(&m.name))
        })
        .cloned()
        .collect()
}

fn spec_ref_for(registry: &TypeRegistry, ty: &TypeRef) -> SpecRef {
    SpecRef::new(
        ty.type_name()
            .filter(|name| registry.contains(name))
            .map(str::to_string),
    )
}

/// Introspects `type_name`. Other classes are never loaded from here: cross
/// references stay unresolved until first asked for.
pub(crate) fn introspect(
    type_name: &str,
    registry: &Arc<TypeRegistry>,
    processor: &FacetProcessor,
    config: &IntrospectionConfig,
) -> Result<ObjectSpecification> {
    let class = registry
        .class(type_name)
        .ok_or_else(|| MetaModelError::UnknownType(type_name.to_string()))?;

    let policy = match registry.synthesize_on_type(type_name, AnnotationKind::DomainObject) {
        Some(Annotation::DomainObject { introspection, .. }) => introspection.resolve(config.policy),
        _ => config.policy,
    };
    let methods = registry.methods_of(type_name);
    let scope = IntrospectionScope {
        class: class.as_ref(),
        registry: registry.as_ref(),
        policy,
        methods: &methods,
    };

    let mut remover = MethodRemover::new();
    let mut holder = FacetHolder::new();
    processor.process_class(&mut ProcessClassContext {
        scope,
        holder: &mut holder,
        remover: &mut remover,
    });

    let sort = holder
        .get_facet::<ObjectNatureFacet>()
        .map(|f| f.sort)
        .unwrap_or(BeanSort::Unknown);
    let logical_type_name = holder
        .get_facet::<LogicalTypeFacet>()
        .map(|f| f.logical_type_name.clone())
        .unwrap_or_else(|| type_name.to_string());

    let mut failures = Vec::new();
    let candidates = if sort.is_value() {
        Vec::new()
    } else {
        discover_members(&scope, &remover, &mut failures)?
    };
    for candidate in &candidates {
        remover.remove_method(&candidate.method);
    }

    let mut properties = Vec::new();
    let mut collections = Vec::new();
    let mut actions = Vec::new();
    for Candidate {
        id,
        feature_type,
        method,
    } in candidates
    {
        let mut member_holder = FacetHolder::new();
        processor.process_member(&mut ProcessMethodContext {
            scope,
            feature_type,
            member_id: &id,
            method: &method,
            holder: &mut member_holder,
            remover: &mut remover,
        });
        match feature_type {
            FeatureType::Property => properties.push(OneToOneAssociation {
                spec: spec_ref_for(registry, &method.return_type),
                id,
                method,
                holder: member_holder,
            }),
            FeatureType::Collection => collections.push(OneToManyAssociation {
                element_spec: spec_ref_for(registry, &method.return_type),
                id,
                method,
                holder: member_holder,
            }),
            FeatureType::Action => {
                let mut parameters = Vec::with_capacity(method.param_count());
                for (index, param) in method.params.iter().enumerate() {
                    let mut param_holder = FacetHolder::new();
                    processor.process_param(&mut ProcessParameterContext {
                        scope,
                        action_id: &id,
                        method: &method,
                        index,
                        param,
                        holder: &mut param_holder,
                        remover: &mut remover,
                    });
                    parameters.push(ObjectActionParameter {
                        index,
                        name: param.name.clone(),
                        ty: param.ty.clone(),
                        holder: param_holder,
                        spec: spec_ref_for(registry, &param.ty),
                    });
                }
                actions.push(ObjectAction {
                    return_spec: spec_ref_for(registry, &method.return_type),
                    id,
                    method,
                    holder: member_holder,
                    parameters,
                });
            }
            FeatureType::Object | FeatureType::ActionParameter => {}
        }
    }

    let unconsumed = leftover_support_methods(&scope, &remover);
    tracing::debug!(
        type_name = %type_name,
        sort = %sort,
        policy = ?policy,
        properties = properties.len(),
        collections = collections.len(),
        actions = actions.len(),
        unconsumed = unconsumed.len(),
        "introspected class"
    );

    Ok(ObjectSpecification {
        type_name: type_name.to_string(),
        logical_type_name,
        sort,
        is_abstract: class.is_abstract,
        superclass: SpecRef::new(class.superclass.clone()),
        policy,
        holder,
        properties,
        collections,
        actions,
        unconsumed,
        introspection_failures: failures,
        registry: registry.clone(),
    })
}
