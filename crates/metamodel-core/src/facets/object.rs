//! Object-level facets: nature, logical type, persistence, title, icon and
//! lifecycle callbacks.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::IntrospectionPolicy;
use crate::error::Result;
use crate::facetapi::{impl_facet, FacetAttributes, FeatureTypes};
use crate::methods::{naming, MethodFinderOptions, ReturnExpectation};
use crate::object::DomainObject;
use crate::reflect::{Annotation, AnnotationKind, MethodMeta, Nature};
use crate::spec::BeanSort;

use super::common::{value_to_text, CssClassFacet, TextSource};
use super::{FacetFactory, ProcessClassContext};

// ============================================================================
// Facets
// ============================================================================

#[derive(Debug, Clone)]
pub struct ObjectNatureFacet {
    pub sort: BeanSort,
    pub attributes: FacetAttributes,
}

/// Name under which the type is known outside the process (bookmarks, REST).
#[derive(Debug, Clone)]
pub struct LogicalTypeFacet {
    pub logical_type_name: String,
    pub attributes: FacetAttributes,
}

#[derive(Debug, Clone)]
pub struct EntityFacet {
    pub schema: Option<String>,
    pub table: Option<String>,
    pub attributes: FacetAttributes,
}

#[derive(Debug, Clone)]
pub struct IntrospectionPolicyFacet {
    pub policy: IntrospectionPolicy,
    pub attributes: FacetAttributes,
}

#[derive(Debug, Clone)]
pub struct TitleComponent {
    pub property: String,
    pub sequence: Option<String>,
    pub prepend: String,
    pub append: String,
}

#[derive(Debug, Clone)]
pub enum TitleSource {
    /// `title()` support method.
    Method(Arc<MethodMeta>),
    /// `@Title` properties, in sequence order.
    Properties(Vec<TitleComponent>),
}

#[derive(Debug, Clone)]
pub struct TitleFacet {
    pub source: TitleSource,
    pub attributes: FacetAttributes,
}

impl TitleFacet {
    pub fn title(&self, pojo: &dyn DomainObject) -> Result<String> {
        match &self.source {
            TitleSource::Method(method) => {
                Ok(value_to_text(pojo.invoke(&method.name, &[])?).unwrap_or_default())
            }
            TitleSource::Properties(components) => {
                let parts: Vec<String> = components
                    .iter()
                    .filter_map(|c| {
                        pojo.property(&c.property)
                            .and_then(value_to_text)
                            .map(|text| format!("{}{}{}", c.prepend, text, c.append))
                    })
                    .collect();
                Ok(parts.join(" "))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct IconFacet {
    pub source: TextSource,
    pub attributes: FacetAttributes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Created,
    Loaded,
    Persisting,
    Persisted,
    Updating,
    Updated,
    Removing,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 7] = [
        LifecycleEvent::Created,
        LifecycleEvent::Loaded,
        LifecycleEvent::Persisting,
        LifecycleEvent::Persisted,
        LifecycleEvent::Updating,
        LifecycleEvent::Updated,
        LifecycleEvent::Removing,
    ];

    pub fn method_name(self) -> &'static str {
        naming::LIFECYCLE_METHODS[self as usize]
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleCallbackFacet {
    pub callbacks: BTreeMap<LifecycleEvent, Arc<MethodMeta>>,
    pub attributes: FacetAttributes,
}

impl LifecycleCallbackFacet {
    /// Invokes the callback for `event`, if the class declares one.
    pub fn fire(&self, event: LifecycleEvent, pojo: &dyn DomainObject) -> Result<bool> {
        match self.callbacks.get(&event) {
            Some(method) => {
                pojo.invoke(&method.name, &[])?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl_facet!(
    ObjectNatureFacet,
    LogicalTypeFacet,
    EntityFacet,
    IntrospectionPolicyFacet,
    TitleFacet,
    IconFacet,
    LifecycleCallbackFacet,
);

// ============================================================================
// Factories
// ============================================================================

/// Classifies the class and registers the class-name logical type fallback.
pub struct ObjectNatureFacetFactory;

impl FacetFactory for ObjectNatureFacetFactory {
    fn name(&self) -> &'static str {
        "ObjectNatureFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::OBJECTS_ONLY
    }

    fn process_class(&self, ctx: &mut ProcessClassContext<'_>) {
        let class = ctx.class();
        let sort = if class.is_abstract {
            BeanSort::Abstract
        } else if class.annotation(AnnotationKind::DomainService).is_some() {
            BeanSort::Service
        } else if class.annotation(AnnotationKind::Value).is_some() {
            BeanSort::Value
        } else {
            match ctx.scope.class_annotation(AnnotationKind::DomainObject) {
                Some(Annotation::DomainObject { nature, .. }) => match nature {
                    Nature::Entity => BeanSort::Entity,
                    Nature::ViewModel | Nature::NotSpecified => BeanSort::ViewModel,
                    Nature::Mixin => BeanSort::Mixin,
                    Nature::Bean => BeanSort::Service,
                },
                _ => BeanSort::Unknown,
            }
        };
        ctx.holder.add_facet(ObjectNatureFacet {
            sort,
            attributes: FacetAttributes::DEFAULT,
        });
        ctx.holder.add_facet(LogicalTypeFacet {
            logical_type_name: class.name.clone(),
            attributes: FacetAttributes::DEFAULT.derived().noop(),
        });
    }
}

/// `@Entity(schema, table)`: marks the class as an entity and derives its
/// logical type name from the table mapping.
pub struct PersistenceCapableFacetFactory;

impl FacetFactory for PersistenceCapableFacetFactory {
    fn name(&self) -> &'static str {
        "PersistenceCapableFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::OBJECTS_ONLY
    }

    fn process_class(&self, ctx: &mut ProcessClassContext<'_>) {
        let class = ctx.class();
        let Some(Annotation::Entity { schema, table }) = class.annotation(AnnotationKind::Entity)
        else {
            return;
        };
        ctx.holder.add_facet(EntityFacet {
            schema: schema.clone(),
            table: table.clone(),
            attributes: FacetAttributes::DEFAULT,
        });
        if !class.is_abstract {
            ctx.holder.add_facet(ObjectNatureFacet {
                sort: BeanSort::Entity,
                attributes: FacetAttributes::DEFAULT.always_replace(),
            });
        }
        let logical_type_name = match (schema, table) {
            (Some(schema), Some(table)) => Some(format!("{schema}.{table}")),
            (None, Some(table)) => Some(table.clone()),
            (Some(schema), None) => Some(format!("{schema}.{}", class.simple_name())),
            (None, None) => None,
        };
        ctx.holder
            .add_facet_if_present(logical_type_name.map(|logical_type_name| LogicalTypeFacet {
                logical_type_name,
                attributes: FacetAttributes::DEFAULT.derived(),
            }));
    }
}

/// Explicit `logicalTypeName` of `@DomainObject`, `@DomainService` or
/// `@Value`, and the introspection policy in effect.
pub struct DomainObjectAnnotationFacetFactory;

impl FacetFactory for DomainObjectAnnotationFacetFactory {
    fn name(&self) -> &'static str {
        "DomainObjectAnnotationFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::OBJECTS_ONLY
    }

    fn process_class(&self, ctx: &mut ProcessClassContext<'_>) {
        let explicit = ctx.class().annotations.iter().find_map(|a| match a {
            Annotation::DomainObject {
                logical_type_name, ..
            }
            | Annotation::DomainService { logical_type_name }
            | Annotation::Value { logical_type_name } => logical_type_name.clone(),
            _ => None,
        });
        ctx.holder
            .add_facet_if_present(explicit.map(|logical_type_name| LogicalTypeFacet {
                logical_type_name,
                attributes: FacetAttributes::DEFAULT.always_replace(),
            }));
        ctx.holder.add_facet(IntrospectionPolicyFacet {
            policy: ctx.policy(),
            attributes: FacetAttributes::DEFAULT,
        });
    }
}

fn dewey_key(sequence: Option<&str>) -> Vec<u32> {
    sequence
        .unwrap_or("")
        .split('.')
        .map(|part| part.trim().parse().unwrap_or(u32::MAX))
        .collect()
}

/// `@Title` properties, overridden by a `title()` support method.
pub struct TitleFacetFactory;

impl FacetFactory for TitleFacetFactory {
    fn name(&self) -> &'static str {
        "TitleFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::OBJECTS_ONLY
    }

    fn process_class(&self, ctx: &mut ProcessClassContext<'_>) {
        let registry = ctx.scope.registry;
        let mut components: Vec<TitleComponent> = ctx
            .scope
            .methods
            .iter()
            .filter(|m| m.param_count() == 0 && !m.return_type.is_void())
            .filter_map(|m| {
                let Some(Annotation::Title {
                    sequence,
                    prepend,
                    append,
                }) = registry.synthesize_on_method(m, AnnotationKind::Title)
                else {
                    return None;
                };
                Some(TitleComponent {
                    property: naming::accessor_id(&m.name).unwrap_or_else(|| m.name.clone()),
                    sequence: sequence.clone(),
                    prepend: prepend.clone().unwrap_or_default(),
                    append: append.clone().unwrap_or_default(),
                })
            })
            .collect();
        if !components.is_empty() {
            components.sort_by_key(|c| dewey_key(c.sequence.as_deref()));
            ctx.holder.add_facet(TitleFacet {
                source: TitleSource::Properties(components),
                attributes: FacetAttributes::DEFAULT,
            });
        }

        let options = MethodFinderOptions::object_support([naming::TITLE_METHOD], ctx.policy())
            .with_params(Vec::new())
            .returning(ReturnExpectation::String);
        if let Some(method) = ctx.find_single(&options) {
            ctx.remove_method(&method);
            ctx.holder.add_facet(TitleFacet {
                source: TitleSource::Method(method),
                attributes: FacetAttributes::DEFAULT.always_replace(),
            });
        }
    }
}

/// `iconName()` support method.
pub struct IconFacetFactory;

impl FacetFactory for IconFacetFactory {
    fn name(&self) -> &'static str {
        "IconFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::OBJECTS_ONLY
    }

    fn process_class(&self, ctx: &mut ProcessClassContext<'_>) {
        let options = MethodFinderOptions::object_support([naming::ICON_NAME_METHOD], ctx.policy())
            .with_params(Vec::new())
            .returning(ReturnExpectation::String);
        if let Some(method) = ctx.find_single(&options) {
            ctx.remove_method(&method);
            ctx.holder.add_facet(IconFacet {
                source: TextSource::Method(method),
                attributes: FacetAttributes::DEFAULT,
            });
        }
    }
}

/// `cssClass()` support method; takes precedence over a layout's static class.
pub struct CssClassFacetFactory;

impl FacetFactory for CssClassFacetFactory {
    fn name(&self) -> &'static str {
        "CssClassFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::OBJECTS_ONLY
    }

    fn process_class(&self, ctx: &mut ProcessClassContext<'_>) {
        let options = MethodFinderOptions::object_support([naming::CSS_CLASS_METHOD], ctx.policy())
            .with_params(Vec::new())
            .returning(ReturnExpectation::String);
        if let Some(method) = ctx.find_single(&options) {
            ctx.remove_method(&method);
            ctx.holder.add_facet(CssClassFacet {
                source: TextSource::Method(method),
                attributes: FacetAttributes::DEFAULT,
            });
        }
    }
}

/// `created()`, `loaded()`, `persisting()`, ... callbacks.
pub struct LifecycleCallbackFacetFactory;

impl FacetFactory for LifecycleCallbackFacetFactory {
    fn name(&self) -> &'static str {
        "LifecycleCallbackFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::OBJECTS_ONLY
    }

    fn process_class(&self, ctx: &mut ProcessClassContext<'_>) {
        let mut callbacks = BTreeMap::new();
        for event in LifecycleEvent::ALL {
            let options =
                MethodFinderOptions::lifecycle_callback([event.method_name()], ctx.policy())
                    .with_params(Vec::new());
            if let Some(method) = ctx.find_single(&options) {
                ctx.remove_method(&method);
                callbacks.insert(event, method);
            }
        }
        if !callbacks.is_empty() {
            ctx.holder.add_facet(LifecycleCallbackFacet {
                callbacks,
                attributes: FacetAttributes::DEFAULT,
            });
        }
    }
}
