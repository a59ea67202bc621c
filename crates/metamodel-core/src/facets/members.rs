//! Member facets: accessors, invocation, semantics, and the facets derived
//! from `@Property`, `@Collection`, `@Action`, `@Parameter` and `@Digits`.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{MetaModelError, Result};
use crate::facetapi::{impl_facet, FacetAttributes, FacetHolder, FeatureTypes};
use crate::object::DomainObject;
use crate::reflect::{
    Annotation, AnnotationKind, Editing, MethodMeta, Optionality, SemanticsOf, TypeRef, Where,
};

use super::common::{HiddenFacet, MandatoryFacet, MaxLengthFacet};
use super::{FacetFactory, ProcessMethodContext, ProcessParameterContext};

#[derive(Debug, Clone)]
pub struct PropertyAccessorFacet {
    pub property_id: String,
    pub method: Arc<MethodMeta>,
    pub attributes: FacetAttributes,
}

impl PropertyAccessorFacet {
    pub fn get(&self, pojo: &dyn DomainObject) -> Option<Value> {
        pojo.property(&self.property_id)
    }
}

#[derive(Debug, Clone)]
pub struct CollectionAccessorFacet {
    pub collection_id: String,
    pub method: Arc<MethodMeta>,
    pub attributes: FacetAttributes,
}

impl CollectionAccessorFacet {
    pub fn get(&self, pojo: &dyn DomainObject) -> Vec<Value> {
        match pojo.property(&self.collection_id) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        }
    }
}

/// Element type of a collection or of a collection-returning action.
#[derive(Debug, Clone)]
pub struct TypeOfFacet {
    pub element_type: String,
    pub attributes: FacetAttributes,
}

#[derive(Debug, Clone)]
pub struct ActionInvocationFacet {
    pub method: Arc<MethodMeta>,
    pub return_type: TypeRef,
    pub attributes: FacetAttributes,
}

impl ActionInvocationFacet {
    pub fn invoke(&self, pojo: &dyn DomainObject, args: &[Value]) -> Result<Value> {
        if args.len() != self.method.param_count() {
            return Err(MetaModelError::illegal_argument(format!(
                "{} expects {} argument(s), got {}",
                self.method.signature(),
                self.method.param_count(),
                args.len()
            )));
        }
        pojo.invoke(&self.method.name, args)
    }
}

#[derive(Debug, Clone)]
pub struct ActionSemanticsFacet {
    pub semantics: SemanticsOf,
    pub attributes: FacetAttributes,
}

#[derive(Debug, Clone)]
pub struct DisabledFacet {
    pub reason: String,
    pub attributes: FacetAttributes,
}

/// Precision and scale of a decimal property or parameter.
#[derive(Debug, Clone)]
pub struct BigDecimalValueFacet {
    pub precision: u32,
    pub scale: u32,
    pub attributes: FacetAttributes,
}

impl_facet!(
    PropertyAccessorFacet,
    CollectionAccessorFacet,
    TypeOfFacet,
    ActionInvocationFacet,
    ActionSemanticsFacet,
    DisabledFacet,
    BigDecimalValueFacet,
);

// ============================================================================
// Accessors and invocation
// ============================================================================

pub struct PropertyAccessorFacetFactory;

impl FacetFactory for PropertyAccessorFacetFactory {
    fn name(&self) -> &'static str {
        "PropertyAccessorFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::PROPERTIES_ONLY
    }

    fn process_method(&self, ctx: &mut ProcessMethodContext<'_>) {
        ctx.holder.add_facet(PropertyAccessorFacet {
            property_id: ctx.member_id.to_string(),
            method: ctx.method.clone(),
            attributes: FacetAttributes::DEFAULT,
        });
    }
}

pub struct CollectionAccessorFacetFactory;

impl FacetFactory for CollectionAccessorFacetFactory {
    fn name(&self) -> &'static str {
        "CollectionAccessorFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::COLLECTIONS_ONLY
    }

    fn process_method(&self, ctx: &mut ProcessMethodContext<'_>) {
        ctx.holder.add_facet(CollectionAccessorFacet {
            collection_id: ctx.member_id.to_string(),
            method: ctx.method.clone(),
            attributes: FacetAttributes::DEFAULT,
        });
        if let Some(element) = ctx.method.return_type.type_name() {
            ctx.holder.add_facet(TypeOfFacet {
                element_type: element.to_string(),
                attributes: FacetAttributes::DEFAULT.derived(),
            });
        }
    }
}

/// Invocation plus the non-idempotent default semantics.
pub struct ActionInvocationFacetFactory;

impl FacetFactory for ActionInvocationFacetFactory {
    fn name(&self) -> &'static str {
        "ActionInvocationFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::ACTIONS_ONLY
    }

    fn process_method(&self, ctx: &mut ProcessMethodContext<'_>) {
        let return_type = ctx.method.return_type.clone();
        if let TypeRef::Collection(element) = &return_type {
            ctx.holder.add_facet(TypeOfFacet {
                element_type: element.clone(),
                attributes: FacetAttributes::DEFAULT.derived(),
            });
        }
        ctx.holder.add_facet(ActionInvocationFacet {
            method: ctx.method.clone(),
            return_type,
            attributes: FacetAttributes::DEFAULT,
        });
        ctx.holder.add_facet(ActionSemanticsFacet {
            semantics: SemanticsOf::NonIdempotent,
            attributes: FacetAttributes::DEFAULT.derived(),
        });
    }
}

// ============================================================================
// Annotations
// ============================================================================

fn add_optionality(holder: &mut FacetHolder, optionality: Optionality) {
    let mandatory = match optionality {
        Optionality::Default => return,
        Optionality::Mandatory => true,
        Optionality::Optional => false,
    };
    holder.add_facet(MandatoryFacet {
        mandatory,
        attributes: FacetAttributes::DEFAULT.always_replace(),
    });
}

fn add_hidden(holder: &mut FacetHolder, hidden: Where) {
    if hidden != Where::NotSpecified {
        holder.add_facet(HiddenFacet {
            hidden,
            attributes: FacetAttributes::DEFAULT,
        });
    }
}

fn add_max_length(holder: &mut FacetHolder, max_length: Option<usize>) {
    holder.add_facet_if_present(max_length.map(|max_length| MaxLengthFacet {
        max_length,
        attributes: FacetAttributes::DEFAULT,
    }));
}

fn add_type_of(holder: &mut FacetHolder, type_of: &Option<String>) {
    holder.add_facet_if_present(type_of.clone().map(|element_type| TypeOfFacet {
        element_type,
        attributes: FacetAttributes::DEFAULT.always_replace(),
    }));
}

pub struct PropertyAnnotationFacetFactory;

impl FacetFactory for PropertyAnnotationFacetFactory {
    fn name(&self) -> &'static str {
        "PropertyAnnotationFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::PROPERTIES_ONLY
    }

    fn process_method(&self, ctx: &mut ProcessMethodContext<'_>) {
        let Some(Annotation::Property {
            editing,
            optionality,
            max_length,
            hidden,
        }) = ctx.annotation(AnnotationKind::Property)
        else {
            return;
        };
        if *editing == Editing::Disabled {
            ctx.holder.add_facet(DisabledFacet {
                reason: "Disabled".to_string(),
                attributes: FacetAttributes::DEFAULT,
            });
        }
        add_optionality(ctx.holder, *optionality);
        add_max_length(ctx.holder, *max_length);
        add_hidden(ctx.holder, *hidden);
    }
}

pub struct CollectionAnnotationFacetFactory;

impl FacetFactory for CollectionAnnotationFacetFactory {
    fn name(&self) -> &'static str {
        "CollectionAnnotationFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::COLLECTIONS_ONLY
    }

    fn process_method(&self, ctx: &mut ProcessMethodContext<'_>) {
        if let Some(Annotation::Collection { type_of, hidden }) =
            ctx.annotation(AnnotationKind::Collection)
        {
            add_type_of(ctx.holder, type_of);
            add_hidden(ctx.holder, *hidden);
        }
    }
}

pub struct ActionAnnotationFacetFactory;

impl FacetFactory for ActionAnnotationFacetFactory {
    fn name(&self) -> &'static str {
        "ActionAnnotationFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::ACTIONS_ONLY
    }

    fn process_method(&self, ctx: &mut ProcessMethodContext<'_>) {
        let Some(Annotation::Action {
            semantics,
            type_of,
            hidden,
        }) = ctx.annotation(AnnotationKind::Action)
        else {
            return;
        };
        if *semantics != SemanticsOf::NotSpecified {
            ctx.holder.add_facet(ActionSemanticsFacet {
                semantics: *semantics,
                attributes: FacetAttributes::DEFAULT.always_replace(),
            });
        }
        add_type_of(ctx.holder, type_of);
        add_hidden(ctx.holder, *hidden);
    }
}

pub struct ParameterAnnotationFacetFactory;

impl FacetFactory for ParameterAnnotationFacetFactory {
    fn name(&self) -> &'static str {
        "ParameterAnnotationFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::PARAMETERS_ONLY
    }

    fn process_param(&self, ctx: &mut ProcessParameterContext<'_>) {
        if let Some(Annotation::Parameter {
            optionality,
            max_length,
        }) = ctx.annotation(AnnotationKind::Parameter)
        {
            add_optionality(ctx.holder, *optionality);
            add_max_length(ctx.holder, *max_length);
        }
    }
}

fn big_decimal(integer: u32, fraction: u32) -> BigDecimalValueFacet {
    BigDecimalValueFacet {
        precision: integer + fraction,
        scale: fraction,
        attributes: FacetAttributes::DEFAULT,
    }
}

/// `@Digits(integer, fraction)` on decimal properties and parameters.
pub struct DigitsFacetFactory;

impl FacetFactory for DigitsFacetFactory {
    fn name(&self) -> &'static str {
        "DigitsFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::PROPERTIES_AND_PARAMETERS
    }

    fn process_method(&self, ctx: &mut ProcessMethodContext<'_>) {
        if let Some(Annotation::Digits { integer, fraction }) = ctx.annotation(AnnotationKind::Digits) {
            ctx.holder.add_facet(big_decimal(*integer, *fraction));
        }
    }

    fn process_param(&self, ctx: &mut ProcessParameterContext<'_>) {
        if let Some(Annotation::Digits { integer, fraction }) = ctx.annotation(AnnotationKind::Digits) {
            ctx.holder.add_facet(big_decimal(*integer, *fraction));
        }
    }
}
