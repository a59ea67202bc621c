//! Facets shared by several feature types, and the default/layout factories
//! that contribute them.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::facetapi::{impl_facet, FacetAttributes, FacetHolder, FeatureType, FeatureTypes};
use crate::methods::naming;
use crate::object::DomainObject;
use crate::reflect::{Annotation, AnnotationKind, LayoutAttributes, MethodMeta, RenderDay, Where};

use super::{FacetFactory, ProcessClassContext, ProcessMethodContext, ProcessParameterContext};

// ============================================================================
// Facets
// ============================================================================

/// Text that is either declared up front or computed by a support method.
#[derive(Debug, Clone)]
pub enum TextSource {
    Static(String),
    Method(Arc<MethodMeta>),
}

impl TextSource {
    pub fn text_for(&self, pojo: &dyn DomainObject) -> Result<Option<String>> {
        match self {
            TextSource::Static(text) => Ok(Some(text.clone())),
            TextSource::Method(method) => Ok(value_to_text(pojo.invoke(&method.name, &[])?)),
        }
    }
}

pub(crate) fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct NamedFacet {
    pub name: String,
    pub attributes: FacetAttributes,
}

#[derive(Debug, Clone)]
pub struct DescribedAsFacet {
    pub text: String,
    pub attributes: FacetAttributes,
}

#[derive(Debug, Clone)]
pub struct HiddenFacet {
    pub hidden: Where,
    pub attributes: FacetAttributes,
}

impl HiddenFacet {
    pub fn is_always_hidden(&self) -> bool {
        self.hidden == Where::Everywhere
    }
}

#[derive(Debug, Clone)]
pub struct CssClassFacet {
    pub source: TextSource,
    pub attributes: FacetAttributes,
}

/// Font Awesome icon class, e.g. `fa-user`.
#[derive(Debug, Clone)]
pub struct CssClassFaFacet {
    pub name: String,
    pub attributes: FacetAttributes,
}

#[derive(Debug, Clone)]
pub struct LayoutOrderFacet {
    pub sequence: String,
    pub attributes: FacetAttributes,
}

#[derive(Debug, Clone)]
pub struct MandatoryFacet {
    pub mandatory: bool,
    pub attributes: FacetAttributes,
}

#[derive(Debug, Clone)]
pub struct MaxLengthFacet {
    pub max_length: usize,
    pub attributes: FacetAttributes,
}

/// Date rendering shifted by a number of days (`-1` for end-exclusive dates).
#[derive(Debug, Clone)]
pub struct RenderedAdjustedFacet {
    pub adjust_by: i32,
    pub attributes: FacetAttributes,
}

impl_facet!(
    NamedFacet,
    DescribedAsFacet,
    HiddenFacet,
    CssClassFacet,
    CssClassFaFacet,
    LayoutOrderFacet,
    MandatoryFacet,
    MaxLengthFacet,
    RenderedAdjustedFacet,
);

// ============================================================================
// Defaults
// ============================================================================

fn derived_name(name: String) -> NamedFacet {
    NamedFacet {
        name,
        attributes: FacetAttributes::DEFAULT.derived().noop(),
    }
}

/// Friendly names inferred from identifiers; any explicit name replaces them.
pub struct NamedFacetDefaultFactory;

impl FacetFactory for NamedFacetDefaultFactory {
    fn name(&self) -> &'static str {
        "NamedFacetDefaultFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::EVERYTHING
    }

    fn process_class(&self, ctx: &mut ProcessClassContext<'_>) {
        let name = naming::natural_name(ctx.class().simple_name());
        ctx.holder.add_facet(derived_name(name));
    }

    fn process_method(&self, ctx: &mut ProcessMethodContext<'_>) {
        ctx.holder
            .add_facet(derived_name(naming::natural_name(ctx.member_id)));
    }

    fn process_param(&self, ctx: &mut ProcessParameterContext<'_>) {
        ctx.holder
            .add_facet(derived_name(naming::natural_name(&ctx.param.name)));
    }
}

/// Properties and parameters are mandatory unless declared optional.
pub struct MandatoryFacetDefaultFactory;

impl FacetFactory for MandatoryFacetDefaultFactory {
    fn name(&self) -> &'static str {
        "MandatoryFacetDefaultFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::PROPERTIES_AND_PARAMETERS
    }

    fn process_method(&self, ctx: &mut ProcessMethodContext<'_>) {
        ctx.holder.add_facet(MandatoryFacet {
            mandatory: true,
            attributes: FacetAttributes::DEFAULT.derived(),
        });
    }

    fn process_param(&self, ctx: &mut ProcessParameterContext<'_>) {
        ctx.holder.add_facet(MandatoryFacet {
            mandatory: true,
            attributes: FacetAttributes::DEFAULT.derived(),
        });
    }
}

// ============================================================================
// Layout
// ============================================================================

fn apply_layout(holder: &mut FacetHolder, layout: &LayoutAttributes) {
    let declared = FacetAttributes::DEFAULT;
    holder.add_facet_if_present(layout.named.clone().map(|name| NamedFacet {
        name,
        attributes: declared,
    }));
    holder.add_facet_if_present(layout.described_as.clone().map(|text| DescribedAsFacet {
        text,
        attributes: declared,
    }));
    holder.add_facet_if_present(layout.css_class.clone().map(|css| CssClassFacet {
        source: TextSource::Static(css),
        attributes: declared,
    }));
    holder.add_facet_if_present(layout.css_class_fa.clone().map(|name| CssClassFaFacet {
        name,
        attributes: declared,
    }));
    holder.add_facet_if_present(layout.sequence.clone().map(|sequence| LayoutOrderFacet {
        sequence,
        attributes: declared,
    }));
    if layout.hidden != Where::NotSpecified {
        holder.add_facet(HiddenFacet {
            hidden: layout.hidden,
            attributes: declared,
        });
    }
    if layout.render_day == RenderDay::AsDayBefore {
        holder.add_facet(RenderedAdjustedFacet {
            adjust_by: -1,
            attributes: declared,
        });
    }
}

/// `@DomainObjectLayout`, `@PropertyLayout`, `@CollectionLayout`,
/// `@ActionLayout`, `@ParameterLayout` and `@MemberOrder`.
pub struct LayoutFacetFactory;

impl FacetFactory for LayoutFacetFactory {
    fn name(&self) -> &'static str {
        "LayoutFacetFactory"
    }

    fn feature_types(&self) -> FeatureTypes {
        FeatureTypes::EVERYTHING
    }

    fn process_class(&self, ctx: &mut ProcessClassContext<'_>) {
        if let Some(layout) = ctx
            .scope
            .class_annotation(AnnotationKind::DomainObjectLayout)
            .and_then(Annotation::layout)
        {
            apply_layout(ctx.holder, layout);
        }
    }

    fn process_method(&self, ctx: &mut ProcessMethodContext<'_>) {
        let kind = match ctx.feature_type {
            FeatureType::Property => AnnotationKind::PropertyLayout,
            FeatureType::Collection => AnnotationKind::CollectionLayout,
            FeatureType::Action => AnnotationKind::ActionLayout,
            FeatureType::Object | FeatureType::ActionParameter => return,
        };
        if let Some(layout) = ctx.annotation(kind).and_then(Annotation::layout) {
            apply_layout(ctx.holder, layout);
        }
        if let Some(Annotation::MemberOrder { sequence }) = ctx.annotation(AnnotationKind::MemberOrder) {
            ctx.holder.add_facet(LayoutOrderFacet {
                sequence: sequence.clone(),
                attributes: FacetAttributes::DEFAULT,
            });
        }
    }

    fn process_param(&self, ctx: &mut ProcessParameterContext<'_>) {
        if let Some(layout) = ctx
            .annotation(AnnotationKind::ParameterLayout)
            .and_then(Annotation::layout)
        {
            apply_layout(ctx.holder, layout);
        }
    }
}
