//! Member support methods: `hide`, `disable`, `validate`, `default` and
//! `choices`, for members and for action parameters.

use std::sync::Arc;

use serde_json::Value;

use crate::config::IntrospectionPolicy;
use crate::error::Result;
use crate::facetapi::{impl_facet, FacetAttributes, FacetHolder, FeatureType, FeatureTypes};
use crate::methods::{naming, MethodFinderOptions, ReturnExpectation};
use crate::object::DomainObject;
use crate::reflect::{MethodMeta, TypeRef};

use super::common::value_to_text;
use super::{FacetFactory, ProcessMethodContext, ProcessParameterContext};

#[derive(Debug, Clone)]
pub struct HideForContextFacet {
    pub method: Arc<MethodMeta>,
    pub attributes: FacetAttributes,
}

impl HideForContextFacet {
    pub fn hides(&self, pojo: &dyn DomainObject) -> Result<bool> {
        Ok(matches!(pojo.invoke(&self.method.name, &[])?, Value::Bool(true)))
    }
}

#[derive(Debug, Clone)]
pub struct DisableForContextFacet {
    pub method: Arc<MethodMeta>,
    pub attributes: FacetAttributes,
}

impl DisableForContextFacet {
    /// The reason the member is disabled, or `None` when it is usable.
    pub fn disabled_reason(&self, pojo: &dyn DomainObject) -> Result<Option<String>> {
        Ok(value_to_text(pojo.invoke(&self.method.name, &[])?))
    }
}

#[derive(Debug, Clone)]
pub struct ValidateFacet {
    pub method: Arc<MethodMeta>,
    pub attributes: FacetAttributes,
}

impl ValidateFacet {
    /// The reason the proposed value(s) are invalid, or `None`.
    pub fn invalid_reason(&self, pojo: &dyn DomainObject, args: &[Value]) -> Result<Option<String>> {
        Ok(value_to_text(pojo.invoke(&self.method.name, args)?))
    }
}

#[derive(Debug, Clone)]
pub struct DefaultedFacet {
    pub method: Arc<MethodMeta>,
    pub attributes: FacetAttributes,
}

impl DefaultedFacet {
    pub fn default_value(&self, pojo: &dyn DomainObject) -> Result<Value> {
        pojo.invoke(&self.method.name, &[])
    }
}

#[derive(Debug, Clone)]
pub struct ChoicesFacet {
    pub method: Arc<MethodMeta>,
    pub attributes: FacetAttributes,
}

impl ChoicesFacet {
    pub fn choices(&self, pojo: &dyn DomainObject) -> Result<Vec<Value>> {
        Ok(match pojo.invoke(&self.method.name, &[])? {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            single => vec![single],
        })
    }
}

impl_facet!(
    HideForContextFacet,
    DisableForContextFacet,
    ValidateFacet,
    DefaultedFacet,
    ChoicesFacet,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportKind {
    Hide,
    Disable,
    Validate,
    Default,
    Choices,
}

impl SupportKind {
    pub const ALL: [SupportKind; 5] = [
        SupportKind::Hide,
        SupportKind::Disable,
        SupportKind::Validate,
        SupportKind::Default,
        SupportKind::Choices,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            SupportKind::Hide => naming::HIDE_PREFIX,
            SupportKind::Disable => naming::DISABLE_PREFIX,
            SupportKind::Validate => naming::VALIDATE_PREFIX,
            SupportKind::Default => naming::DEFAULT_PREFIX,
            SupportKind::Choices => naming::CHOICES_PREFIX,
        }
    }

    fn feature_types(self) -> FeatureTypes {
        match self {
            SupportKind::Hide | SupportKind::Disable => FeatureTypes::MEMBERS,
            SupportKind::Validate => FeatureTypes::of(&[
                FeatureType::Property,
                FeatureType::Action,
                FeatureType::ActionParameter,
            ]),
            SupportKind::Default | SupportKind::Choices => FeatureTypes::PROPERTIES_AND_PARAMETERS,
        }
    }

    fn returns(self) -> ReturnExpectation {
        match self {
            SupportKind::Hide => ReturnExpectation::Boolean,
            SupportKind::Disable | SupportKind::Validate => ReturnExpectation::String,
            SupportKind::Default | SupportKind::Choices => ReturnExpectation::NonVoid,
        }
    }
}

/// One factory per [`SupportKind`]; finds `<prefix><Member>` or
/// `<prefix><N><Action>` and installs the matching facet.
pub struct MemberSupportFacetFactory {
    kind: SupportKind,
}

impl MemberSupportFacetFactory {
    pub fn new(kind: SupportKind) -> Self {
        Self { kind }
    }

    fn options(
        &self,
        name: String,
        params: Vec<TypeRef>,
        policy: IntrospectionPolicy,
    ) -> MethodFinderOptions {
        let options = MethodFinderOptions::member_support([name], policy)
            .with_params(params)
            .returning(self.kind.returns());
        if self.kind == SupportKind::Choices {
            options.and_also(|m| m.return_type.is_collection())
        } else {
            options
        }
    }

    fn attach(&self, holder: &mut FacetHolder, method: Arc<MethodMeta>) {
        let attributes = FacetAttributes::DEFAULT;
        match self.kind {
            SupportKind::Hide => holder.add_facet(HideForContextFacet { method, attributes }),
            SupportKind::Disable => holder.add_facet(DisableForContextFacet { method, attributes }),
            SupportKind::Validate => holder.add_facet(ValidateFacet { method, attributes }),
            SupportKind::Default => holder.add_facet(DefaultedFacet { method, attributes }),
            SupportKind::Choices => holder.add_facet(ChoicesFacet { method, attributes }),
        };
    }
}

impl FacetFactory for MemberSupportFacetFactory {
    fn name(&self) -> &'static str {
        match self.kind {
            SupportKind::Hide => "HideFacetFactory",
            SupportKind::Disable => "DisableFacetFactory",
            SupportKind::Validate => "ValidateFacetFactory",
            SupportKind::Default => "DefaultFacetFactory",
            SupportKind::Choices => "ChoicesFacetFactory",
        }
    }

    fn feature_types(&self) -> FeatureTypes {
        self.kind.feature_types()
    }

    fn process_method(&self, ctx: &mut ProcessMethodContext<'_>) {
        let name = format!("{}{}", self.kind.prefix(), naming::capitalize(ctx.member_id));
        let params = match (self.kind, ctx.feature_type) {
            (SupportKind::Validate, FeatureType::Property) => vec![ctx.method.return_type.clone()],
            (SupportKind::Validate, FeatureType::Action) => ctx.method.param_types(),
            _ => Vec::new(),
        };
        let options = self.options(name, params, ctx.policy());
        if let Some(method) = ctx.find_single(&options) {
            ctx.remove_method(&method);
            self.attach(ctx.holder, method);
        }
    }

    fn process_param(&self, ctx: &mut ProcessParameterContext<'_>) {
        let name = format!(
            "{}{}{}",
            self.kind.prefix(),
            ctx.index,
            naming::capitalize(ctx.action_id)
        );
        let params = match self.kind {
            SupportKind::Validate => vec![ctx.param.ty.clone()],
            _ => Vec::new(),
        };
        let options = self.options(name, params, ctx.policy());
        if let Some(method) = ctx.find_single(&options) {
            ctx.remove_method(&method);
            self.attach(ctx.holder, method);
        }
    }
}
