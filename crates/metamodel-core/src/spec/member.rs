use std::sync::Arc;

use serde_json::Value;

use crate::error::{MetaModelError, Result};
use crate::facetapi::{FacetHolder, FeatureType, HasFacetHolder};
use crate::facets::common::{
    DescribedAsFacet, HiddenFacet, LayoutOrderFacet, MandatoryFacet, MaxLengthFacet, NamedFacet,
};
use crate::facets::members::{
    ActionInvocationFacet, ActionSemanticsFacet, CollectionAccessorFacet, PropertyAccessorFacet,
    TypeOfFacet,
};
use crate::methods::naming;
use crate::object::DomainObject;
use crate::reflect::{MethodMeta, SemanticsOf, TypeRef};
use crate::specloader::SpecificationLoader;

use super::{ObjectSpecification, SpecRef};

/// Queries shared by members and action parameters.
pub trait ObjectFeature: HasFacetHolder {
    fn id(&self) -> &str;

    fn feature_type(&self) -> FeatureType;

    fn friendly_name(&self) -> String {
        self.facet::<NamedFacet>()
            .map(|f| f.name.clone())
            .unwrap_or_else(|| naming::natural_name(self.id()))
    }

    fn description(&self) -> Option<&str> {
        self.facet::<DescribedAsFacet>().map(|f| f.text.as_str())
    }

    fn is_always_hidden(&self) -> bool {
        self.facet::<HiddenFacet>()
            .is_some_and(HiddenFacet::is_always_hidden)
    }

    fn layout_order(&self) -> Option<&str> {
        self.facet::<LayoutOrderFacet>().map(|f| f.sequence.as_str())
    }

    fn is_mandatory(&self) -> bool {
        self.facet::<MandatoryFacet>().is_some_and(|f| f.mandatory)
    }
}

// ============================================================================
// Properties
// ============================================================================

#[derive(Debug)]
pub struct OneToOneAssociation {
    pub(crate) id: String,
    pub(crate) method: Arc<MethodMeta>,
    pub(crate) holder: FacetHolder,
    pub(crate) spec: SpecRef,
}

impl HasFacetHolder for OneToOneAssociation {
    fn facet_holder(&self) -> &FacetHolder {
        &self.holder
    }
}

impl ObjectFeature for OneToOneAssociation {
    fn id(&self) -> &str {
        &self.id
    }

    fn feature_type(&self) -> FeatureType {
        FeatureType::Property
    }
}

impl OneToOneAssociation {
    pub fn method(&self) -> &Arc<MethodMeta> {
        &self.method
    }

    pub fn value_type(&self) -> &TypeRef {
        &self.method.return_type
    }

    pub fn max_length(&self) -> Option<usize> {
        self.facet::<MaxLengthFacet>().map(|f| f.max_length)
    }

    /// Specification of the property's type; `None` for value types.
    pub fn specification(&self, loader: &SpecificationLoader) -> Result<Option<Arc<ObjectSpecification>>> {
        self.spec.resolve(loader)
    }

    pub fn get(&self, pojo: &dyn DomainObject) -> Option<Value> {
        self.facet::<PropertyAccessorFacet>()
            .and_then(|accessor| accessor.get(pojo))
    }
}

// ============================================================================
// Collections
// ============================================================================

#[derive(Debug)]
pub struct OneToManyAssociation {
    pub(crate) id: String,
    pub(crate) method: Arc<MethodMeta>,
    pub(crate) holder: FacetHolder,
    pub(crate) element_spec: SpecRef,
}

impl HasFacetHolder for OneToManyAssociation {
    fn facet_holder(&self) -> &FacetHolder {
        &self.holder
    }
}

impl ObjectFeature for OneToManyAssociation {
    fn id(&self) -> &str {
        &self.id
    }

    fn feature_type(&self) -> FeatureType {
        FeatureType::Collection
    }
}

impl OneToManyAssociation {
    pub fn method(&self) -> &Arc<MethodMeta> {
        &self.method
    }

    pub fn element_type(&self) -> Option<&str> {
        self.facet::<TypeOfFacet>()
            .map(|f| f.element_type.as_str())
            .or(self.element_spec.type_name())
    }

    pub fn element_specification(
        &self,
        loader: &SpecificationLoader,
    ) -> Result<Option<Arc<ObjectSpecification>>> {
        self.element_spec.resolve(loader)
    }

    pub fn get(&self, pojo: &dyn DomainObject) -> Vec<Value> {
        self.facet::<CollectionAccessorFacet>()
            .map(|accessor| accessor.get(pojo))
            .unwrap_or_default()
    }
}

// ============================================================================
// Actions
// ============================================================================

#[derive(Debug)]
pub struct ObjectAction {
    pub(crate) id: String,
    pub(crate) method: Arc<MethodMeta>,
    pub(crate) holder: FacetHolder,
    pub(crate) parameters: Vec<ObjectActionParameter>,
    pub(crate) return_spec: SpecRef,
}

impl HasFacetHolder for ObjectAction {
    fn facet_holder(&self) -> &FacetHolder {
        &self.holder
    }
}

impl ObjectFeature for ObjectAction {
    fn id(&self) -> &str {
        &self.id
    }

    fn feature_type(&self) -> FeatureType {
        FeatureType::Action
    }
}

impl ObjectAction {
    pub fn method(&self) -> &Arc<MethodMeta> {
        &self.method
    }

    pub fn parameters(&self) -> &[ObjectActionParameter] {
        &self.parameters
    }

    pub fn parameter(&self, index: usize) -> Option<&ObjectActionParameter> {
        self.parameters.get(index)
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn return_type(&self) -> &TypeRef {
        &self.method.return_type
    }

    pub fn semantics(&self) -> SemanticsOf {
        self.facet::<ActionSemanticsFacet>()
            .map(|f| f.semantics)
            .unwrap_or_default()
    }

    /// Specification of the returned type (element type for collections).
    pub fn return_specification(
        &self,
        loader: &SpecificationLoader,
    ) -> Result<Option<Arc<ObjectSpecification>>> {
        self.return_spec.resolve(loader)
    }

    pub fn invoke(&self, pojo: &dyn DomainObject, args: &[Value]) -> Result<Value> {
        let facet = self.facet::<ActionInvocationFacet>().ok_or_else(|| {
            MetaModelError::IllegalState(format!("action `{}` has no invocation facet", self.id))
        })?;
        facet.invoke(pojo, args)
    }
}

#[derive(Debug)]
pub struct ObjectActionParameter {
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) ty: TypeRef,
    pub(crate) holder: FacetHolder,
    pub(crate) spec: SpecRef,
}

impl HasFacetHolder for ObjectActionParameter {
    fn facet_holder(&self) -> &FacetHolder {
        &self.holder
    }
}

impl ObjectFeature for ObjectActionParameter {
    fn id(&self) -> &str {
        &self.name
    }

    fn feature_type(&self) -> FeatureType {
        FeatureType::ActionParameter
    }
}

impl ObjectActionParameter {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn specification(&self, loader: &SpecificationLoader) -> Result<Option<Arc<ObjectSpecification>>> {
        self.spec.resolve(loader)
    }
}

// ============================================================================
// Any member
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub enum ObjectMember<'a> {
    Property(&'a OneToOneAssociation),
    Collection(&'a OneToManyAssociation),
    Action(&'a ObjectAction),
}

impl<'a> ObjectMember<'a> {
    pub fn method(&self) -> &'a Arc<MethodMeta> {
        match self {
            ObjectMember::Property(p) => &p.method,
            ObjectMember::Collection(c) => &c.method,
            ObjectMember::Action(a) => &a.method,
        }
    }
}

impl HasFacetHolder for ObjectMember<'_> {
    fn facet_holder(&self) -> &FacetHolder {
        match self {
            ObjectMember::Property(p) => &p.holder,
            ObjectMember::Collection(c) => &c.holder,
            ObjectMember::Action(a) => &a.holder,
        }
    }
}

impl ObjectFeature for ObjectMember<'_> {
    fn id(&self) -> &str {
        match self {
            ObjectMember::Property(p) => &p.id,
            ObjectMember::Collection(c) => &c.id,
            ObjectMember::Action(a) => &a.id,
        }
    }

    fn feature_type(&self) -> FeatureType {
        match self {
            ObjectMember::Property(_) => FeatureType::Property,
            ObjectMember::Collection(_) => FeatureType::Collection,
            ObjectMember::Action(_) => FeatureType::Action,
        }
    }
}
