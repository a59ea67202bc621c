//! Object specifications: the per-class metamodel consumers query.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use serde::{Deserialize, Serialize};

use crate::config::IntrospectionPolicy;
use crate::error::Result;
use crate::facetapi::{FacetHolder, HasFacetHolder};
use crate::facets::common::{CssClassFacet, DescribedAsFacet, NamedFacet};
use crate::facets::object::{IconFacet, TitleFacet};
use crate::methods::naming;
use crate::object::DomainObject;
use crate::reflect::{MethodMeta, TypeRegistry};
use crate::specloader::SpecificationLoader;
use crate::validation::ValidationFailure;

mod introspector;
mod member;

pub(crate) use introspector::introspect;
pub use member::{
    ObjectAction, ObjectActionParameter, ObjectFeature, ObjectMember, OneToManyAssociation,
    OneToOneAssociation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeanSort {
    ViewModel,
    Entity,
    Value,
    Service,
    Mixin,
    Abstract,
    Collection,
    Unknown,
}

impl BeanSort {
    pub fn is_entity(self) -> bool {
        self == BeanSort::Entity
    }

    pub fn is_view_model(self) -> bool {
        self == BeanSort::ViewModel
    }

    pub fn is_value(self) -> bool {
        self == BeanSort::Value
    }

    pub fn is_service(self) -> bool {
        self == BeanSort::Service
    }

    pub fn is_abstract(self) -> bool {
        self == BeanSort::Abstract
    }

    pub fn name(self) -> &'static str {
        match self {
            BeanSort::ViewModel => "VIEW_MODEL",
            BeanSort::Entity => "ENTITY",
            BeanSort::Value => "VALUE",
            BeanSort::Service => "SERVICE",
            BeanSort::Mixin => "MIXIN",
            BeanSort::Abstract => "ABSTRACT",
            BeanSort::Collection => "COLLECTION",
            BeanSort::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for BeanSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cross reference to another class's specification, resolved through the
/// loader on first access and memoized weakly.
#[derive(Debug, Default)]
pub struct SpecRef {
    type_name: Option<String>,
    cell: OnceLock<Weak<ObjectSpecification>>,
}

impl SpecRef {
    pub(crate) fn new(type_name: Option<String>) -> Self {
        Self {
            type_name,
            cell: OnceLock::new(),
        }
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some_and(|w| w.strong_count() > 0)
    }

    /// `Ok(None)` for value types and types outside the registry.
    pub fn resolve(&self, loader: &SpecificationLoader) -> Result<Option<Arc<ObjectSpecification>>> {
        let Some(type_name) = &self.type_name else {
            return Ok(None);
        };
        if let Some(spec) = self.cell.get().and_then(Weak::upgrade) {
            return Ok(Some(spec));
        }
        let spec = loader.spec_for_type(type_name)?;
        if let Some(spec) = &spec {
            let _ = self.cell.set(Arc::downgrade(spec));
        }
        Ok(spec)
    }
}

/// Metamodel of one domain class. Immutable once introspection completes,
/// apart from the lazily resolved cross references.
pub struct ObjectSpecification {
    pub(crate) type_name: String,
    pub(crate) logical_type_name: String,
    pub(crate) sort: BeanSort,
    pub(crate) is_abstract: bool,
    pub(crate) superclass: SpecRef,
    pub(crate) policy: IntrospectionPolicy,
    pub(crate) holder: FacetHolder,
    pub(crate) properties: Vec<OneToOneAssociation>,
    pub(crate) collections: Vec<OneToManyAssociation>,
    pub(crate) actions: Vec<ObjectAction>,
    pub(crate) unconsumed: Vec<Arc<MethodMeta>>,
    pub(crate) introspection_failures: Vec<ValidationFailure>,
    pub(crate) registry: Arc<TypeRegistry>,
}

impl fmt::Debug for ObjectSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectSpecification")
            .field("type_name", &self.type_name)
            .field("logical_type_name", &self.logical_type_name)
            .field("sort", &self.sort)
            .field("properties", &self.properties.len())
            .field("collections", &self.collections.len())
            .field("actions", &self.actions.len())
            .finish_non_exhaustive()
    }
}

impl HasFacetHolder for ObjectSpecification {
    fn facet_holder(&self) -> &FacetHolder {
        &self.holder
    }
}

impl ObjectSpecification {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn logical_type_name(&self) -> &str {
        &self.logical_type_name
    }

    pub fn sort(&self) -> BeanSort {
        self.sort
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_entity(&self) -> bool {
        self.sort.is_entity()
    }

    pub fn is_view_model(&self) -> bool {
        self.sort.is_view_model()
    }

    pub fn is_value(&self) -> bool {
        self.sort.is_value()
    }

    pub fn is_service(&self) -> bool {
        self.sort.is_service()
    }

    pub fn policy(&self) -> IntrospectionPolicy {
        self.policy
    }

    pub fn superclass_name(&self) -> Option<&str> {
        self.superclass.type_name()
    }

    pub fn superclass(&self, loader: &SpecificationLoader) -> Result<Option<Arc<ObjectSpecification>>> {
        self.superclass.resolve(loader)
    }

    pub fn friendly_name(&self) -> String {
        self.facet::<NamedFacet>()
            .map(|f| f.name.clone())
            .unwrap_or_else(|| naming::natural_name(self.type_name.rsplit('.').next().unwrap_or_default()))
    }

    pub fn description(&self) -> Option<&str> {
        self.facet::<DescribedAsFacet>().map(|f| f.text.as_str())
    }

    pub fn properties(&self) -> &[OneToOneAssociation] {
        &self.properties
    }

    pub fn collections(&self) -> &[OneToManyAssociation] {
        &self.collections
    }

    pub fn actions(&self) -> &[ObjectAction] {
        &self.actions
    }

    /// Properties, then collections, then actions.
    pub fn members(&self) -> Vec<ObjectMember<'_>> {
        self.properties
            .iter()
            .map(ObjectMember::Property)
            .chain(self.collections.iter().map(ObjectMember::Collection))
            .chain(self.actions.iter().map(ObjectMember::Action))
            .collect()
    }

    pub fn member(&self, id: &str) -> Option<ObjectMember<'_>> {
        self.members().into_iter().find(|m| m.id() == id)
    }

    pub fn property(&self, id: &str) -> Option<&OneToOneAssociation> {
        self.properties.iter().find(|p| p.id() == id)
    }

    pub fn collection(&self, id: &str) -> Option<&OneToManyAssociation> {
        self.collections.iter().find(|c| c.id() == id)
    }

    pub fn action(&self, id: &str) -> Option<&ObjectAction> {
        self.actions.iter().find(|a| a.id() == id)
    }

    /// Support-looking methods no factory claimed.
    pub fn unconsumed_methods(&self) -> &[Arc<MethodMeta>] {
        &self.unconsumed
    }

    pub fn introspection_failures(&self) -> &[ValidationFailure] {
        &self.introspection_failures
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Whether instances of `type_name` are instances of this class.
    pub fn is_assignable_from(&self, type_name: &str) -> bool {
        self.registry.is_assignable_from(&self.type_name, type_name)
    }

    pub fn title_of(&self, pojo: &dyn DomainObject) -> Result<String> {
        match self.facet::<TitleFacet>() {
            Some(facet) => facet.title(pojo),
            None => Ok(format!("Untitled {}", self.friendly_name())),
        }
    }

    pub fn icon_name_of(&self, pojo: &dyn DomainObject) -> Result<Option<String>> {
        match self.facet::<IconFacet>() {
            Some(facet) => facet.source.text_for(pojo),
            None => Ok(None),
        }
    }

    pub fn css_class_of(&self, pojo: &dyn DomainObject) -> Result<Option<String>> {
        match self.facet::<CssClassFacet>() {
            Some(facet) => facet.source.text_for(pojo),
            None => Ok(None),
        }
    }
}
