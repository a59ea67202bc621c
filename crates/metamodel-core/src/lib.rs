//! Facet-based metamodel builder.
//!
//! Domain classes are described by an explicit metadata table
//! ([`reflect::TypeRegistry`]). A [`facets::ProgrammingModel`] of facet
//! factories walks every class, member and action parameter and contributes
//! [`facetapi::Facet`]s to their [`facetapi::FacetHolder`]s. The result is one
//! [`spec::ObjectSpecification`] per class, cached by the
//! [`specloader::SpecificationLoader`] and validated as a whole.
//!
//! ```text
//!  .dom text ──► TypeRegistry ──► FacetProcessor ──► ObjectSpecification
//!                                  (factories A, B, ...)        │
//!                                                               ▼
//!                  ManagedObject ◄── SpecificationLoader ◄── validators
//! ```
//!
//! On top of the specifications, [`object::ManagedObject`] pairs a domain
//! instance with its specification under one of seven fixed identity and
//! mutability contracts.

pub mod config;
pub mod error;
pub mod facetapi;
pub mod facets;
pub mod methods;
pub mod object;
pub mod reflect;
pub mod spec;
pub mod specloader;
pub mod validation;

pub use config::{IntrospectionConfig, IntrospectionPolicy};
pub use error::{MetaModelError, Result};
pub use facetapi::{Facet, FacetAttributes, FacetHolder, FeatureType, HasFacetHolder};
pub use facets::{FacetFactory, ProgrammingModel};
pub use object::{Bookmark, DomainObject, DynObject, ManagedObject, MetaModelContext, Pojo, Specialization};
pub use reflect::{ClassMeta, MethodMeta, TypeRef, TypeRegistry};
pub use spec::{BeanSort, ObjectFeature, ObjectSpecification};
pub use specloader::{LoadState, SpecificationLoader};
pub use validation::{ValidationFailure, ValidationFailures, ValidationKind};
