//! The facet API: typed units of metadata, the holders that own them, and the
//! feature types factories are registered against.

mod facet;
mod feature;
mod holder;

pub(crate) use facet::impl_facet;
pub use facet::{Facet, FacetAttributes, FacetType};
pub use feature::{FeatureType, FeatureTypes};
pub use holder::{FacetHolder, HasFacetHolder};
