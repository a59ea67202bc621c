use std::any::{Any, TypeId};
use std::fmt;

/// Key of a facet within a [`FacetHolder`](super::FacetHolder).
///
/// One concrete Rust type per facet type; the name is only for display.
#[derive(Clone, Copy)]
pub struct FacetType {
    id: TypeId,
    name: &'static str,
}

impl FacetType {
    pub fn of<T: 'static>() -> Self {
        let full = std::any::type_name::<T>();
        Self {
            id: TypeId::of::<T>(),
            name: full.rsplit("::").next().unwrap_or(full),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for FacetType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FacetType {}

impl std::hash::Hash for FacetType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for FacetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for FacetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Flags that drive the holder's replacement rule.
///
/// - `derived`: inferred from naming or defaults rather than declared.
/// - `noop`: a placeholder that any later contribution of the same type replaces.
/// - `always_replace`: replaces whatever facet of the same type is already held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FacetAttributes {
    pub derived: bool,
    pub noop: bool,
    pub always_replace: bool,
}

impl FacetAttributes {
    pub const DEFAULT: FacetAttributes = FacetAttributes {
        derived: false,
        noop: false,
        always_replace: false,
    };

    pub const fn derived(mut self) -> Self {
        self.derived = true;
        self
    }

    pub const fn noop(mut self) -> Self {
        self.noop = true;
        self
    }

    pub const fn always_replace(mut self) -> Self {
        self.always_replace = true;
        self
    }
}

/// A typed unit of behaviour or metadata attached to one feature.
pub trait Facet: Any + fmt::Debug + Send + Sync {
    fn attributes(&self) -> FacetAttributes;

    fn facet_type(&self) -> FacetType;

    fn as_any(&self) -> &dyn Any;

    fn is_derived(&self) -> bool {
        self.attributes().derived
    }

    fn is_noop(&self) -> bool {
        self.attributes().noop
    }

    fn is_always_replace(&self) -> bool {
        self.attributes().always_replace
    }

    /// One-line rendering for diagnostics (`describe`).
    fn summary(&self) -> String {
        format!("{self:?}")
    }
}

/// Implements [`Facet`] for structs carrying an `attributes: FacetAttributes` field.
macro_rules! impl_facet {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::facetapi::Facet for $ty {
                fn attributes(&self) -> $crate::facetapi::FacetAttributes {
                    self.attributes
                }

                fn facet_type(&self) -> $crate::facetapi::FacetType {
                    $crate::facetapi::FacetType::of::<Self>()
                }

                fn as_any(&self) -> &dyn ::std::any::Any {
                    self
                }
            }
        )+
    };
}

pub(crate) use impl_facet;
