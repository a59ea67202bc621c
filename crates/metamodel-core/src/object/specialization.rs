use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MetaModelError, Result};
use crate::spec::BeanSort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypePolicy {
    NoType,
    AbstractTypeAllowed,
    ExactTypeRequired,
}

impl TypePolicy {
    pub fn is_no_type(self) -> bool {
        self == TypePolicy::NoType
    }

    pub fn is_abstract_type_allowed(self) -> bool {
        self == TypePolicy::AbstractTypeAllowed
    }

    pub fn is_exact_type_required(self) -> bool {
        self == TypePolicy::ExactTypeRequired
    }

    pub fn is_type_required_any(self) -> bool {
        !self.is_no_type()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookmarkPolicy {
    NoBookmark,
    Immutable,
    /// State changes of the object show up as a new identifier.
    Refreshable,
}

impl BookmarkPolicy {
    pub fn is_no_bookmark(self) -> bool {
        self == BookmarkPolicy::NoBookmark
    }

    pub fn is_immutable(self) -> bool {
        self == BookmarkPolicy::Immutable
    }

    pub fn is_refreshable(self) -> bool {
        self == BookmarkPolicy::Refreshable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PojoPolicy {
    NoPojo,
    Immutable,
    /// Mutable state behind a fixed reference.
    Stateful,
    /// The reference itself can be replaced by refetching.
    Refetchable,
    /// A fixed list of pojos sharing an element specification.
    Packed,
}

impl PojoPolicy {
    pub fn is_no_pojo(self) -> bool {
        self == PojoPolicy::NoPojo
    }

    pub fn is_immutable(self) -> bool {
        self == PojoPolicy::Immutable
    }

    pub fn is_stateful(self) -> bool {
        self == PojoPolicy::Stateful
    }

    pub fn is_refetchable(self) -> bool {
        self == PojoPolicy::Refetchable
    }

    pub fn is_packed(self) -> bool {
        self == PojoPolicy::Packed
    }
}

/// Contract of a managed object: one of seven fixed combinations of type,
/// bookmark and pojo policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Specialization {
    name: &'static str,
    type_policy: TypePolicy,
    bookmark_policy: BookmarkPolicy,
    pojo_policy: PojoPolicy,
}

impl Specialization {
    const fn new(
        name: &'static str,
        type_policy: TypePolicy,
        bookmark_policy: BookmarkPolicy,
        pojo_policy: PojoPolicy,
    ) -> Self {
        Self {
            name,
            type_policy,
            bookmark_policy,
            pojo_policy,
        }
    }

    pub const UNSPECIFIED: Specialization = Specialization::new(
        "UNSPECIFIED",
        TypePolicy::NoType,
        BookmarkPolicy::NoBookmark,
        PojoPolicy::NoPojo,
    );
    pub const EMPTY: Specialization = Specialization::new(
        "EMPTY",
        TypePolicy::AbstractTypeAllowed,
        BookmarkPolicy::NoBookmark,
        PojoPolicy::NoPojo,
    );
    pub const VALUE: Specialization = Specialization::new(
        "VALUE",
        TypePolicy::ExactTypeRequired,
        BookmarkPolicy::Immutable,
        PojoPolicy::Immutable,
    );
    pub const SERVICE: Specialization = Specialization::new(
        "SERVICE",
        TypePolicy::ExactTypeRequired,
        BookmarkPolicy::Immutable,
        PojoPolicy::Immutable,
    );
    pub const VIEWMODEL: Specialization = Specialization::new(
        "VIEWMODEL",
        TypePolicy::ExactTypeRequired,
        BookmarkPolicy::Refreshable,
        PojoPolicy::Stateful,
    );
    pub const ENTITY: Specialization = Specialization::new(
        "ENTITY",
        TypePolicy::ExactTypeRequired,
        BookmarkPolicy::Immutable,
        PojoPolicy::Refetchable,
    );
    pub const PACKED: Specialization = Specialization::new(
        "PACKED",
        TypePolicy::AbstractTypeAllowed,
        BookmarkPolicy::NoBookmark,
        PojoPolicy::Packed,
    );

    pub const ALL: [Specialization; 7] = [
        Specialization::UNSPECIFIED,
        Specialization::EMPTY,
        Specialization::VALUE,
        Specialization::SERVICE,
        Specialization::VIEWMODEL,
        Specialization::ENTITY,
        Specialization::PACKED,
    ];

    /// Specialization of a single, non-null pojo of the given sort.
    pub fn for_sort(sort: BeanSort) -> Result<Self> {
        match sort {
            BeanSort::Entity => Ok(Specialization::ENTITY),
            BeanSort::ViewModel => Ok(Specialization::VIEWMODEL),
            BeanSort::Value => Ok(Specialization::VALUE),
            BeanSort::Service => Ok(Specialization::SERVICE),
            BeanSort::Abstract => Err(MetaModelError::illegal_argument(
                "an object with a pojo requires a concrete specification",
            )),
            BeanSort::Mixin | BeanSort::Collection | BeanSort::Unknown => Err(
                MetaModelError::not_implemented(format!("managed objects of sort {sort}")),
            ),
        }
    }

    pub fn name(self) -> &'static str {
        self.name
    }

    pub fn type_policy(self) -> TypePolicy {
        self.type_policy
    }

    pub fn bookmark_policy(self) -> BookmarkPolicy {
        self.bookmark_policy
    }

    pub fn pojo_policy(self) -> PojoPolicy {
        self.pojo_policy
    }

    pub fn is_unspecified(self) -> bool {
        self == Specialization::UNSPECIFIED
    }

    pub fn is_empty(self) -> bool {
        self == Specialization::EMPTY
    }

    pub fn is_value(self) -> bool {
        self == Specialization::VALUE
    }

    pub fn is_service(self) -> bool {
        self == Specialization::SERVICE
    }

    pub fn is_viewmodel(self) -> bool {
        self == Specialization::VIEWMODEL
    }

    pub fn is_entity(self) -> bool {
        self == Specialization::ENTITY
    }

    pub fn is_packed(self) -> bool {
        self == Specialization::PACKED
    }
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_and_service_share_policies_but_not_identity() {
        let value = Specialization::VALUE;
        let service = Specialization::SERVICE;
        assert_eq!(value.type_policy(), service.type_policy());
        assert_eq!(value.bookmark_policy(), service.bookmark_policy());
        assert_eq!(value.pojo_policy(), service.pojo_policy());
        assert_ne!(value, service);
        assert!(value.is_value() && !value.is_service());
    }

    #[test]
    fn only_unspecified_has_no_type() {
        let untyped: Vec<&str> = Specialization::ALL
            .iter()
            .filter(|s| s.type_policy().is_no_type())
            .map(|s| s.name())
            .collect();
        assert_eq!(untyped, vec!["UNSPECIFIED"]);
    }

    #[test]
    fn sorts_map_to_specializations() {
        assert_eq!(Specialization::for_sort(BeanSort::Entity).expect("entity"), Specialization::ENTITY);
        assert_eq!(
            Specialization::for_sort(BeanSort::ViewModel).expect("vm"),
            Specialization::VIEWMODEL
        );
        assert!(Specialization::for_sort(BeanSort::Mixin)
            .unwrap_err()
            .is_not_implemented());
        assert!(Specialization::for_sort(BeanSort::Abstract)
            .unwrap_err()
            .is_illegal_argument());
    }
}
