use std::collections::HashMap;

use super::facet::{Facet, FacetType};

/// Per-feature container of facets, keyed by facet type.
///
/// At most one facet per type is held. A contribution of a type that is
/// already present only replaces the held facet when the contribution asks
/// for it (`always_replace`) or the held facet is a no-op placeholder;
/// otherwise the contribution is dropped.
#[derive(Debug, Default)]
pub struct FacetHolder {
    facets: HashMap<FacetType, Box<dyn Facet>>,
}

impl FacetHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    pub fn get_facet<T: Facet>(&self) -> Option<&T> {
        self.facets
            .get(&FacetType::of::<T>())
            .and_then(|f| f.as_any().downcast_ref::<T>())
    }

    pub fn facet_of_type(&self, facet_type: FacetType) -> Option<&dyn Facet> {
        self.facets.get(&facet_type).map(|f| f.as_ref())
    }

    pub fn contains_facet<T: Facet>(&self) -> bool {
        self.facets.contains_key(&FacetType::of::<T>())
    }

    /// Present and not a no-op.
    pub fn contains_do_op_facet<T: Facet>(&self) -> bool {
        self.get_facet::<T>().is_some_and(|f| !f.is_noop())
    }

    pub fn contains_do_op_not_derived_facet<T: Facet>(&self) -> bool {
        self.get_facet::<T>()
            .is_some_and(|f| !f.is_noop() && !f.is_derived())
    }

    /// Held facets ordered by facet type name.
    pub fn facets(&self) -> Vec<&dyn Facet> {
        let mut facets: Vec<&dyn Facet> = self.facets.values().map(|f| f.as_ref()).collect();
        facets.sort_by_key(|f| f.facet_type().name());
        facets
    }

    /// Adds `facet` under the replacement rule; returns whether it is now held.
    pub fn add_facet<F: Facet>(&mut self, facet: F) -> bool {
        self.add_boxed(Box::new(facet))
    }

    pub fn add_boxed(&mut self, facet: Box<dyn Facet>) -> bool {
        let facet_type = facet.facet_type();
        if let Some(existing) = self.facets.get(&facet_type) {
            if !facet.is_always_replace() && !existing.is_noop() {
                tracing::trace!(
                    facet_type = %facet_type,
                    existing = %existing.summary(),
                    dropped = %facet.summary(),
                    "facet contribution dropped"
                );
                return false;
            }
        }
        self.facets.insert(facet_type, facet);
        true
    }

    pub fn add_facet_if_present<F: Facet>(&mut self, facet: Option<F>) -> bool {
        match facet {
            Some(facet) => self.add_facet(facet),
            None => false,
        }
    }

    /// Installs `facet` regardless of what is held.
    pub fn add_or_replace_facet<F: Facet>(&mut self, facet: F) {
        self.facets.insert(FacetType::of::<F>(), Box::new(facet));
    }

    pub fn remove_facet<T: Facet>(&mut self) -> bool {
        self.facets.remove(&FacetType::of::<T>()).is_some()
    }
}

/// Implemented by metamodel features that own a [`FacetHolder`].
pub trait HasFacetHolder {
    fn facet_holder(&self) -> &FacetHolder;

    fn facet<T: Facet>(&self) -> Option<&T> {
        self.facet_holder().get_facet::<T>()
    }

    fn contains_facet<T: Facet>(&self) -> bool {
        self.facet_holder().contains_facet::<T>()
    }

    fn contains_do_op_facet<T: Facet>(&self) -> bool {
        self.facet_holder().contains_do_op_facet::<T>()
    }
}

impl HasFacetHolder for FacetHolder {
    fn facet_holder(&self) -> &FacetHolder {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facetapi::{impl_facet, FacetAttributes};

    #[derive(Debug)]
    struct Label {
        text: &'static str,
        attributes: FacetAttributes,
    }

    #[derive(Debug)]
    struct Width {
        attributes: FacetAttributes,
    }

    impl_facet!(Label, Width);

    fn label(text: &'static str, attributes: FacetAttributes) -> Label {
        Label { text, attributes }
    }

    #[test]
    fn keeps_existing_facet_against_plain_contribution() {
        let mut holder = FacetHolder::new();
        assert!(holder.add_facet(label("first", FacetAttributes::DEFAULT)));
        assert!(!holder.add_facet(label("second", FacetAttributes::DEFAULT)));
        assert_eq!(holder.get_facet::<Label>().map(|l| l.text), Some("first"));
        assert_eq!(holder.facet_count(), 1);
    }

    #[test]
    fn noop_facet_is_replaced_by_any_contribution() {
        let mut holder = FacetHolder::new();
        holder.add_facet(label("fallback", FacetAttributes::DEFAULT.noop()));
        assert!(!holder.contains_do_op_facet::<Label>());
        assert!(holder.add_facet(label("real", FacetAttributes::DEFAULT)));
        assert!(holder.contains_do_op_facet::<Label>());
    }

    #[test]
    fn always_replace_wins_over_do_op_facet() {
        let mut holder = FacetHolder::new();
        holder.add_facet(label("derived", FacetAttributes::DEFAULT.derived()));
        assert!(!holder.contains_do_op_not_derived_facet::<Label>());
        assert!(holder.add_facet(label("explicit", FacetAttributes::DEFAULT.always_replace())));
        assert_eq!(holder.get_facet::<Label>().map(|l| l.text), Some("explicit"));
        assert!(holder.contains_do_op_not_derived_facet::<Label>());
    }

    #[test]
    fn facets_are_keyed_by_type() {
        let mut holder = FacetHolder::new();
        holder.add_facet(label("x", FacetAttributes::DEFAULT));
        holder.add_facet(Width {
            attributes: FacetAttributes::DEFAULT,
        });
        let names: Vec<&str> = holder.facets().iter().map(|f| f.facet_type().name()).collect();
        assert_eq!(names, vec!["Label", "Width"]);
        assert!(holder.remove_facet::<Width>());
        assert!(!holder.contains_facet::<Width>());
    }

    #[test]
    fn add_or_replace_ignores_the_rule() {
        let mut holder = FacetHolder::new();
        holder.add_facet(label("first", FacetAttributes::DEFAULT));
        holder.add_or_replace_facet(label("second", FacetAttributes::DEFAULT));
        assert_eq!(holder.get_facet::<Label>().map(|l| l.text), Some("second"));
    }
}
