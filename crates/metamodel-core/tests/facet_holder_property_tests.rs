//! Property tests for the facet holder's replacement rule.

use std::any::Any;

use metamodel_core::facetapi::FacetType;
use metamodel_core::{Facet, FacetAttributes, FacetHolder};
use proptest::prelude::*;

#[derive(Debug)]
struct Tag {
    value: u8,
    attributes: FacetAttributes,
}

impl Facet for Tag {
    fn attributes(&self) -> FacetAttributes {
        self.attributes
    }

    fn facet_type(&self) -> FacetType {
        FacetType::of::<Self>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn attributes() -> impl Strategy<Value = FacetAttributes> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(derived, noop, always_replace)| {
        FacetAttributes {
            derived,
            noop,
            always_replace,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn non_replacing_contribution_never_displaces_a_do_op_facet(
        first in attributes().prop_filter("do-op", |a| !a.noop),
        second in attributes().prop_filter("non-replacing", |a| !a.always_replace),
        first_value in any::<u8>(),
        second_value in any::<u8>(),
    ) {
        let mut holder = FacetHolder::new();
        let installed = holder.add_facet(Tag { value: first_value, attributes: first });
        prop_assert!(installed);
        let replaced = holder.add_facet(Tag { value: second_value, attributes: second });
        prop_assert!(!replaced);

        let held = holder.get_facet::<Tag>().expect("tag");
        prop_assert_eq!(held.value, first_value);
        prop_assert_eq!(held.attributes, first);
        prop_assert_eq!(holder.facet_count(), 1);
    }

    #[test]
    fn last_contribution_wins_exactly_when_the_rule_allows(
        contributions in prop::collection::vec((any::<u8>(), attributes()), 1..12),
    ) {
        let mut holder = FacetHolder::new();
        let mut expected: Option<(u8, FacetAttributes)> = None;
        for (value, attributes) in &contributions {
            let replaces = match expected {
                None => true,
                Some((_, held)) => attributes.always_replace || held.noop,
            };
            let added = holder.add_facet(Tag { value: *value, attributes: *attributes });
            prop_assert_eq!(added, replaces);
            if replaces {
                expected = Some((*value, *attributes));
            }
        }
        let (value, attributes) = expected.expect("first contribution is always held");
        let held = holder.get_facet::<Tag>().expect("tag");
        prop_assert_eq!(held.value, value);
        prop_assert_eq!(held.attributes, attributes);
        prop_assert_eq!(holder.contains_do_op_facet::<Tag>(), !attributes.noop);
    }
}
