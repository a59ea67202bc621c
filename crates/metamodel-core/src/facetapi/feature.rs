use serde::{Deserialize, Serialize};

/// The kind of metamodel feature a facet holder describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureType {
    Object,
    Property,
    Collection,
    Action,
    ActionParameter,
}

impl FeatureType {
    pub const ALL: [FeatureType; 5] = [
        FeatureType::Object,
        FeatureType::Property,
        FeatureType::Collection,
        FeatureType::Action,
        FeatureType::ActionParameter,
    ];

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    pub fn is_member(self) -> bool {
        matches!(
            self,
            FeatureType::Property | FeatureType::Collection | FeatureType::Action
        )
    }

    pub fn is_association(self) -> bool {
        matches!(self, FeatureType::Property | FeatureType::Collection)
    }

    pub fn name(self) -> &'static str {
        match self {
            FeatureType::Object => "object",
            FeatureType::Property => "property",
            FeatureType::Collection => "collection",
            FeatureType::Action => "action",
            FeatureType::ActionParameter => "parameter",
        }
    }
}

/// Set of feature types a factory applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureTypes(u8);

impl FeatureTypes {
    pub const NONE: FeatureTypes = FeatureTypes(0);
    pub const OBJECTS_ONLY: FeatureTypes = FeatureTypes::of(&[FeatureType::Object]);
    pub const PROPERTIES_ONLY: FeatureTypes = FeatureTypes::of(&[FeatureType::Property]);
    pub const COLLECTIONS_ONLY: FeatureTypes = FeatureTypes::of(&[FeatureType::Collection]);
    pub const ACTIONS_ONLY: FeatureTypes = FeatureTypes::of(&[FeatureType::Action]);
    pub const PARAMETERS_ONLY: FeatureTypes = FeatureTypes::of(&[FeatureType::ActionParameter]);
    pub const MEMBERS: FeatureTypes = FeatureTypes::of(&[
        FeatureType::Property,
        FeatureType::Collection,
        FeatureType::Action,
    ]);
    pub const PROPERTIES_AND_ACTIONS: FeatureTypes =
        FeatureTypes::of(&[FeatureType::Property, FeatureType::Action]);
    pub const PROPERTIES_AND_PARAMETERS: FeatureTypes =
        FeatureTypes::of(&[FeatureType::Property, FeatureType::ActionParameter]);
    pub const EVERYTHING_BUT_PARAMETERS: FeatureTypes = FeatureTypes::of(&[
        FeatureType::Object,
        FeatureType::Property,
        FeatureType::Collection,
        FeatureType::Action,
    ]);
    pub const EVERYTHING: FeatureTypes = FeatureTypes::of(&FeatureType::ALL);

    pub const fn of(types: &[FeatureType]) -> Self {
        let mut bits = 0u8;
        let mut i = 0;
        while i < types.len() {
            bits |= types[i].bit();
            i += 1;
        }
        FeatureTypes(bits)
    }

    pub fn contains(self, feature_type: FeatureType) -> bool {
        self.0 & feature_type.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = FeatureType> {
        FeatureType::ALL
            .into_iter()
            .filter(move |ft| self.contains(*ft))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_contain_expected_feature_types() {
        assert!(FeatureTypes::MEMBERS.contains(FeatureType::Collection));
        assert!(!FeatureTypes::MEMBERS.contains(FeatureType::Object));
        assert!(!FeatureTypes::EVERYTHING_BUT_PARAMETERS.contains(FeatureType::ActionParameter));
        assert_eq!(FeatureTypes::EVERYTHING.iter().count(), 5);
        assert!(FeatureTypes::NONE.is_empty());
    }
}
