use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MetaModelError;

/// Stable identifier of an entity, view model, value or service instance.
///
/// Text form is `<logical type name>:<identifier>`; the identifier may itself
/// contain `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bookmark {
    logical_type_name: String,
    identifier: String,
}

impl Bookmark {
    pub fn new(logical_type_name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            logical_type_name: logical_type_name.into(),
            identifier: identifier.into(),
        }
    }

    pub fn logical_type_name(&self) -> &str {
        &self.logical_type_name
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Display for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.logical_type_name, self.identifier)
    }
}

impl FromStr for Bookmark {
    type Err = MetaModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((ltn, id)) if !ltn.trim().is_empty() && !id.is_empty() => Ok(Bookmark::new(ltn, id)),
            _ => Err(MetaModelError::illegal_argument(format!(
                "`{s}` is not a bookmark (expected `<logical type>:<id>`)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identifier_keeps_colons() {
        let bookmark: Bookmark = "crm.Customer:{\"a\":1}".parse().expect("parse");
        assert_eq!(bookmark.logical_type_name(), "crm.Customer");
        assert_eq!(bookmark.identifier(), "{\"a\":1}");
    }

    #[test]
    fn rejects_missing_parts() {
        for text in ["", "crm.Customer", ":42", "crm.Customer:"] {
            let err = text.parse::<Bookmark>().unwrap_err();
            assert!(err.is_illegal_argument(), "{text}");
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn text_form_round_trips(
            ltn in "[a-z][a-z0-9]{0,6}(\\.[A-Z][a-zA-Z0-9]{0,8})?",
            id in "[ -~]{1,24}",
        ) {
            let bookmark = Bookmark::new(ltn, id);
            let parsed: Bookmark = bookmark.to_string().parse().expect("parse");
            prop_assert_eq!(parsed, bookmark);
        }
    }
}
