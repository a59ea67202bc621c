//! Introspection configuration.
//!
//! Mirrors what a deployment would put in its settings file:
//!
//! ```toml
//! policy = "ANNOTATION_REQUIRED"
//! validate-on-create = true
//! parallel-introspection = true
//! value-types = ["Money", "EmailAddress"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MetaModelError, Result};

/// Whether non-public methods may be picked up as members or support methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncapsulationPolicy {
    OnlyPublicMembersSupported,
    EncapsulatedMembersSupported,
}

impl EncapsulationPolicy {
    pub fn is_encapsulated_members_supported(self) -> bool {
        self == EncapsulationPolicy::EncapsulatedMembersSupported
    }
}

/// Whether members (and their support methods) must be annotated to be recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberAnnotationPolicy {
    MemberAnnotationsRequired,
    MemberAnnotationsOptional,
}

impl MemberAnnotationPolicy {
    pub fn is_member_annotations_required(self) -> bool {
        self == MemberAnnotationPolicy::MemberAnnotationsRequired
    }
}

/// How classes are introspected: a combination of encapsulation and member
/// annotation policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntrospectionPolicy {
    /// Public methods are members; annotations refine them.
    #[default]
    AnnotationOptional,
    /// Only annotated public methods are members.
    AnnotationRequired,
    /// Only annotated methods are members, but they may be non-public.
    EncapsulationEnabled,
}

impl IntrospectionPolicy {
    pub fn encapsulation_policy(self) -> EncapsulationPolicy {
        match self {
            IntrospectionPolicy::EncapsulationEnabled => {
                EncapsulationPolicy::EncapsulatedMembersSupported
            }
            _ => EncapsulationPolicy::OnlyPublicMembersSupported,
        }
    }

    pub fn member_annotation_policy(self) -> MemberAnnotationPolicy {
        match self {
            IntrospectionPolicy::AnnotationOptional => {
                MemberAnnotationPolicy::MemberAnnotationsOptional
            }
            _ => MemberAnnotationPolicy::MemberAnnotationsRequired,
        }
    }
}

/// Configuration for the specification loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct IntrospectionConfig {
    /// Policy for classes that don't override it via `@DomainObject(introspection = ...)`.
    pub policy: IntrospectionPolicy,
    /// Run metamodel validation at the end of `create_meta_model`.
    pub validate_on_create: bool,
    /// Introspect registered classes on the rayon pool during `create_meta_model`.
    pub parallel_introspection: bool,
    /// Additional type names treated as built-in value types.
    pub value_types: Vec<String>,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            policy: IntrospectionPolicy::default(),
            validate_on_create: true,
            parallel_introspection: true,
            value_types: Vec::new(),
        }
    }
}

impl IntrospectionConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| MetaModelError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MetaModelError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn with_policy(mut self, policy: IntrospectionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_axes() {
        use IntrospectionPolicy::*;
        assert_eq!(
            AnnotationOptional.encapsulation_policy(),
            EncapsulationPolicy::OnlyPublicMembersSupported
        );
        assert!(!AnnotationOptional
            .member_annotation_policy()
            .is_member_annotations_required());
        assert!(AnnotationRequired
            .member_annotation_policy()
            .is_member_annotations_required());
        assert!(EncapsulationEnabled
            .encapsulation_policy()
            .is_encapsulated_members_supported());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config = IntrospectionConfig::from_toml_str(
            "policy = \"ENCAPSULATION_ENABLED\"\nvalue-types = [\"Money\"]\n",
        )
        .expect("config");
        assert_eq!(config.policy, IntrospectionPolicy::EncapsulationEnabled);
        assert_eq!(config.value_types, vec!["Money".to_string()]);
        assert!(config.validate_on_create);
        assert!(config.parallel_introspection);
    }

    #[test]
    fn rejects_unknown_policy() {
        let err = IntrospectionConfig::from_toml_str("policy = \"WHATEVER\"").unwrap_err();
        assert!(matches!(err, MetaModelError::Config(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("introspection.toml");
        std::fs::write(&path, "validate-on-create = false\n").expect("write");
        let config = IntrospectionConfig::load(&path).expect("load");
        assert!(!config.validate_on_create);
    }
}
