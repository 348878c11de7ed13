//! Resolver configuration.

use serde::Deserialize;

/// How a synthesized many-to-many inverse property is named.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InverseNaming {
    /// `<declaringEntity lower-first>_<property>`, e.g. `tag_posts`.
    EntityAndProperty,
    /// `<property><suffix>`, e.g. `posts_inverse`.
    Suffix(String),
}

impl Default for InverseNaming {
    fn default() -> Self {
        InverseNaming::EntityAndProperty
    }
}

impl InverseNaming {
    /// Name of the inverse synthesized for `entity.property`.
    pub fn inverse_name(&self, entity: &str, property: &str) -> String {
        match self {
            InverseNaming::EntityAndProperty => {
                let mut chars = entity.chars();
                let head = match chars.next() {
                    Some(c) => c.to_lowercase().collect::<String>(),
                    None => String::new(),
                };
                format!("{head}{}_{property}", chars.as_str())
            }
            InverseNaming::Suffix(suffix) => format!("{property}{suffix}"),
        }
    }
}

/// Configuration for metadata resolution.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Require a primary key on every table-backed entity.
    pub require_primary_key: bool,

    /// Synthesize an inverse collection for unilateral many-to-many relations.
    pub synthesize_many_to_many_inverse: bool,

    /// Naming of synthesized inverse properties.
    pub inverse_naming: InverseNaming,

    /// Maximum number of nested deferred references chased for one target.
    pub max_thunk_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            require_primary_key: true,
            synthesize_many_to_many_inverse: true,
            inverse_naming: InverseNaming::default(),
            max_thunk_depth: 32,
        }
    }
}

impl ResolverConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Permissive configuration: primary keys are not enforced.
    pub fn lenient() -> Self {
        Self {
            require_primary_key: false,
            ..Default::default()
        }
    }

    /// Set whether primary keys are enforced.
    pub fn require_primary_key(mut self, require: bool) -> Self {
        self.require_primary_key = require;
        self
    }

    /// Set whether unilateral many-to-many relations get a synthesized inverse.
    pub fn synthesize_many_to_many_inverse(mut self, synthesize: bool) -> Self {
        self.synthesize_many_to_many_inverse = synthesize;
        self
    }

    /// Set the inverse naming strategy.
    pub fn inverse_naming(mut self, naming: InverseNaming) -> Self {
        self.inverse_naming = naming;
        self
    }

    /// Set the maximum deferred reference depth.
    pub fn max_thunk_depth(mut self, depth: usize) -> Self {
        self.max_thunk_depth = depth.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert!(config.require_primary_key);
        assert!(config.synthesize_many_to_many_inverse);
        assert_eq!(config.inverse_naming, InverseNaming::EntityAndProperty);
        assert_eq!(config.max_thunk_depth, 32);
    }

    #[test]
    fn test_inverse_naming() {
        assert_eq!(
            InverseNaming::EntityAndProperty.inverse_name("Tag", "posts"),
            "tag_posts"
        );
        assert_eq!(
            InverseNaming::EntityAndProperty.inverse_name("BlogPost", "tags"),
            "blogPost_tags"
        );
        assert_eq!(
            InverseNaming::Suffix("Inverse".to_string()).inverse_name("Tag", "posts"),
            "postsInverse"
        );
    }

    #[test]
    fn test_config_from_json() {
        let config: ResolverConfig = serde_json::from_str(
            r#"{ "require_primary_key": false, "inverse_naming": { "suffix": "_inv" } }"#,
        )
        .unwrap();

        assert!(!config.require_primary_key);
        assert!(config.synthesize_many_to_many_inverse);
        assert_eq!(config.inverse_naming, InverseNaming::Suffix("_inv".to_string()));
    }

    #[test]
    fn test_builder_setters() {
        let config = ResolverConfig::lenient()
            .synthesize_many_to_many_inverse(false)
            .max_thunk_depth(0);

        assert!(!config.require_primary_key);
        assert!(!config.synthesize_many_to_many_inverse);
        assert_eq!(config.max_thunk_depth, 1);
    }
}
