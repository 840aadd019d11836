//! Class cache pattern configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::{validate_names, Validatable};

/// Which methods of the wrapped target get their results cached.
///
/// With `cache_by_default` set, every method is cached except those in
/// `class_non_cache_methods`. Without it, only the methods in
/// `class_cache_methods` are cached. The list that does not apply to the
/// current mode is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Cache every method unless it is listed as non-cacheable
    #[serde(default = "crate::domains::utils::default_true")]
    pub cache_by_default: bool,

    /// Methods cached when `cache_by_default` is false
    #[serde(default)]
    pub class_cache_methods: Vec<String>,

    /// Methods never cached when `cache_by_default` is true
    #[serde(default)]
    pub class_non_cache_methods: Vec<String>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            cache_by_default: true,
            class_cache_methods: Vec::new(),
            class_non_cache_methods: Vec::new(),
        }
    }
}

impl Validatable for PatternConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_names(&self.class_cache_methods, "class_cache_methods", self.domain_name())?;
        validate_names(
            &self.class_non_cache_methods,
            "class_non_cache_methods",
            self.domain_name(),
        )?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "pattern"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_defaults() {
        let config = PatternConfig::default();
        assert!(config.cache_by_default);
        assert!(config.class_cache_methods.is_empty());
        assert!(config.class_non_cache_methods.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlapping_lists_are_accepted() {
        let config = PatternConfig {
            cache_by_default: false,
            class_cache_methods: vec!["lookup".to_string()],
            class_non_cache_methods: vec!["lookup".to_string()],
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_method_name_rejected() {
        let config = PatternConfig {
            class_non_cache_methods: vec![String::new()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
