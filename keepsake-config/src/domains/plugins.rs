//! Plugin registry configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};

/// Plugin registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Reuse one instance per plugin name instead of building a fresh one
    #[serde(default = "crate::domains::utils::default_false")]
    pub shared_by_default: bool,

    /// Extra alias spellings, mapped to a registered plugin name
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl Validatable for PluginsConfig {
    fn validate(&self) -> ConfigResult<()> {
        for (alias, target) in &self.aliases {
            validate_required_string(alias, "aliases key", self.domain_name())?;
            validate_required_string(target, "aliases value", self.domain_name())?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "plugins"
    }
}
