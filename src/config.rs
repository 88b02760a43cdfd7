//! Custom rule files
//!
//! A rule file is a JSON document of the form
//!
//! ```json
//! {
//!   "rules": {
//!     "stationCode": {
//!       "pattern": "^[A-Z]{3}$",
//!       "maxLength": 3,
//!       "required": false,
//!       "sanitize": true,
//!       "description": "Station code"
//!     }
//!   }
//! }
//! ```
//!
//! Entries are registered on top of the built-in table.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::rules::{FieldRuleDescriptor, RuleRegistry};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: BTreeMap<String, FieldRuleDescriptor>,
}

impl RuleSet {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse rule set")
    }

    /// Registers every rule, failing on the first one the registry rejects
    pub fn apply(&self, registry: &RuleRegistry) -> Result<usize> {
        for (field, descriptor) in &self.rules {
            registry
                .try_register_rule(field, descriptor)
                .with_context(|| format!("Invalid rule for field '{}'", field))?;
        }
        Ok(self.rules.len())
    }
}

/// Reads and parses a rule file
pub fn load_rule_set(path: &Path) -> Result<RuleSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rule file: {:?}", path))?;
    let rule_set = RuleSet::from_json(&text)?;
    info!("Loaded {} custom rules from {}", rule_set.rules.len(), path.display());
    Ok(rule_set)
}
