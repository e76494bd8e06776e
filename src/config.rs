//! Expansion settings.

use serde::{Deserialize, Serialize};

use crate::combine::ProductOrder;
use crate::diagnostics::ExpandError;
use crate::naming::DEFAULT_NAME_PATTERN;

/// Settings carried by one [`Expander`](crate::expand::Expander).
///
/// ```rust
/// use expander::config::ExpandConfig;
/// use expander::combine::ProductOrder;
/// let config = ExpandConfig::from_json(r#"{ "product_order": "modern" }"#).unwrap();
/// assert_eq!(config.product_order, ProductOrder::Modern);
/// assert_eq!(config.name_pattern, "{base_name}__<{label}>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpandConfig {
    /// Pattern rendered for every generated name.
    pub name_pattern: String,
    pub product_order: ProductOrder,
    /// Hand `label` and `context_targets` to bodies whose signature names
    /// them. Deprecated; off means they are only reachable through the call.
    pub legacy_signature_introspection: bool,
    /// Prefix the host uses to discover tests.
    pub test_prefix: String,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            name_pattern: DEFAULT_NAME_PATTERN.to_string(),
            product_order: ProductOrder::default(),
            legacy_signature_introspection: true,
            test_prefix: "test".to_string(),
        }
    }
}

impl ExpandConfig {
    /// Parses and validates a JSON configuration. Missing fields keep their
    /// defaults.
    pub fn from_json(text: &str) -> Result<Self, ExpandError> {
        let config: Self = serde_json::from_str(text).map_err(|err| ExpandError::InvalidConfig {
            message: err.to_string(),
            source: Some(err),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ExpandError> {
        serde_json::to_string_pretty(self).map_err(|err| ExpandError::InvalidConfig {
            message: err.to_string(),
            source: Some(err),
        })
    }

    pub fn validate(&self) -> Result<(), ExpandError> {
        if self.name_pattern.trim().is_empty() {
            return Err(ExpandError::InvalidConfig {
                message: "name_pattern must not be empty".to_string(),
                source: None,
            });
        }
        if self.test_prefix.is_empty() {
            return Err(ExpandError::InvalidConfig {
                message: "test_prefix must not be empty".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}
