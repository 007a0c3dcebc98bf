//! Engine configuration
//!
//! Every node on a network must run with the same values here: they
//! decide when proposals pass and which contracts calls are routed through.

use crate::contract::{MIDDLEWARE_METHOD, TEXT_FILTER};
use crate::core::Amount;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Middleware engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// Stake a proposal must accumulate before it executes
    #[serde(with = "crate::core::amount::decimal")]
    pub pass_threshold: Amount,
    /// Method invoked on every middleware contract
    pub entry_point: String,
    /// Registry installed when nothing has been persisted yet
    pub default_middlewares: Vec<String>,
    /// Module name reserved for governance requests
    pub governance_module: String,
    /// Module whose calls are routed through the middleware chain
    pub intercepted_module: String,
    /// Base-store key holding the registry
    pub registry_key: String,
    /// Desc tag written on refund transactions
    pub award_marker: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            pass_threshold: Amount::from(1u32),
            entry_point: MIDDLEWARE_METHOD.to_string(),
            default_middlewares: vec![TEXT_FILTER.to_string()],
            governance_module: "middle".to_string(),
            intercepted_module: "wasm".to_string(),
            registry_key: "middlewares".to_string(),
            award_marker: "1".to_string(),
        }
    }
}

impl MiddlewareConfig {
    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = fs::File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values make sense together
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entry_point.is_empty() {
            return Err(ConfigError::Invalid("entry_point can not be empty".into()));
        }
        if self.registry_key.is_empty() {
            return Err(ConfigError::Invalid("registry_key can not be empty".into()));
        }
        if self.governance_module == self.intercepted_module {
            return Err(ConfigError::Invalid(format!(
                "governance_module and intercepted_module must differ, both are {}",
                self.governance_module
            )));
        }
        let mut seen = std::collections::BTreeSet::new();
        for name in &self.default_middlewares {
            if name.is_empty() || !seen.insert(name) {
                return Err(ConfigError::Invalid(format!(
                    "default_middlewares must be unique and non-empty, got {:?}",
                    self.default_middlewares
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MiddlewareConfig::default();
        assert_eq!(config.pass_threshold, Amount::from(1u32));
        assert_eq!(config.default_middlewares, vec!["text_filter".to_string()]);
        assert_eq!(config.entry_point, "middleware");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("middle.json");
        fs::write(&path, r#"{"pass_threshold": "1000", "intercepted_module": "evm"}"#).unwrap();

        let config = MiddlewareConfig::load(&path).unwrap();
        assert_eq!(config.pass_threshold, Amount::from(1000u32));
        assert_eq!(config.intercepted_module, "evm");
        assert_eq!(config.governance_module, "middle");
    }

    #[test]
    fn test_invalid_config() {
        let config = MiddlewareConfig {
            default_middlewares: vec!["a".into(), "a".into()],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MiddlewareConfig {
            intercepted_module: "middle".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
