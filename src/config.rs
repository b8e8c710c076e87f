//! Session configuration, loadable from TOML.
//!
//! ```toml
//! max_steps = 5000
//! max_macro_depth = 50
//! strategy = "simple"
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::macros::DEFAULT_MAX_DEPTH;
use crate::reduce::DEFAULT_MAX_STEPS;
use crate::types::checker::TypeChecker;

/// Which unification strategy the type checker runs with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    HindleyMilner,
    Simple,
}

impl StrategyKind {
    pub fn checker(self) -> TypeChecker {
        match self {
            StrategyKind::HindleyMilner => TypeChecker::hindley_milner(),
            StrategyKind::Simple => TypeChecker::simple(),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::HindleyMilner => write!(f, "hindley-milner"),
            StrategyKind::Simple => write!(f, "simple"),
        }
    }
}

/// Configuration for a [`crate::session::Session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Rewrite steps allowed per `reduce`/`normalize` call (default: 1000).
    pub max_steps: usize,
    /// Nested macro re-expansions allowed per node (default: 100).
    pub max_macro_depth: usize,
    pub strategy: StrategyKind,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_macro_depth: DEFAULT_MAX_DEPTH,
            strategy: StrategyKind::default(),
        }
    }
}

impl SessionConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Toml {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { source })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Toml {
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps == 0 {
            return Err(ConfigError::Invalid {
                message: "max_steps must be > 0".into(),
            });
        }
        if self.max_macro_depth == 0 {
            return Err(ConfigError::Invalid {
                message: "max_macro_depth must be > 0".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_engine_constants() {
        let config = SessionConfig::default();
        assert_eq!(config.max_steps, 1000);
        assert_eq!(config.max_macro_depth, 100);
        assert_eq!(config.strategy, StrategyKind::HindleyMilner);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config = SessionConfig::from_toml_str("strategy = \"simple\"").unwrap();
        assert_eq!(config.strategy, StrategyKind::Simple);
        assert_eq!(config.max_steps, 1000);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let err = SessionConfig::from_toml_str("max_steps = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        let err = SessionConfig::from_toml_str("max_macro_depth = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn malformed_toml_reports_parse_error() {
        let err = SessionConfig::from_toml_str("max_steps = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_steps = 42\nstrategy = \"hindley-milner\"").unwrap();
        let config = SessionConfig::load(file.path()).unwrap();
        assert_eq!(config.max_steps, 42);
        assert_eq!(config.strategy, StrategyKind::HindleyMilner);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SessionConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn serialized_config_reloads() {
        let config = SessionConfig {
            max_steps: 7,
            max_macro_depth: 3,
            strategy: StrategyKind::Simple,
        };
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("strategy = \"simple\""));
        assert_eq!(SessionConfig::from_toml_str(&text).unwrap(), config);
    }
}
