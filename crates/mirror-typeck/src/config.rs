//! Inference configuration.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Knobs for a single compilation unit's inference run.
///
/// Loaded from a TOML document; every key is optional.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TyperConfig {
    /// Settling passes before the driver reports non-terminating inference.
    pub max_passes: usize,
    /// Observer notifications processed in one propagation before the
    /// dependency graph is declared cyclic.
    pub max_propagation_steps: usize,
    /// Packages every scope sees after `add_default_imports`.
    pub default_imports: Vec<String>,
    /// A call to a void method evaluates to its receiver.
    pub void_returns_receiver: bool,
}

impl Default for TyperConfig {
    fn default() -> Self {
        TyperConfig {
            max_passes: 64,
            max_propagation_steps: 1_000_000,
            default_imports: vec!["java.lang".to_string()],
            void_returns_receiver: true,
        }
    }
}

impl TyperConfig {
    pub fn from_toml_str(content: &str) -> Result<TyperConfig, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    pub fn from_file(path: &Path) -> Result<TyperConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => write!(f, "failed to read {}: {}", path.display(), source),
            ConfigError::Parse(e) => write!(f, "failed to parse typer config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = TyperConfig::from_toml_str("").unwrap();
        assert_eq!(config, TyperConfig::default());
    }

    #[test]
    fn overrides_selected_keys() {
        let config = TyperConfig::from_toml_str(
            "max_passes = 4\ndefault_imports = [\"java.lang\", \"java.util\"]\n",
        )
        .unwrap();
        assert_eq!(config.max_passes, 4);
        assert_eq!(config.default_imports, vec!["java.lang", "java.util"]);
        assert!(config.void_returns_receiver);
    }

    #[test]
    fn rejects_wrong_types() {
        let err = TyperConfig::from_toml_str("max_passes = \"many\"").unwrap_err();
        assert!(err.to_string().starts_with("failed to parse typer config"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = TyperConfig::from_file(Path::new("/nonexistent/typer.toml")).unwrap_err();
        match &err {
            ConfigError::Io { path, source } => {
                assert_eq!(path, Path::new("/nonexistent/typer.toml"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected an io error, got {:?}", other),
        }
        assert!(std::error::Error::source(&err).is_some());
    }
}
