//! Project configuration (`elmcheck.toml`)
//!
//! ```toml
//! [check]
//! source-directories = ["src"]
//! suggestions = true
//! deny-warnings = false
//! ```
//!
//! The file is optional. Without one every setting takes its default.

use crate::error::CheckError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "elmcheck.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub check: CheckConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CheckConfig {
    /// Directories scanned when no paths are given, relative to the
    /// config file
    #[serde(default = "default_source_directories")]
    pub source_directories: Vec<PathBuf>,

    /// Include hint diagnostics
    #[serde(default)]
    pub suggestions: bool,

    /// Warnings fail the run
    #[serde(default)]
    pub deny_warnings: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            source_directories: default_source_directories(),
            suggestions: false,
            deny_warnings: false,
        }
    }
}

fn default_source_directories() -> Vec<PathBuf> {
    vec![PathBuf::from("src")]
}

/// A parsed config plus the directory it was found in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub root: PathBuf,
    pub config: Config,
}

impl LoadedConfig {
    /// Source directories resolved against the config root
    pub fn source_directories(&self) -> Vec<PathBuf> {
        self.config
            .check
            .source_directories
            .iter()
            .map(|dir| self.root.join(dir))
            .collect()
    }
}

impl Config {
    pub fn parse(content: &str, path: &Path) -> Result<Self, CheckError> {
        toml::from_str(content).map_err(|source| CheckError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, CheckError> {
        let content = std::fs::read_to_string(path).map_err(|e| CheckError::io(path, e))?;
        Self::parse(&content, path)
    }

    /// Walk up from `start` to the first directory holding an
    /// `elmcheck.toml`. No file anywhere gives the defaults rooted at
    /// `start` (or its directory, for a file).
    pub fn discover(start: &Path) -> Result<LoadedConfig, CheckError> {
        let first = if start.is_file() {
            start.parent().unwrap_or(start)
        } else {
            start
        };
        for dir in first.ancestors() {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "loading configuration");
                return Ok(LoadedConfig {
                    root: dir.to_path_buf(),
                    config: Self::load(&candidate)?,
                });
            }
        }
        Ok(LoadedConfig {
            root: first.to_path_buf(),
            config: Config::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_for_empty_file() {
        let config = Config::parse("", Path::new("elmcheck.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.check.source_directories, vec![PathBuf::from("src")]);
    }

    #[test]
    fn test_parse_kebab_case_keys() {
        let content = r#"
[check]
source-directories = ["src", "lib"]
suggestions = true
deny-warnings = true
"#;
        let config = Config::parse(content, Path::new("elmcheck.toml")).unwrap();
        assert_eq!(
            config.check,
            CheckConfig {
                source_directories: vec![PathBuf::from("src"), PathBuf::from("lib")],
                suggestions: true,
                deny_warnings: true,
            }
        );
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let outcome = Config::parse("[check]\nsuggestions = \"yes\"\n", Path::new("elmcheck.toml"));
        assert!(matches!(outcome, Err(CheckError::Config { .. })));
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[check]\nsuggestions = true\n").unwrap();
        let nested = dir.path().join("src").join("Page");
        std::fs::create_dir_all(&nested).unwrap();
        let file = nested.join("Home.elm");
        std::fs::write(&file, "module Page.Home exposing (..)\n").unwrap();

        let loaded = Config::discover(&file).unwrap();
        assert_eq!(loaded.root, dir.path());
        assert!(loaded.config.check.suggestions);
        assert_eq!(loaded.source_directories(), vec![dir.path().join("src")]);
    }

    #[test]
    fn test_discover_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::discover(dir.path()).unwrap();
        assert_eq!(loaded.root, dir.path());
        assert_eq!(loaded.config, Config::default());
    }
}
