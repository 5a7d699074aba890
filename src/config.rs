//! Pattern Lab Configuration - Loaded Once, Shared Immutably

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::merge::MergeStrategy;

pub const DEFAULT_CONFIG_FILE: &str = "patternlab-config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternLabConfig {
    #[serde(default = "default_true")]
    pub clean_public: bool,
    #[serde(default = "default_pattern_extension")]
    pub pattern_extension: String,
    pub paths: Paths,
    #[serde(default)]
    pub app: AppConfig,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
    /// Location the config was read from, handed to the engine.
    #[serde(skip)]
    pub source_file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_pattern_extension() -> String {
    "mustache".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub source: SourcePaths,
    pub public: PublicPaths,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePaths {
    pub root: PathBuf,
    pub patterns: PathBuf,
    pub data: PathBuf,
    pub meta: PathBuf,
    pub annotations: PathBuf,
    pub styleguide: PathBuf,
    pub js: PathBuf,
    pub images: PathBuf,
    pub fonts: PathBuf,
    pub css: PathBuf,
    pub app: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicPaths {
    pub root: PathBuf,
    pub patterns: PathBuf,
    pub data: PathBuf,
    pub annotations: PathBuf,
    pub styleguide: PathBuf,
    pub js: PathBuf,
    pub images: PathBuf,
    pub fonts: PathBuf,
    pub css: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Per-key merge strategies, keyed by dotted path (e.g. `module.rules`).
    #[serde(default)]
    pub webpack_merge: BTreeMap<String, MergeStrategy>,
    /// Opaque minimizer options.
    #[serde(default)]
    pub uglify: Value,
    #[serde(default)]
    pub webpack_dev_server: DevServerSettings,
    #[serde(default)]
    pub engine: EngineCommand,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevServerSettings {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub watch_content_base: bool,
    #[serde(default)]
    pub watch_options: Value,
}

fn default_url() -> String {
    "http://localhost".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for DevServerSettings {
    fn default() -> Self {
        Self {
            url: default_url(),
            port: default_port(),
            watch_content_base: true,
            watch_options: Value::Null,
        }
    }
}

/// Command line used to reach the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineCommand {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_program() -> String {
    "patternlab".to_string()
}

impl Default for EngineCommand {
    fn default() -> Self {
        Self { program: default_program(), args: vec![] }
    }
}

impl PatternLabConfig {
    /// Load the configuration from a JSON file.
    ///
    /// Relative paths inside the file are later resolved against the
    /// file's parent directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.source_file = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Resolve a configured path against the config directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Dotted template extensions the engine renders, e.g. `.mustache`.
    pub fn template_extensions(&self) -> Vec<String> {
        let ext = self.pattern_extension.trim_start_matches('.');
        if ext.is_empty() {
            return vec![];
        }
        vec![format!(".{ext}")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "paths": {
            "source": {
                "root": "./source/",
                "patterns": "./source/_patterns/",
                "data": "./source/_data/",
                "meta": "./source/_meta/",
                "annotations": "./source/_annotations/",
                "styleguide": "./styleguide/",
                "js": "./source/js/",
                "images": "./source/images/",
                "fonts": "./source/fonts/",
                "css": "./source/css/",
                "app": "./source/_app/"
            },
            "public": {
                "root": "./public/",
                "patterns": "./public/patterns/",
                "data": "./public/styleguide/data/",
                "annotations": "./public/annotations/",
                "styleguide": "./public/styleguide/",
                "js": "./public/js/",
                "images": "./public/images/",
                "fonts": "./public/fonts/",
                "css": "./public/css/"
            }
        }
    }"#;

    #[test]
    fn test_defaults_applied() {
        let config = PatternLabConfig::from_json(MINIMAL).unwrap();
        assert!(config.clean_public);
        assert_eq!(config.pattern_extension, "mustache");
        assert_eq!(config.app.webpack_dev_server.port, 3000);
        assert_eq!(config.app.engine.program, "patternlab");
        assert!(config.app.webpack_merge.is_empty());
    }

    #[test]
    fn test_template_extensions_dotted() {
        let mut config = PatternLabConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.template_extensions(), vec![".mustache"]);
        config.pattern_extension = ".hbs".into();
        assert_eq!(config.template_extensions(), vec![".hbs"]);
    }

    #[test]
    fn test_resolve_relative_to_base() {
        let config = PatternLabConfig::from_json(MINIMAL)
            .unwrap()
            .with_base_dir("/srv/site");
        assert_eq!(
            config.resolve(&config.paths.public.root),
            PathBuf::from("/srv/site/./public/")
        );
        assert_eq!(config.resolve(Path::new("/abs")), PathBuf::from("/abs"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = PatternLabConfig::load(Path::new("/nonexistent/patternlab-config.json"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
