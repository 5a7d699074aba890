//! Bundler Configuration - Base Pipeline, Overrides, Hook Registration

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::PatternLabConfig;
use crate::copy::CopyRule;
use crate::engine::PatternEngine;
use crate::files::{glob_set, matching_files};
use crate::hooks::{BundlerHost, RebuildHook, WatchFilesHook};
use crate::merge::merge_with_strategy;

pub const SOURCE_BUNDLE: &str = "js/pl-source";
pub const VENDOR_BUNDLE: &str = "js/pl-source-vendor";
pub const CUSTOMIZATION_FILE: &str = "webpack.app";

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("Invalid entry pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("Failed to scan {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("Failed to read override {path}: {source}")]
    OverrideRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid override {path}: {source}")]
    OverrideParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Override {0} must be a JSON object")]
    OverrideShape(PathBuf),

    #[error("Invalid copy rules in merged configuration: {0}")]
    Merge(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildEnv {
    Development,
    Production,
}

impl BuildEnv {
    pub fn is_development(&self) -> bool {
        *self == BuildEnv::Development
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildEnv::Development => "development",
            BuildEnv::Production => "production",
        }
    }
}

impl fmt::Display for BuildEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" | "dev" => Ok(BuildEnv::Development),
            "production" | "prod" => Ok(BuildEnv::Production),
            other => Err(format!("unknown build environment: {other}")),
        }
    }
}

/// Base configuration, before any overrides are merged in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BaseConfig {
    pub mode: BuildEnv,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devtool: Option<String>,
    pub context: PathBuf,
    pub node: BTreeMap<String, String>,
    pub entry: BTreeMap<String, Vec<PathBuf>>,
    pub output: Output,
    pub optimization: Optimization,
    #[serde(default)]
    pub plugins: Vec<String>,
    #[serde(default)]
    pub copy: Vec<CopyRule>,
    pub dev_server: DevServer,
    #[serde(default)]
    pub module: ModuleConfig,
}

/// Merged configuration consumed by the bundler host.
///
/// Overrides may reshape any key, so the merged tree is kept as JSON. Only
/// the copy rules are read back into types, because the host executes them.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleConfig {
    env: BuildEnv,
    copy: Vec<CopyRule>,
    value: Value,
}

impl BundleConfig {
    pub fn from_value(env: BuildEnv, value: Value) -> Result<Self, BundleError> {
        let copy = match value.get("copy") {
            Some(rules) => serde_json::from_value(rules.clone())?,
            None => vec![],
        };
        Ok(Self { env, copy, value })
    }

    pub fn env(&self) -> BuildEnv {
        self.env
    }

    pub fn copy_rules(&self) -> &[CopyRule] {
        &self.copy
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Look up a value by JSON pointer, e.g. `/output/publicPath`.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.value.pointer(pointer)
    }
}

impl Serialize for BundleConfig {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Output {
    pub path: PathBuf,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Optimization {
    #[serde(default)]
    pub minimize: bool,
    #[serde(default)]
    pub minimizer: Value,
    #[serde(default)]
    pub split_chunks: SplitChunks,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SplitChunks {
    #[serde(default)]
    pub cache_groups: BTreeMap<String, CacheGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheGroup {
    pub test: String,
    pub chunks: String,
    pub name: String,
    pub priority: i32,
    pub enforce: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DevServer {
    pub content_base: PathBuf,
    pub public_path: String,
    pub port: u16,
    pub open: bool,
    pub hot: bool,
    pub watch_content_base: bool,
    #[serde(default)]
    pub watch_options: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModuleConfig {
    #[serde(default)]
    pub rules: Vec<ModuleRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleRule {
    pub test: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
    #[serde(rename = "use")]
    pub uses: Vec<LoaderUse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoaderUse {
    pub loader: String,
    #[serde(default)]
    pub options: Value,
}

/// Source of override configuration layered over the base.
pub trait Customization {
    /// Override layers, applied in order. Each must be a JSON object.
    fn overrides(&self, env: BuildEnv) -> Result<Vec<Value>, BundleError>;
}

/// Overrides read from `<source.app>/webpack.app.json` and
/// `<source.app>/webpack.app.<env>.json`. Missing files contribute nothing.
#[derive(Debug, Clone)]
pub struct FileCustomization {
    dir: PathBuf,
}

impl FileCustomization {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &PatternLabConfig) -> Self {
        Self::new(config.resolve(&config.paths.source.app))
    }

    fn read(&self, name: &str) -> Result<Option<Value>, BundleError> {
        let path = self.dir.join(name);
        if !path.is_file() {
            debug!(path = %path.display(), "no override file");
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|source| BundleError::OverrideRead {
            path: path.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|source| {
            BundleError::OverrideParse {
                path: path.clone(),
                source,
            }
        })?;
        if !value.is_object() {
            return Err(BundleError::OverrideShape(path));
        }
        Ok(Some(value))
    }
}

impl Customization for FileCustomization {
    fn overrides(&self, env: BuildEnv) -> Result<Vec<Value>, BundleError> {
        let project = self.read(&format!("{CUSTOMIZATION_FILE}.json"))?;
        let environment = self.read(&format!("{CUSTOMIZATION_FILE}.{env}.json"))?;
        Ok(project.into_iter().chain(environment).collect())
    }
}

/// No overrides at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCustomization;

impl Customization for NoCustomization {
    fn overrides(&self, _env: BuildEnv) -> Result<Vec<Value>, BundleError> {
        Ok(vec![])
    }
}

/// Builds the bundler configuration and wires the engine into the host.
pub struct Configurator {
    config: Arc<PatternLabConfig>,
    engine: Arc<dyn PatternEngine>,
    args: Vec<String>,
}

impl Configurator {
    /// Raw process arguments are captured for the `cleanPublic=` override.
    pub fn new(config: Arc<PatternLabConfig>, engine: Arc<dyn PatternEngine>) -> Self {
        Self {
            config,
            engine,
            args: std::env::args().collect(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Base configuration before any overrides.
    pub fn base_config(&self, env: BuildEnv) -> Result<BaseConfig, BundleError> {
        let config = &self.config;
        let paths = &config.paths;
        let server = &config.app.webpack_dev_server;

        let mut entry = BTreeMap::new();
        entry.insert(SOURCE_BUNDLE.to_string(), self.source_scripts()?);

        let mut cache_groups = BTreeMap::new();
        cache_groups.insert(
            "vendor".to_string(),
            CacheGroup {
                test: "node_modules".to_string(),
                chunks: "initial".to_string(),
                name: VENDOR_BUNDLE.to_string(),
                priority: 10,
                enforce: true,
            },
        );

        let plugins = if env.is_development() {
            vec![
                "HotModuleReplacementPlugin".to_string(),
                "NamedModulesPlugin".to_string(),
            ]
        } else {
            vec![]
        };

        let mut node = BTreeMap::new();
        node.insert("fs".to_string(), "empty".to_string());

        Ok(BaseConfig {
            mode: env,
            devtool: env.is_development().then(|| "source-map".to_string()),
            context: config.resolve(&paths.source.root),
            node,
            entry,
            output: Output {
                path: config.resolve(&paths.public.root),
                filename: "[name].js".to_string(),
            },
            optimization: Optimization {
                minimize: !env.is_development(),
                minimizer: config.app.uglify.clone(),
                split_chunks: SplitChunks { cache_groups },
            },
            plugins,
            copy: self.copy_rules(),
            dev_server: DevServer {
                content_base: config.resolve(&paths.public.root),
                public_path: format!("{}:{}", server.url, server.port),
                port: server.port,
                open: true,
                hot: true,
                watch_content_base: server.watch_content_base,
                watch_options: server.watch_options.clone(),
            },
            module: ModuleConfig {
                rules: vec![ModuleRule {
                    test: r"\.js$".to_string(),
                    exclude: Some("(node_modules|bower_components)".to_string()),
                    uses: vec![LoaderUse {
                        loader: "babel-loader".to_string(),
                        options: json!({ "cacheDirectory": true }),
                    }],
                }],
            },
        })
    }

    /// Base configuration with every override layer merged in.
    pub fn configure(
        &self,
        env: BuildEnv,
        customization: &dyn Customization,
    ) -> Result<BundleConfig, BundleError> {
        let mut merged = serde_json::to_value(self.base_config(env)?)?;
        let strategies = &self.config.app.webpack_merge;

        let layers = customization.overrides(env)?;
        info!(%env, layers = layers.len(), "merging bundle configuration");
        for layer in layers {
            merged = merge_with_strategy(merged, layer, strategies);
        }

        BundleConfig::from_value(env, merged)
    }

    /// Register the lifecycle hooks: watch files in development, rebuild
    /// through the engine after every compilation.
    pub fn register_hooks(&self, env: BuildEnv, host: &mut dyn BundlerHost) {
        if env.is_development() {
            let extensions = self.engine.supported_template_extensions();
            host.tap_after_emit(Box::new(WatchFilesHook::new(&self.config, &extensions)));
        }
        host.tap_done(Box::new(RebuildHook::new(
            Arc::clone(&self.engine),
            self.config.clean_public,
            self.args.clone(),
        )));
    }

    fn source_scripts(&self) -> Result<Vec<PathBuf>, BundleError> {
        let root = self.config.resolve(&self.config.paths.source.js);
        let include = glob_set(&["**/*.js"], true)?;
        let exclude = glob_set(&["**/*.test.js"], true)?;
        let found = matching_files(&root, &include, Some(&exclude)).map_err(|source| {
            BundleError::Walk {
                path: root.clone(),
                source,
            }
        })?;
        Ok(found.into_iter().map(|f| f.path).collect())
    }

    fn copy_rules(&self) -> Vec<CopyRule> {
        let config = &self.config;
        let source = &config.paths.source;
        let public = &config.paths.public;
        let at = |p: &Path| config.resolve(p);

        vec![
            CopyRule::new(at(&source.images), "./**/*.*", at(&public.images)),
            CopyRule::new(at(&source.root), "./*.ico", at(&public.root)),
            CopyRule::new(at(&source.fonts), "./*", at(&public.fonts)),
            CopyRule::new(at(&source.css), "./*.css", at(&public.css)),
            CopyRule::new(at(&source.styleguide), "./**/*", at(&public.root)).ignoring("*.css"),
            CopyRule::new(at(&source.styleguide), "./**/*.css", at(&public.styleguide).join("css"))
                .flattened(),
        ]
    }
}
