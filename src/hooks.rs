//! Lifecycle Hooks - Watch Registration and Post-Compile Rebuild
//!
//! Hooks are registered explicitly against a [`BundlerHost`]; the host
//! decides when `after-emit` and `on-done` fire.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bundle::BuildEnv;
use crate::config::PatternLabConfig;
use crate::engine::{BuildFuture, PatternEngine};
use crate::files::{glob_set, matching_files};

#[derive(Debug, Error)]
pub enum HookError {
    #[error("Invalid watch pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("Failed to scan watch root: {0}")]
    Walk(#[from] walkdir::Error),
}

/// An asset written during a compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedAsset {
    pub path: PathBuf,
    pub hash: String,
    pub unchanged: bool,
}

/// Mutable state of one compilation, visible to `after-emit` hooks.
#[derive(Debug, Clone, Default)]
pub struct Compilation {
    pub assets: Vec<EmittedAsset>,
    /// Files whose change should trigger a rebuild.
    pub file_dependencies: BTreeSet<PathBuf>,
}

/// Summary handed to `on-done` hooks.
#[derive(Debug, Clone)]
pub struct Stats {
    pub hash: String,
    pub env: BuildEnv,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub emitted: usize,
    pub unchanged: usize,
}

impl Stats {
    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }
}

pub trait AfterEmitHook: Send + Sync {
    fn name(&self) -> &'static str;
    fn after_emit(&self, compilation: &mut Compilation) -> Result<(), HookError>;
}

pub trait DoneHook: Send + Sync {
    fn name(&self) -> &'static str;
    fn done(&self, stats: &Stats) -> BuildFuture;
}

/// Hook points exposed by whatever drives compilations.
pub trait BundlerHost {
    fn tap_after_emit(&mut self, hook: Box<dyn AfterEmitHook>);
    fn tap_done(&mut self, hook: Box<dyn DoneHook>);
}

/// Adds pattern, data and asset files to the watch set after each emit.
pub struct WatchFilesHook {
    roots: Vec<(PathBuf, Vec<String>)>,
}

impl WatchFilesHook {
    pub fn new(config: &PatternLabConfig, template_extensions: &[String]) -> Self {
        let source = &config.paths.source;
        let data_files = || vec!["**/*.{json,md,yaml,yml}".to_string()];
        let everything = || vec!["**/*".to_string()];

        let mut pattern_globs = data_files();
        pattern_globs.extend(template_extensions.iter().map(|ext| format!("**/*{ext}")));

        Self {
            roots: vec![
                (config.resolve(&source.patterns), pattern_globs),
                (config.resolve(&source.data), data_files()),
                (config.resolve(&source.fonts), everything()),
                (config.resolve(&source.images), everything()),
                (config.resolve(&source.meta), everything()),
                (config.resolve(&source.annotations), everything()),
            ],
        }
    }

    /// Every file currently matched by the watch globs.
    pub fn watch_files(&self) -> Result<Vec<PathBuf>, HookError> {
        let mut files = vec![];
        for (root, globs) in &self.roots {
            let set = glob_set(globs, true)?;
            let found = matching_files(root, &set, None)?;
            debug!(root = %root.display(), count = found.len(), "watch root scanned");
            files.extend(found.into_iter().map(|f| absolute(f.path)));
        }
        Ok(files)
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&path))
        .unwrap_or(path)
}

impl AfterEmitHook for WatchFilesHook {
    fn name(&self) -> &'static str {
        "watch_files"
    }

    fn after_emit(&self, compilation: &mut Compilation) -> Result<(), HookError> {
        compilation.file_dependencies.extend(self.watch_files()?);
        Ok(())
    }
}

/// Re-runs the engine build once every compilation finishes.
pub struct RebuildHook {
    engine: Arc<dyn PatternEngine>,
    default_clean: bool,
    args: Vec<String>,
}

impl RebuildHook {
    pub fn new(engine: Arc<dyn PatternEngine>, default_clean: bool, args: Vec<String>) -> Self {
        Self { engine, default_clean, args }
    }

    pub fn clean_public(&self) -> bool {
        clean_public_from_args(&self.args).unwrap_or(self.default_clean)
    }
}

impl DoneHook for RebuildHook {
    fn name(&self) -> &'static str {
        "rebuild"
    }

    fn done(&self, stats: &Stats) -> BuildFuture {
        let clean = self.clean_public();
        info!(hash = %stats.hash, clean_public = clean, "compilation done, rebuilding patterns");
        self.engine.build(clean)
    }
}

/// Value of the last `cleanPublic=<bool>` token in `args`, if any.
///
/// Any token containing `cleanPublic` counts, so `--env.cleanPublic=false`
/// is honoured too. Values that are not `true`/`false` are ignored.
pub fn clean_public_from_args<S: AsRef<str>>(args: &[S]) -> Option<bool> {
    let mut clean = None;
    for arg in args.iter().map(AsRef::as_ref) {
        if !arg.contains("cleanPublic") {
            continue;
        }
        let value = arg.split('=').nth(1).map(str::trim);
        match value.map(|v| serde_json::from_str::<bool>(v)) {
            Some(Ok(parsed)) => clean = Some(parsed),
            _ => warn!(arg, "ignoring malformed cleanPublic argument"),
        }
    }
    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_public_parsing() {
        assert_eq!(clean_public_from_args(&["bundle", "cleanPublic=false"]), Some(false));
        assert_eq!(clean_public_from_args(&["--env.cleanPublic=true"]), Some(true));
        assert_eq!(clean_public_from_args(&["build"]), None);
    }

    #[test]
    fn test_clean_public_malformed_ignored() {
        assert_eq!(clean_public_from_args(&["cleanPublic=maybe"]), None);
        assert_eq!(clean_public_from_args(&["cleanPublic"]), None);
        assert_eq!(
            clean_public_from_args(&["cleanPublic=true", "cleanPublic=nope"]),
            Some(true)
        );
    }
}
