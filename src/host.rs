//! Local Host - Drives One Compilation Cycle
//!
//! Emission is limited to the copy rules; script bundling stays with a real
//! bundler. Hooks fire in registration order.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use crate::bundle::BundleConfig;
use crate::copy::CopyError;
use crate::engine::EngineError;
use crate::hashing::compute_compilation_hash;
use crate::hooks::{
    AfterEmitHook, BundlerHost, Compilation, DoneHook, EmittedAsset, HookError, Stats,
};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Copy failed: {0}")]
    Copy(#[from] CopyError),

    #[error("Hook `{hook}` failed: {source}")]
    Hook {
        hook: &'static str,
        source: HookError,
    },

    #[error("Hook `{hook}` failed: {source}")]
    Done {
        hook: &'static str,
        source: EngineError,
    },

    #[error("Failed to hash compilation: {0}")]
    Hash(#[from] serde_json::Error),
}

pub struct LocalHost {
    config: BundleConfig,
    after_emit: Vec<Box<dyn AfterEmitHook>>,
    done: Vec<Box<dyn DoneHook>>,
}

impl LocalHost {
    pub fn new(config: BundleConfig) -> Self {
        Self {
            config,
            after_emit: vec![],
            done: vec![],
        }
    }

    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Emit assets, run `after-emit` hooks, then await each `on-done` hook.
    pub async fn run(&self) -> Result<(Compilation, Stats), HostError> {
        let start_time = Utc::now();
        let mut compilation = Compilation::default();

        for rule in self.config.copy_rules() {
            for file in rule.apply()? {
                compilation.assets.push(EmittedAsset {
                    path: file.destination,
                    hash: file.hash,
                    unchanged: file.unchanged,
                });
            }
        }

        for hook in &self.after_emit {
            hook.after_emit(&mut compilation)
                .map_err(|source| HostError::Hook {
                    hook: hook.name(),
                    source,
                })?;
            debug!(hook = hook.name(), "after-emit hook ran");
        }

        let hashes: Vec<String> = compilation.assets.iter().map(|a| a.hash.clone()).collect();
        let unchanged = compilation.assets.iter().filter(|a| a.unchanged).count();
        let stats = Stats {
            hash: compute_compilation_hash(&self.config, &hashes)?,
            env: self.config.env(),
            start_time,
            end_time: Utc::now(),
            emitted: compilation.assets.len() - unchanged,
            unchanged,
        };

        info!(
            hash = %stats.hash,
            emitted = stats.emitted,
            unchanged = stats.unchanged,
            watched = compilation.file_dependencies.len(),
            duration_ms = stats.duration_ms(),
            "compilation finished"
        );

        for hook in &self.done {
            hook.done(&stats)
                .await
                .map_err(|source| HostError::Done {
                    hook: hook.name(),
                    source,
                })?;
        }

        Ok((compilation, stats))
    }
}

impl BundlerHost for LocalHost {
    fn tap_after_emit(&mut self, hook: Box<dyn AfterEmitHook>) {
        self.after_emit.push(hook);
    }

    fn tap_done(&mut self, hook: Box<dyn DoneHook>) {
        self.done.push(hook);
    }
}
