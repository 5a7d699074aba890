//! Engine Seam - Every Pattern Lab Operation Goes Through Here
//!
//! The engine is external. `build` may finish later than it returns, so it
//! always hands back a future; synchronous engines return a ready one.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::debug;

use crate::config::{EngineCommand, PatternLabConfig};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to start engine `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Engine operation `{operation}` failed with {status}")]
    CommandFailed {
        operation: &'static str,
        status: ExitStatus,
    },

    #[error("Engine error: {0}")]
    Other(String),
}

/// Deferred result of an engine build.
pub type BuildFuture = Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send>>;

/// Wrap a synchronous result as an already-settled build.
pub fn settled(result: Result<(), EngineError>) -> BuildFuture {
    Box::pin(std::future::ready(result))
}

/// Operations the wrapper forwards to the pattern library engine.
pub trait PatternEngine: Send + Sync {
    fn build(&self, clean_public: bool) -> BuildFuture;
    fn version(&self) -> Result<(), EngineError>;
    fn help(&self) -> Result<(), EngineError>;
    fn patterns_only(&self, clean_public: bool) -> Result<(), EngineError>;
    fn list_starterkits(&self) -> Result<(), EngineError>;
    fn load_starterkit(&self, kit: &str, clean: bool) -> Result<(), EngineError>;
    fn install_plugin(&self, plugin: &str) -> Result<(), EngineError>;

    /// Dotted extensions of the templates the engine renders.
    fn supported_template_extensions(&self) -> Vec<String>;
}

/// Engine reached through its command line bridge.
///
/// Invocations take the form `<program> [args] <operation> --config <path> [flags]`
/// with stdio inherited, so engine output lands on the user's terminal.
#[derive(Debug, Clone)]
pub struct ExternalEngine {
    command: EngineCommand,
    config_file: Option<PathBuf>,
    template_extensions: Vec<String>,
}

impl ExternalEngine {
    pub fn new(config: &PatternLabConfig) -> Self {
        Self {
            command: config.app.engine.clone(),
            config_file: config.source_file.clone(),
            template_extensions: config.template_extensions(),
        }
    }

    fn arguments(&self, operation: &str, flags: &[String]) -> Vec<String> {
        let mut args = self.command.args.clone();
        args.push(operation.to_string());
        if let Some(path) = &self.config_file {
            args.push("--config".to_string());
            args.push(path.display().to_string());
        }
        args.extend(flags.iter().cloned());
        args
    }

    fn run(&self, operation: &'static str, flags: &[String]) -> Result<(), EngineError> {
        let args = self.arguments(operation, flags);
        debug!(program = %self.command.program, ?args, "running engine operation");

        let status = Command::new(&self.command.program)
            .args(&args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| EngineError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        check_status(operation, status)
    }
}

fn check_status(operation: &'static str, status: ExitStatus) -> Result<(), EngineError> {
    if status.success() {
        Ok(())
    } else {
        Err(EngineError::CommandFailed { operation, status })
    }
}

fn clean_flag(clean: bool) -> Vec<String> {
    if clean {
        vec!["--clean".to_string()]
    } else {
        vec![]
    }
}

impl PatternEngine for ExternalEngine {
    fn build(&self, clean_public: bool) -> BuildFuture {
        let program = self.command.program.clone();
        let args = self.arguments("build", &clean_flag(clean_public));
        debug!(%program, ?args, "starting engine build");

        Box::pin(async move {
            let status = tokio::process::Command::new(&program)
                .args(&args)
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .await
                .map_err(|source| EngineError::Spawn { program, source })?;
            check_status("build", status)
        })
    }

    fn version(&self) -> Result<(), EngineError> {
        self.run("version", &[])
    }

    fn help(&self) -> Result<(), EngineError> {
        self.run("help", &[])
    }

    fn patterns_only(&self, clean_public: bool) -> Result<(), EngineError> {
        self.run("patternsonly", &clean_flag(clean_public))
    }

    fn list_starterkits(&self) -> Result<(), EngineError> {
        self.run("liststarterkits", &[])
    }

    fn load_starterkit(&self, kit: &str, clean: bool) -> Result<(), EngineError> {
        let mut flags = vec!["--kit".to_string(), kit.to_string()];
        flags.extend(clean_flag(clean));
        self.run("loadstarterkit", &flags)
    }

    fn install_plugin(&self, plugin: &str) -> Result<(), EngineError> {
        self.run("installplugin", &["--plugin".to_string(), plugin.to_string()])
    }

    fn supported_template_extensions(&self) -> Vec<String> {
        self.template_extensions.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(program: &str) -> ExternalEngine {
        ExternalEngine {
            command: EngineCommand {
                program: program.to_string(),
                args: vec!["node_modules/.bin/pl".to_string()],
            },
            config_file: Some(PathBuf::from("patternlab-config.json")),
            template_extensions: vec![".mustache".to_string()],
        }
    }

    #[test]
    fn test_arguments_layout() {
        let args = engine("node").arguments("loadstarterkit", &["--kit".into(), "base".into()]);
        assert_eq!(
            args,
            vec![
                "node_modules/.bin/pl",
                "loadstarterkit",
                "--config",
                "patternlab-config.json",
                "--kit",
                "base"
            ]
        );
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = engine("definitely-not-a-real-engine-binary").version().unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_settled_future_resolves() {
        assert!(settled(Ok(())).await.is_ok());
        let err = settled(Err(EngineError::Other("boom".into()))).await.unwrap_err();
        assert_eq!(err.to_string(), "Engine error: boom");
    }
}
