//! Pattern Lab CLI - Verb Dispatcher
//!
//! Verbs: build, version, help, patternsonly, liststarterkits,
//! loadstarterkit, installplugin. Unknown tokens are ignored.

use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use patternlab_edition::{
    logging, DispatchInputs, Dispatcher, ExternalEngine, PatternLabConfig, DEFAULT_CONFIG_FILE,
    EDITION_VERSION,
};

#[derive(Parser)]
#[command(name = "patternlab")]
#[command(version = EDITION_VERSION)]
#[command(about = "Pattern Lab - engine tasks")]
struct Cli {
    /// Path to the Pattern Lab configuration
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Starter kit to load
    #[arg(long, env = "npm_config_kit")]
    kit: Option<String>,

    /// Clean the public directory when loading a starter kit (true/false)
    #[arg(long, env = "npm_config_clean")]
    clean: Option<String>,

    /// Plugin to install
    #[arg(long, env = "npm_config_plugin")]
    plugin: Option<String>,

    /// Verbs to run, in order
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    verbs: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let config = match PatternLabConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let engine = ExternalEngine::new(&config);
    let inputs = DispatchInputs {
        kit: cli.kit,
        clean: cli.clean,
        plugin: cli.plugin,
    };
    let dispatcher = Dispatcher::new(&config, &engine, inputs);

    match dispatcher.run(&cli.verbs, &mut io::stdout()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
