//! Pattern Lab Bundle - One Compilation Cycle
//!
//! Builds the merged bundler configuration, copies static assets and
//! rebuilds patterns through the engine. `cleanPublic=<bool>` among the
//! arguments overrides the configured clean flag.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

use patternlab_edition::{
    logging, BuildEnv, Configurator, ExternalEngine, FileCustomization, LocalHost,
    PatternEngine, PatternLabConfig, DEFAULT_CONFIG_FILE, EDITION_VERSION,
};

#[derive(Parser)]
#[command(name = "patternlab-bundle")]
#[command(version = EDITION_VERSION)]
#[command(about = "Pattern Lab - asset bundle and rebuild")]
struct Cli {
    /// Path to the Pattern Lab configuration
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Build environment
    #[arg(short, long, default_value = "development")]
    env: BuildEnv,

    /// Print the merged configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Extra arguments, e.g. cleanPublic=false
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    rest: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let config = match PatternLabConfig::load(&cli.config) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let engine: Arc<dyn PatternEngine> = Arc::new(ExternalEngine::new(&config));
    let configurator = Configurator::new(Arc::clone(&config), engine);
    let customization = FileCustomization::from_config(&config);

    let bundle = match configurator.configure(cli.env, &customization) {
        Ok(b) => b,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.print_config {
        return match serde_json::to_string_pretty(&bundle) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    let mut host = LocalHost::new(bundle);
    configurator.register_hooks(cli.env, &mut host);

    match host.run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
