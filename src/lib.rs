//! Pattern Lab Edition - Engine Wrapper
//!
//! Two entry points share this crate:
//! 1. The dispatcher maps CLI verbs onto engine operations
//! 2. The configurator builds the bundler pipeline and hooks the engine
//!    build onto every compilation

pub mod bundle;
pub mod config;
pub mod copy;
pub mod dispatch;
pub mod engine;
pub mod files;
pub mod hashing;
pub mod hooks;
pub mod host;
pub mod logging;
pub mod merge;

pub use bundle::{
    BaseConfig, BuildEnv, BundleConfig, BundleError, Configurator, Customization,
    FileCustomization,
};
pub use config::{ConfigError, PatternLabConfig, DEFAULT_CONFIG_FILE};
pub use dispatch::{DispatchError, DispatchInputs, Dispatcher, Outcome, Verb};
pub use engine::{settled, BuildFuture, EngineError, ExternalEngine, PatternEngine};
pub use hooks::{BundlerHost, Compilation, Stats};
pub use host::{HostError, LocalHost};
pub use merge::MergeStrategy;

pub const EDITION_VERSION: &str = env!("CARGO_PKG_VERSION");
