//! CLI Dispatcher - One Verb, One Engine Call
//!
//! Tokens are scanned in order; anything that is not a verb is ignored.

use std::io::Write;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::PatternLabConfig;
use crate::engine::{EngineError, PatternEngine};

pub const NO_KIT_MESSAGE: &str = "====[ Pattern Lab Error: No Valid Kit Found ]====";
pub const NO_PLUGIN_MESSAGE: &str = "====[ Pattern Lab Error: No Valid Plugin Found ]====";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Failed to write diagnostic: {0}")]
    Output(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Build,
    Version,
    Help,
    PatternsOnly,
    ListStarterkits,
    LoadStarterkit,
    InstallPlugin,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Build => "build",
            Verb::Version => "version",
            Verb::Help => "help",
            Verb::PatternsOnly => "patternsonly",
            Verb::ListStarterkits => "liststarterkits",
            Verb::LoadStarterkit => "loadstarterkit",
            Verb::InstallPlugin => "installplugin",
        }
    }
}

impl FromStr for Verb {
    type Err = ();

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "build" => Ok(Verb::Build),
            "version" => Ok(Verb::Version),
            "help" => Ok(Verb::Help),
            "patternsonly" => Ok(Verb::PatternsOnly),
            "liststarterkits" => Ok(Verb::ListStarterkits),
            "loadstarterkit" => Ok(Verb::LoadStarterkit),
            "installplugin" => Ok(Verb::InstallPlugin),
            _ => Err(()),
        }
    }
}

/// Values npm passes through the environment (`npm_config_*`).
#[derive(Debug, Clone, Default)]
pub struct DispatchInputs {
    pub kit: Option<String>,
    /// Raw `npm_config_clean`; see [`DispatchInputs::clean`].
    pub clean: Option<String>,
    pub plugin: Option<String>,
}

impl DispatchInputs {
    fn kit(&self) -> Option<&str> {
        self.kit.as_deref().filter(|k| !k.is_empty())
    }

    fn plugin(&self) -> Option<&str> {
        self.plugin.as_deref().filter(|p| !p.is_empty())
    }

    /// Clean flag for `loadstarterkit`. Unset, empty and unrecognized values
    /// are all `false`, so a stray value never blocks the other verbs.
    pub fn clean(&self) -> bool {
        let Some(raw) = self.clean.as_deref() else {
            return false;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" | "on" => true,
            "false" | "0" | "no" | "n" | "off" | "" => false,
            _ => {
                warn!(value = raw, "unrecognized clean flag, using false");
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Invoked(Verb),
    MissingInput(Verb),
}

pub struct Dispatcher<'a> {
    config: &'a PatternLabConfig,
    engine: &'a dyn PatternEngine,
    inputs: DispatchInputs,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        config: &'a PatternLabConfig,
        engine: &'a dyn PatternEngine,
        inputs: DispatchInputs,
    ) -> Self {
        Self {
            config,
            engine,
            inputs,
        }
    }

    /// Dispatch every recognized verb in `tokens`, in order.
    ///
    /// Diagnostics for missing inputs go to `out`. The first engine failure
    /// stops dispatch and is returned.
    pub async fn run<S, W>(&self, tokens: &[S], out: &mut W) -> Result<Vec<Outcome>, DispatchError>
    where
        S: AsRef<str>,
        W: Write,
    {
        let mut outcomes = vec![];

        for verb in tokens.iter().filter_map(|t| t.as_ref().parse::<Verb>().ok()) {
            info!(verb = verb.as_str(), "dispatching");
            let outcome = match verb {
                Verb::Build => {
                    self.build(|| {}).await?;
                    Outcome::Invoked(verb)
                }
                Verb::Version => {
                    self.engine.version()?;
                    Outcome::Invoked(verb)
                }
                Verb::Help => {
                    self.engine.help()?;
                    Outcome::Invoked(verb)
                }
                Verb::PatternsOnly => {
                    self.engine.patterns_only(self.config.clean_public)?;
                    Outcome::Invoked(verb)
                }
                Verb::ListStarterkits => {
                    self.engine.list_starterkits()?;
                    Outcome::Invoked(verb)
                }
                Verb::LoadStarterkit => match self.inputs.kit() {
                    Some(kit) => {
                        self.engine.load_starterkit(kit, self.inputs.clean())?;
                        Outcome::Invoked(verb)
                    }
                    None => {
                        writeln!(out, "{NO_KIT_MESSAGE}")?;
                        Outcome::MissingInput(verb)
                    }
                },
                Verb::InstallPlugin => match self.inputs.plugin() {
                    Some(plugin) => {
                        self.engine.install_plugin(plugin)?;
                        Outcome::Invoked(verb)
                    }
                    None => {
                        writeln!(out, "{NO_PLUGIN_MESSAGE}")?;
                        Outcome::MissingInput(verb)
                    }
                },
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Run the engine build with the configured clean flag, then call `done`.
    ///
    /// `done` only fires once the engine's build has settled successfully.
    pub async fn build<F: FnOnce()>(&self, done: F) -> Result<(), EngineError> {
        self.engine.build(self.config.clean_public).await?;
        done();
        Ok(())
    }
}
