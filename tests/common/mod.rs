//! Shared fixtures: a recording engine and a throwaway site tree.

#![allow(dead_code)]

use patternlab_edition::{settled, BuildFuture, EngineError, PatternEngine, PatternLabConfig};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Build(bool),
    Version,
    Help,
    PatternsOnly(bool),
    ListStarterkits,
    LoadStarterkit(String, bool),
    InstallPlugin(String),
}

/// Records every call; `build` can be held open until released.
#[derive(Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<Call>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    fail_version: bool,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// `build` stays pending until the paired sender fires.
    pub fn gated(gate: oneshot::Receiver<()>) -> Self {
        Self {
            gate: Mutex::new(Some(gate)),
            ..Self::default()
        }
    }

    pub fn failing_version() -> Self {
        Self {
            fail_version: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PatternEngine for RecordingEngine {
    fn build(&self, clean_public: bool) -> BuildFuture {
        self.record(Call::Build(clean_public));
        match self.gate.lock().unwrap().take() {
            Some(gate) => Box::pin(async move {
                gate.await
                    .map_err(|_| EngineError::Other("gate dropped".to_string()))
            }),
            None => settled(Ok(())),
        }
    }

    fn version(&self) -> Result<(), EngineError> {
        self.record(Call::Version);
        if self.fail_version {
            return Err(EngineError::Other("version unavailable".to_string()));
        }
        Ok(())
    }

    fn help(&self) -> Result<(), EngineError> {
        self.record(Call::Help);
        Ok(())
    }

    fn patterns_only(&self, clean_public: bool) -> Result<(), EngineError> {
        self.record(Call::PatternsOnly(clean_public));
        Ok(())
    }

    fn list_starterkits(&self) -> Result<(), EngineError> {
        self.record(Call::ListStarterkits);
        Ok(())
    }

    fn load_starterkit(&self, kit: &str, clean: bool) -> Result<(), EngineError> {
        self.record(Call::LoadStarterkit(kit.to_string(), clean));
        Ok(())
    }

    fn install_plugin(&self, plugin: &str) -> Result<(), EngineError> {
        self.record(Call::InstallPlugin(plugin.to_string()));
        Ok(())
    }

    fn supported_template_extensions(&self) -> Vec<String> {
        vec![".mustache".to_string(), ".hbs".to_string()]
    }
}

pub fn config_json(clean_public: bool) -> String {
    serde_json::json!({
        "cleanPublic": clean_public,
        "paths": {
            "source": {
                "root": "source",
                "patterns": "source/_patterns",
                "data": "source/_data",
                "meta": "source/_meta",
                "annotations": "source/_annotations",
                "styleguide": "styleguide",
                "js": "source/js",
                "images": "source/images",
                "fonts": "source/fonts",
                "css": "source/css",
                "app": "source/_app"
            },
            "public": {
                "root": "public",
                "patterns": "public/patterns",
                "data": "public/styleguide/data",
                "annotations": "public/annotations",
                "styleguide": "public/styleguide",
                "js": "public/js",
                "images": "public/images",
                "fonts": "public/fonts",
                "css": "public/css"
            }
        },
        "app": {
            "webpackMerge": { "entry": "replace" },
            "uglify": { "sourceMap": false },
            "webpackDevServer": { "url": "http://localhost", "port": 3000 }
        }
    })
    .to_string()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A minimal Pattern Lab site on disk plus its loaded configuration.
pub fn site(clean_public: bool) -> (TempDir, PatternLabConfig) {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(root, "source/_patterns/atoms/button.mustache", "<button>{{ label }}</button>");
    write(root, "source/_patterns/atoms/button.json", r#"{"label": "Go"}"#);
    write(root, "source/_patterns/atoms/button.md", "# Button");
    write(root, "source/_patterns/atoms/card.hbs", "<div>{{title}}</div>");
    write(root, "source/_patterns/atoms/notes.txt", "not watched");
    write(root, "source/_data/data.json", "{}");
    write(root, "source/_data/listitems.yaml", "items: []");
    write(root, "source/_meta/_00-head.mustache", "<head></head>");
    write(root, "source/_annotations/annotations.js", "var comments = {};");
    write(root, "source/fonts/icons.woff", "woff");
    write(root, "source/images/logo.png", "png");
    write(root, "source/images/icons/arrow.svg", "<svg/>");
    write(root, "source/css/style.css", "body {}");
    write(root, "source/js/app.js", "init();");
    write(root, "source/js/app.test.js", "test();");
    write(root, "source/js/lib/util.js", "export {};");
    write(root, "source/favicon.ico", "ico");
    write(root, "styleguide/index.html", "<html></html>");
    write(root, "styleguide/css/pattern-lab.css", ".pl {}");
    fs::create_dir_all(root.join("source/_app")).unwrap();

    let config_path = root.join("patternlab-config.json");
    fs::write(&config_path, config_json(clean_public)).unwrap();
    let config = PatternLabConfig::load(&config_path).unwrap();

    (dir, config)
}
