//! CLI Environment Handling Tests

#![cfg(unix)]

mod common;

use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// Config whose engine is `true`, so every engine call succeeds.
fn config_with_noop_engine() -> TempDir {
    let dir = TempDir::new().unwrap();
    let mut config: serde_json::Value =
        serde_json::from_str(&common::config_json(true)).unwrap();
    config["app"]["engine"] = serde_json::json!({ "program": "true" });
    fs::write(dir.path().join("patternlab-config.json"), config.to_string()).unwrap();
    dir
}

fn patternlab(dir: &TempDir, clean: &str, verbs: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_patternlab"))
        .current_dir(dir.path())
        .env("npm_config_clean", clean)
        .env_remove("npm_config_kit")
        .env_remove("npm_config_plugin")
        .args(verbs)
        .output()
        .unwrap()
}

#[test]
fn odd_clean_value_does_not_block_other_verbs() {
    let dir = config_with_noop_engine();
    for clean in ["maybe", ""] {
        let output = patternlab(&dir, clean, &["version"]);
        assert!(
            output.status.success(),
            "npm_config_clean={clean:?}: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn odd_clean_value_still_loads_starterkit() {
    let dir = config_with_noop_engine();
    let output = Command::new(env!("CARGO_BIN_EXE_patternlab"))
        .current_dir(dir.path())
        .env("npm_config_clean", "maybe")
        .env("npm_config_kit", "@pattern-lab/starterkit-mustache-base")
        .arg("loadstarterkit")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(!String::from_utf8_lossy(&output.stdout).contains("No Valid Kit"));
}
