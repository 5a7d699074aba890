//! Copy Rules - Static Assets From Source to Public

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::files::{glob_set, matching_files};
use crate::hashing::{sha256_file, sha256_hex};

#[derive(Debug, Error)]
pub enum CopyError {
    #[error("Copy source directory not found: {0}")]
    MissingContext(PathBuf),

    #[error("Invalid copy pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("Failed to scan {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    Io {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CopyRule {
    pub context: PathBuf,
    pub from: String,
    pub to: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub flatten: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub hash: String,
    /// Destination already held identical bytes.
    pub unchanged: bool,
}

impl CopyRule {
    pub fn new(context: impl Into<PathBuf>, from: &str, to: impl Into<PathBuf>) -> Self {
        Self {
            context: context.into(),
            from: from.to_string(),
            to: to.into(),
            ignore: vec![],
            flatten: false,
        }
    }

    pub fn ignoring(mut self, pattern: &str) -> Self {
        self.ignore.push(pattern.to_string());
        self
    }

    pub fn flattened(mut self) -> Self {
        self.flatten = true;
        self
    }

    /// Copy every matching file into `to`.
    pub fn apply(&self) -> Result<Vec<CopiedFile>, CopyError> {
        if !self.context.is_dir() {
            return Err(CopyError::MissingContext(self.context.clone()));
        }

        let include = glob_set(&[self.from.as_str()], true)?;
        let exclude = if self.ignore.is_empty() {
            None
        } else {
            Some(glob_set(&self.ignore, false)?)
        };

        let found = matching_files(&self.context, &include, exclude.as_ref()).map_err(|source| {
            CopyError::Walk {
                path: self.context.clone(),
                source,
            }
        })?;

        let mut copied = vec![];
        for file in found {
            let destination = if self.flatten {
                match file.relative.file_name() {
                    Some(name) => self.to.join(name),
                    None => continue,
                }
            } else {
                self.to.join(&file.relative)
            };
            copied.push(copy_file(file.path, destination)?);
        }

        debug!(
            context = %self.context.display(),
            from = %self.from,
            count = copied.len(),
            "copy rule applied"
        );
        Ok(copied)
    }
}

fn io_error(from: &Path, to: &Path) -> impl FnOnce(std::io::Error) -> CopyError {
    let (from, to) = (from.to_path_buf(), to.to_path_buf());
    move |source| CopyError::Io { from, to, source }
}

fn copy_file(source: PathBuf, destination: PathBuf) -> Result<CopiedFile, CopyError> {
    let data = fs::read(&source).map_err(io_error(&source, &destination))?;
    let hash = sha256_hex(&data);

    let unchanged = destination.is_file()
        && sha256_file(&destination).map_or(false, |existing| existing == hash);

    if !unchanged {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(io_error(&source, &destination))?;
        }
        fs::write(&destination, &data).map_err(io_error(&source, &destination))?;
    }

    Ok(CopiedFile {
        source,
        destination,
        hash,
        unchanged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn styleguide() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("styleguide");
        let out = dir.path().join("public");
        fs::create_dir_all(src.join("css/nested")).unwrap();
        fs::create_dir_all(src.join("js")).unwrap();
        fs::write(src.join("index.html"), b"<html/>").unwrap();
        fs::write(src.join("js/app.js"), b"app()").unwrap();
        fs::write(src.join("css/styleguide.css"), b"body{}").unwrap();
        fs::write(src.join("css/nested/theme.css"), b"a{}").unwrap();
        (dir, src, out)
    }

    #[test]
    fn test_ignore_skips_css_anywhere() {
        let (_dir, src, out) = styleguide();
        let copied = CopyRule::new(&src, "./**/*", &out).ignoring("*.css").apply().unwrap();
        assert_eq!(copied.len(), 2);
        assert!(out.join("index.html").is_file());
        assert!(out.join("js/app.js").is_file());
        assert!(!out.join("css/styleguide.css").exists());
    }

    #[test]
    fn test_flatten_drops_directories() {
        let (_dir, src, out) = styleguide();
        let css_out = out.join("styleguide/css");
        let copied = CopyRule::new(&src, "./**/*.css", &css_out).flattened().apply().unwrap();
        assert_eq!(copied.len(), 2);
        assert!(css_out.join("styleguide.css").is_file());
        assert!(css_out.join("theme.css").is_file());
    }

    #[test]
    fn test_second_copy_is_unchanged() {
        let (_dir, src, out) = styleguide();
        let rule = CopyRule::new(&src, "./*.html", &out);
        assert!(!rule.apply().unwrap()[0].unchanged);
        assert!(rule.apply().unwrap()[0].unchanged);
    }

    #[test]
    fn test_missing_context_is_error() {
        let dir = TempDir::new().unwrap();
        let err = CopyRule::new(dir.path().join("fonts"), "./*", dir.path().join("out"))
            .apply()
            .unwrap_err();
        assert!(matches!(err, CopyError::MissingContext(_)));
    }
}
