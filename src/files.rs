//! File Enumeration - Glob Matching Over Directory Walks

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file found under a root, with its path relative to that root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FoundFile {
    pub path: PathBuf,
    pub relative: PathBuf,
}

/// Compile glob patterns. With `literal_separator`, `*` stays inside one
/// directory and only `**` crosses into subdirectories.
pub fn glob_set<S: AsRef<str>>(
    patterns: &[S],
    literal_separator: bool,
) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref().trim_start_matches("./");
        builder.add(
            GlobBuilder::new(pattern)
                .literal_separator(literal_separator)
                .build()?,
        );
    }
    builder.build()
}

/// Every regular file under `root` whose relative path matches `include`
/// and not `exclude`, sorted by path. A missing root yields nothing.
pub fn matching_files(
    root: &Path,
    include: &GlobSet,
    exclude: Option<&GlobSet>,
) -> Result<Vec<FoundFile>, walkdir::Error> {
    let mut found = vec![];
    if !root.is_dir() {
        return Ok(found);
    }

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if !include.is_match(relative) {
            continue;
        }
        if exclude.is_some_and(|set| set.is_match(relative)) {
            continue;
        }
        found.push(FoundFile {
            path: entry.path().to_path_buf(),
            relative: relative.to_path_buf(),
        });
    }

    found.sort();
    Ok(found)
}
