//! Source file discovery.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use super::{Result, ScanError};
use crate::config::ScanConfig;

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["__pycache__", "node_modules", "site-packages"];

fn build_excludes(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ScanError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ScanError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}

/// Files found under a scan root.
#[derive(Debug, Default)]
pub struct FileWalk {
    /// Files to scan, sorted by path.
    pub files: Vec<PathBuf>,
    /// Entries below the root the walk could not read, with the reason.
    /// Dangling symlinks and link loops end up here.
    pub unreadable: Vec<(PathBuf, String)>,
}

/// Collect the files to scan under `root`, sorted by path.
///
/// Hidden directories are skipped, as are paths matching `excluded_paths`
/// (relative to `root`). Only an error on the root itself fails the walk.
pub fn collect_files(root: &Path, config: &ScanConfig) -> Result<FileWalk> {
    let excludes = build_excludes(&config.excluded_paths)?;

    let mut walk = FileWalk::default();
    let walker = WalkDir::new(root)
        .follow_links(config.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            // The root itself is never filtered
            if e.depth() == 0 {
                return true;
            }
            let rel = e.path().strip_prefix(root).unwrap_or(e.path());
            if excludes.is_match(rel) {
                return false;
            }
            if e.file_type().is_dir() {
                let name = e.file_name().to_string_lossy();
                if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref()) {
                    return false;
                }
            }
            true
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() > 0 => {
                let path = e.path().unwrap_or(root).to_path_buf();
                walk.unreadable.push((path, e.to_string()));
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if config.handles_extension(ext) {
            walk.files.push(path.to_path_buf());
        }
    }

    Ok(walk)
}

/// Path of `path` relative to `root`, with `/` separators.
pub fn relative_label(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
