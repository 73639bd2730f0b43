//! Filesystem utilities for fabrication

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{IoResultExt, PrefabError, Result};

/// Write content to a file, creating parent directories if needed
pub fn write_file<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).at_path(parent)?;
    }

    fs::write(path, contents).at_path(path)
}

/// Every file below `root` whose name ends with `suffix`, sorted by path
pub fn find_files_with_suffix<P: AsRef<Path>>(root: P, suffix: &str) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            PrefabError::io(&path, e.into())
        })?;

        if entry.file_type().is_file() && entry.file_name().to_string_lossy().ends_with(suffix) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}
