//! Static application skeleton copy.
//!
//! The skeleton is a plain directory tree. Every occurrence of the product
//! and vendor placeholders, in file contents and in path segments, is replaced
//! while copying. Files that are not UTF-8 are copied byte for byte.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{IoResultExt, PrefabError, Result};
use crate::fs_utils::write_file;

pub const PRODUCT_PLACEHOLDER: &str = "ReplaceThisWithTheNameOfYourProduct";
pub const VENDOR_PLACEHOLDER: &str = "ReplaceThisWithTheNameOfYourVendor";

/// What a skeleton copy wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkeletonCopy {
    pub files: Vec<PathBuf>,
}

struct Placeholders<'a> {
    project_name: &'a str,
    vendor: &'a str,
}

impl Placeholders<'_> {
    fn apply(&self, text: &str) -> String {
        text.replace(PRODUCT_PLACEHOLDER, self.project_name)
            .replace(VENDOR_PLACEHOLDER, self.vendor)
    }
}

/// Copy `source_dir` into `target_dir`, overwriting files that already exist
pub fn copy_skeleton(source_dir: &Path, target_dir: &Path, project_name: &str, vendor: &str) -> Result<SkeletonCopy> {
    if !source_dir.is_dir() {
        return Err(PrefabError::configuration(source_dir, "skeleton directory does not exist"));
    }

    let placeholders = Placeholders { project_name, vendor };
    let mut copy = SkeletonCopy::default();

    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source_dir).to_path_buf();
            PrefabError::io(&path, e.into())
        })?;

        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|_| PrefabError::configuration(entry.path(), "skeleton entry outside the skeleton directory"))?;
        let target = target_dir.join(placeholders.apply(&relative.to_string_lossy()));

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).at_path(&target)?;
            continue;
        }

        let bytes = fs::read(entry.path()).at_path(entry.path())?;
        match String::from_utf8(bytes) {
            Ok(text) => write_file(&target, placeholders.apply(&text))?,
            Err(raw) => write_file(&target, raw.into_bytes())?,
        }

        debug!(file = %target.display(), "copied skeleton file");
        copy.files.push(target);
    }

    Ok(copy)
}
