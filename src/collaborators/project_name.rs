//! Project name resolution from the host project's `composer.json`.

use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::{PrefabError, Result};

pub const COMPOSER_MANIFEST: &str = "composer.json";

/// Default vendor segment removed from the autoload namespace
pub const DEFAULT_VENDOR: &str = "Neighborhoods";

/// Project name from the first `autoload.psr-4` namespace of `<project_dir>/composer.json`.
///
/// `"Neighborhoods\\Acme\\": "src/"` with vendor `Neighborhoods` resolves to `Acme`.
pub fn resolve_project_name(project_dir: &Path, vendor: &str) -> Result<String> {
    let manifest = project_dir.join(COMPOSER_MANIFEST);
    if !manifest.is_file() {
        return Err(PrefabError::ProjectName(format!(
            "could not find {} in {}",
            COMPOSER_MANIFEST,
            project_dir.display()
        )));
    }

    let contents = fs::read_to_string(&manifest).map_err(|e| {
        PrefabError::ProjectName(format!("could not read {}: {}", manifest.display(), e))
    })?;

    project_name_from_manifest(&contents, vendor)
}

/// Same as [`resolve_project_name`], over manifest text
pub fn project_name_from_manifest(contents: &str, vendor: &str) -> Result<String> {
    let manifest: Value = serde_json::from_str(contents)
        .map_err(|e| PrefabError::ProjectName(format!("invalid {}: {}", COMPOSER_MANIFEST, e)))?;

    let namespace = manifest
        .get("autoload")
        .and_then(|autoload| autoload.get("psr-4"))
        .and_then(Value::as_object)
        .and_then(|psr4| psr4.keys().next())
        .ok_or_else(|| {
            PrefabError::ProjectName(format!("{} has no autoload.psr-4 namespace", COMPOSER_MANIFEST))
        })?;

    let stripped = if vendor.is_empty() {
        namespace.as_str().to_string()
    } else {
        namespace.replace(vendor, "")
    };
    let project_name = stripped.trim_matches('\\');

    if project_name.is_empty() {
        return Err(PrefabError::ProjectName(format!(
            "namespace '{}' has nothing left once the vendor '{}' is removed",
            namespace, vendor
        )));
    }

    Ok(project_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_psr4_namespace_wins() {
        let manifest = r#"{
            "autoload": {
                "psr-4": {
                    "Neighborhoods\\Acme\\": "src/",
                    "Neighborhoods\\AcmeFab\\": "fab/"
                }
            }
        }"#;
        assert_eq!(project_name_from_manifest(manifest, DEFAULT_VENDOR).unwrap(), "Acme");
    }

    #[test]
    fn test_custom_vendor() {
        let manifest = r#"{"autoload": {"psr-4": {"Initech\\Tps\\": "src/"}}}"#;
        assert_eq!(project_name_from_manifest(manifest, "Initech").unwrap(), "Tps");
    }

    #[test]
    fn test_missing_psr4() {
        let err = project_name_from_manifest(r#"{"name": "acme/acme"}"#, DEFAULT_VENDOR).unwrap_err();
        assert!(matches!(err, PrefabError::ProjectName(_)));
    }

    #[test]
    fn test_missing_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let err = resolve_project_name(temp_dir.path(), DEFAULT_VENDOR).unwrap_err();
        assert!(err.to_string().contains("composer.json"));
    }

    #[test]
    fn test_resolves_from_project_dir() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(COMPOSER_MANIFEST),
            r#"{"autoload": {"psr-4": {"Neighborhoods\\Acme\\": "src/"}}}"#,
        )
        .unwrap();

        assert_eq!(resolve_project_name(temp_dir.path(), DEFAULT_VENDOR).unwrap(), "Acme");
    }
}
