//! Project configuration schema for prefab.yaml
//!
//! Every field is optional; a project without a `prefab.yaml` runs with the
//! defaults below. Relative paths are resolved against the project directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::build_plan::DEFAULT_WORKERS;
use crate::collaborators::project_name::DEFAULT_VENDOR;
use crate::error::{PrefabError, Result};
use crate::spec_loader::{DEFAULT_DEFINITION_SUFFIX, DEFAULT_FAB_DIRECTORY};

pub const PROJECT_CONFIG_FILE: &str = "prefab.yaml";

/// Top-level project configuration from prefab.yaml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProjectConfig {
    /// Overrides the name read from composer.json
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default = "default_vendor")]
    pub vendor: String,
    #[serde(default = "default_definition_suffix")]
    pub definition_suffix: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// Directory configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PathsConfig {
    #[serde(default = "default_source_dir")]
    pub source: String,
    #[serde(default = "default_output_dir")]
    pub output: String,
    #[serde(default = "default_templates_dir")]
    pub templates: String,
    /// Static skeleton copied into the project before fabrication
    #[serde(default)]
    pub skeleton: Option<String>,
    /// Where fabrication trees are written for inspection
    #[serde(default)]
    pub fabrication: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: default_source_dir(),
            output: default_output_dir(),
            templates: default_templates_dir(),
            skeleton: None,
            fabrication: None,
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_name: None,
            vendor: default_vendor(),
            definition_suffix: default_definition_suffix(),
            paths: PathsConfig::default(),
            workers: default_workers(),
        }
    }
}

fn default_vendor() -> String {
    DEFAULT_VENDOR.to_string()
}

fn default_definition_suffix() -> String {
    DEFAULT_DEFINITION_SUFFIX.to_string()
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_source_dir() -> String {
    "src".to_string()
}

fn default_output_dir() -> String {
    DEFAULT_FAB_DIRECTORY.to_string()
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

impl ProjectConfig {
    /// Load project configuration from a prefab.yaml file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PrefabError::configuration(path, format!("failed to read {}: {}", PROJECT_CONFIG_FILE, e)))?;

        Self::from_str_at(path, &contents)
    }

    /// Parse prefab.yaml text that was read from `path`
    pub fn from_str_at(path: &Path, contents: &str) -> Result<Self> {
        let config: ProjectConfig = serde_yaml::from_str(contents)
            .map_err(|e| PrefabError::configuration(path, format!("failed to parse {}: {}", PROJECT_CONFIG_FILE, e)))?;

        if config.workers == 0 {
            return Err(PrefabError::configuration(path, "'workers' must be at least 1"));
        }
        Ok(config)
    }

    /// `<project_dir>/prefab.yaml` when present, defaults otherwise
    pub fn discover<P: AsRef<Path>>(project_dir: P) -> Result<Self> {
        let path = project_dir.as_ref().join(PROJECT_CONFIG_FILE);
        if path.is_file() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Name of the output directory, relative to the project directory
    pub fn fab_directory(&self) -> &str {
        &self.paths.output
    }

    pub fn source_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.paths.source)
    }

    pub fn output_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.paths.output)
    }

    pub fn templates_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.paths.templates)
    }

    pub fn skeleton_dir(&self, project_dir: &Path) -> Option<PathBuf> {
        self.paths.skeleton.as_ref().map(|dir| project_dir.join(dir))
    }

    pub fn fabrication_dir(&self, project_dir: &Path) -> Option<PathBuf> {
        self.paths.fabrication.as_ref().map(|dir| project_dir.join(dir))
    }
}
