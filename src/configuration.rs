//! Type definitions for a loaded DAO definition.
//!
//! A [`ConfigurationRecord`] is built once by the spec loader and never mutated
//! afterwards; the template assembler only borrows it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Per-property options from the `properties` mapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PropertyDef {
    #[serde(default)]
    pub nullable: bool,
}

/// Which set of supporting actors an entity receives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportingActorGroup {
    /// Every baseline actor plus the map, repository and handler machinery
    #[default]
    Complete,
    /// Only the aware trait, factory and builder
    Minimal,
}

impl SupportingActorGroup {
    pub fn includes_map_actors(self) -> bool {
        matches!(self, SupportingActorGroup::Complete)
    }
}

impl fmt::Display for SupportingActorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupportingActorGroup::Complete => write!(f, "complete"),
            SupportingActorGroup::Minimal => write!(f, "minimal"),
        }
    }
}

/// Where a definition sits below the project's `src/` directory
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EntityLocation {
    /// Directory of the definition relative to `src/` (e.g. `Users`)
    pub relative_dir: PathBuf,
    /// Definition file name without its suffix (e.g. `User`)
    pub name: String,
}

impl EntityLocation {
    /// Relative path segments joined without separators (`Users/User` -> `UsersUser`)
    pub fn qualified_name(&self) -> String {
        let mut qualified: String = self
            .relative_dir
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        qualified.push_str(&self.name);
        qualified
    }

    /// Relative path segments joined with namespace separators (`Users\User`)
    pub fn namespace_suffix(&self) -> String {
        let mut parts: Vec<String> = self
            .relative_dir
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        parts.push(self.name.clone());
        parts.join("\\")
    }

    /// Directory this entity's actors are committed to, relative to the output root
    pub fn partition(&self) -> PathBuf {
        self.relative_dir.join(&self.name)
    }
}

/// Validated, immutable description of one DAO
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationRecord {
    pub table_name: String,
    pub identity_field: Option<String>,
    pub http_route: Option<String>,
    pub properties: IndexMap<String, PropertyDef>,
    pub project_name: String,
    /// `<project_dir>/<fab dir>/<relative_dir>`; informational. The runtime
    /// commits under its own output root, which resolves to the same
    /// directory for a generator run.
    pub root_save_location: PathBuf,
    pub project_dir: PathBuf,
    pub supporting_actor_group: Option<SupportingActorGroup>,
    pub entity: EntityLocation,
}

impl ConfigurationRecord {
    pub fn has_identity_field(&self) -> bool {
        self.identity_field.is_some()
    }

    pub fn has_http_route(&self) -> bool {
        self.http_route.is_some()
    }

    /// Route name used by the handler interface; derived from the definition's location
    pub fn route_name(&self) -> Option<String> {
        let name = self.entity.qualified_name();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    pub fn actor_group(&self) -> SupportingActorGroup {
        self.supporting_actor_group.unwrap_or_default()
    }
}
