//! DAO definition loader.
//!
//! Reads `*.prefab.definition.yml` documents and turns them into
//! [`ConfigurationRecord`]s. Supports both:
//! - the flat layout (`table_name`, `properties`, ... at the document root)
//! - the original layout, where the same keys sit under a `dao:` mapping

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::configuration::{ConfigurationRecord, EntityLocation, PropertyDef, SupportingActorGroup};
use crate::error::{PrefabError, Result};
use crate::utils::to_pascal_case;

/// File suffix that marks a DAO definition
pub const DEFAULT_DEFINITION_SUFFIX: &str = ".prefab.definition.yml";

/// Directory (relative to the project root) that receives fabricated actors
pub const DEFAULT_FAB_DIRECTORY: &str = "fab";

const SRC_SEGMENT: &str = "/src/";

/// Loads definitions for one project.
#[derive(Debug, Clone)]
pub struct SpecLoader {
    project_name: String,
    definition_suffix: String,
    fab_directory: String,
    source_root: Option<SourceRoot>,
}

/// Known project layout; definitions are located relative to `source_dir`
#[derive(Debug, Clone, PartialEq)]
struct SourceRoot {
    project_dir: PathBuf,
    source_dir: PathBuf,
}

impl SpecLoader {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            definition_suffix: DEFAULT_DEFINITION_SUFFIX.to_string(),
            fab_directory: DEFAULT_FAB_DIRECTORY.to_string(),
            source_root: None,
        }
    }

    pub fn with_definition_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.definition_suffix = suffix.into();
        self
    }

    pub fn with_fab_directory(mut self, fab_directory: impl Into<String>) -> Self {
        self.fab_directory = fab_directory.into();
        self
    }

    /// Locate definitions relative to `source_dir` instead of splitting on `/src/`
    pub fn with_source_root(mut self, project_dir: impl Into<PathBuf>, source_dir: impl Into<PathBuf>) -> Self {
        self.source_root = Some(SourceRoot {
            project_dir: project_dir.into(),
            source_dir: source_dir.into(),
        });
        self
    }

    pub fn definition_suffix(&self) -> &str {
        &self.definition_suffix
    }

    /// Load and validate a single definition file
    pub fn load(&self, path: impl AsRef<Path>) -> Result<ConfigurationRecord> {
        let path = path.as_ref();

        let yaml_content = fs::read_to_string(path)
            .map_err(|e| PrefabError::configuration(path, format!("failed to read file: {}", e)))?;

        self.load_from_str(path, &yaml_content)
    }

    /// Parse definition text that was read from `path`
    pub fn load_from_str(&self, path: &Path, yaml_content: &str) -> Result<ConfigurationRecord> {
        let document: Value = serde_yaml::from_str(yaml_content)
            .map_err(|e| PrefabError::configuration(path, format!("failed to parse YAML: {}", e)))?;

        let dao = dao_mapping(path, &document)?;

        let table_name = required_string(path, dao, "table_name")?;
        let identity_field = optional_string(path, dao, "identity_field")?;
        let http_route = optional_string(path, dao, "http_route")?;
        let properties = parse_properties(path, dao)?;
        let supporting_actor_group = match dao.get("supporting_actor_group") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_yaml::from_value::<SupportingActorGroup>(value.clone()).map_err(|e| {
                    PrefabError::configuration(path, format!("invalid 'supporting_actor_group': {}", e))
                })?,
            ),
        };

        let locations = match &self.source_root {
            Some(root) => derive_locations_under(
                path,
                &root.project_dir,
                &root.source_dir,
                &self.definition_suffix,
                &self.fab_directory,
            )?,
            None => derive_locations(path, &self.definition_suffix, &self.fab_directory)?,
        };

        Ok(ConfigurationRecord {
            table_name,
            identity_field,
            http_route,
            properties,
            project_name: self.project_name.clone(),
            root_save_location: locations.root_save_location,
            project_dir: locations.project_dir,
            supporting_actor_group,
            entity: locations.entity,
        })
    }

    /// Find every definition file below `src_dir`, sorted by path
    pub fn discover(&self, src_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let src_dir = src_dir.as_ref();

        if !src_dir.is_dir() {
            return Err(PrefabError::configuration(src_dir, "source directory does not exist"));
        }

        let mut definitions = Vec::new();
        for entry in WalkDir::new(src_dir).follow_links(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(src_dir).to_path_buf();
                PrefabError::io(&path, e.into())
            })?;

            if entry.file_type().is_file()
                && entry.file_name().to_string_lossy().ends_with(&self.definition_suffix)
            {
                definitions.push(entry.into_path());
            }
        }

        definitions.sort();
        Ok(definitions)
    }
}

/// Paths derived from a definition's location
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedLocations {
    pub project_dir: PathBuf,
    pub root_save_location: PathBuf,
    pub entity: EntityLocation,
}

/// Split a definition path on its last `/src/` segment.
///
/// `/app/src/Users/User.prefab.definition.yml` yields the project directory
/// `/app/`, the save location `/app/fab/Users` and the entity `Users` / `User`.
/// Only used for a standalone definition; project runs go through
/// [`derive_locations_under`].
pub fn derive_locations(path: &Path, suffix: &str, fab_directory: &str) -> Result<DerivedLocations> {
    let raw = path.to_string_lossy();
    let normalized = if raw.starts_with("src/") {
        format!("./{}", raw)
    } else {
        raw.into_owned()
    };

    let split_at = normalized.rfind(SRC_SEGMENT).ok_or_else(|| {
        PrefabError::configuration(path, "definition path must contain a '/src/' segment")
    })?;

    let before = &normalized[..split_at];
    let after = Path::new(&normalized[split_at + SRC_SEGMENT.len()..]);

    locations_from_parts(path, PathBuf::from(format!("{}/", before)), after, suffix, fab_directory)
}

/// Locate a definition relative to a known source directory.
///
/// Every directory below `source_dir` is part of the entity's location, even
/// one that happens to be called `src`.
pub fn derive_locations_under(
    path: &Path,
    project_dir: &Path,
    source_dir: &Path,
    suffix: &str,
    fab_directory: &str,
) -> Result<DerivedLocations> {
    let after = path.strip_prefix(source_dir).map_err(|_| {
        PrefabError::configuration(
            path,
            format!("definition is not below the source directory {}", source_dir.display()),
        )
    })?;

    locations_from_parts(path, project_dir.to_path_buf(), after, suffix, fab_directory)
}

fn locations_from_parts(
    path: &Path,
    project_dir: PathBuf,
    after: &Path,
    suffix: &str,
    fab_directory: &str,
) -> Result<DerivedLocations> {
    let file_name = after
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PrefabError::configuration(path, "definition path has no file name"))?;

    let name = match file_name.strip_suffix(suffix) {
        Some(stripped) => stripped.to_string(),
        None => file_name.split('.').next().unwrap_or_default().to_string(),
    };
    if name.is_empty() {
        return Err(PrefabError::configuration(path, "definition file name is empty once its suffix is removed"));
    }

    let relative_dir = after.parent().map(Path::to_path_buf).unwrap_or_default();
    let root_save_location = project_dir.join(fab_directory).join(&relative_dir);

    Ok(DerivedLocations {
        project_dir,
        root_save_location,
        entity: EntityLocation { relative_dir, name },
    })
}

fn dao_mapping<'a>(path: &Path, document: &'a Value) -> Result<&'a Mapping> {
    let root = document
        .as_mapping()
        .ok_or_else(|| PrefabError::configuration(path, "definition must be a YAML mapping"))?;

    match root.get("dao") {
        Some(Value::Mapping(dao)) => Ok(dao),
        Some(_) => Err(PrefabError::configuration(path, "'dao' must be a mapping")),
        None => Ok(root),
    }
}

fn required_string(path: &Path, dao: &Mapping, key: &str) -> Result<String> {
    match optional_string(path, dao, key)? {
        Some(value) if !value.is_empty() => Ok(value),
        Some(_) => Err(PrefabError::configuration(path, format!("'{}' cannot be empty", key))),
        None => Err(PrefabError::configuration(path, format!("missing required field '{}'", key))),
    }
}

fn optional_string(path: &Path, dao: &Mapping, key: &str) -> Result<Option<String>> {
    match dao.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(PrefabError::configuration(
            path,
            format!("'{}' must be a string, found {}", key, describe(other)),
        )),
    }
}

fn parse_properties(path: &Path, dao: &Mapping) -> Result<IndexMap<String, PropertyDef>> {
    let entries = match dao.get("properties") {
        None | Some(Value::Null) => {
            return Err(PrefabError::configuration(path, "missing required field 'properties'"))
        }
        Some(Value::Mapping(entries)) => entries,
        Some(other) => {
            return Err(PrefabError::configuration(
                path,
                format!("'properties' must be a mapping, found {}", describe(other)),
            ))
        }
    };

    let mut properties = IndexMap::with_capacity(entries.len());
    let mut accessor_names: HashMap<String, String> = HashMap::with_capacity(entries.len());
    for (key, value) in entries {
        let name = key
            .as_str()
            .ok_or_else(|| PrefabError::configuration(path, "property names must be strings"))?;

        let options = value.as_mapping().ok_or_else(|| {
            PrefabError::configuration(
                path,
                format!("property '{}' must be a mapping, found {}", name, describe(value)),
            )
        })?;

        let nullable = match options.get("nullable") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(PrefabError::configuration(
                    path,
                    format!("property '{}': 'nullable' must be a boolean, found {}", name, describe(other)),
                ))
            }
        };

        if properties.insert(name.to_string(), PropertyDef { nullable }).is_some() {
            return Err(PrefabError::configuration(path, format!("duplicate property '{}'", name)));
        }

        // getFooBar/setFooBar must stay unique
        let accessor = to_pascal_case(name);
        if let Some(previous) = accessor_names.insert(accessor.clone(), name.to_string()) {
            return Err(PrefabError::configuration(
                path,
                format!(
                    "properties '{}' and '{}' both generate get{}/set{}",
                    previous, name, accessor, accessor
                ),
            ));
        }
    }

    Ok(properties)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
