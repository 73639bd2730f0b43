//! Fabrication runtime.
//!
//! Renders every supporting actor of one [`FabricationTree`] and commits the
//! results for that entity as a unit:
//!
//! 1. Validate every actor key and resolve every template
//! 2. Apply each actor's processor chain, substitute template tokens, strip markers
//! 3. Write the rendered actors into a staging directory inside the output root
//! 4. Move the staged entity directory onto `<output root>/<relative_dir>/<name>`
//!
//! Any failure before the final move drops the staging directory, so an entity
//! is either fully written or untouched.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::configuration::EntityLocation;
use crate::error::{IoResultExt, PrefabError, Result};
use crate::fs_utils::write_file;
use crate::processors::{apply_chain, markers};
use crate::tree::{ActorEntry, ActorKey, FabricationTree, ENTITY_NAME_PLACEHOLDER};
use crate::utils::to_camel_case;

const STAGING_PREFIX: &str = ".prefab-staging-";
const PREVIOUS_GENERATION_DIRECTORY: &str = ".previous";

/// Replaced by the entity's camelCase name
pub const ENTITY_VAR_TOKEN: &str = "<EntityVar>";
/// Replaced by the project name
pub const PROJECT_NAME_TOKEN: &str = "<ProjectName>";
/// Replaced by the entity's fully-qualified namespace
pub const NAMESPACE_TOKEN: &str = "<Namespace>";

/// Everything a runtime pass needs, passed explicitly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeParameters {
    /// Directory holding `Actor/...` templates
    pub template_root: PathBuf,
    /// Directory receiving `<relative_dir>/<name>/...`
    pub output_root: PathBuf,
    pub project_name: String,
    /// Vendor segment that starts every generated namespace (e.g. `Neighborhoods`)
    pub namespace_prefix: String,
}

/// Files committed for one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricatedEntity {
    /// Committed entity directory
    pub directory: PathBuf,
    /// Committed files, in actor order
    pub files: Vec<PathBuf>,
}

struct ResolvedActor<'a> {
    key: &'a ActorKey,
    entry: &'a ActorEntry,
    template: PathBuf,
    output: PathBuf,
}

/// Applies processor chains to templates for one entity at a time
#[derive(Debug, Clone)]
pub struct FabricationRuntime {
    parameters: RuntimeParameters,
}

impl FabricationRuntime {
    pub fn new(parameters: RuntimeParameters) -> Self {
        Self { parameters }
    }

    /// Namespace of the entity's actors: `<prefix>\<project>\<relative dir>\<name>`
    pub fn entity_namespace(&self, entity: &EntityLocation) -> String {
        [
            self.parameters.namespace_prefix.as_str(),
            self.parameters.project_name.as_str(),
            entity.namespace_suffix().as_str(),
        ]
        .iter()
        .filter(|segment| !segment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\\")
    }

    /// Render and commit every actor of `tree` for `entity`
    pub fn fabricate(&self, tree: &FabricationTree, entity: &EntityLocation) -> Result<FabricatedEntity> {
        let actors = self.resolve(tree, entity)?;

        let output_root = &self.parameters.output_root;
        fs::create_dir_all(output_root).at_path(output_root)?;

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(output_root)
            .at_path(output_root)?;
        let staged_entity = staging.path().join(&entity.name);
        fs::create_dir_all(&staged_entity).at_path(&staged_entity)?;

        for actor in &actors {
            let rendered = self.render(actor, entity)?;
            write_file(staging.path().join(&actor.output), rendered)?;
            debug!(actor = %actor.key, output = %actor.output.display(), "staged actor");
        }

        let directory = output_root.join(entity.partition());
        commit(&staged_entity, &directory, staging.path())?;

        info!(
            entity = %entity.qualified_name(),
            actors = actors.len(),
            directory = %directory.display(),
            "committed entity"
        );

        let files = actors
            .iter()
            .map(|actor| directory.join(strip_entity_segment(&actor.output)))
            .collect();

        Ok(FabricatedEntity { directory, files })
    }

    fn resolve<'a>(&self, tree: &'a FabricationTree, entity: &EntityLocation) -> Result<Vec<ResolvedActor<'a>>> {
        tree.supporting_actors
            .iter()
            .map(|(key, entry)| self.resolve_actor(key, entry, entity))
            .collect()
    }

    fn resolve_actor<'a>(
        &self,
        key: &'a ActorKey,
        entry: &'a ActorEntry,
        entity: &EntityLocation,
    ) -> Result<ResolvedActor<'a>> {
        let template = self.parameters.template_root.join(key.template_path()?);
        if !template.is_file() {
            return Err(PrefabError::TemplateResolution {
                actor: key.to_string(),
                path: template,
            });
        }

        Ok(ResolvedActor {
            key,
            entry,
            template,
            output: key.output_path(&entity.name)?,
        })
    }

    fn render(&self, actor: &ResolvedActor<'_>, entity: &EntityLocation) -> Result<String> {
        let template = fs::read_to_string(&actor.template).at_path(&actor.template)?;
        let processed = apply_chain(&template, actor.entry)?;
        let substituted = self.substitute_tokens(&processed, entity);
        Ok(markers::strip_markers(&substituted))
    }

    fn substitute_tokens(&self, text: &str, entity: &EntityLocation) -> String {
        text.replace(ENTITY_NAME_PLACEHOLDER, &entity.name)
            .replace(ENTITY_VAR_TOKEN, &to_camel_case(&entity.name))
            .replace(PROJECT_NAME_TOKEN, &self.parameters.project_name)
            .replace(NAMESPACE_TOKEN, &self.entity_namespace(entity))
    }
}

/// Output paths start with the entity name; the committed directory already is that segment
fn strip_entity_segment(output: &Path) -> PathBuf {
    output.components().skip(1).collect()
}

/// Move the staged entity directory onto `target`, keeping any previous generation until the move succeeds
fn commit(staged: &Path, target: &Path, staging_root: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).at_path(parent)?;
    }

    let backup = staging_root.join(PREVIOUS_GENERATION_DIRECTORY);
    let had_previous = target.exists();
    if had_previous {
        fs::rename(target, &backup).at_path(target)?;
    }

    if let Err(e) = fs::rename(staged, target) {
        if had_previous {
            fs::rename(&backup, target).at_path(&backup)?;
        }
        return Err(PrefabError::io(target, e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{ProcessorInvocation, ProcessorVariant, StaticContextRecord};
    use tempfile::TempDir;

    fn entity() -> EntityLocation {
        EntityLocation {
            relative_dir: PathBuf::from("Users"),
            name: "User".to_string(),
        }
    }

    fn runtime(temp_dir: &TempDir) -> FabricationRuntime {
        FabricationRuntime::new(RuntimeParameters {
            template_root: temp_dir.path().join("templates"),
            output_root: temp_dir.path().join("fab"),
            project_name: "Acme".to_string(),
            namespace_prefix: "Neighborhoods".to_string(),
        })
    }

    fn write_template(temp_dir: &TempDir, relative: &str, contents: &str) {
        write_file(temp_dir.path().join("templates/Actor").join(relative), contents).unwrap();
    }

    fn handler_tree() -> FabricationTree {
        let mut tree = FabricationTree::new();
        tree.attach(
            "<EntityName>/Map/Repository/Handler.php",
            "Handler-Import",
            ProcessorInvocation::new(
                ProcessorVariant::Namespace,
                StaticContextRecord::new()
                    .with("project_name", "Acme")
                    .with("namespace", "use \\Neighborhoods\\PROJECTNAME\\Prefab5\\AwareTrait;"),
            ),
        )
        .unwrap();
        tree
    }

    #[test]
    fn test_entity_namespace() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(runtime(&temp_dir).entity_namespace(&entity()), "Neighborhoods\\Acme\\Users\\User");
    }

    #[test]
    fn test_fabricate_renders_and_commits() {
        let temp_dir = TempDir::new().unwrap();
        write_template(
            &temp_dir,
            "Map/Repository/Handler.php",
            "namespace <Namespace>\\Map\\Repository;\n\nclass Handler\n{\n    // @prefab:imports\n    protected $<EntityVar>;\n}\n",
        );

        let fabricated = runtime(&temp_dir).fabricate(&handler_tree(), &entity()).unwrap();

        let expected = temp_dir.path().join("fab/Users/User/Map/Repository/Handler.php");
        assert_eq!(fabricated.files, vec![expected.clone()]);
        assert_eq!(
            fs::read_to_string(expected).unwrap(),
            "namespace Neighborhoods\\Acme\\Users\\User\\Map\\Repository;\n\nclass Handler\n{\n    use \\Neighborhoods\\Acme\\Prefab5\\AwareTrait;\n    protected $user;\n}\n"
        );
    }

    #[test]
    fn test_missing_template_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let err = runtime(&temp_dir).fabricate(&handler_tree(), &entity()).unwrap_err();

        assert!(matches!(err, PrefabError::TemplateResolution { .. }));
        assert!(!temp_dir.path().join("fab/Users/User").exists());
    }

    #[test]
    fn test_failing_chain_keeps_previous_generation() {
        let temp_dir = TempDir::new().unwrap();
        write_file(temp_dir.path().join("fab/Users/User/Old.php"), "old").unwrap();
        write_template(&temp_dir, "Builder.php", "class Builder {}\n");
        write_template(&temp_dir, "Map/Repository/Handler.php", "// @prefab:imports\n");

        let mut tree = handler_tree();
        tree.attach(
            "<EntityName>/Builder.php",
            "Builder",
            ProcessorInvocation::new(ProcessorVariant::Builder, StaticContextRecord::new()),
        )
        .unwrap();

        let err = runtime(&temp_dir).fabricate(&tree, &entity()).unwrap_err();
        assert!(matches!(err, PrefabError::ProcessorContext { .. }));

        let user_dir = temp_dir.path().join("fab/Users/User");
        assert!(user_dir.join("Old.php").exists());
        assert!(!user_dir.join("Map").exists());

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path().join("fab"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_regeneration_replaces_previous_output() {
        let temp_dir = TempDir::new().unwrap();
        write_file(temp_dir.path().join("fab/Users/User/Stale.php"), "stale").unwrap();
        write_template(&temp_dir, "Map/Repository/Handler.php", "// @prefab:imports\n");

        runtime(&temp_dir).fabricate(&handler_tree(), &entity()).unwrap();

        let user_dir = temp_dir.path().join("fab/Users/User");
        assert!(!user_dir.join("Stale.php").exists());
        assert!(user_dir.join("Map/Repository/Handler.php").exists());
    }

    #[test]
    fn test_invalid_actor_key_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut tree = FabricationTree::new();
        tree.ensure_actor("<EntityName>/../Escape.php");

        let err = runtime(&temp_dir).fabricate(&tree, &entity()).unwrap_err();
        assert!(matches!(err, PrefabError::InvalidActorKey(_)));
    }
}
