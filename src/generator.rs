//! High-level orchestration of a full fabrication run.
//!
//! A run goes through these phases:
//! 1. Resolve the project name (prefab.yaml, then composer.json)
//! 2. Copy the static skeleton, when one is configured
//! 3. Discover, load and assemble every DAO definition below the source directory
//! 4. Write each fabrication tree for inspection, when a fabrication directory is configured
//! 5. Execute the build plan
//! 6. List the generated service definitions for the DI container builder
//!
//! Definitions that fail to load or assemble are reported and skipped; they
//! never stop the other entities.

use std::fmt;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::assembler::assemble;
use crate::build_plan::{BuildPlan, BuildPlanEntry, BuildReport, CommitHook};
use crate::collaborators::{collect_service_definitions, copy_skeleton, resolve_project_name};
use crate::configuration::ConfigurationRecord;
use crate::error::{PrefabError, Result};
use crate::fs_utils::write_file;
use crate::project_config::ProjectConfig;
use crate::runtime::{FabricationRuntime, RuntimeParameters};
use crate::spec_loader::SpecLoader;
use crate::tree::FabricationTree;

/// Suffix of the fabrication tree written for each entity
pub const FABRICATION_FILE_SUFFIX: &str = ".fabrication.yml";

/// One definition turned into its tree
#[derive(Debug, Clone)]
pub struct AssembledEntity {
    pub definition: PathBuf,
    pub record: ConfigurationRecord,
    pub tree: FabricationTree,
}

/// Every definition of a project, assembled or failed
#[derive(Debug, Default)]
pub struct Assembly {
    pub entities: Vec<AssembledEntity>,
    pub failed: Vec<(PathBuf, PrefabError)>,
}

/// Outcome of [`Generator::generate`]
#[derive(Debug)]
pub struct GenerationReport {
    pub project_name: String,
    pub skeleton_files: Vec<PathBuf>,
    pub fabrication_files: Vec<PathBuf>,
    /// Definitions that could not be loaded or assembled
    pub definition_failures: Vec<(PathBuf, PrefabError)>,
    pub build: BuildReport,
    /// Generated `*.service.yml` files, sorted
    pub service_definitions: Vec<PathBuf>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.definition_failures.is_empty() && self.build.is_success()
    }
}

/// Drives a fabrication run for one project directory
#[derive(Clone)]
pub struct Generator {
    project_dir: PathBuf,
    config: ProjectConfig,
    on_committed: Option<CommitHook>,
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("project_dir", &self.project_dir)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Generator {
    pub fn new(project_dir: impl Into<PathBuf>, config: ProjectConfig) -> Self {
        Self {
            project_dir: project_dir.into(),
            config,
            on_committed: None,
        }
    }

    /// Report each entity as soon as it commits
    pub fn with_commit_hook(mut self, hook: CommitHook) -> Self {
        self.on_committed = Some(hook);
        self
    }

    /// Generator for `project_dir` using its prefab.yaml (or the defaults)
    pub fn for_project(project_dir: impl Into<PathBuf>) -> Result<Self> {
        let project_dir = project_dir.into();
        let config = ProjectConfig::discover(&project_dir)?;
        Ok(Self::new(project_dir, config))
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Configured name, falling back to composer.json
    pub fn project_name(&self) -> Result<String> {
        match &self.config.project_name {
            Some(name) if !name.is_empty() => Ok(name.clone()),
            _ => resolve_project_name(&self.project_dir, &self.config.vendor),
        }
    }

    fn spec_loader(&self, project_name: &str) -> SpecLoader {
        SpecLoader::new(project_name)
            .with_definition_suffix(self.config.definition_suffix.clone())
            .with_fab_directory(self.config.fab_directory())
            .with_source_root(&self.project_dir, self.config.source_dir(&self.project_dir))
    }

    /// Load and assemble every definition below the source directory
    pub fn assemble_all(&self, project_name: &str) -> Result<Assembly> {
        let loader = self.spec_loader(project_name);
        let definitions = loader.discover(self.config.source_dir(&self.project_dir))?;
        info!(definitions = definitions.len(), "discovered definitions");

        let mut assembly = Assembly::default();
        for definition in definitions {
            let assembled = loader
                .load(&definition)
                .and_then(|record| assemble(&record).map(|tree| (record, tree)));

            match assembled {
                Ok((record, tree)) => assembly.entities.push(AssembledEntity { definition, record, tree }),
                Err(e) => {
                    warn!(definition = %definition.display(), error = %e, "definition skipped");
                    assembly.failed.push((definition, e));
                }
            }
        }

        Ok(assembly)
    }

    /// Write each tree to `<fabrication dir>/<relative_dir>/<name>.fabrication.yml`
    pub fn write_fabrication_trees(&self, fabrication_dir: &Path, entities: &[AssembledEntity]) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(entities.len());
        for entity in entities {
            let location = &entity.record.entity;
            let path = fabrication_dir
                .join(&location.relative_dir)
                .join(format!("{}{}", location.name, FABRICATION_FILE_SUFFIX));
            write_file(&path, entity.tree.to_yaml()?)?;
            written.push(path);
        }
        Ok(written)
    }

    fn runtime(&self, project_name: &str) -> FabricationRuntime {
        FabricationRuntime::new(RuntimeParameters {
            template_root: self.config.templates_dir(&self.project_dir),
            output_root: self.config.output_dir(&self.project_dir),
            project_name: project_name.to_string(),
            namespace_prefix: self.config.vendor.clone(),
        })
    }

    /// Run every phase. Only project-level problems are returned as errors;
    /// per-entity failures land in the report.
    pub async fn generate(&self, cancel: &CancellationToken) -> Result<GenerationReport> {
        let project_name = self.project_name()?;
        info!(project = %project_name, project_dir = %self.project_dir.display(), "starting generation");

        let skeleton_files = match self.config.skeleton_dir(&self.project_dir) {
            Some(skeleton) => {
                info!(skeleton = %skeleton.display(), "copying skeleton");
                copy_skeleton(&skeleton, &self.project_dir, &project_name, &self.config.vendor)?.files
            }
            None => Vec::new(),
        };

        info!("assembling build plan");
        let assembly = self.assemble_all(&project_name)?;

        let fabrication_files = match self.config.fabrication_dir(&self.project_dir) {
            Some(dir) => self.write_fabrication_trees(&dir, &assembly.entities)?,
            None => Vec::new(),
        };

        let mut plan = BuildPlan::new(self.runtime(&project_name)).with_workers(self.config.workers);
        if let Some(hook) = &self.on_committed {
            plan = plan.with_commit_hook(hook.clone());
        }
        for entity in assembly.entities {
            plan.push(BuildPlanEntry::new(
                entity.tree,
                entity.record.entity,
                entity.record.project_name,
                entity.record.project_dir,
            ));
        }

        info!("fabricating supporting actors");
        let build = plan.execute(cancel).await;

        let service_definitions = collect_service_definitions(&self.config.output_dir(&self.project_dir))?;

        Ok(GenerationReport {
            project_name,
            skeleton_files,
            fabrication_files,
            definition_failures: assembly.failed,
            build,
            service_definitions,
        })
    }
}
