//! # Prefab: Declarative Code Fabrication
//!
//! Prefab turns YAML DAO definitions into generated source files in two steps:
//!
//! - **Assembly**: each definition becomes a [`FabricationTree`], a map of
//!   supporting actors (output files) to ordered chains of annotation
//!   processors and their static context records
//! - **Fabrication**: the runtime applies every chain to the actor's template
//!   and commits one entity's files at a time, all or nothing
//!
//! ## Example: DAO definition
//!
//! `src/Users/User.prefab.definition.yml`:
//!
//! ```yaml
//! dao:
//!   table_name: users
//!   identity_field: id
//!   http_route: /users
//!   properties:
//!     id:
//!       nullable: false
//!     name:
//!       nullable: false
//!     bio:
//!       nullable: true
//! ```
//!
//! ## Example: assembling a tree
//!
//! ```rust,no_run
//! use prefab::{assemble, SpecLoader};
//!
//! let record = SpecLoader::new("Acme")
//!     .load("/app/src/Users/User.prefab.definition.yml")
//!     .unwrap();
//! let tree = assemble(&record).unwrap();
//! println!("{}", tree.to_yaml().unwrap());
//! ```

// Definitions and trees
pub mod configuration;
pub mod error;
pub mod spec_loader;
pub mod tree;

// Assembly
pub mod assembler;
pub mod context_builders;

// Template transforms
pub mod processors;

// Fabrication
pub mod build_plan;
pub mod runtime;

// Orchestration
pub mod collaborators;
pub mod generator;
pub mod project_config;

pub mod fs_utils;
pub mod utils;

// Re-export key types
pub use configuration::{ConfigurationRecord, EntityLocation, PropertyDef, SupportingActorGroup};
pub use error::{PrefabError, Result};
pub use spec_loader::SpecLoader;
pub use tree::{ActorEntry, ActorKey, FabricationTree, ProcessorInvocation, ProcessorVariant, StaticContextRecord};

pub use assembler::{assemble, TemplateAssembler};
pub use processors::{apply_chain, AnnotationProcessor};

pub use build_plan::{BuildPlan, BuildPlanEntry, BuildReport, CommitHook, EntryState};
pub use runtime::{FabricatedEntity, FabricationRuntime, RuntimeParameters};

pub use generator::{GenerationReport, Generator};
pub use project_config::ProjectConfig;
