//! Template assembler.
//!
//! Turns one [`ConfigurationRecord`] into its [`FabricationTree`]. Assembly
//! starts from the baseline actor set and merges one small tree per step into
//! it; every merge is a checked deep union, so two steps that target the same
//! invocation key on the same actor fail with a merge conflict instead of
//! overwriting each other.

use tracing::debug;

use crate::configuration::{ConfigurationRecord, SupportingActorGroup};
use crate::context_builders::{
    builder_context, handler_interface_context, identity_field_context, namespace_context,
    repository_context,
};
use crate::error::Result;
use crate::tree::{FabricationTree, ProcessorInvocation, ProcessorVariant};

/// Actor keys of the supporting actors
pub mod actor_keys {
    pub const AWARE_TRAIT: &str = "<EntityName>/AwareTrait.php";
    pub const FACTORY: &str = "<EntityName>/Factory.php";
    pub const BUILDER: &str = "<EntityName>/Builder.php";
    pub const MAP: &str = "<EntityName>/Map.php";
    pub const MAP_FACTORY_SERVICE_FILE: &str = "<EntityName>/Map/Factory.service.yml";
    pub const REPOSITORY: &str = "<EntityName>/Map/Repository.php";
    pub const REPOSITORY_INTERFACE: &str = "<EntityName>/Map/RepositoryInterface.php";
    pub const REPOSITORY_SERVICE_FILE: &str = "<EntityName>/Map/Repository.service.yml";
    pub const HANDLER: &str = "<EntityName>/Map/Repository/Handler.php";
    pub const HANDLER_INTERFACE: &str = "<EntityName>/Map/Repository/HandlerInterface.php";
    pub const HANDLER_SERVICE_FILE: &str = "<EntityName>/Map/Repository/Handler.service.yml";
}

/// Invocation keys used within each actor's chain
pub mod invocation_keys {
    pub const BUILDER: &str = "Builder";
    pub const HANDLER: &str = "Handler";
    pub const HANDLER_INTERFACE: &str = "HandlerInterface";
    pub const NAMESPACE: &str = "Namespace";
    pub const REPOSITORY: &str = "Repository";
    pub const REPOSITORY_INTERFACE: &str = "RepositoryInterface";
    pub const REPOSITORY_UPDATE_ELEMENT_IDENTITY_FIELD: &str = "RepositoryUpdateElementIdentityField";
}

/// Baseline actors: key and whether it belongs to the map machinery
const BASELINE_ACTORS: &[(&str, bool)] = &[
    (actor_keys::AWARE_TRAIT, false),
    (actor_keys::FACTORY, false),
    (actor_keys::BUILDER, false),
    (actor_keys::MAP, true),
    (actor_keys::MAP_FACTORY_SERVICE_FILE, true),
    (actor_keys::HANDLER, true),
    (actor_keys::HANDLER_SERVICE_FILE, true),
    (actor_keys::REPOSITORY, true),
    (actor_keys::REPOSITORY_INTERFACE, true),
    (actor_keys::REPOSITORY_SERVICE_FILE, true),
];

const HANDLER_IMPORTS: [(&str, &str); 2] = [
    (
        "Http\\Message",
        "use \\Neighborhoods\\PROJECTNAME\\Prefab5\\Psr\\Http\\Message\\ServerRequest\\AwareTrait;",
    ),
    (
        "SearchCriteria",
        "use \\Neighborhoods\\PROJECTNAME\\Prefab5\\SearchCriteria\\ServerRequest\\Builder\\Factory\\AwareTrait;",
    ),
];

const HANDLER_SERVICE_FILE_IMPORT: &str =
    "- [setSearchCriteriaServerRequestBuilderFactory, ['@Neighborhoods\\PROJECTNAME\\Prefab5\\SearchCriteria\\ServerRequest\\Builder\\FactoryInterface']]";

const REPOSITORY_SERVICE_FILE_IMPORTS: [(&str, &str); 2] = [
    (
        "DbalConnection",
        "- [setDoctrineDBALConnectionDecoratorRepository, ['@Neighborhoods\\PROJECTNAME\\Prefab5\\Doctrine\\DBAL\\Connection\\Decorator\\RepositoryInterface']]",
    ),
    (
        "SearchCriteria",
        "- [setSearchCriteriaDoctrineDBALQueryQueryBuilderBuilderFactory, ['@Neighborhoods\\PROJECTNAME\\Prefab5\\SearchCriteria\\Doctrine\\DBAL\\Query\\QueryBuilder\\Builder\\FactoryInterface']]",
    ),
];

const REPOSITORY_NAMESPACES: [&str; 3] = [
    "Neighborhoods\\PROJECTNAME\\Prefab5\\Doctrine",
    "Neighborhoods\\PROJECTNAME\\Prefab5\\SearchCriteriaInterface",
    "Neighborhoods\\PROJECTNAME\\Prefab5\\SearchCriteria",
];

const REPOSITORY_INTERFACE_NAMESPACES: [&str; 1] = ["Neighborhoods\\PROJECTNAME\\Prefab5\\SearchCriteriaInterface"];

/// The actors every entity of `group` starts with, all with empty chains
pub fn baseline_tree(group: SupportingActorGroup) -> FabricationTree {
    let mut tree = FabricationTree::new();
    for (actor, is_map_actor) in BASELINE_ACTORS {
        if !is_map_actor || group.includes_map_actors() {
            tree.ensure_actor(*actor);
        }
    }
    tree
}

/// Builds the fabrication tree for one configuration record
pub struct TemplateAssembler<'a> {
    record: &'a ConfigurationRecord,
}

impl<'a> TemplateAssembler<'a> {
    pub fn new(record: &'a ConfigurationRecord) -> Self {
        Self { record }
    }

    /// Run every assembly step over the baseline tree
    pub fn assemble(&self) -> Result<FabricationTree> {
        let group = self.record.actor_group();
        let mut tree = baseline_tree(group);

        self.merge_step(&mut tree, "builder", self.builder_step()?)?;

        if group.includes_map_actors() {
            self.merge_step(&mut tree, "handler", self.handler_step()?)?;
            if let Some(step) = self.handler_interface_step()? {
                self.merge_step(&mut tree, "handler-interface", step)?;
            }
            self.merge_step(&mut tree, "handler-service-file", self.handler_service_file_step()?)?;
            self.merge_step(&mut tree, "repository", self.repository_step()?)?;
            self.merge_step(&mut tree, "identity-field", self.identity_field_step()?)?;
            self.merge_step(&mut tree, "repository-interface", self.repository_interface_step()?)?;
            self.merge_step(&mut tree, "repository-service-file", self.repository_service_file_step()?)?;
        }

        Ok(tree)
    }

    fn merge_step(&self, tree: &mut FabricationTree, step: &str, fragment: FabricationTree) -> Result<()> {
        debug!(
            table = %self.record.table_name,
            step,
            actors = fragment.supporting_actors.len(),
            "merging assembly step"
        );
        tree.merge(fragment)
    }

    fn project_name(&self) -> &str {
        &self.record.project_name
    }

    pub fn builder_step(&self) -> Result<FabricationTree> {
        let mut step = FabricationTree::new();
        step.attach(
            actor_keys::BUILDER,
            invocation_keys::BUILDER,
            ProcessorInvocation::new(ProcessorVariant::Builder, builder_context(self.record)),
        )?;
        Ok(step)
    }

    pub fn handler_step(&self) -> Result<FabricationTree> {
        let mut step = FabricationTree::new();
        for (import_key, namespace) in HANDLER_IMPORTS {
            step.attach(
                actor_keys::HANDLER,
                format!("{}-{}", invocation_keys::HANDLER, import_key),
                ProcessorInvocation::new(
                    ProcessorVariant::Namespace,
                    namespace_context(self.project_name(), namespace),
                ),
            )?;
        }
        Ok(step)
    }

    pub fn handler_service_file_step(&self) -> Result<FabricationTree> {
        let mut step = FabricationTree::new();
        step.attach(
            actor_keys::HANDLER_SERVICE_FILE,
            invocation_keys::NAMESPACE,
            ProcessorInvocation::new(
                ProcessorVariant::Namespace,
                namespace_context(self.project_name(), HANDLER_SERVICE_FILE_IMPORT),
            ),
        )?;
        Ok(step)
    }

    pub fn repository_step(&self) -> Result<FabricationTree> {
        let mut step = FabricationTree::new();
        step.attach(
            actor_keys::REPOSITORY,
            invocation_keys::REPOSITORY,
            ProcessorInvocation::new(
                ProcessorVariant::Repository,
                repository_context(self.project_name(), &REPOSITORY_NAMESPACES),
            ),
        )?;
        Ok(step)
    }

    pub fn repository_interface_step(&self) -> Result<FabricationTree> {
        let mut step = FabricationTree::new();
        step.attach(
            actor_keys::REPOSITORY_INTERFACE,
            invocation_keys::REPOSITORY_INTERFACE,
            ProcessorInvocation::new(
                ProcessorVariant::RepositoryInterface,
                repository_context(self.project_name(), &REPOSITORY_INTERFACE_NAMESPACES),
            ),
        )?;
        Ok(step)
    }

    pub fn repository_service_file_step(&self) -> Result<FabricationTree> {
        let mut step = FabricationTree::new();
        for (import_key, namespace) in REPOSITORY_SERVICE_FILE_IMPORTS {
            step.attach(
                actor_keys::REPOSITORY_SERVICE_FILE,
                format!("{}-{}", invocation_keys::NAMESPACE, import_key),
                ProcessorInvocation::new(
                    ProcessorVariant::Namespace,
                    namespace_context(self.project_name(), namespace),
                ),
            )?;
        }
        Ok(step)
    }

    /// Present only when the record has both a route path and a route name
    pub fn handler_interface_step(&self) -> Result<Option<FabricationTree>> {
        let Some(context) = handler_interface_context(self.record) else {
            return Ok(None);
        };

        let mut step = FabricationTree::new();
        step.attach(
            actor_keys::HANDLER_INTERFACE,
            invocation_keys::HANDLER_INTERFACE,
            ProcessorInvocation::new(ProcessorVariant::HandlerInterface, context),
        )?;
        Ok(Some(step))
    }

    /// Always present; the context is empty without an identity field
    pub fn identity_field_step(&self) -> Result<FabricationTree> {
        let mut step = FabricationTree::new();
        step.attach(
            actor_keys::REPOSITORY,
            invocation_keys::REPOSITORY_UPDATE_ELEMENT_IDENTITY_FIELD,
            ProcessorInvocation::new(
                ProcessorVariant::RepositoryUpdateElementIdentityField,
                identity_field_context(self.record),
            ),
        )?;
        Ok(step)
    }
}

/// Assemble the fabrication tree for `record`
pub fn assemble(record: &ConfigurationRecord) -> Result<FabricationTree> {
    TemplateAssembler::new(record).assemble()
}
