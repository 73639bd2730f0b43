//! The fabrication tree: supporting actors, their annotation processor chains
//! and each processor's static context record.
//!
//! The serialized form is the hand-off contract consumed by the runtime:
//!
//! ```yaml
//! supporting_actors:
//!   <EntityName>/Builder.php:
//!     annotation_processors:
//!       Builder:
//!         processor: Builder
//!         static_context_record:
//!           properties:
//!             name:
//!               nullable: false
//! ```

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{PrefabError, Result};

/// Placeholder occupying the first segment of every actor key
pub const ENTITY_NAME_PLACEHOLDER: &str = "<EntityName>";

/// Directory under the template root that mirrors the actor key layout
pub const TEMPLATE_ACTOR_DIRECTORY: &str = "Actor";

/// Relative output path of one supporting actor, e.g. `<EntityName>/Map/Repository.php`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ActorKey(String);

impl ActorKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path below the entity directory, with the placeholder segment removed.
    ///
    /// Rejects keys that are not rooted at the placeholder or that would
    /// escape the entity directory.
    pub fn entity_relative_path(&self) -> Result<PathBuf> {
        let rest = self
            .0
            .strip_prefix(ENTITY_NAME_PLACEHOLDER)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| PrefabError::InvalidActorKey(self.0.clone()))?;

        let relative = Path::new(rest);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(PrefabError::InvalidActorKey(self.0.clone()));
        }

        Ok(relative.to_path_buf())
    }

    /// Template file bound to this actor, relative to the template root
    pub fn template_path(&self) -> Result<PathBuf> {
        Ok(Path::new(TEMPLATE_ACTOR_DIRECTORY).join(self.entity_relative_path()?))
    }

    /// Output path with the placeholder replaced by `entity_name`
    pub fn output_path(&self, entity_name: &str) -> Result<PathBuf> {
        Ok(Path::new(entity_name).join(self.entity_relative_path()?))
    }
}

impl fmt::Display for ActorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// The closed set of annotation processors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ProcessorVariant {
    Namespace,
    Builder,
    Repository,
    RepositoryInterface,
    HandlerInterface,
    RepositoryUpdateElementIdentityField,
}

impl ProcessorVariant {
    pub const ALL: [ProcessorVariant; 6] = [
        ProcessorVariant::Namespace,
        ProcessorVariant::Builder,
        ProcessorVariant::Repository,
        ProcessorVariant::RepositoryInterface,
        ProcessorVariant::HandlerInterface,
        ProcessorVariant::RepositoryUpdateElementIdentityField,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ProcessorVariant::Namespace => "Namespace",
            ProcessorVariant::Builder => "Builder",
            ProcessorVariant::Repository => "Repository",
            ProcessorVariant::RepositoryInterface => "RepositoryInterface",
            ProcessorVariant::HandlerInterface => "HandlerInterface",
            ProcessorVariant::RepositoryUpdateElementIdentityField => "RepositoryUpdateElementIdentityField",
        }
    }
}

impl fmt::Display for ProcessorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Payload handed to one processor invocation
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct StaticContextRecord(IndexMap<String, Value>);

impl StaticContextRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// A field that must be present
    pub fn require(&self, processor: ProcessorVariant, field: &str) -> Result<&Value> {
        match self.0.get(field) {
            None | Some(Value::Null) => Err(PrefabError::missing_context(processor, field)),
            Some(value) => Ok(value),
        }
    }

    /// A string field that must be present
    pub fn require_str(&self, processor: ProcessorVariant, field: &str) -> Result<&str> {
        self.require(processor, field)?
            .as_str()
            .ok_or_else(|| PrefabError::malformed_context(processor, field, "expected a string"))
    }

    /// A string field that may be absent
    pub fn optional_str(&self, processor: ProcessorVariant, field: &str) -> Result<Option<&str>> {
        match self.0.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| PrefabError::malformed_context(processor, field, "expected a string")),
        }
    }

    /// A sequence-of-strings field that must be present
    pub fn require_str_list(&self, processor: ProcessorVariant, field: &str) -> Result<Vec<&str>> {
        let items = self
            .require(processor, field)?
            .as_sequence()
            .ok_or_else(|| PrefabError::malformed_context(processor, field, "expected a list"))?;

        items
            .iter()
            .map(|item| {
                item.as_str().ok_or_else(|| {
                    PrefabError::malformed_context(processor, field, "expected a list of strings")
                })
            })
            .collect()
    }
}

/// One annotation processor bound to an actor
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProcessorInvocation {
    pub processor: ProcessorVariant,
    #[serde(default)]
    pub static_context_record: StaticContextRecord,
}

impl ProcessorInvocation {
    pub fn new(processor: ProcessorVariant, static_context_record: StaticContextRecord) -> Self {
        Self {
            processor,
            static_context_record,
        }
    }
}

/// An actor's processor chain, in application order
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ActorEntry {
    #[serde(default)]
    pub annotation_processors: IndexMap<String, ProcessorInvocation>,
}

impl ActorEntry {
    pub fn is_empty(&self) -> bool {
        self.annotation_processors.is_empty()
    }

    pub fn invocation(&self, key: &str) -> Option<&ProcessorInvocation> {
        self.annotation_processors.get(key)
    }
}

/// Every supporting actor for one entity
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FabricationTree {
    #[serde(default)]
    pub supporting_actors: IndexMap<ActorKey, ActorEntry>,
}

impl FabricationTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an actor with an empty chain if it is not already present
    pub fn ensure_actor(&mut self, actor: impl Into<ActorKey>) -> &mut ActorEntry {
        self.supporting_actors.entry(actor.into()).or_default()
    }

    /// Append one invocation to an actor's chain, creating the actor if needed.
    ///
    /// A key that is already present on that actor is a merge conflict.
    pub fn attach(
        &mut self,
        actor: impl Into<ActorKey>,
        key: impl Into<String>,
        invocation: ProcessorInvocation,
    ) -> Result<()> {
        let actor = actor.into();
        let key = key.into();

        let entry = self.supporting_actors.entry(actor.clone()).or_default();
        match entry.annotation_processors.entry(key) {
            Entry::Occupied(occupied) => Err(PrefabError::MergeConflict {
                actor: actor.to_string(),
                key: occupied.key().clone(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(invocation);
                Ok(())
            }
        }
    }

    /// Deep union of `other` into `self`.
    ///
    /// Missing actors are created, existing siblings are kept and chains are
    /// extended in `other`'s order. Fails on the first invocation key that
    /// both trees define for the same actor.
    pub fn merge(&mut self, other: FabricationTree) -> Result<()> {
        for (actor, entry) in other.supporting_actors {
            self.ensure_actor(actor.clone());
            for (key, invocation) in entry.annotation_processors {
                self.attach(actor.clone(), key, invocation)?;
            }
        }
        Ok(())
    }

    pub fn actor(&self, actor: &str) -> Option<&ActorEntry> {
        self.supporting_actors.get(&ActorKey::new(actor))
    }

    pub fn actor_keys(&self) -> impl Iterator<Item = &ActorKey> {
        self.supporting_actors.keys()
    }

    /// Every invocation of `variant`, with its actor and key
    pub fn invocations_of(
        &self,
        variant: ProcessorVariant,
    ) -> impl Iterator<Item = (&ActorKey, &str, &ProcessorInvocation)> {
        self.supporting_actors.iter().flat_map(move |(actor, entry)| {
            entry
                .annotation_processors
                .iter()
                .filter(move |(_, invocation)| invocation.processor == variant)
                .map(move |(key, invocation)| (actor, key.as_str(), invocation))
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namespace_invocation(namespace: &str) -> ProcessorInvocation {
        ProcessorInvocation::new(
            ProcessorVariant::Namespace,
            StaticContextRecord::new()
                .with("project_name", "Acme")
                .with("namespace", namespace),
        )
    }

    #[test]
    fn test_actor_key_paths() {
        let key = ActorKey::new("<EntityName>/Map/Repository.php");
        assert_eq!(key.template_path().unwrap(), PathBuf::from("Actor/Map/Repository.php"));
        assert_eq!(key.output_path("User").unwrap(), PathBuf::from("User/Map/Repository.php"));
    }

    #[test]
    fn test_actor_key_must_be_rooted_at_placeholder() {
        for bad in ["Map/Repository.php", "<EntityName>", "<EntityName>/", "<EntityName>/../escape.php", "/<EntityName>/x"] {
            let err = ActorKey::new(bad).entity_relative_path().unwrap_err();
            assert!(matches!(err, PrefabError::InvalidActorKey(_)), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_attach_rejects_duplicate_key() {
        let mut tree = FabricationTree::new();
        tree.attach("<EntityName>/Handler.php", "Namespace", namespace_invocation("A")).unwrap();

        let err = tree
            .attach("<EntityName>/Handler.php", "Namespace", namespace_invocation("B"))
            .unwrap_err();

        match err {
            PrefabError::MergeConflict { actor, key } => {
                assert_eq!(actor, "<EntityName>/Handler.php");
                assert_eq!(key, "Namespace");
            }
            other => panic!("unexpected error: {other}"),
        }

        let kept = tree.actor("<EntityName>/Handler.php").unwrap().invocation("Namespace").unwrap();
        assert_eq!(kept.static_context_record.get("namespace"), Some(&Value::from("A")));
    }

    #[test]
    fn test_same_key_on_different_actors_is_not_a_conflict() {
        let mut tree = FabricationTree::new();
        tree.attach("<EntityName>/A.php", "Namespace", namespace_invocation("A")).unwrap();
        tree.attach("<EntityName>/B.php", "Namespace", namespace_invocation("A")).unwrap();
        assert_eq!(tree.supporting_actors.len(), 2);
    }

    #[test]
    fn test_merge_keeps_siblings_and_order() {
        let mut base = FabricationTree::new();
        base.ensure_actor("<EntityName>/AwareTrait.php");
        base.attach("<EntityName>/Handler.php", "Namespace-First", namespace_invocation("A")).unwrap();

        let mut step = FabricationTree::new();
        step.attach("<EntityName>/Handler.php", "Namespace-Second", namespace_invocation("B")).unwrap();
        step.attach("<EntityName>/Builder.php", "Builder", ProcessorInvocation::new(ProcessorVariant::Builder, StaticContextRecord::new())).unwrap();

        base.merge(step).unwrap();

        let actors: Vec<&str> = base.actor_keys().map(ActorKey::as_str).collect();
        assert_eq!(actors, vec!["<EntityName>/AwareTrait.php", "<EntityName>/Handler.php", "<EntityName>/Builder.php"]);

        let chain: Vec<&String> = base
            .actor("<EntityName>/Handler.php")
            .unwrap()
            .annotation_processors
            .keys()
            .collect();
        assert_eq!(chain, vec!["Namespace-First", "Namespace-Second"]);
    }

    #[test]
    fn test_merge_conflict_is_reported() {
        let mut base = FabricationTree::new();
        base.attach("<EntityName>/Handler.php", "Namespace", namespace_invocation("A")).unwrap();

        let mut step = FabricationTree::new();
        step.attach("<EntityName>/Handler.php", "Namespace", namespace_invocation("B")).unwrap();

        assert!(matches!(base.merge(step), Err(PrefabError::MergeConflict { .. })));
    }

    #[test]
    fn test_yaml_shape_and_round_trip() {
        let mut tree = FabricationTree::new();
        tree.ensure_actor("<EntityName>/Factory.php");
        tree.attach("<EntityName>/Handler.php", "Namespace", namespace_invocation("A")).unwrap();

        let yaml = tree.to_yaml().unwrap();
        assert!(yaml.starts_with("supporting_actors:"));
        assert!(yaml.contains("annotation_processors"));
        assert!(yaml.contains("processor: Namespace"));
        assert!(yaml.contains("static_context_record"));

        let parsed = FabricationTree::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, tree);
    }

    #[test]
    fn test_context_accessors() {
        let record = StaticContextRecord::new()
            .with("project_name", "Acme")
            .with("namespaces", vec![Value::from("A"), Value::from("B")])
            .with("count", 3);

        assert_eq!(record.require_str(ProcessorVariant::Repository, "project_name").unwrap(), "Acme");
        assert_eq!(record.require_str_list(ProcessorVariant::Repository, "namespaces").unwrap(), vec!["A", "B"]);
        assert_eq!(record.optional_str(ProcessorVariant::Repository, "absent").unwrap(), None);
        assert!(matches!(
            record.require_str(ProcessorVariant::Repository, "count"),
            Err(PrefabError::ProcessorContext { .. })
        ));
        assert!(matches!(
            record.require(ProcessorVariant::Repository, "absent"),
            Err(PrefabError::ProcessorContext { .. })
        ));
    }
}
