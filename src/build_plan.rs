//! Build plan: one runtime pass per entity.
//!
//! Entries are independent and each is atomic, so they run concurrently on
//! blocking worker tasks bounded by a semaphore. Cancellation is honoured
//! between entities only; an entity that has started always finishes (or
//! fails) as a whole.
//!
//! Every entity commits by replacing its whole output directory, so two
//! entries whose directories nest (`Users/User` and `Users/User/Address`)
//! would clobber each other. Such entries fail before anything is written.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::configuration::EntityLocation;
use crate::error::{PrefabError, Result};
use crate::runtime::{FabricatedEntity, FabricationRuntime};
use crate::tree::FabricationTree;

/// Default number of entities fabricated at once
pub const DEFAULT_WORKERS: usize = 4;

/// Lifecycle of one entry; there is no retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Constructed,
    Executing,
    Completed,
    Failed,
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryState::Constructed => write!(f, "constructed"),
            EntryState::Executing => write!(f, "executing"),
            EntryState::Completed => write!(f, "completed"),
            EntryState::Failed => write!(f, "failed"),
        }
    }
}

/// Called on the worker right after an entity commits
pub type CommitHook = Arc<dyn Fn(&FabricatedEntity) + Send + Sync>;

/// One entity's tree plus where it belongs.
///
/// `project_name` and `project_dir` record what the definition was loaded
/// with; output location and token values come from the runtime's
/// [`RuntimeParameters`](crate::runtime::RuntimeParameters).
#[derive(Debug, Clone)]
pub struct BuildPlanEntry {
    pub tree: FabricationTree,
    pub entity: EntityLocation,
    pub project_name: String,
    pub project_dir: PathBuf,
    state: EntryState,
}

impl BuildPlanEntry {
    pub fn new(
        tree: FabricationTree,
        entity: EntityLocation,
        project_name: impl Into<String>,
        project_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tree,
            entity,
            project_name: project_name.into(),
            project_dir: project_dir.into(),
            state: EntryState::Constructed,
        }
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn name(&self) -> String {
        self.entity.qualified_name()
    }

    fn overlaps(&self, other: &BuildPlanEntry) -> bool {
        let partition = self.entity.partition();
        let other = other.entity.partition();
        partition.starts_with(&other) || other.starts_with(&partition)
    }
}

/// Outcome of [`BuildPlan::execute`]
#[derive(Debug, Default)]
pub struct BuildReport {
    pub completed: Vec<FabricatedEntity>,
    /// Entity name and the error that stopped it
    pub failed: Vec<(String, PrefabError)>,
    /// Entities never started because of cancellation
    pub skipped: Vec<String>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Ordered set of entries executed against one runtime
pub struct BuildPlan {
    runtime: Arc<FabricationRuntime>,
    entries: Vec<BuildPlanEntry>,
    workers: usize,
    on_committed: Option<CommitHook>,
}

impl BuildPlan {
    pub fn new(runtime: FabricationRuntime) -> Self {
        Self {
            runtime: Arc::new(runtime),
            entries: Vec::new(),
            workers: DEFAULT_WORKERS,
            on_committed: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_commit_hook(mut self, hook: CommitHook) -> Self {
        self.on_committed = Some(hook);
        self
    }

    pub fn push(&mut self, entry: BuildPlanEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[BuildPlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every entry once. Failures are collected, never propagated to siblings.
    pub async fn execute(&mut self, cancel: &CancellationToken) -> BuildReport {
        info!(entities = self.entries.len(), workers = self.workers, "executing build plan");

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        let mut report = BuildReport::default();

        self.reject_overlapping_partitions(&mut report);

        for (index, entry) in self.entries.iter_mut().enumerate() {
            if entry.state != EntryState::Constructed {
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                break;
            };
            if cancel.is_cancelled() {
                break;
            }

            entry.state = EntryState::Executing;
            debug!(
                entity = %entry.name(),
                project = %entry.project_name,
                project_dir = %entry.project_dir.display(),
                "starting entity"
            );
            let runtime = Arc::clone(&self.runtime);
            let on_committed = self.on_committed.clone();
            let tree = entry.tree.clone();
            let entity = entry.entity.clone();

            tasks.spawn_blocking(move || {
                let _permit = permit;
                let result = runtime.fabricate(&tree, &entity);
                if let (Ok(fabricated), Some(hook)) = (&result, &on_committed) {
                    hook(fabricated);
                }
                (index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "build plan worker aborted");
                    continue;
                }
            };

            let entry = &mut self.entries[index];
            record_outcome(entry, result, &mut report);
        }

        // A worker that panicked never reported back
        for entry in self.entries.iter_mut() {
            if entry.state == EntryState::Executing {
                let error = PrefabError::Worker(format!("worker for '{}' did not finish", entry.name()));
                record_outcome(entry, Err(error), &mut report);
            }
        }

        for entry in &self.entries {
            if entry.state == EntryState::Constructed {
                report.skipped.push(entry.name());
            }
        }
        if !report.skipped.is_empty() {
            warn!(skipped = report.skipped.len(), "build plan cancelled before every entity started");
        }

        report.completed.sort_by(|a, b| a.directory.cmp(&b.directory));
        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "build plan finished"
        );
        report
    }

    /// Fail every pending entry whose output directory contains, or sits inside, another entry's
    fn reject_overlapping_partitions(&mut self, report: &mut BuildReport) {
        let overlapping: Vec<(usize, String)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.state == EntryState::Constructed)
            .filter_map(|(index, entry)| {
                self.entries
                    .iter()
                    .enumerate()
                    .find(|(other, candidate)| *other != index && entry.overlaps(candidate))
                    .map(|(_, candidate)| (index, candidate.name()))
            })
            .collect();

        for (index, other) in overlapping {
            let entry = &mut self.entries[index];
            let error = PrefabError::PartitionOverlap {
                entity: entry.name(),
                other,
            };
            record_outcome(entry, Err(error), report);
        }
    }
}

fn record_outcome(entry: &mut BuildPlanEntry, result: Result<FabricatedEntity>, report: &mut BuildReport) {
    match result {
        Ok(fabricated) => {
            entry.state = EntryState::Completed;
            report.completed.push(fabricated);
        }
        Err(e) => {
            entry.state = EntryState::Failed;
            warn!(entity = %entry.name(), error = %e, "entity failed");
            report.failed.push((entry.name(), e));
        }
    }
}
