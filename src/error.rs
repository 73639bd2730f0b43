//! Error type shared by every fabrication stage.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::tree::ProcessorVariant;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, PrefabError>;

/// Everything that can stop an entity (or a whole run) from being fabricated.
#[derive(Error, Debug)]
pub enum PrefabError {
    #[error("Configuration error in {}: {message}", path.display())]
    Configuration { path: PathBuf, message: String },

    #[error("Merge conflict: actor '{actor}' already has an annotation processor keyed '{key}'")]
    MergeConflict { actor: String, key: String },

    #[error("Invalid actor key '{0}': keys must start with '<EntityName>/' and stay inside the entity directory")]
    InvalidActorKey(String),

    #[error("No template for actor '{actor}' (looked for {})", path.display())]
    TemplateResolution { actor: String, path: PathBuf },

    #[error("{processor} processor requires context field '{field}': {reason}")]
    ProcessorContext {
        processor: ProcessorVariant,
        field: String,
        reason: String,
    },

    #[error("{processor} processor could not find the '@prefab:{marker}' marker in its template")]
    TemplateMarker {
        processor: ProcessorVariant,
        marker: String,
    },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    #[error("Could not resolve project name: {0}")]
    ProjectName(String),

    #[error("Output of '{entity}' overlaps the output of '{other}'; nested entity directories cannot be committed independently")]
    PartitionOverlap { entity: String, other: String },

    #[error("Build worker failed: {0}")]
    Worker(String),
}

impl PrefabError {
    pub(crate) fn configuration(path: &Path, message: impl Into<String>) -> Self {
        PrefabError::Configuration {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        PrefabError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn missing_context(processor: ProcessorVariant, field: &str) -> Self {
        PrefabError::ProcessorContext {
            processor,
            field: field.to_string(),
            reason: "field is missing".to_string(),
        }
    }

    pub(crate) fn malformed_context(
        processor: ProcessorVariant,
        field: &str,
        reason: impl Into<String>,
    ) -> Self {
        PrefabError::ProcessorContext {
            processor,
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Attach a path to a raw `io::Error`
pub(crate) trait IoResultExt<T> {
    fn at_path(self, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at_path(self, path: &Path) -> Result<T> {
        self.map_err(|e| PrefabError::io(path, e))
    }
}
