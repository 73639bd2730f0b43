//! Annotation processors.
//!
//! Each [`ProcessorVariant`] maps to exactly one stateless processor. A
//! processor is a pure transform from template text plus its static context
//! record to new template text; chains apply them in tree order.

pub mod builder;
pub mod handler_interface;
pub mod identity_field;
pub mod markers;
pub mod namespace;
pub mod repository;

use tracing::debug;

use crate::error::{PrefabError, Result};
use crate::tree::{ActorEntry, ProcessorVariant, StaticContextRecord};

pub use builder::BuilderProcessor;
pub use handler_interface::HandlerInterfaceProcessor;
pub use identity_field::RepositoryUpdateElementIdentityFieldProcessor;
pub use namespace::NamespaceProcessor;
pub use repository::{RepositoryInterfaceProcessor, RepositoryProcessor};

/// Token inside fixed namespaces that is replaced by the project name
pub const PROJECT_NAME_TOKEN: &str = "PROJECTNAME";

/// A context-driven template transform
pub trait AnnotationProcessor: Send + Sync {
    /// The tag this processor is selected by
    fn variant(&self) -> ProcessorVariant;

    /// Transform `template` using `context`
    fn process(&self, template: &str, context: &StaticContextRecord) -> Result<String>;
}

impl ProcessorVariant {
    /// The processor implementing this variant
    pub fn processor(self) -> &'static dyn AnnotationProcessor {
        match self {
            ProcessorVariant::Namespace => &NamespaceProcessor,
            ProcessorVariant::Builder => &BuilderProcessor,
            ProcessorVariant::Repository => &RepositoryProcessor,
            ProcessorVariant::RepositoryInterface => &RepositoryInterfaceProcessor,
            ProcessorVariant::HandlerInterface => &HandlerInterfaceProcessor,
            ProcessorVariant::RepositoryUpdateElementIdentityField => {
                &RepositoryUpdateElementIdentityFieldProcessor
            }
        }
    }
}

/// Run an actor's chain over `template`, each processor consuming the previous output
pub fn apply_chain(template: &str, entry: &ActorEntry) -> Result<String> {
    let mut text = template.to_string();
    for (key, invocation) in &entry.annotation_processors {
        debug!(invocation = %key, processor = %invocation.processor, "applying annotation processor");
        text = invocation
            .processor
            .processor()
            .process(&text, &invocation.static_context_record)?;
    }
    Ok(text)
}

/// Insert import lines at the `imports` marker, skipping any already present.
pub(crate) fn insert_imports(variant: ProcessorVariant, template: &str, lines: Vec<String>) -> Result<String> {
    let mut pending: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        if !markers::contains_line(template, &line) && !pending.contains(&line) {
            pending.push(line);
        }
    }

    if pending.is_empty() {
        return Ok(template.to_string());
    }

    markers::insert_at_marker(template, markers::IMPORTS, &pending).ok_or_else(|| {
        PrefabError::TemplateMarker {
            processor: variant,
            marker: markers::IMPORTS.to_string(),
        }
    })
}

/// Escape a value for a single-quoted string literal in generated code
pub(crate) fn quote_single(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
