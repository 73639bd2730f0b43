//! Ordered import lists for repositories and their interfaces.

use crate::error::Result;
use crate::processors::{insert_imports, AnnotationProcessor, PROJECT_NAME_TOKEN};
use crate::tree::{ProcessorVariant, StaticContextRecord};

pub const CONTEXT_PROJECT_NAME: &str = "project_name";
pub const CONTEXT_NAMESPACES: &str = "namespaces";

// Later entries may alias over earlier ones, so list order is preserved.
fn import_namespaces(variant: ProcessorVariant, template: &str, context: &StaticContextRecord) -> Result<String> {
    let project_name = context.require_str(variant, CONTEXT_PROJECT_NAME)?;
    let namespaces = context.require_str_list(variant, CONTEXT_NAMESPACES)?;

    let lines = namespaces
        .into_iter()
        .map(|namespace| format!("use {};", namespace.replace(PROJECT_NAME_TOKEN, project_name)))
        .collect();

    insert_imports(variant, template, lines)
}

pub struct RepositoryProcessor;

impl AnnotationProcessor for RepositoryProcessor {
    fn variant(&self) -> ProcessorVariant {
        ProcessorVariant::Repository
    }

    fn process(&self, template: &str, context: &StaticContextRecord) -> Result<String> {
        import_namespaces(self.variant(), template, context)
    }
}

pub struct RepositoryInterfaceProcessor;

impl AnnotationProcessor for RepositoryInterfaceProcessor {
    fn variant(&self) -> ProcessorVariant {
        ProcessorVariant::RepositoryInterface
    }

    fn process(&self, template: &str, context: &StaticContextRecord) -> Result<String> {
        import_namespaces(self.variant(), template, context)
    }
}
