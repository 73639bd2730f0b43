//! Single import insertion.

use crate::error::Result;
use crate::processors::{insert_imports, AnnotationProcessor, PROJECT_NAME_TOKEN};
use crate::tree::{ProcessorVariant, StaticContextRecord};

pub const CONTEXT_PROJECT_NAME: &str = "project_name";
pub const CONTEXT_NAMESPACE: &str = "namespace";

/// Inserts one fully-qualified import line at the `imports` marker.
///
/// The `namespace` context value is used verbatim (so it can be a PHP `use`
/// statement or a service reference line) after `PROJECTNAME` is replaced.
pub struct NamespaceProcessor;

impl AnnotationProcessor for NamespaceProcessor {
    fn variant(&self) -> ProcessorVariant {
        ProcessorVariant::Namespace
    }

    fn process(&self, template: &str, context: &StaticContextRecord) -> Result<String> {
        let project_name = context.require_str(self.variant(), CONTEXT_PROJECT_NAME)?;
        let namespace = context.require_str(self.variant(), CONTEXT_NAMESPACE)?;

        let line = namespace.replace(PROJECT_NAME_TOKEN, project_name);
        insert_imports(self.variant(), template, vec![line])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrefabError;

    fn context(namespace: &str) -> StaticContextRecord {
        StaticContextRecord::new()
            .with(CONTEXT_PROJECT_NAME, "Acme")
            .with(CONTEXT_NAMESPACE, namespace)
    }

    #[test]
    fn test_inserts_import_with_project_name() {
        let template = "class Handler\n{\n    // @prefab:imports\n}\n";
        let output = NamespaceProcessor
            .process(template, &context("use \\Neighborhoods\\PROJECTNAME\\Prefab5\\AwareTrait;"))
            .unwrap();

        assert!(output.contains("    use \\Neighborhoods\\Acme\\Prefab5\\AwareTrait;\n    // @prefab:imports"));
    }

    #[test]
    fn test_does_not_duplicate_existing_import() {
        let template = "use A;\n// @prefab:imports\n";
        let output = NamespaceProcessor.process(template, &context("use A;")).unwrap();
        assert_eq!(output, template);
    }

    #[test]
    fn test_missing_namespace_field() {
        let ctx = StaticContextRecord::new().with(CONTEXT_PROJECT_NAME, "Acme");
        let err = NamespaceProcessor.process("// @prefab:imports\n", &ctx).unwrap_err();
        assert!(matches!(err, PrefabError::ProcessorContext { ref field, .. } if field == "namespace"));
    }

    #[test]
    fn test_missing_marker() {
        let err = NamespaceProcessor.process("class Handler {}\n", &context("use A;")).unwrap_err();
        assert!(matches!(err, PrefabError::TemplateMarker { ref marker, .. } if marker == "imports"));
    }
}
