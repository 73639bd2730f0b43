//! Identity-aware update clause for the repository.

use crate::error::{PrefabError, Result};
use crate::processors::{markers, quote_single, AnnotationProcessor};
use crate::tree::{ProcessorVariant, StaticContextRecord};

pub const CONTEXT_IDENTITY_FIELD: &str = "identity_field";

/// Restricts the repository's update query to the identity field.
///
/// An empty context (no identity field on the DAO) contributes nothing and
/// does not need the marker.
pub struct RepositoryUpdateElementIdentityFieldProcessor;

fn update_clause(identity_field: &str) -> String {
    let column = quote_single(identity_field);
    format!(
        "$updateQueryBuilder->where(\n\
         \x20   $updateQueryBuilder->expr()->eq(\n\
         \x20       {column},\n\
         \x20       $updateQueryBuilder->createNamedParameter($record[{column}])\n\
         \x20   )\n\
         );"
    )
}

impl AnnotationProcessor for RepositoryUpdateElementIdentityFieldProcessor {
    fn variant(&self) -> ProcessorVariant {
        ProcessorVariant::RepositoryUpdateElementIdentityField
    }

    fn process(&self, template: &str, context: &StaticContextRecord) -> Result<String> {
        let identity_field = match context.optional_str(self.variant(), CONTEXT_IDENTITY_FIELD)? {
            Some(field) => field,
            None => return Ok(template.to_string()),
        };

        markers::insert_at_marker(template, markers::UPDATE_IDENTITY, &[update_clause(identity_field)])
            .ok_or_else(|| PrefabError::TemplateMarker {
                processor: self.variant(),
                marker: markers::UPDATE_IDENTITY.to_string(),
            })
    }
}
