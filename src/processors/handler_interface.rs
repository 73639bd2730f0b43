//! Route constants on the repository handler interface.

use crate::error::{PrefabError, Result};
use crate::processors::{markers, quote_single, AnnotationProcessor};
use crate::tree::{ProcessorVariant, StaticContextRecord};
use crate::utils::to_screaming_snake_case;

pub const CONTEXT_ROUTE_PATH: &str = "route_path";
pub const CONTEXT_ROUTE_NAME: &str = "route_name";

pub struct HandlerInterfaceProcessor;

impl AnnotationProcessor for HandlerInterfaceProcessor {
    fn variant(&self) -> ProcessorVariant {
        ProcessorVariant::HandlerInterface
    }

    fn process(&self, template: &str, context: &StaticContextRecord) -> Result<String> {
        let route_path = context.require_str(self.variant(), CONTEXT_ROUTE_PATH)?;
        let route_name = context.require_str(self.variant(), CONTEXT_ROUTE_NAME)?;

        let suffix = to_screaming_snake_case(route_name);
        let declarations = vec![
            format!("public const ROUTE_PATH_{} = {};", suffix, quote_single(route_path)),
            format!("public const ROUTE_NAME_{} = {};", suffix, quote_single(route_name)),
        ];

        markers::insert_at_marker(template, markers::ROUTE, &declarations).ok_or_else(|| {
            PrefabError::TemplateMarker {
                processor: self.variant(),
                marker: markers::ROUTE.to_string(),
            }
        })
    }
}
