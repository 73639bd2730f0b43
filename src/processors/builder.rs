//! Accessor and mutator generation for every DAO property.

use indexmap::IndexMap;
use serde_yaml::Value;

use crate::configuration::PropertyDef;
use crate::error::{PrefabError, Result};
use crate::processors::{markers, AnnotationProcessor};
use crate::tree::{ProcessorVariant, StaticContextRecord};
use crate::utils::to_pascal_case;

pub const CONTEXT_PROPERTIES: &str = "properties";

/// Emits one getter/setter pair per property at the `accessors` marker and,
/// when the template has one, a member declaration at the `properties` marker.
///
/// Non-nullable getters throw until their setter has run; nullable ones return
/// whatever was set, including null.
pub struct BuilderProcessor;

impl BuilderProcessor {
    fn properties(context: &StaticContextRecord) -> Result<IndexMap<String, PropertyDef>> {
        let variant = ProcessorVariant::Builder;
        let entries = context
            .require(variant, CONTEXT_PROPERTIES)?
            .as_mapping()
            .ok_or_else(|| PrefabError::malformed_context(variant, CONTEXT_PROPERTIES, "expected a mapping"))?;

        let mut properties = IndexMap::with_capacity(entries.len());
        for (name, options) in entries {
            let name = name.as_str().ok_or_else(|| {
                PrefabError::malformed_context(variant, CONTEXT_PROPERTIES, "property names must be strings")
            })?;
            let nullable = match options.get("nullable") {
                None | Some(Value::Null) => false,
                Some(Value::Bool(b)) => *b,
                Some(_) => {
                    return Err(PrefabError::malformed_context(
                        variant,
                        CONTEXT_PROPERTIES,
                        format!("'{}.nullable' must be a boolean", name),
                    ))
                }
            };
            properties.insert(name.to_string(), PropertyDef { nullable });
        }

        Ok(properties)
    }
}

fn declaration(name: &str) -> String {
    format!("protected ${};", name)
}

fn accessors(name: &str, property: PropertyDef) -> String {
    let method = to_pascal_case(name);

    let getter = if property.nullable {
        format!(
            "public function get{method}()\n\
             {{\n\
             \x20   return $this->{name};\n\
             }}\n"
        )
    } else {
        format!(
            "public function get{method}()\n\
             {{\n\
             \x20   if ($this->{name} === null) {{\n\
             \x20       throw new \\LogicException('{method} has not been set.');\n\
             \x20   }}\n\
             \x20   return $this->{name};\n\
             }}\n"
        )
    };

    let parameter = if property.nullable {
        format!("${name} = null")
    } else {
        format!("${name}")
    };

    let setter = format!(
        "public function set{method}({parameter}) : self\n\
         {{\n\
         \x20   $this->{name} = ${name};\n\
         \x20   return $this;\n\
         }}\n"
    );

    format!("{getter}\n{setter}")
}

impl AnnotationProcessor for BuilderProcessor {
    fn variant(&self) -> ProcessorVariant {
        ProcessorVariant::Builder
    }

    fn process(&self, template: &str, context: &StaticContextRecord) -> Result<String> {
        let properties = Self::properties(context)?;
        if properties.is_empty() {
            return Ok(template.to_string());
        }

        let mut text = template.to_string();

        if markers::has_marker(&text, markers::PROPERTIES) {
            let declarations: Vec<String> = properties.keys().map(|name| declaration(name)).collect();
            if let Some(updated) = markers::insert_at_marker(&text, markers::PROPERTIES, &declarations) {
                text = updated;
            }
        }

        let methods: Vec<String> = properties
            .iter()
            .map(|(name, property)| accessors(name, *property))
            .collect();
        let methods = vec![methods.join("\n")];

        markers::insert_at_marker(&text, markers::ACCESSORS, &methods).ok_or_else(|| PrefabError::TemplateMarker {
            processor: self.variant(),
            marker: markers::ACCESSORS.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Mapping;

    const TEMPLATE: &str = "class Builder\n{\n    // @prefab:properties\n\n    // @prefab:accessors\n}\n";

    fn context(properties: &[(&str, bool)]) -> StaticContextRecord {
        let mut mapping = Mapping::new();
        for (name, nullable) in properties {
            let mut options = Mapping::new();
            options.insert(Value::from("nullable"), Value::from(*nullable));
            mapping.insert(Value::from(*name), Value::Mapping(options));
        }
        StaticContextRecord::new().with(CONTEXT_PROPERTIES, Value::Mapping(mapping))
    }

    #[test]
    fn test_accessor_pair_per_property() {
        let output = BuilderProcessor
            .process(TEMPLATE, &context(&[("name", false), ("bio", true)]))
            .unwrap();

        assert!(output.contains("    protected $name;\n    protected $bio;\n"));
        assert!(output.contains("    public function getName()"));
        assert!(output.contains("    public function setName($name) : self"));
        assert!(output.contains("    public function getBio()"));
        assert!(output.contains("    public function setBio($bio = null) : self"));
        assert!(output.find("getName").unwrap() < output.find("getBio").unwrap());
    }

    #[test]
    fn test_non_nullable_getter_guards_unset_field() {
        let output = BuilderProcessor.process(TEMPLATE, &context(&[("first_name", false)])).unwrap();
        assert!(output.contains("public function getFirstName()"));
        assert!(output.contains("if ($this->first_name === null) {"));
        assert!(output.contains("throw new \\LogicException('FirstName has not been set.');"));
    }

    #[test]
    fn test_nullable_getter_has_no_guard() {
        let output = BuilderProcessor.process(TEMPLATE, &context(&[("bio", true)])).unwrap();
        assert!(!output.contains("LogicException"));
        assert!(output.contains("        return $this->bio;"));
    }

    #[test]
    fn test_properties_marker_is_optional() {
        let template = "class Builder\n{\n    // @prefab:accessors\n}\n";
        let output = BuilderProcessor.process(template, &context(&[("name", false)])).unwrap();
        assert!(!output.contains("protected $name;"));
        assert!(output.contains("getName"));
    }

    #[test]
    fn test_accessors_marker_is_required() {
        let err = BuilderProcessor
            .process("class Builder {}\n", &context(&[("name", false)]))
            .unwrap_err();
        assert!(matches!(err, PrefabError::TemplateMarker { processor: ProcessorVariant::Builder, .. }));
    }

    #[test]
    fn test_missing_properties_context() {
        let err = BuilderProcessor.process(TEMPLATE, &StaticContextRecord::new()).unwrap_err();
        assert!(matches!(err, PrefabError::ProcessorContext { ref field, .. } if field == "properties"));
    }
}
