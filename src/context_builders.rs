//! Static context record builders.
//!
//! One small function per processor variant, each deriving that processor's
//! payload from a [`ConfigurationRecord`] (or from fixed assembler inputs).

use serde_yaml::{Mapping, Value};

use crate::configuration::ConfigurationRecord;
use crate::processors::builder::CONTEXT_PROPERTIES;
use crate::processors::handler_interface::{CONTEXT_ROUTE_NAME, CONTEXT_ROUTE_PATH};
use crate::processors::identity_field::CONTEXT_IDENTITY_FIELD;
use crate::processors::namespace::{CONTEXT_NAMESPACE, CONTEXT_PROJECT_NAME};
use crate::processors::repository::CONTEXT_NAMESPACES;
use crate::tree::StaticContextRecord;

/// `{properties: name -> {nullable}}`, copied from the record in declaration order
pub fn builder_context(record: &ConfigurationRecord) -> StaticContextRecord {
    let mut properties = Mapping::with_capacity(record.properties.len());
    for (name, property) in &record.properties {
        let mut options = Mapping::new();
        options.insert(Value::from("nullable"), Value::from(property.nullable));
        properties.insert(Value::from(name.as_str()), Value::Mapping(options));
    }

    StaticContextRecord::new().with(CONTEXT_PROPERTIES, Value::Mapping(properties))
}

/// `{project_name, namespace}`
pub fn namespace_context(project_name: &str, namespace: &str) -> StaticContextRecord {
    StaticContextRecord::new()
        .with(CONTEXT_PROJECT_NAME, project_name)
        .with(CONTEXT_NAMESPACE, namespace)
}

/// `{project_name, namespaces: [...]}`, order preserved
pub fn repository_context(project_name: &str, namespaces: &[&str]) -> StaticContextRecord {
    let namespaces: Vec<Value> = namespaces.iter().map(|n| Value::from(*n)).collect();

    StaticContextRecord::new()
        .with(CONTEXT_PROJECT_NAME, project_name)
        .with(CONTEXT_NAMESPACES, namespaces)
}

/// `{route_path, route_name}`, only when the record has both
pub fn handler_interface_context(record: &ConfigurationRecord) -> Option<StaticContextRecord> {
    let route_path = record.http_route.as_deref()?;
    let route_name = record.route_name()?;

    Some(
        StaticContextRecord::new()
            .with(CONTEXT_ROUTE_PATH, route_path)
            .with(CONTEXT_ROUTE_NAME, route_name),
    )
}

/// `{identity_field}` when the record has one, otherwise an empty record
pub fn identity_field_context(record: &ConfigurationRecord) -> StaticContextRecord {
    match &record.identity_field {
        Some(identity_field) => {
            StaticContextRecord::new().with(CONTEXT_IDENTITY_FIELD, identity_field.as_str())
        }
        None => StaticContextRecord::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{EntityLocation, PropertyDef};
    use indexmap::IndexMap;
    use std::path::PathBuf;

    fn record(identity_field: Option<&str>, http_route: Option<&str>) -> ConfigurationRecord {
        let mut properties = IndexMap::new();
        properties.insert("name".to_string(), PropertyDef { nullable: false });
        properties.insert("bio".to_string(), PropertyDef { nullable: true });

        ConfigurationRecord {
            table_name: "users".to_string(),
            identity_field: identity_field.map(String::from),
            http_route: http_route.map(String::from),
            properties,
            project_name: "Acme".to_string(),
            root_save_location: PathBuf::from("/app/fab/Users"),
            project_dir: PathBuf::from("/app/"),
            supporting_actor_group: None,
            entity: EntityLocation {
                relative_dir: PathBuf::from("Users"),
                name: "User".to_string(),
            },
        }
    }

    #[test]
    fn test_builder_context_copies_properties_in_order() {
        let context = builder_context(&record(None, None));
        let properties = context.get("properties").unwrap().as_mapping().unwrap();

        let names: Vec<&str> = properties.keys().filter_map(Value::as_str).collect();
        assert_eq!(names, vec!["name", "bio"]);
        assert_eq!(properties.get("name").unwrap().get("nullable"), Some(&Value::from(false)));
        assert_eq!(properties.get("bio").unwrap().get("nullable"), Some(&Value::from(true)));
    }

    #[test]
    fn test_handler_interface_context_needs_route() {
        assert!(handler_interface_context(&record(None, None)).is_none());

        let context = handler_interface_context(&record(None, Some("/users"))).unwrap();
        assert_eq!(context.get("route_path"), Some(&Value::from("/users")));
        assert_eq!(context.get("route_name"), Some(&Value::from("UsersUser")));
    }

    #[test]
    fn test_identity_field_context() {
        assert!(identity_field_context(&record(None, None)).is_empty());

        let context = identity_field_context(&record(Some("id"), None));
        assert_eq!(context.fields().collect::<Vec<_>>(), vec!["identity_field"]);
        assert_eq!(context.get("identity_field"), Some(&Value::from("id")));
    }

    #[test]
    fn test_repository_context_keeps_order() {
        let context = repository_context("Acme", &["B", "A"]);
        let namespaces = context.get("namespaces").unwrap().as_sequence().unwrap();
        assert_eq!(namespaces, &vec![Value::from("B"), Value::from("A")]);
    }
}
