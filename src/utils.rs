//! Case conversion helpers for generated identifiers.

use convert_case::{Case, Casing};

/// Convert a property or entity name to PascalCase (`first_name` -> `FirstName`)
pub fn to_pascal_case(s: &str) -> String {
    s.to_case(Case::Pascal)
}

/// Convert a name to camelCase (`UsersUser` -> `usersUser`)
pub fn to_camel_case(s: &str) -> String {
    s.to_case(Case::Camel)
}

/// Convert a name to SCREAMING_SNAKE_CASE (`UsersUser` -> `USERS_USER`)
pub fn to_screaming_snake_case(s: &str) -> String {
    s.to_case(Case::ScreamingSnake)
}
