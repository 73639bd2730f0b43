//! Boundary collaborators of the generator.
//!
//! Each of these touches the host project rather than the fabrication tree:
//! - [`project_name`]: read the project name from `composer.json`
//! - [`skeleton`]: copy the static application skeleton into the project
//! - [`service_definitions`]: gather generated service files for the DI container builder

pub mod project_name;
pub mod service_definitions;
pub mod skeleton;

pub use project_name::resolve_project_name;
pub use service_definitions::collect_service_definitions;
pub use skeleton::{copy_skeleton, SkeletonCopy};
