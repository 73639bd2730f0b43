//! Service definition files handed to the DI container builder.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fs_utils::find_files_with_suffix;

pub const SERVICE_DEFINITION_SUFFIX: &str = ".service.yml";

/// Every generated service definition below `output_root`, sorted by path
pub fn collect_service_definitions(output_root: &Path) -> Result<Vec<PathBuf>> {
    find_files_with_suffix(output_root, SERVICE_DEFINITION_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_utils::write_file;
    use tempfile::TempDir;

    #[test]
    fn test_only_service_files_are_collected() {
        let temp_dir = TempDir::new().unwrap();
        write_file(temp_dir.path().join("Users/User/Map/Repository.service.yml"), "services: {}\n").unwrap();
        write_file(temp_dir.path().join("Users/User/Map/Repository.php"), "<?php\n").unwrap();

        let found = collect_service_definitions(temp_dir.path()).unwrap();
        assert_eq!(found, vec![temp_dir.path().join("Users/User/Map/Repository.service.yml")]);
    }
}
