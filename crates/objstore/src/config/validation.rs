//! Configuration validation.

use std::collections::HashSet;

use super::Config;
use crate::error::{Result, StorageError};
use crate::mapping::FieldMapping;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Database validation
    if config.database.url.is_empty() {
        return Err(StorageError::Config("database.url is required".into()));
    }
    if !matches!(
        config.database.r#type.to_lowercase().as_str(),
        "sqlite" | "sqlite3"
    ) {
        return Err(StorageError::Config(format!(
            "database.type must be 'sqlite', got '{}'",
            config.database.r#type
        )));
    }
    if config.database.max_connections == 0 {
        return Err(StorageError::Config(
            "database.max_connections must be at least 1".into(),
        ));
    }

    // Storage validation
    if config.storage.max_in_list == 0 {
        return Err(StorageError::Config(
            "storage.max_in_list must be at least 1".into(),
        ));
    }

    // Type validation
    let mut seen = HashSet::new();
    for object_type in &config.types {
        if !seen.insert(object_type.name.as_str()) {
            return Err(StorageError::Config(format!(
                "type '{}' is declared more than once",
                object_type.name
            )));
        }
        FieldMapping::resolve(object_type).map_err(|e| {
            StorageError::Config(format!("type '{}' is invalid: {}", object_type.name, e))
        })?;
    }

    Ok(())
}
