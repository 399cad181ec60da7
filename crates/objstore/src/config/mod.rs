//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::{FieldType, KeyType};
    use crate::error::StorageError;

    const PEOPLE: &str = r#"
database:
  url: "sqlite::memory:"
storage:
  max_in_list: 100
types:
  - name: Person
    fields:
      name: text
      age: i32
      birthday: date
  - name: Tag
    key:
      column: label
      type: text
"#;

    #[test]
    fn test_from_yaml_with_defaults() {
        let config = Config::from_yaml(PEOPLE).unwrap();
        assert_eq!(config.database.r#type, "sqlite");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.storage.max_in_list, 100);
        assert_eq!(config.types.len(), 2);

        let tag = config.object_type("Tag").unwrap();
        assert_eq!(tag.key_column, "label");
        assert_eq!(tag.key_type, KeyType::Text);

        let person = config.object_type("Person").unwrap();
        assert!(person
            .accessors
            .iter()
            .any(|a| a.name == "getBirthday" && a.returns == FieldType::Date));
    }

    #[test]
    fn test_storage_section_is_optional() {
        let config = Config::from_yaml("database:\n  url: \"sqlite::memory:\"\n").unwrap();
        assert_eq!(config.storage.max_in_list, 500);
        assert!(config.types.is_empty());
    }

    #[test]
    fn test_rejects_empty_url() {
        let err = Config::from_yaml("database:\n  url: \"\"\n").unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }

    #[test]
    fn test_rejects_unsupported_database() {
        let yaml = "database:\n  type: oracle\n  url: oracle://db\n";
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("sqlite"));
    }

    #[test]
    fn test_rejects_zero_in_list() {
        let yaml = "database:\n  url: \"sqlite::memory:\"\nstorage:\n  max_in_list: 0\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_duplicate_types() {
        let yaml = r#"
database:
  url: "sqlite::memory:"
types:
  - name: Person
  - name: Person
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_rejects_unresolvable_type() {
        let yaml = r#"
database:
  url: "sqlite::memory:"
types:
  - name: Person
    accessors:
      - name: getAge
        returns: i32
      - name: getAge
        returns: text
"#;
        assert!(matches!(
            Config::from_yaml(yaml),
            Err(StorageError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/objstore.yaml").unwrap_err();
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objstore.yaml");
        std::fs::write(&path, PEOPLE).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.types[0].name, "Person");
    }
}
