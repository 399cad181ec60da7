//! Configuration type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mapping::ObjectType;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database the storage runs against.
    pub database: DatabaseConfig,

    /// Storage behaviour.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Storable types registered on connect.
    #[serde(default)]
    pub types: Vec<ObjectType>,
}

impl Config {
    /// Declared type by name.
    pub fn object_type(&self, name: &str) -> Option<&ObjectType> {
        self.types.iter().find(|t| t.name == name)
    }
}

/// Database connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database type (only "sqlite" has a bundled execution surface).
    #[serde(default = "default_sqlite")]
    pub r#type: String,

    /// Connection URL, e.g. `sqlite://people.db` or `sqlite::memory:`.
    pub url: String,

    /// Pool size (default: 5). In-memory databases always use one
    /// connection.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Whether the URL names an in-memory SQLite database.
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    /// URL with any password replaced, for logs and `Debug`.
    pub fn redacted_url(&self) -> String {
        redact_url(&self.url)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("type", &self.r#type)
            .field("url", &self.redacted_url())
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Storage behaviour configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Largest identity IN-list issued per read statement (default: 500).
    #[serde(default = "default_max_in_list")]
    pub max_in_list: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_in_list: default_max_in_list(),
        }
    }
}

fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let authority_start = scheme_end + 3;
    let rest = &url[authority_start..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let authority = &rest[..authority_end];

    match (authority.rfind('@'), authority.find(':')) {
        (Some(at), Some(colon)) if colon < at => format!(
            "{}{}:***{}",
            &url[..authority_start],
            &authority[..colon],
            &url[authority_start + at..]
        ),
        _ => url.to_string(),
    }
}

fn default_sqlite() -> String {
    "sqlite".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_max_in_list() -> usize {
    500
}
