//! SQLite SQL dialect (Strategy pattern).

use crate::core::identifier::DOUBLE_QUOTE;
use crate::core::traits::Dialect;

/// SQLite dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Create a new SQLite dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn quote_ident(&self, name: &str) -> String {
        DOUBLE_QUOTE.quote(name)
    }

    fn param_placeholder(&self, index: usize) -> String {
        // Numbered ?NNN placeholders bind by position, 1-based
        format!("?{}", index)
    }
}
