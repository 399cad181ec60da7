//! PostgreSQL SQL dialect (Strategy pattern).

use crate::core::identifier::DOUBLE_QUOTE;
use crate::core::traits::Dialect;

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        DOUBLE_QUOTE.quote(name)
    }

    fn param_placeholder(&self, index: usize) -> String {
        // PostgreSQL uses $1, $2, etc. (1-based)
        format!("${}", index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.quote_ident("name"), "\"name\"");
        assert_eq!(dialect.quote_ident("table\"name"), "\"table\"\"name\"");
        assert_eq!(dialect.quote_ident("Users"), "\"Users\"");
    }

    #[test]
    fn test_param_placeholder() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.param_placeholder(1), "$1");
        assert_eq!(dialect.param_placeholder(10), "$10");
    }

    #[test]
    fn test_qualify_table() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.qualify_table(Some("public"), "Person"), "\"public\".\"Person\"");
        assert_eq!(dialect.qualify_table(None, "Person"), "\"Person\"");
    }
}
