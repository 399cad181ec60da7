//! SQL Server SQL dialect (Strategy pattern).

use crate::core::identifier::BRACKET;
use crate::core::traits::Dialect;

/// SQL Server dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MssqlDialect;

impl MssqlDialect {
    /// Create a new SQL Server dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &str {
        "mssql"
    }

    fn quote_ident(&self, name: &str) -> String {
        BRACKET.quote(name)
    }

    fn param_placeholder(&self, index: usize) -> String {
        // MSSQL uses @P1, @P2, etc. (1-based)
        format!("@P{}", index)
    }
}
