//! MySQL/MariaDB SQL dialect (Strategy pattern).

use crate::core::identifier::BACKTICK;
use crate::core::traits::Dialect;

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        BACKTICK.quote(name)
    }

    fn param_placeholder(&self, _index: usize) -> String {
        // Native MySQL placeholders are positional and unnumbered
        "?".to_string()
    }
}
