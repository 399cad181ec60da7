//! Identifier validation and quoting rules.
//!
//! Table and column names are spliced into generated SQL text because
//! identifiers cannot be bound as statement parameters. Every name is
//! validated before it is quoted, and quoting itself is driven by a small
//! per-dialect rule table rather than ad-hoc string handling.

use crate::error::{Result, StorageError};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - SQL Server: 128 characters
/// - MySQL: 64 characters
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// How a dialect delimits identifiers.
///
/// The closing delimiter is escaped by doubling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteRule {
    pub open: char,
    pub close: char,
}

/// ANSI double quotes (PostgreSQL, SQLite).
pub const DOUBLE_QUOTE: QuoteRule = QuoteRule {
    open: '"',
    close: '"',
};

/// MySQL backticks.
pub const BACKTICK: QuoteRule = QuoteRule {
    open: '`',
    close: '`',
};

/// SQL Server brackets.
pub const BRACKET: QuoteRule = QuoteRule {
    open: '[',
    close: ']',
};

impl QuoteRule {
    /// Quote an already validated identifier.
    pub fn quote(&self, name: &str) -> String {
        let mut escaped = String::with_capacity(name.len() + 2);
        escaped.push(self.open);
        for c in name.chars() {
            if c == self.close {
                escaped.push(c);
            }
            escaped.push(c);
        }
        escaped.push(self.close);
        escaped
    }
}

/// Validate an identifier for security issues.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes (injection vector)
/// - Identifiers exceeding maximum length
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StorageError::illegal_argument("Identifier cannot be empty"));
    }

    if name.contains('\0') {
        return Err(StorageError::illegal_argument(format!(
            "Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(StorageError::illegal_argument(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}
