// ABOUTME: Error types for device tree blob reading
// ABOUTME: Structural failures of the flattened container, reported before any decoding

use thiserror::Error;

/// Main error type for DTB reading operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DtbError {
    /// Invalid magic number in DTB header
    #[error("invalid magic number in DTB header: {0:#010x}")]
    InvalidMagic(u32),
    /// Malformed header structure
    #[error("malformed DTB header structure")]
    MalformedHeader,
    /// Invalid token in structure block
    #[error("invalid token {token:#x} at structure offset {offset:#x}")]
    InvalidToken { token: u32, offset: usize },
    /// Structure block ended before the data it announced
    #[error("truncated structure block at offset {0:#x}")]
    Truncated(usize),
    /// Node or property name is not NUL-terminated UTF-8
    #[error("bad string at offset {0:#x}")]
    BadString(usize),
    /// Node nesting does not balance
    #[error("unbalanced node nesting in structure block")]
    Unbalanced,
}
