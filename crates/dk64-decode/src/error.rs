//! Decode errors.

use thiserror::Error;

/// Errors that abort decoding of a single geometry asset.
///
/// Offsets are byte offsets relative to the start of the region being
/// decoded (the display-list region for command errors, the asset buffer
/// for table errors).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed opcode {opcode:#04x} at offset {offset:#x}")]
    MalformedOpcode { offset: usize, opcode: u8 },

    #[error("unterminated command stream at offset {offset:#x} ({remaining} bytes left)")]
    TruncatedStream { offset: usize, remaining: usize },

    #[error("branch at {offset:#x} targets {target:#x}, past the {region_len:#x}-byte region")]
    MissingBranchTarget {
        offset: usize,
        target: u32,
        region_len: usize,
    },

    #[error("branch nesting at offset {offset:#x} exceeds the depth limit of {depth}")]
    RecursionLimit { offset: usize, depth: usize },

    #[error("{table} table at {start:#x}..{end:#x} exceeds the {len:#x}-byte asset")]
    TableOutOfBounds {
        table: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },
}

/// Result alias for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
