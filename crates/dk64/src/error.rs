//! Error types for geometry asset handling.

use dk64_decode::DecodeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("asset is {len:#x} bytes, too small for a geometry header")]
    HeaderTooSmall { len: usize },

    #[error("{region} region {start:#x}..{end:#x} lies outside the {len:#x}-byte asset")]
    RegionOutOfBounds {
        region: &'static str,
        start: u32,
        end: u32,
        len: usize,
    },

    #[error("asset {index} points to asset {target}, but the table has {len} assets")]
    DanglingIndirection {
        index: usize,
        target: usize,
        len: usize,
    },

    #[error("asset index {index} out of range for a table of {len} assets")]
    NoSuchAsset { index: usize, len: usize },

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;
