//! Vertex window tables.
//!
//! Geometry assets carry two small tables that decide which slice of the
//! vertex-data region a display list addresses:
//!
//! - The **chunk table** assigns a window to up to four display lists each.
//! - The **expansion table** lists display lists that address the whole
//!   vertex-data region instead. An expansion always wins over a chunk.

use std::collections::{HashMap, HashSet};

use crate::bytes::read_u32;
use crate::error::{DecodeError, DecodeResult};

/// Size of one chunk record in bytes.
pub const CHUNK_SIZE: usize = 52;

/// Size of one expansion record in bytes.
pub const EXPANSION_SIZE: usize = 16;

/// A byte range of the vertex-data region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VertexWindow {
    pub start: u32,
    pub size: u32,
}

impl VertexWindow {
    /// Window covering an entire region of `len` bytes.
    #[must_use]
    pub fn full(len: usize) -> Self {
        Self {
            start: 0,
            size: u32::try_from(len).unwrap_or(u32::MAX),
        }
    }

    /// The window's bytes within `vertex_data`, clipped to the region.
    #[must_use]
    pub fn slice<'a>(&self, vertex_data: &'a [u8]) -> &'a [u8] {
        let start = (self.start as usize).min(vertex_data.len());
        let end = start
            .saturating_add(self.size as usize)
            .min(vertex_data.len());
        &vertex_data[start..end]
    }

    fn end(&self) -> u64 {
        u64::from(self.start) + u64::from(self.size)
    }
}

/// One record of the chunk table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexChunk {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub unknown_char: u8,
    /// Four opaque bytes that look like a MIPS instruction.
    pub ucode_marker: [u8; 4],
    pub unknown_flag: u32,
    /// `(start, size)` of each display list using this chunk's window.
    pub display_lists: [(u32, u32); 4],
    pub vertex_window: VertexWindow,
}

impl VertexChunk {
    /// Parse one 52-byte chunk record.
    #[must_use]
    pub fn from_bytes(raw: &[u8; CHUNK_SIZE]) -> Self {
        let pair = |offset| (read_u32(raw, offset), read_u32(raw, offset + 4));
        Self {
            r: raw[0],
            g: raw[1],
            b: raw[2],
            unknown_char: raw[3],
            ucode_marker: [raw[4], raw[5], raw[6], raw[7]],
            unknown_flag: read_u32(raw, 8),
            display_lists: [pair(12), pair(20), pair(28), pair(36)],
            vertex_window: VertexWindow {
                start: read_u32(raw, 44),
                size: read_u32(raw, 48),
            },
        }
    }

    /// Start offsets of the display lists this chunk applies to.
    ///
    /// Unused slots have a size of zero and are skipped.
    pub fn display_list_starts(&self) -> impl Iterator<Item = u32> + '_ {
        self.display_lists
            .iter()
            .filter(|(_, size)| *size != 0)
            .map(|(start, _)| *start)
    }
}

/// One record of the expansion table.
///
/// Only the third word is understood: the offset of a display list that
/// addresses the full vertex-data region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexExpansion {
    pub unknown_1: u32,
    pub unknown_2: u32,
    pub display_list_offset: u32,
    pub unknown_4: u32,
}

impl VertexExpansion {
    /// Parse one 16-byte expansion record.
    #[must_use]
    pub fn from_bytes(raw: &[u8; EXPANSION_SIZE]) -> Self {
        Self {
            unknown_1: read_u32(raw, 0),
            unknown_2: read_u32(raw, 4),
            display_list_offset: read_u32(raw, 8),
            unknown_4: read_u32(raw, 12),
        }
    }
}

/// Parse the chunk table occupying `start..end` of `data`.
///
/// A trailing partial record is ignored.
pub fn parse_chunk_table(data: &[u8], start: usize, end: usize) -> DecodeResult<Vec<VertexChunk>> {
    let table = data
        .get(start..end)
        .ok_or(DecodeError::TableOutOfBounds {
            table: "vertex chunk",
            start,
            end,
            len: data.len(),
        })?;
    Ok(table
        .chunks_exact(CHUNK_SIZE)
        .filter_map(|record| <&[u8; CHUNK_SIZE]>::try_from(record).ok())
        .map(VertexChunk::from_bytes)
        .collect())
}

/// Parse the expansion table at `start`: a big-endian `u32` count followed
/// by that many 16-byte records.
pub fn parse_expansion_table(data: &[u8], start: usize) -> DecodeResult<Vec<VertexExpansion>> {
    let out_of_bounds = |end| DecodeError::TableOutOfBounds {
        table: "expansion",
        start,
        end,
        len: data.len(),
    };

    let count = crate::bytes::read_u32_checked(data, start)
        .ok_or_else(|| out_of_bounds(start.saturating_add(4)))? as usize;
    let records_start = start + 4;
    let records_end = count
        .checked_mul(EXPANSION_SIZE)
        .and_then(|len| records_start.checked_add(len))
        .ok_or_else(|| out_of_bounds(usize::MAX))?;
    let records = data
        .get(records_start..records_end)
        .ok_or_else(|| out_of_bounds(records_end))?;

    Ok(records
        .chunks_exact(EXPANSION_SIZE)
        .filter_map(|record| <&[u8; EXPANSION_SIZE]>::try_from(record).ok())
        .map(VertexExpansion::from_bytes)
        .collect())
}

/// Lookup tables derived from the chunk and expansion records of one asset.
///
/// Built once per asset and shared by reference with the graph builder.
#[derive(Debug, Clone, Default)]
pub struct WindowTables {
    chunk_windows: HashMap<u32, VertexWindow>,
    expansions: HashSet<u32>,
}

impl WindowTables {
    /// Index the chunk and expansion records.
    ///
    /// `vertex_len` is the length of the vertex-data region. Chunk windows
    /// reaching past it are clipped. When two chunks name the same display
    /// list, the later record wins.
    #[must_use]
    pub fn new(chunks: &[VertexChunk], expansions: &[VertexExpansion], vertex_len: usize) -> Self {
        let mut chunk_windows = HashMap::new();
        for chunk in chunks {
            let window = clip_window(chunk.vertex_window, vertex_len);
            for start in chunk.display_list_starts() {
                chunk_windows.insert(start, window);
            }
        }

        Self {
            chunk_windows,
            expansions: expansions
                .iter()
                .map(|expansion| expansion.display_list_offset)
                .collect(),
        }
    }

    /// The chunk window assigned to the display list starting at `offset`.
    #[must_use]
    pub fn chunk_window(&self, offset: u32) -> Option<VertexWindow> {
        self.chunk_windows.get(&offset).copied()
    }

    /// Whether the display list starting at `offset` uses the full region.
    #[must_use]
    pub fn is_expansion(&self, offset: u32) -> bool {
        self.expansions.contains(&offset)
    }
}

fn clip_window(window: VertexWindow, vertex_len: usize) -> VertexWindow {
    let full = VertexWindow::full(vertex_len);
    if window.end() <= u64::from(full.size) {
        return window;
    }

    let start = window.start.min(full.size);
    let clipped = VertexWindow {
        start,
        size: full.size - start,
    };
    tracing::warn!(
        start = window.start,
        size = window.size,
        vertex_len,
        "vertex chunk window exceeds vertex data, clipping"
    );
    clipped
}
