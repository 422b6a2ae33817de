//! Decode F3DEX2 display lists and vertex data from DK64 geometry assets.
//!
//! This crate provides pure synchronous decoding functions for rebuilding
//! meshes from the display-list and vertex-data regions of a geometry
//! asset. Nothing here performs I/O or spawns threads; every function is a
//! deterministic function of its input bytes, so the caller decides how to
//! spread assets across workers.
//!
//! # Pipeline
//!
//! 1. [`parse_chunk_table`] and [`parse_expansion_table`] read the vertex
//!    window tables, indexed by [`WindowTables`].
//! 2. [`build_display_lists`] walks the display-list region and produces a
//!    [`DisplayListGraph`].
//! 3. [`reconstruct`] turns a list of that graph into ordered
//!    [`MeshGroup`]s of vertices and triangles.

mod bytes;
mod error;

pub mod command;
pub mod display_list;
pub mod mesh;
pub mod tables;
pub mod vertices;

pub use bytes::read_u32_checked;
pub use command::{COMMAND_SIZE, Command, Opcode, commands};
pub use display_list::{
    BuildLimits, DEFAULT_MAX_BRANCH_DEPTH, DisplayList, DisplayListGraph, NodeId, WindowState,
    build_display_lists,
};
pub use error::{DecodeError, DecodeResult};
pub use mesh::{
    Mesh, MeshGroup, SkippedGroup, reconstruct, reconstruct_all, resolve_vertex_address,
};
pub use tables::{
    CHUNK_SIZE, EXPANSION_SIZE, VertexChunk, VertexExpansion, VertexWindow, WindowTables,
    parse_chunk_table, parse_expansion_table,
};
pub use vertices::{VERTEX_SIZE, unpack_vertices};

/// Vertex record as stored in the vertex-data region (16 bytes).
///
/// - `x`, `y`, `z`: signed 16-bit position
/// - `unknown`: preserved, meaning undocumented
/// - `u`, `v`: 16-bit texture coordinates
/// - `r`, `g`, `b`, `alpha`: colour or normal channels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct Vertex {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub unknown: u16,
    pub u: u16,
    pub v: u16,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: u8,
}

const _: () = assert!(std::mem::size_of::<Vertex>() == VERTEX_SIZE);

/// Triangle as three slots into the vertex group it belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Triangle {
    pub v1: u8,
    pub v2: u8,
    pub v3: u8,
}

impl Triangle {
    #[must_use]
    pub const fn new(v1: u8, v2: u8, v3: u8) -> Self {
        Self { v1, v2, v3 }
    }

    /// Build from raw command fields, which store slots in 2-byte steps.
    #[must_use]
    pub const fn from_slots(v1: u8, v2: u8, v3: u8) -> Self {
        Self::new(v1 / 2, v2 / 2, v3 / 2)
    }

    #[must_use]
    pub const fn indices(&self) -> [u8; 3] {
        [self.v1, self.v2, self.v3]
    }
}
