//! Geometry assets.
//!
//! A geometry asset is one decompressed entry of the ROM's geometry table.
//! Its header holds big-endian offsets (relative to the asset) locating the
//! display-list region, the vertex-data region and the two vertex window
//! tables. Some entries are instead short indirection records that point at
//! another entry of the same table.

use dk64_decode::{
    BuildLimits, DisplayListGraph, Mesh, NodeId, VertexChunk, VertexExpansion, WindowTables,
    build_display_lists, parse_chunk_table, parse_expansion_table, read_u32_checked,
    reconstruct_all,
};

use crate::error::{Error, Result};

/// Header field offsets within an asset.
pub mod header {
    pub const DISPLAY_LIST_START: usize = 0x34;
    pub const VERTEX_START: usize = 0x38;
    /// End of the vertex data; only used to compute its length.
    pub const VERTEX_END: usize = 0x40;
    pub const CHUNK_TABLE_START: usize = 0x68;
    /// End of the chunk table; only used to compute its length.
    pub const CHUNK_TABLE_END: usize = 0x6C;
    pub const EXPANSION_TABLE_START: usize = 0x70;
    /// Smallest buffer that holds every header field.
    pub const SIZE: usize = EXPANSION_TABLE_START + 4;
}

/// Offsets read from a geometry asset's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryHeader {
    pub display_list_start: u32,
    pub vertex_start: u32,
    pub vertex_end: u32,
    pub chunk_table_start: u32,
    pub chunk_table_end: u32,
    pub expansion_table_start: u32,
}

impl GeometryHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let field = |offset| {
            read_u32_checked(data, offset).ok_or(Error::HeaderTooSmall { len: data.len() })
        };
        Ok(Self {
            display_list_start: field(header::DISPLAY_LIST_START)?,
            vertex_start: field(header::VERTEX_START)?,
            vertex_end: field(header::VERTEX_END)?,
            chunk_table_start: field(header::CHUNK_TABLE_START)?,
            chunk_table_end: field(header::CHUNK_TABLE_END)?,
            expansion_table_start: field(header::EXPANSION_TABLE_START)?,
        })
    }
}

/// Whether the first eight bytes mark an indirection record:
/// `00 ?? 08 00 00 00 00 00`.
#[must_use]
pub fn is_indirection(data: &[u8]) -> bool {
    matches!(data, [0x00, _, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, ..])
}

/// One entry of a geometry table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryAsset {
    raw: Vec<u8>,
}

impl GeometryAsset {
    /// Wrap a decompressed table entry.
    #[must_use]
    pub fn new(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    #[must_use]
    pub fn is_indirection(&self) -> bool {
        is_indirection(&self.raw)
    }

    /// For an indirection record, the index of the table entry it points at.
    #[must_use]
    pub fn pointer(&self) -> Option<usize> {
        self.is_indirection().then(|| usize::from(self.raw[1]))
    }

    pub fn header(&self) -> Result<GeometryHeader> {
        GeometryHeader::parse(&self.raw)
    }

    /// The display-list region: from the display-list start to the vertex start.
    pub fn display_list_region(&self) -> Result<&[u8]> {
        let header = self.header()?;
        self.region("display list", header.display_list_start, header.vertex_start)
    }

    /// The vertex-data region.
    pub fn vertex_data(&self) -> Result<&[u8]> {
        let header = self.header()?;
        self.region("vertex", header.vertex_start, header.vertex_end)
    }

    /// Chunk table records. Empty for indirection records.
    pub fn vertex_chunks(&self) -> Result<Vec<VertexChunk>> {
        if self.is_indirection() {
            return Ok(Vec::new());
        }
        let header = self.header()?;
        let start = header.chunk_table_start as usize;
        // A table end before its start means the table is empty.
        let end = (header.chunk_table_end as usize).max(start);
        Ok(parse_chunk_table(&self.raw, start, end)?)
    }

    /// Expansion table records. Empty for indirection records.
    pub fn expansions(&self) -> Result<Vec<VertexExpansion>> {
        if self.is_indirection() {
            return Ok(Vec::new());
        }
        let header = self.header()?;
        Ok(parse_expansion_table(
            &self.raw,
            header.expansion_table_start as usize,
        )?)
    }

    /// Build the display-list graph and reconstruct every top-level list.
    ///
    /// Indirection records decode to an empty geometry carrying only the
    /// pointer.
    pub fn decode(&self, limits: BuildLimits) -> Result<DecodedGeometry> {
        if let Some(target) = self.pointer() {
            return Ok(DecodedGeometry {
                points_to: Some(target),
                ..DecodedGeometry::default()
            });
        }

        let display_lists = self.display_list_region()?;
        let vertex_data = self.vertex_data()?;
        let tables =
            WindowTables::new(&self.vertex_chunks()?, &self.expansions()?, vertex_data.len());

        let graph = build_display_lists(display_lists, vertex_data, &tables, limits)?;
        let meshes = reconstruct_all(&graph, vertex_data);

        tracing::debug!(
            top_level = graph.top_level().len(),
            nodes = graph.nodes().len(),
            vertex_bytes = vertex_data.len(),
            "decoded geometry asset"
        );

        Ok(DecodedGeometry {
            points_to: None,
            graph,
            meshes,
        })
    }

    fn region(&self, region: &'static str, start: u32, end: u32) -> Result<&[u8]> {
        self.raw
            .get(start as usize..end as usize)
            .ok_or(Error::RegionOutOfBounds {
                region,
                start,
                end,
                len: self.raw.len(),
            })
    }
}

/// Display lists and meshes decoded from one asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedGeometry {
    /// Set for indirection records, which carry no geometry of their own.
    pub points_to: Option<usize>,
    pub graph: DisplayListGraph,
    /// Mesh of each top-level list, in stream order.
    pub meshes: Vec<(NodeId, Mesh)>,
}

impl DecodedGeometry {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|(_, mesh)| mesh.vertex_count()).sum()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|(_, mesh)| mesh.triangle_count()).sum()
    }

    /// Axis-aligned bounds of every exported vertex, if there are any.
    #[must_use]
    pub fn bounds(&self) -> Option<(glam::I16Vec3, glam::I16Vec3)> {
        self.meshes
            .iter()
            .flat_map(|(_, mesh)| &mesh.groups)
            .flat_map(|group| &group.vertices)
            .map(dk64_decode::Vertex::position)
            .fold(None, |bounds, p| match bounds {
                None => Some((p, p)),
                Some((min, max)) => Some((min.min(p), max.max(p))),
            })
    }
}
