//! Vertex unpacking.

use crate::Vertex;
use crate::bytes::{read_i16, read_u16};

/// Size of one packed vertex record in bytes.
pub const VERTEX_SIZE: usize = 16;

impl Vertex {
    /// Parse one 16-byte vertex record.
    ///
    /// # Format
    ///
    /// - Bytes 0-5: Position (3 × i16)
    /// - Bytes 6-7: Unknown (u16, preserved as-is)
    /// - Bytes 8-11: Texture coordinates (2 × u16)
    /// - Bytes 12-15: Colour or normal channels and alpha (4 × u8)
    #[must_use]
    pub fn from_bytes(raw: &[u8; VERTEX_SIZE]) -> Self {
        Self {
            x: read_i16(raw, 0),
            y: read_i16(raw, 2),
            z: read_i16(raw, 4),
            unknown: read_u16(raw, 6),
            u: read_u16(raw, 8),
            v: read_u16(raw, 10),
            r: raw[12],
            g: raw[13],
            b: raw[14],
            alpha: raw[15],
        }
    }

    /// Position as an integer vector.
    #[must_use]
    pub fn position(&self) -> glam::I16Vec3 {
        glam::I16Vec3::new(self.x, self.y, self.z)
    }
}

/// Unpack consecutive vertex records.
///
/// Input length must be a multiple of [`VERTEX_SIZE`]; a trailing partial
/// record is ignored.
#[must_use]
pub fn unpack_vertices(packed: &[u8]) -> Vec<Vertex> {
    packed
        .chunks_exact(VERTEX_SIZE)
        .filter_map(|record| <&[u8; VERTEX_SIZE]>::try_from(record).ok())
        .map(Vertex::from_bytes)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signed_positions_and_attributes() {
        let raw = [
            0xFF, 0xFE, 0x00, 0x10, 0x80, 0x00, // x, y, z
            0xAB, 0xCD, // unknown
            0x01, 0x00, 0x02, 0x00, // u, v
            0x11, 0x22, 0x33, 0xFF, // r, g, b, alpha
        ];
        let vertex = Vertex::from_bytes(&raw);
        assert_eq!(vertex.position(), glam::I16Vec3::new(-2, 16, i16::MIN));
        assert_eq!(vertex.unknown, 0xABCD);
        assert_eq!((vertex.u, vertex.v), (0x100, 0x200));
        assert_eq!((vertex.r, vertex.g, vertex.b, vertex.alpha), (0x11, 0x22, 0x33, 0xFF));
    }

    #[test]
    fn unpacks_whole_records_only() {
        let mut packed = vec![0u8; VERTEX_SIZE * 2 + 5];
        packed[VERTEX_SIZE + 1] = 7;
        let vertices = unpack_vertices(&packed);
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[1].x, 7);
    }
}
