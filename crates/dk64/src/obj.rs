//! Wavefront OBJ export.
//!
//! Triangle indices in a mesh group are local to that group. The exporter
//! makes them global by adding the number of vertices already written by
//! earlier groups, plus the format's index base.

use std::fmt::{self, Write};

use crate::asset::DecodedGeometry;

/// Options for OBJ output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjOptions {
    /// Index of the first vertex. OBJ is 1-based.
    pub index_base: usize,
    /// Emit `#` section comments for lists and groups.
    pub comments: bool,
}

impl Default for ObjOptions {
    fn default() -> Self {
        Self {
            index_base: 1,
            comments: true,
        }
    }
}

/// Write the top-level meshes of `geometry` as OBJ `v` and `f` lines.
///
/// Indirection records produce no output.
pub fn write_obj(
    out: &mut impl Write,
    geometry: &DecodedGeometry,
    options: ObjOptions,
) -> fmt::Result {
    let mut emitted = 0usize;

    for (id, mesh) in &geometry.meshes {
        let list = geometry.graph.node(*id);
        if options.comments {
            // Numbered by stream position, so branch lists leave gaps.
            let number = geometry.graph.stream_number(*id).unwrap_or(0);
            writeln!(out, "# Display List {number}, Offset: {}\n", list.offset())?;
        }

        for (group_num, group) in mesh.groups.iter().enumerate() {
            if options.comments {
                writeln!(out, "# Vertex Group {}\n", group_num + 1)?;
            }
            for vertex in &group.vertices {
                writeln!(out, "v {} {} {}", vertex.x, vertex.y, vertex.z)?;
            }
            writeln!(out)?;

            if options.comments {
                writeln!(out, "# Triangle Group {}\n", group_num + 1)?;
            }
            let base = emitted + options.index_base;
            for tri in &group.triangles {
                let [a, b, c] = tri.indices().map(|i| usize::from(i) + base);
                writeln!(out, "f {a} {b} {c}")?;
            }
            writeln!(out)?;

            emitted += group.vertices.len();
        }
    }
    Ok(())
}

/// Render `geometry` as an OBJ document.
#[must_use]
pub fn to_obj(geometry: &DecodedGeometry, options: ObjOptions) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_obj(&mut out, geometry, options);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_geometry_writes_nothing() {
        let geometry = DecodedGeometry {
            points_to: Some(2),
            ..DecodedGeometry::default()
        };
        assert_eq!(to_obj(&geometry, ObjOptions::default()), "");
    }

    #[test]
    fn defaults_are_one_based_with_comments() {
        let options = ObjOptions::default();
        assert_eq!(options.index_base, 1);
        assert!(options.comments);
    }
}
