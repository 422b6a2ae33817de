//! Mesh reconstruction from a display-list graph.
//!
//! Each `G_VTX` opens a group: the vertices it loads plus the triangles that
//! follow it. Triangle indices are local to their group. A `G_DL` splices
//! the branch's groups in at that point without closing the current group,
//! so triangles after the branch still land in the group opened before it.

use crate::command::Command;
use crate::display_list::{DisplayListGraph, NodeId};
use crate::vertices::{VERTEX_SIZE, unpack_vertices};
use crate::{Triangle, Vertex};

/// Vertices loaded by one `G_VTX` and the triangles drawn from them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshGroup {
    pub vertices: Vec<Vertex>,
    /// Indices are local to `vertices`.
    pub triangles: Vec<Triangle>,
}

/// A `G_VTX` whose vertices could not be read from the active window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedGroup {
    /// Offset of the display list containing the command.
    pub list_offset: u32,
    /// Index of the command within that list.
    pub command_index: usize,
    pub address: u32,
    pub vertex_count: u8,
    pub vertex_pointer: u32,
    pub window_len: usize,
}

/// Groups reconstructed from one display list and its branches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mesh {
    pub groups: Vec<MeshGroup>,
    /// Groups dropped because neither addressing mode fit the window.
    pub skipped: Vec<SkippedGroup>,
}

impl Mesh {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.groups.iter().map(|group| group.vertices.len()).sum()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.groups.iter().map(|group| group.triangles.len()).sum()
    }
}

/// Resolve where a `G_VTX` reads from within a window of `window_len` bytes.
///
/// The address is first taken relative to the list's running baseline. If
/// that overruns the window, the raw address is used instead. Returns the
/// byte offset within the window, or `None` if both overrun.
#[must_use]
pub fn resolve_vertex_address(
    vertex_pointer: u32,
    address: u32,
    vertex_count: u8,
    window_len: usize,
) -> Option<usize> {
    let len = usize::from(vertex_count) * VERTEX_SIZE;
    let fits = |start: usize| start.checked_add(len).is_some_and(|end| end <= window_len);

    let windowed = (vertex_pointer as usize).saturating_add(address as usize);
    if fits(windowed) {
        return Some(windowed);
    }
    let raw = address as usize;
    fits(raw).then_some(raw)
}

/// Reconstruct the mesh groups of `id`, including everything it branches to.
///
/// `vertex_data` is the asset's full vertex-data region; each list reads
/// from its own window within it.
#[must_use]
pub fn reconstruct(graph: &DisplayListGraph, id: NodeId, vertex_data: &[u8]) -> Mesh {
    let mut mesh = Mesh::default();
    append_groups(graph, id, vertex_data, &mut mesh);
    mesh
}

/// Reconstruct every top-level list of `graph`, in order.
#[must_use]
pub fn reconstruct_all(graph: &DisplayListGraph, vertex_data: &[u8]) -> Vec<(NodeId, Mesh)> {
    graph
        .top_level()
        .iter()
        .map(|id| (*id, reconstruct(graph, *id, vertex_data)))
        .collect()
}

// The graph is acyclic: a branch edge always points at a node finished
// before its parent.
fn append_groups(graph: &DisplayListGraph, id: NodeId, vertex_data: &[u8], mesh: &mut Mesh) {
    let list = graph.node(id);
    let window = list.window().slice(vertex_data);
    let mut open: Option<usize> = None;
    let mut orphans = 0usize;

    for (command_index, command) in list.commands().iter().enumerate() {
        match *command {
            Command::Vertex {
                vertex_count,
                address,
                ..
            } => {
                let resolved = resolve_vertex_address(
                    list.vertex_pointer(),
                    address,
                    vertex_count,
                    window.len(),
                );
                match resolved {
                    Some(start) => {
                        let end = start + usize::from(vertex_count) * VERTEX_SIZE;
                        mesh.groups.push(MeshGroup {
                            vertices: unpack_vertices(&window[start..end]),
                            triangles: Vec::new(),
                        });
                        open = Some(mesh.groups.len() - 1);
                    }
                    None => {
                        let skipped = SkippedGroup {
                            list_offset: list.offset(),
                            command_index,
                            address,
                            vertex_count,
                            vertex_pointer: list.vertex_pointer(),
                            window_len: window.len(),
                        };
                        tracing::warn!(?skipped, "vertex load overruns its window, skipping group");
                        mesh.skipped.push(skipped);
                        open = None;
                    }
                }
            }
            Command::Triangle1(tri) => match open {
                Some(group) => mesh.groups[group].triangles.push(tri),
                None => orphans += 1,
            },
            Command::Triangle2(first, second) => match open {
                Some(group) => mesh.groups[group].triangles.extend([first, second]),
                None => orphans += 2,
            },
            Command::DisplayList { target, .. } => match list.branch(target) {
                Some(child) => append_groups(graph, child, vertex_data, mesh),
                None => tracing::warn!(
                    offset = list.offset(),
                    target,
                    "branch has no materialised target"
                ),
            },
            Command::EndDisplayList | Command::Inert(_) => {}
        }
    }

    if orphans > 0 {
        tracing::warn!(
            offset = list.offset(),
            orphans,
            "dropped triangles with no open vertex group"
        );
    }
}
