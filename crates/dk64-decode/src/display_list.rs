//! Display-list graph construction.
//!
//! The display-list region of a geometry asset is a run of `G_ENDDL`
//! terminated command streams. Streams can branch (`G_DL`) into other
//! streams in the same region, and streams that share a vertex window keep a
//! running vertex baseline between them. The builder walks the region once
//! and materialises every stream as a node in an arena; branch edges are
//! node ids keyed by their target offset.
//!
//! # Window resolution
//!
//! When a stream reaches its terminator, the window it addresses is chosen
//! in this order:
//!
//! 1. Its start offset is in the expansion table: the full vertex-data
//!    region, baseline reset to zero.
//! 2. Its start offset is a chunk key: the chunk's window. The baseline is
//!    reset only when the chunk's start differs from the last chunk seen in
//!    the same walk.
//! 3. Otherwise the window and baseline carry over unchanged.
//!
//! After each stream the baseline advances by 16 bytes per vertex the
//! stream loads itself.
//!
//! # Branch ownership
//!
//! Every parent gets its own node for each branch target, bound to the
//! window the parent resolves. Two siblings calling the same target
//! therefore hold distinct nodes with the same offset. A stream reached at
//! top level after being built as a branch reuses that branch node and
//! leaves no second copy in the arena.

use std::collections::{BTreeMap, HashMap};

use crate::command::{COMMAND_SIZE, Command, read_command};
use crate::error::{DecodeError, DecodeResult};
use crate::tables::{VertexWindow, WindowTables};
use crate::vertices::VERTEX_SIZE;

/// Default limit on branch nesting.
pub const DEFAULT_MAX_BRANCH_DEPTH: usize = 32;

/// Limits applied while building a display-list graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildLimits {
    /// Maximum number of nested `G_DL` branches followed from a top-level
    /// list. Exceeding it is treated as malformed input.
    pub max_branch_depth: usize,
}

impl Default for BuildLimits {
    fn default() -> Self {
        Self {
            max_branch_depth: DEFAULT_MAX_BRANCH_DEPTH,
        }
    }
}

/// Index of a [`DisplayList`] in a [`DisplayListGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the graph's arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Active vertex window plus the running baseline within it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowState {
    pub window: VertexWindow,
    /// Bytes of the window already consumed by earlier sibling lists.
    pub baseline: u32,
}

/// One decoded display list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayList {
    offset: u32,
    raw: Vec<u8>,
    commands: Vec<Command>,
    window: VertexWindow,
    vertex_pointer: u32,
    branches: BTreeMap<u32, NodeId>,
    is_top_level: bool,
}

impl DisplayList {
    /// Start offset of this list within the display-list region.
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Raw command bytes, terminator included.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Size of the raw command bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.raw.len()
    }

    #[must_use]
    pub fn num_commands(&self) -> usize {
        self.commands.len()
    }

    /// Decoded commands in stream order.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Vertex window the list's `G_VTX` commands address.
    #[must_use]
    pub fn window(&self) -> VertexWindow {
        self.window
    }

    /// Baseline added to `G_VTX` addresses before falling back to raw
    /// addressing.
    #[must_use]
    pub fn vertex_pointer(&self) -> u32 {
        self.vertex_pointer
    }

    /// Branch children keyed by target offset.
    #[must_use]
    pub fn branches(&self) -> &BTreeMap<u32, NodeId> {
        &self.branches
    }

    /// The child reached by a `G_DL` with the given target.
    #[must_use]
    pub fn branch(&self, target: u32) -> Option<NodeId> {
        self.branches.get(&target).copied()
    }

    /// `false` for lists that are only reachable as a branch target.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.is_top_level
    }

    /// `G_VTX` commands as `(vertex_count, address)` pairs.
    pub fn vertex_buffers(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.commands.iter().filter_map(|command| match command {
            Command::Vertex {
                vertex_count,
                address,
                ..
            } => Some((*vertex_count, *address)),
            _ => None,
        })
    }

    /// Number of vertices loaded by this list, branches excluded.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_buffers()
            .map(|(count, _)| usize::from(count))
            .sum()
    }
}

/// Arena of display lists decoded from one geometry asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayListGraph {
    nodes: Vec<DisplayList>,
    stream: Vec<NodeId>,
    top_level: Vec<NodeId>,
}

impl DisplayListGraph {
    #[must_use]
    pub fn node(&self, id: NodeId) -> &DisplayList {
        &self.nodes[id.0]
    }

    /// Every materialised node, branch-only nodes included.
    #[must_use]
    pub fn nodes(&self) -> &[DisplayList] {
        &self.nodes
    }

    /// Every list terminated by the top-level walk, in stream order.
    ///
    /// Unlike [`top_level`](Self::top_level) this includes branch lists
    /// that the walk reached again and reused.
    #[must_use]
    pub fn stream(&self) -> &[NodeId] {
        &self.stream
    }

    /// 1-based position of `id` in [`stream`](Self::stream).
    #[must_use]
    pub fn stream_number(&self, id: NodeId) -> Option<usize> {
        self.stream.iter().position(|entry| *entry == id).map(|i| i + 1)
    }

    /// Top-level lists in stream order.
    #[must_use]
    pub fn top_level(&self) -> &[NodeId] {
        &self.top_level
    }

    pub fn top_level_lists(&self) -> impl Iterator<Item = &DisplayList> + '_ {
        self.top_level.iter().map(|id| self.node(*id))
    }

    /// The first node materialised for the list starting at `offset`, if any.
    #[must_use]
    pub fn find(&self, offset: u32) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.offset == offset)
            .map(NodeId)
    }

    /// Vertices loaded by `id` and, recursively, by all of its branches.
    #[must_use]
    pub fn recursive_vertex_count(&self, id: NodeId) -> usize {
        let node = self.node(id);
        node.vertex_count()
            + node
                .branches
                .values()
                .map(|child| self.recursive_vertex_count(*child))
                .sum::<usize>()
    }
}

/// Build the display-list graph for one asset.
///
/// `display_lists` is the display-list region and `vertex_data` the
/// vertex-data region. Every returned top-level list ends in exactly one
/// `G_ENDDL`; lists reached only through `G_DL` are stored in the graph but
/// never listed as top-level.
pub fn build_display_lists(
    display_lists: &[u8],
    vertex_data: &[u8],
    tables: &WindowTables,
    limits: BuildLimits,
) -> DecodeResult<DisplayListGraph> {
    let mut builder = Builder {
        region: display_lists,
        full_window: VertexWindow::full(vertex_data.len()),
        tables,
        limits,
        nodes: Vec::new(),
    };

    let root_state = WindowState {
        window: builder.full_window,
        baseline: 0,
    };
    let stream = builder.walk(0, false, root_state, 0)?;
    let top_level = stream
        .iter()
        .copied()
        .filter(|id| builder.nodes[id.0].is_top_level)
        .collect();

    Ok(DisplayListGraph {
        nodes: builder.nodes,
        stream,
        top_level,
    })
}

struct Builder<'a> {
    region: &'a [u8],
    full_window: VertexWindow,
    tables: &'a WindowTables,
    limits: BuildLimits,
    nodes: Vec<DisplayList>,
}

/// Per-list accumulator while walking one stream.
#[derive(Default)]
struct Pending {
    raw: Vec<u8>,
    commands: Vec<Command>,
    branches: BTreeMap<u32, NodeId>,
}

impl Builder<'_> {
    /// Walk the stream starting at `start`.
    ///
    /// A branch walk (`is_branch`) finalises exactly one list and returns.
    /// A top-level walk continues until the end of the region.
    fn walk(
        &mut self,
        start: usize,
        is_branch: bool,
        inherited: WindowState,
        depth: usize,
    ) -> DecodeResult<Vec<NodeId>> {
        let mut finalized = Vec::new();
        let mut pending = Pending::default();
        // Lists already built as branches of earlier siblings in this walk.
        let mut reusable: HashMap<u32, NodeId> = HashMap::new();
        let mut state = inherited;
        let mut last_chunk_start = 0;
        let mut list_start = start;
        // Arena length when the pending list started; everything past it
        // belongs to the pending list's branches.
        let mut list_mark = self.nodes.len();
        let mut cursor = start;

        loop {
            if cursor >= self.region.len() && pending.commands.is_empty() && !is_branch {
                break;
            }

            let command = read_command(self.region, cursor)?;
            pending
                .raw
                .extend_from_slice(&self.region[cursor..cursor + COMMAND_SIZE]);
            pending.commands.push(command);

            match command {
                Command::DisplayList { target, .. } => {
                    // Each parent owns its branch nodes; the window is
                    // rebound per parent at its terminator.
                    if !pending.branches.contains_key(&target) {
                        let child = self.branch(cursor, target, state.window, depth)?;
                        pending.branches.insert(target, child);
                    }
                }
                Command::EndDisplayList => {
                    let offset = offset_u32(list_start);

                    if let Some(window) = self.tables.chunk_window(offset) {
                        if window.start != last_chunk_start {
                            state.baseline = 0;
                            last_chunk_start = window.start;
                        }
                        state.window = window;
                    }
                    if self.tables.is_expansion(offset) {
                        state.window = self.full_window;
                        state.baseline = 0;
                    }

                    let pending = std::mem::take(&mut pending);
                    let id = if let Some(existing) = reusable.get(&offset) {
                        tracing::debug!(offset, "reusing display list built as a branch");
                        // Drop the branch nodes built while re-walking it.
                        self.nodes.truncate(list_mark);
                        *existing
                    } else {
                        // Branches follow the window their parent settled on.
                        for child in pending.branches.values() {
                            self.nodes[child.0].window = state.window;
                        }
                        self.push(DisplayList {
                            offset,
                            raw: pending.raw,
                            commands: pending.commands,
                            window: state.window,
                            vertex_pointer: state.baseline,
                            branches: pending.branches,
                            is_top_level: !is_branch,
                        })
                    };

                    let node = &self.nodes[id.0];
                    for (target, child) in &node.branches {
                        reusable.entry(*target).or_insert(*child);
                    }
                    let consumed = node.vertex_count() * VERTEX_SIZE;
                    state.baseline = state
                        .baseline
                        .saturating_add(u32::try_from(consumed).unwrap_or(u32::MAX));

                    tracing::debug!(
                        offset,
                        commands = node.num_commands(),
                        branches = node.branches.len(),
                        window_start = state.window.start,
                        vertex_pointer = node.vertex_pointer,
                        "finalized display list"
                    );

                    finalized.push(id);
                    cursor += COMMAND_SIZE;
                    list_start = cursor;
                    list_mark = self.nodes.len();
                    if is_branch {
                        break;
                    }
                    continue;
                }
                _ => {}
            }

            cursor += COMMAND_SIZE;
        }

        Ok(finalized)
    }

    /// Build the branch target of the `G_DL` at `offset`.
    fn branch(
        &mut self,
        offset: usize,
        target: u32,
        window: VertexWindow,
        depth: usize,
    ) -> DecodeResult<NodeId> {
        let start = target as usize;
        if start >= self.region.len() {
            return Err(DecodeError::MissingBranchTarget {
                offset,
                target,
                region_len: self.region.len(),
            });
        }
        if depth >= self.limits.max_branch_depth {
            return Err(DecodeError::RecursionLimit {
                offset,
                depth: self.limits.max_branch_depth,
            });
        }

        let inherited = WindowState {
            window,
            baseline: 0,
        };
        let finalized = self.walk(start, true, inherited, depth + 1)?;
        // A branch walk only returns after finalising its single list.
        finalized
            .first()
            .copied()
            .ok_or(DecodeError::TruncatedStream {
                offset: start,
                remaining: self.region.len() - start,
            })
    }

    fn push(&mut self, list: DisplayList) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(list);
        id
    }
}

fn offset_u32(offset: usize) -> u32 {
    u32::try_from(offset).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{VertexChunk, VertexExpansion};
    use proptest::prelude::*;

    const END: [u8; 8] = [0xDF, 0, 0, 0, 0, 0, 0, 0];
    const SYNC: [u8; 8] = [0xE7, 0, 0, 0, 0, 0, 0, 0];

    fn vtx(count: u8, address: u32) -> [u8; 8] {
        let packed = u16::from(count) << 4;
        let [_, a, b, c] = address.to_be_bytes();
        let [hi, lo] = packed.to_be_bytes();
        [0x01, hi, lo, count * 2, 0x06, a, b, c]
    }

    fn dl(target: u32) -> [u8; 8] {
        let [_, a, b, c] = target.to_be_bytes();
        [0xDE, 0x00, 0x00, 0x00, 0x06, a, b, c]
    }

    fn region(commands: &[[u8; 8]]) -> Vec<u8> {
        commands.concat()
    }

    fn chunk(starts: &[u32], start: u32, size: u32) -> VertexChunk {
        let mut display_lists = [(0, 0); 4];
        for (slot, offset) in display_lists.iter_mut().zip(starts) {
            *slot = (*offset, 8);
        }
        VertexChunk {
            r: 0,
            g: 0,
            b: 0,
            unknown_char: 0,
            ucode_marker: [0; 4],
            unknown_flag: 0,
            display_lists,
            vertex_window: VertexWindow { start, size },
        }
    }

    fn expansion(offset: u32) -> VertexExpansion {
        VertexExpansion {
            unknown_1: 0,
            unknown_2: 0,
            display_list_offset: offset,
            unknown_4: 0,
        }
    }

    fn build(
        data: &[u8],
        vertex_len: usize,
        tables: &WindowTables,
    ) -> DecodeResult<DisplayListGraph> {
        build_display_lists(data, &vec![0; vertex_len], tables, BuildLimits::default())
    }

    #[test]
    fn splits_region_into_top_level_lists() {
        let data = region(&[vtx(2, 0), SYNC, END, vtx(1, 0), END]);
        let graph = build(&data, 0x40, &WindowTables::default()).unwrap();

        assert_eq!(graph.top_level().len(), 2);
        let first = graph.node(graph.top_level()[0]);
        let second = graph.node(graph.top_level()[1]);
        assert_eq!((first.offset(), first.num_commands()), (0, 3));
        assert_eq!((second.offset(), second.num_commands()), (0x18, 2));
        assert_eq!(first.vertex_pointer(), 0);
        // Inherited window: the baseline keeps running across siblings.
        assert_eq!(second.vertex_pointer(), 2 * 16);
        assert_eq!(second.window(), VertexWindow::full(0x40));
    }

    #[test]
    fn trailing_commands_without_terminator_are_fatal() {
        let data = region(&[vtx(1, 0), END, SYNC]);
        assert_eq!(
            build(&data, 0x10, &WindowTables::default()),
            Err(DecodeError::TruncatedStream {
                offset: 0x18,
                remaining: 0
            })
        );
    }

    #[test]
    fn malformed_opcode_is_fatal() {
        let data = region(&[[0x42, 0, 0, 0, 0, 0, 0, 0], END]);
        assert_eq!(
            build(&data, 0, &WindowTables::default()),
            Err(DecodeError::MalformedOpcode {
                offset: 0,
                opcode: 0x42
            })
        );
    }

    #[test]
    fn branch_target_outside_region_is_fatal() {
        let data = region(&[dl(0x100), END]);
        assert_eq!(
            build(&data, 0, &WindowTables::default()),
            Err(DecodeError::MissingBranchTarget {
                offset: 0,
                target: 0x100,
                region_len: 0x10
            })
        );
    }

    #[test]
    fn branch_yields_single_child_node() {
        // 0x00: top-level list calling 0x18; 0x18: branch target.
        let data = region(&[dl(0x18), vtx(1, 0), END, vtx(2, 0), END, vtx(1, 0), END]);
        let graph = build(&data, 0x80, &WindowTables::default()).unwrap();

        let root = graph.node(graph.top_level()[0]);
        let child = root.branch(0x18).unwrap();
        assert_eq!(graph.node(child).offset(), 0x18);
        assert_eq!(graph.node(child).num_commands(), 2);
        assert!(!graph.node(child).is_top_level());
        assert_eq!(graph.node(child).vertex_pointer(), 0);
        assert_eq!(graph.recursive_vertex_count(graph.top_level()[0]), 3);
    }

    #[test]
    fn branch_reached_again_at_top_level_is_reused_not_listed() {
        let data = region(&[dl(0x10), END, vtx(2, 0), END, vtx(1, 0), END]);
        let graph = build(&data, 0x80, &WindowTables::default()).unwrap();

        // 0x10 is materialised once, as a branch, and not listed at top level.
        let offsets: Vec<_> = graph.top_level_lists().map(DisplayList::offset).collect();
        assert_eq!(offsets, vec![0x00, 0x20]);
        assert_eq!(graph.nodes().iter().filter(|n| n.offset() == 0x10).count(), 1);
        // Stream numbering still counts the reused list.
        assert_eq!(graph.stream().len(), 3);
        assert_eq!(graph.stream_number(graph.top_level()[1]), Some(3));
        // The reused list still advances the running baseline.
        assert_eq!(graph.node(graph.top_level()[1]).vertex_pointer(), 2 * 16);
    }

    #[test]
    fn duplicate_branch_targets_share_one_node() {
        let data = region(&[dl(0x20), SYNC, dl(0x20), END, vtx(1, 0), END]);
        let graph = build(&data, 0x40, &WindowTables::default()).unwrap();

        let root = graph.node(graph.top_level()[0]);
        assert_eq!(root.branches().len(), 1);
        assert_eq!(graph.nodes().iter().filter(|n| n.offset() == 0x20).count(), 1);
    }

    #[test]
    fn siblings_calling_one_target_get_their_own_windows() {
        let data = region(&[dl(0x20), END, dl(0x20), END, vtx(1, 0), END]);
        let tables = WindowTables::new(
            &[chunk(&[0x00], 0x00, 0x40), chunk(&[0x10], 0x40, 0x40)],
            &[],
            0x80,
        );
        let graph = build(&data, 0x80, &tables).unwrap();

        let first = graph.node(graph.top_level()[0]);
        let second = graph.node(graph.top_level()[1]);
        let first_child = first.branch(0x20).unwrap();
        let second_child = second.branch(0x20).unwrap();
        assert_ne!(first_child, second_child);
        assert_eq!(graph.node(first_child).window().start, 0x00);
        assert_eq!(graph.node(second_child).window().start, 0x40);
        // 0x20 is reused at top level rather than listed.
        assert_eq!(graph.top_level().len(), 2);
    }

    #[test]
    fn nested_branch_rewalked_at_top_level_leaves_no_duplicates() {
        // 0x00 calls 0x10, which calls 0x20. Both are walked again at top level.
        let data = region(&[dl(0x10), END, dl(0x20), END, vtx(1, 0), END]);
        let graph = build(&data, 0x40, &WindowTables::default()).unwrap();

        for offset in [0x00, 0x10, 0x20] {
            let copies = graph.nodes().iter().filter(|n| n.offset() == offset).count();
            assert_eq!(copies, 1, "offset {offset:#x}");
        }
        let offsets: Vec<_> = graph.top_level_lists().map(DisplayList::offset).collect();
        assert_eq!(offsets, vec![0x00]);

        let middle = graph.node(graph.find(0x10).unwrap());
        assert_eq!(middle.branch(0x20), graph.find(0x20));
    }

    #[test]
    fn siblings_sharing_a_chunk_keep_one_baseline() {
        let data = region(&[vtx(2, 0), END, vtx(2, 0), END]);
        let tables = WindowTables::new(&[chunk(&[0x00, 0x10], 0x100, 0x40)], &[], 0x200);
        let graph = build(&data, 0x200, &tables).unwrap();

        let first = graph.node(graph.top_level()[0]);
        let second = graph.node(graph.top_level()[1]);
        let window = VertexWindow {
            start: 0x100,
            size: 0x40,
        };
        assert_eq!((first.window(), first.vertex_pointer()), (window, 0));
        assert_eq!((second.window(), second.vertex_pointer()), (window, 0x20));
    }

    #[test]
    fn new_chunk_resets_baseline() {
        let data = region(&[vtx(2, 0), END, vtx(2, 0), END]);
        let tables = WindowTables::new(
            &[chunk(&[0x00], 0x100, 0x40), chunk(&[0x10], 0x140, 0x40)],
            &[],
            0x200,
        );
        let graph = build(&data, 0x200, &tables).unwrap();

        let second = graph.node(graph.top_level()[1]);
        assert_eq!(second.window().start, 0x140);
        assert_eq!(second.vertex_pointer(), 0);
    }

    #[test]
    fn expansion_overrides_chunk() {
        let data = region(&[vtx(2, 0), END, vtx(2, 0), END]);
        let tables = WindowTables::new(
            &[chunk(&[0x00, 0x10], 0x100, 0x40)],
            &[expansion(0x10)],
            0x200,
        );
        let graph = build(&data, 0x200, &tables).unwrap();

        let second = graph.node(graph.top_level()[1]);
        assert_eq!(second.window(), VertexWindow::full(0x200));
        assert_eq!(second.vertex_pointer(), 0);
    }

    #[test]
    fn branch_children_follow_parent_window() {
        let data = region(&[dl(0x10), END, vtx(1, 0), END]);
        let tables = WindowTables::new(&[chunk(&[0x00], 0x80, 0x20)], &[], 0x100);
        let graph = build(&data, 0x100, &tables).unwrap();

        let root = graph.node(graph.top_level()[0]);
        let child = graph.node(root.branch(0x10).unwrap());
        assert_eq!(child.window(), root.window());
        assert_eq!(child.window().start, 0x80);
    }

    #[test]
    fn self_referencing_branch_hits_depth_limit() {
        let data = region(&[dl(0x08), dl(0x08), END]);
        let limits = BuildLimits { max_branch_depth: 4 };
        let result = build_display_lists(&data, &[], &WindowTables::default(), limits);
        assert_eq!(
            result,
            Err(DecodeError::RecursionLimit {
                offset: 0x08,
                depth: 4
            })
        );
    }

    proptest! {
        #[test]
        fn lists_are_whole_commands_ending_in_enddl(
            lengths in proptest::collection::vec(0usize..6, 1..8),
        ) {
            let mut commands = Vec::new();
            for len in &lengths {
                commands.extend(std::iter::repeat_n(SYNC, *len));
                commands.push(END);
            }
            let data = region(&commands);
            let graph = build(&data, 0, &WindowTables::default()).unwrap();

            prop_assert_eq!(graph.top_level().len(), lengths.len());
            for list in graph.top_level_lists() {
                prop_assert_eq!(list.size() % COMMAND_SIZE, 0);
                prop_assert_eq!(list.commands().last(), Some(&Command::EndDisplayList));
                let terminators = list
                    .commands()
                    .iter()
                    .filter(|c| **c == Command::EndDisplayList)
                    .count();
                prop_assert_eq!(terminators, 1);
            }
        }

        #[test]
        fn build_is_deterministic(counts in proptest::collection::vec(1u8..4, 1..6)) {
            let commands: Vec<_> = counts.iter().flat_map(|count| [vtx(*count, 0), END]).collect();
            let data = region(&commands);
            let tables = WindowTables::default();
            prop_assert_eq!(build(&data, 0x100, &tables), build(&data, 0x100, &tables));
        }
    }
}
