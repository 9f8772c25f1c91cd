//! Control-flow graph construction and queries.
//!
//! The builder performs a single leader scan over the instruction sequence: targets of
//! jumps and switches, exception-handler entry points, and instructions following a
//! terminator or conditional branch all start a new block. Blocks exactly partition the
//! sequence, so every instruction maps to one block even when it is unreachable -
//! unreachable blocks are flagged, never dropped, because callers may still want to
//! inspect them.

use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use log::{debug, warn};

use crate::analysis::cfg::{BasicBlock, CfgEdge};
use crate::bytecode::{MethodBody, OpcodeCategory, Payload};
use crate::utils::graph::{reverse_postorder, DirectedGraph, DominatorTree, NodeId};
use crate::Result;

/// The control-flow graph of one method body.
///
/// Owns the body it was built from; the dominator tree is computed lazily on first use
/// and cached.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use classflow::analysis::ControlFlowGraph;
/// use classflow::bytecode::{opcode, AccessFlags, Instruction, MethodBody, Payload};
///
/// let insns = vec![
///     Instruction::new("Demo", "id", 0, 0, opcode::ILOAD_0, Payload::None),
///     Instruction::new("Demo", "id", 1, 1, opcode::IRETURN, Payload::None),
/// ];
/// let body = MethodBody::new("Demo", "id", "(I)I", AccessFlags::ACC_STATIC, 1, insns, vec![])
///     .unwrap();
/// let cfg = ControlFlowGraph::build(Arc::new(body)).unwrap();
/// assert_eq!(cfg.block_count(), 1);
/// assert_eq!(cfg.exits(), &[cfg.entry()]);
/// ```
#[derive(Debug)]
pub struct ControlFlowGraph {
    body: Arc<MethodBody>,
    blocks: Vec<BasicBlock>,
    edges: Vec<CfgEdge>,
    graph: DirectedGraph,
    block_index: Vec<NodeId>,
    entry: NodeId,
    exits: Vec<NodeId>,
    unreachable: Vec<NodeId>,
    dominators: OnceLock<DominatorTree>,
}

impl ControlFlowGraph {
    /// Builds the CFG of `body`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::GraphError`] when control can fall off the end of the
    /// method along a reachable path, which a verified class file never allows. An
    /// unreachable trailing block with no successor is flagged unreachable instead.
    pub fn build(body: Arc<MethodBody>) -> Result<Self> {
        let len = body.len();
        let instructions = body.instructions();

        // Leader scan
        let mut leader = vec![false; len];
        leader[0] = true;
        for (i, insn) in instructions.iter().enumerate() {
            match insn.payload() {
                Payload::Jump { target } => leader[*target as usize] = true,
                Payload::Switch(table) => {
                    for (_, t) in &table.cases {
                        leader[*t as usize] = true;
                    }
                    leader[table.default as usize] = true;
                }
                _ => {}
            }
            let splits_after = insn.is_terminator() || insn.is_branch()
                || insn.category() == OpcodeCategory::Jsr;
            if splits_after && i + 1 < len {
                leader[i + 1] = true;
            }
        }
        for h in body.handlers() {
            leader[h.handler as usize] = true;
            // A protected range boundary is also a block boundary, so exception edges
            // originate from whole blocks.
            leader[h.start as usize] = true;
            if (h.end as usize) < len {
                leader[h.end as usize] = true;
            }
        }

        // Partition into blocks
        let mut blocks = Vec::new();
        let mut block_index = vec![NodeId(0); len];
        let mut first = 0usize;
        for i in 0..len {
            if i + 1 == len || leader[i + 1] {
                let id = NodeId(blocks.len());
                blocks.push(BasicBlock::new(id, first as u32, i as u32));
                for slot in &mut block_index[first..=i] {
                    *slot = id;
                }
                first = i + 1;
            }
        }

        let mut graph = DirectedGraph::with_nodes(blocks.len());
        let mut edges = Vec::new();
        let mut exits = Vec::new();
        // Blocks whose fallthrough successor does not exist. Only fatal when such a
        // block turns out to be reachable.
        let mut falls_off: Vec<NodeId> = Vec::new();
        fn push_edge(graph: &mut DirectedGraph, edges: &mut Vec<CfgEdge>, e: CfgEdge) {
            graph.add_edge(e.from, e.to);
            edges.push(e);
        }

        for block in &blocks {
            let id = block.id();
            let last = block.last_index();
            let terminator = &instructions[last as usize];
            let next_block = |index: u32| block_index.get(index as usize).copied();

            match terminator.category() {
                OpcodeCategory::If | OpcodeCategory::IfCmp => {
                    let target = match terminator.payload() {
                        Payload::Jump { target } => *target,
                        _ => {
                            return Err(crate::Error::GraphError(format!(
                                "branch without target at {}",
                                terminator
                            )))
                        }
                    };
                    push_edge(&mut graph, &mut edges, CfgEdge::branch(id, block_index[target as usize], true));
                    match next_block(last + 1) {
                        Some(to) => push_edge(&mut graph, &mut edges, CfgEdge::branch(id, to, false)),
                        None => falls_off.push(id),
                    }
                }
                OpcodeCategory::Goto => {
                    let target = match terminator.payload() {
                        Payload::Jump { target } => *target,
                        _ => {
                            return Err(crate::Error::GraphError(format!(
                                "goto without target at {}",
                                terminator
                            )))
                        }
                    };
                    push_edge(&mut graph, &mut edges, CfgEdge::goto(id, block_index[target as usize]));
                }
                OpcodeCategory::Switch => {
                    if let Payload::Switch(table) = terminator.payload() {
                        for (key, target) in &table.cases {
                            push_edge(
                                &mut graph,
                                &mut edges,
                                CfgEdge::switch(id, block_index[*target as usize], Some(*key)),
                            );
                        }
                        push_edge(
                            &mut graph,
                            &mut edges,
                            CfgEdge::switch(id, block_index[table.default as usize], None),
                        );
                    }
                }
                OpcodeCategory::Return | OpcodeCategory::Throw => exits.push(id),
                OpcodeCategory::Ret => {
                    // Subroutine returns are legacy; without subroutine tracking the block
                    // is treated as a method exit.
                    warn!("ret at {} treated as method exit", terminator);
                    exits.push(id);
                }
                OpcodeCategory::Jsr => {
                    if let Payload::Jump { target } = terminator.payload() {
                        push_edge(&mut graph, &mut edges, CfgEdge::goto(id, block_index[*target as usize]));
                    }
                    match next_block(last + 1) {
                        Some(to) => push_edge(&mut graph, &mut edges, CfgEdge::fallthrough(id, to)),
                        None => falls_off.push(id),
                    }
                }
                _ => match next_block(last + 1) {
                    Some(to) => push_edge(&mut graph, &mut edges, CfgEdge::fallthrough(id, to)),
                    None => falls_off.push(id),
                },
            }
        }

        for h in body.handlers() {
            let handler_block = block_index[h.handler as usize];
            let mut covered = (h.start..h.end).map(|i| block_index[i as usize]).collect::<Vec<_>>();
            covered.dedup();
            for from in covered {
                push_edge(
                    &mut graph,
                    &mut edges,
                    CfgEdge::exception(from, handler_block, h.catch_type.clone()),
                );
            }
        }

        let entry = NodeId(0);
        let reachable = reverse_postorder(&graph, entry);
        let mut seen = vec![false; blocks.len()];
        for &n in &reachable {
            seen[n.index()] = true;
        }
        if let Some(&bad) = falls_off.iter().find(|b| seen[b.index()]) {
            return Err(crate::Error::GraphError(format!(
                "control falls off the end of {}.{} after {}",
                body.class_name(),
                body.method_name(),
                instructions[blocks[bad.index()].last_index() as usize]
            )));
        }
        let unreachable: Vec<NodeId> = (0..blocks.len()).map(NodeId).filter(|n| !seen[n.index()]).collect();
        if !unreachable.is_empty() {
            debug!(
                "{}.{}: {} unreachable block(s)",
                body.class_name(),
                body.method_name(),
                unreachable.len()
            );
        }

        Ok(ControlFlowGraph {
            body,
            blocks,
            edges,
            graph,
            block_index,
            entry,
            exits,
            unreachable,
            dominators: OnceLock::new(),
        })
    }

    /// The method body this graph was built from.
    #[must_use]
    pub fn body(&self) -> &Arc<MethodBody> {
        &self.body
    }

    /// The entry block (always the block containing instruction 0).
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Blocks ending in a return, throw, or subroutine return.
    #[must_use]
    pub fn exits(&self) -> &[NodeId] {
        &self.exits
    }

    /// Number of basic blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// All blocks, ordered by first instruction index.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// The block with the given id.
    #[must_use]
    pub fn block(&self, id: NodeId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    /// The block containing instruction `index`.
    #[must_use]
    pub fn block_of_instruction(&self, index: u32) -> Option<NodeId> {
        self.block_index.get(index as usize).copied()
    }

    /// All edges, including exception edges.
    #[must_use]
    pub fn edges(&self) -> &[CfgEdge] {
        &self.edges
    }

    /// Edges leaving `block`.
    pub fn out_edges(&self, block: NodeId) -> impl Iterator<Item = &CfgEdge> + '_ {
        self.edges.iter().filter(move |e| e.from == block)
    }

    /// Successor blocks of `block`.
    #[must_use]
    pub fn successors(&self, block: NodeId) -> &[NodeId] {
        self.graph.successors(block)
    }

    /// Predecessor blocks of `block`.
    #[must_use]
    pub fn predecessors(&self, block: NodeId) -> &[NodeId] {
        self.graph.predecessors(block)
    }

    /// The underlying block graph.
    #[must_use]
    pub fn raw_graph(&self) -> &DirectedGraph {
        &self.graph
    }

    /// Blocks not reachable from the entry.
    #[must_use]
    pub fn unreachable_blocks(&self) -> &[NodeId] {
        &self.unreachable
    }

    /// `true` when `block` is reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, block: NodeId) -> bool {
        !self.unreachable.contains(&block)
    }

    /// Reachable blocks in reverse postorder.
    #[must_use]
    pub fn reverse_postorder(&self) -> Vec<NodeId> {
        reverse_postorder(&self.graph, self.entry)
    }

    /// The dominator tree, computed on first use.
    #[must_use]
    pub fn dominator_tree(&self) -> &DominatorTree {
        self.dominators.get_or_init(|| DominatorTree::compute(&self.graph, self.entry))
    }

    /// Renders the graph in Graphviz DOT format, one record per block.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph cfg {\n  node [shape=box, fontname=monospace];\n");
        for block in &self.blocks {
            let mut label = String::new();
            for insn in block.instructions(&self.body) {
                let _ = write!(label, "{}\\l", insn);
            }
            let _ = writeln!(out, "  {} [label=\"{}\"];", block.id(), label);
        }
        for edge in &self.edges {
            let _ = writeln!(out, "  {} -> {} [label=\"{}\"];", edge.from, edge.to, edge.kind);
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::cfg::CfgEdgeKind;
    use crate::bytecode::{opcode::*, AccessFlags, ExceptionHandler, Instruction, SwitchTable};

    fn body(ops: Vec<(u8, Payload)>, handlers: Vec<ExceptionHandler>) -> Arc<MethodBody> {
        let insns = ops
            .into_iter()
            .enumerate()
            .map(|(i, (op, payload))| Instruction::new("Demo", "m", i as u32, i as u32, op, payload))
            .collect();
        Arc::new(MethodBody::new("Demo", "m", "()V", AccessFlags::ACC_STATIC, 4, insns, handlers).unwrap())
    }

    fn jump(target: u32) -> Payload {
        Payload::Jump { target }
    }

    #[test]
    fn straight_line_is_one_block() {
        let cfg = ControlFlowGraph::build(body(
            vec![(ICONST_0, Payload::None), (POP, Payload::None), (RETURN, Payload::None)],
            vec![],
        ))
        .unwrap();
        assert_eq!(cfg.block_count(), 1);
        assert_eq!(cfg.exits(), &[cfg.entry()]);
        assert!(cfg.unreachable_blocks().is_empty());
    }

    #[test]
    fn blocks_partition_the_method() {
        // if (x) { } else { } join
        let cfg = ControlFlowGraph::build(body(
            vec![
                (ICONST_0, Payload::None),  // 0
                (IFEQ, jump(4)),            // 1
                (NOP, Payload::None),       // 2: then
                (GOTO, jump(5)),            // 3
                (NOP, Payload::None),       // 4: else
                (RETURN, Payload::None),    // 5: join
            ],
            vec![],
        ))
        .unwrap();
        assert_eq!(cfg.block_count(), 4);
        // every instruction belongs to exactly one block, and block ranges are disjoint
        for i in 0..6u32 {
            let id = cfg.block_of_instruction(i).unwrap();
            assert!(cfg.block(id).contains(i));
            let owners = cfg.blocks().iter().filter(|b| b.contains(i)).count();
            assert_eq!(owners, 1, "instruction {} owned by {} blocks", i, owners);
        }
    }

    #[test]
    fn branch_edges_carry_outcomes() {
        let cfg = ControlFlowGraph::build(body(
            vec![
                (ICONST_0, Payload::None),
                (IFEQ, jump(3)),
                (RETURN, Payload::None),
                (RETURN, Payload::None),
            ],
            vec![],
        ))
        .unwrap();
        let cond = cfg.block_of_instruction(1).unwrap();
        let outcomes: Vec<_> = cfg.out_edges(cond).map(|e| e.kind.clone()).collect();
        assert!(outcomes.contains(&CfgEdgeKind::Branch { outcome: true }));
        assert!(outcomes.contains(&CfgEdgeKind::Branch { outcome: false }));
        assert_eq!(cfg.exits().len(), 2);
    }

    #[test]
    fn switch_edges() {
        let table = SwitchTable { cases: vec![(10, 1), (20, 2)], default: 3 };
        let cfg = ControlFlowGraph::build(body(
            vec![
                (LOOKUPSWITCH, Payload::Switch(table)),
                (RETURN, Payload::None),
                (RETURN, Payload::None),
                (RETURN, Payload::None),
            ],
            vec![],
        ))
        .unwrap();
        let entry = cfg.entry();
        let kinds: Vec<_> = cfg.out_edges(entry).map(|e| e.kind.clone()).collect();
        assert_eq!(kinds.len(), 3);
        assert!(kinds.contains(&CfgEdgeKind::Switch { key: Some(10) }));
        assert!(kinds.contains(&CfgEdgeKind::Switch { key: Some(20) }));
        assert!(kinds.contains(&CfgEdgeKind::Switch { key: None }));
    }

    #[test]
    fn loop_back_edge() {
        // 0: iconst_0, 1: ifeq -> 3 (exit test), 2: goto -> 0, 3: return
        let cfg = ControlFlowGraph::build(body(
            vec![
                (ICONST_0, Payload::None),
                (IFEQ, jump(3)),
                (GOTO, jump(0)),
                (RETURN, Payload::None),
            ],
            vec![],
        ))
        .unwrap();
        let header = cfg.entry();
        let latch = cfg.block_of_instruction(2).unwrap();
        assert!(cfg.successors(latch).contains(&header));
        let dom = cfg.dominator_tree();
        assert!(dom.dominates(header, latch));
    }

    #[test]
    fn unreachable_code_is_flagged_not_dropped() {
        let cfg = ControlFlowGraph::build(body(
            vec![
                (GOTO, jump(2)),
                (NOP, Payload::None), // dead
                (RETURN, Payload::None),
            ],
            vec![],
        ))
        .unwrap();
        let dead = cfg.block_of_instruction(1).unwrap();
        assert_eq!(cfg.unreachable_blocks(), &[dead]);
        assert!(!cfg.is_reachable(dead));
        assert_eq!(cfg.block_count(), 3);
    }

    #[test]
    fn exception_edges_cover_protected_blocks() {
        let handler = ExceptionHandler {
            start: 0,
            end: 2,
            handler: 3,
            catch_type: Some("java/lang/Exception".into()),
        };
        let cfg = ControlFlowGraph::build(body(
            vec![
                (NOP, Payload::None),
                (NOP, Payload::None),
                (RETURN, Payload::None),
                (RETURN, Payload::None), // handler
            ],
            vec![handler],
        ))
        .unwrap();
        let handler_block = cfg.block_of_instruction(3).unwrap();
        let exception_edges: Vec<_> = cfg
            .edges()
            .iter()
            .filter(|e| matches!(e.kind, CfgEdgeKind::Exception { .. }))
            .collect();
        assert!(!exception_edges.is_empty());
        assert!(exception_edges.iter().all(|e| e.to == handler_block));
        assert!(cfg.is_reachable(handler_block));
    }

    #[test]
    fn falling_off_the_end_is_an_error() {
        let result = ControlFlowGraph::build(body(vec![(NOP, Payload::None)], vec![]));
        assert!(matches!(result, Err(crate::Error::GraphError(_))));
    }

    #[test]
    fn dead_trailing_block_does_not_abort_the_build() {
        let cfg = ControlFlowGraph::build(body(
            vec![(RETURN, Payload::None), (NOP, Payload::None)],
            vec![],
        ))
        .unwrap();
        let dead = cfg.block_of_instruction(1).unwrap();
        assert!(!cfg.is_reachable(dead));
        assert!(cfg.out_edges(dead).next().is_none());
        assert_eq!(cfg.exits(), &[cfg.entry()]);
    }

    #[test]
    fn dot_output_mentions_every_block() {
        let cfg = ControlFlowGraph::build(body(
            vec![(ICONST_0, Payload::None), (IFEQ, jump(3)), (RETURN, Payload::None), (RETURN, Payload::None)],
            vec![],
        ))
        .unwrap();
        let dot = cfg.to_dot();
        assert!(dot.starts_with("digraph cfg {"));
        for block in cfg.blocks() {
            assert!(dot.contains(&block.id().to_string()));
        }
    }
}
