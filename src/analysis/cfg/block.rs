//! Basic blocks: maximal straight-line instruction runs.

use crate::bytecode::{Instruction, MethodBody};
use crate::utils::graph::NodeId;

/// A maximal straight-line run of instructions.
///
/// Blocks are contiguous: a block covers the instruction indices `first..=last` and every
/// instruction of a method belongs to exactly one block. Control transfers only into
/// `first` and only out of `last`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    id: NodeId,
    first: u32,
    last: u32,
}

impl BasicBlock {
    pub(crate) fn new(id: NodeId, first: u32, last: u32) -> Self {
        debug_assert!(first <= last);
        BasicBlock { id, first, last }
    }

    /// Graph node id of this block.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Index of the first instruction.
    #[must_use]
    pub fn first_index(&self) -> u32 {
        self.first
    }

    /// Index of the last instruction.
    #[must_use]
    pub fn last_index(&self) -> u32 {
        self.last
    }

    /// Number of instructions in the block.
    #[must_use]
    pub fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    /// Always `false`; blocks hold at least one instruction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `true` when `index` falls inside this block.
    #[must_use]
    pub fn contains(&self, index: u32) -> bool {
        self.first <= index && index <= self.last
    }

    /// The instructions of this block, sliced out of `body`.
    #[must_use]
    pub fn instructions<'a>(&self, body: &'a MethodBody) -> &'a [Instruction] {
        &body.instructions()[self.first as usize..=self.last as usize]
    }

    /// The block's terminating instruction.
    #[must_use]
    pub fn terminator<'a>(&self, body: &'a MethodBody) -> &'a Instruction {
        &body.instructions()[self.last as usize]
    }
}
