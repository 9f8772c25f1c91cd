//! Control-flow graph construction: basic blocks, typed edges, dominators.

pub mod block;
pub mod edge;
pub mod graph;

pub use block::BasicBlock;
pub use edge::{CfgEdge, CfgEdgeKind};
pub use graph::ControlFlowGraph;
