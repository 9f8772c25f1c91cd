//! Convenient re-exports of the most commonly used types.
//!
//! ```rust,no_run
//! use classflow::prelude::*;
//! ```

/// The crate-wide error type.
pub use crate::Error;

/// The crate-wide result alias.
pub use crate::Result;

/// The analysis session cache.
pub use crate::AnalysisSession;

/// Opcode constants and metadata.
pub use crate::bytecode::opcode;

/// The instruction model.
pub use crate::bytecode::{
    AccessFlags, ConstValue, ExceptionHandler, FieldRef, Instruction, MethodBody,
    MethodDescriptor, MethodKey, MethodRef, Payload, SwitchTable,
};

/// The analysis passes and their result types.
pub use crate::analysis::{
    BasicBlock, CfgEdge, CfgEdgeKind, ControlDependency, ControlDependenceGraph,
    ControlFlowGraph, DepVariable, DependencyGraph, Frame, MethodAnalysis, RelationKind,
    SourceSet, VarId, VariableKind,
};

/// Graph primitives surfaced by the CFG and CDG APIs.
pub use crate::utils::graph::{DominatorTree, NodeId};
