//! The analysis passes: control flow, control dependence, frame simulation, operand
//! resolution, and the variable-dependency graph.
//!
//! Everything here consumes a validated [`crate::bytecode::MethodBody`] and is pure: no
//! global state, no mutation of inputs. [`MethodAnalysis`] is the umbrella type tying the
//! passes of one method together; [`crate::AnalysisSession`] caches and shares them.

pub mod cdg;
pub mod cfg;
pub mod dataflow;
pub mod frames;
pub mod method;
pub mod operands;

pub use cdg::{ControlDependency, ControlDependenceGraph};
pub use cfg::{BasicBlock, CfgEdge, CfgEdgeKind, ControlFlowGraph};
pub use dataflow::{DepVariable, DependencyGraph, RelationKind, VarId, VariableKind};
pub use frames::{simulate, Frame, SourceSet};
pub use method::MethodAnalysis;
