// Copyright 2026 The classflow authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # classflow
//!
//! Static control-flow and data-flow analysis for JVM bytecode methods.
//!
//! `classflow` takes a decoded method body - the instruction sequence, descriptor, access
//! flags, and exception table - and reconstructs the structural facts test generators and
//! program analyzers need:
//!
//! - **Control-flow graph** - basic blocks with typed edges (fallthrough, branch outcomes,
//!   switch cases, exception transfers), dominators, and unreachable-code flagging
//! - **Control-dependence graph** - which branch outcomes govern each block, including
//!   loop self-dependencies
//! - **Frame simulation** - for every reachable instruction, the set of instructions that
//!   may have produced each operand-stack and local-variable value
//! - **Operand resolution** - exact and aliased producer queries per consumed value
//! - **Variable-dependency graph** - classified variables (parameters, fields, the
//!   receiver) linked by derivation relations, with root resolution and path discovery
//!
//! Class-file parsing and bytecode instrumentation are deliberately out of scope: the
//! input boundary is the [`bytecode::MethodBody`] type, which any decoder can produce.
//!
//! ## Quick Start
//!
//! ```rust
//! use classflow::prelude::*;
//!
//! // static int add(int a, int b) { return a + b; }
//! let insns = vec![
//!     Instruction::new("Demo", "add", 0, 0, opcode::ILOAD_0, Payload::None),
//!     Instruction::new("Demo", "add", 1, 1, opcode::ILOAD_1, Payload::None),
//!     Instruction::new("Demo", "add", 2, 2, opcode::IADD, Payload::None),
//!     Instruction::new("Demo", "add", 3, 3, opcode::IRETURN, Payload::None),
//! ];
//! let body = MethodBody::new("Demo", "add", "(II)I", AccessFlags::ACC_STATIC, 2, insns, vec![])?;
//!
//! let session = AnalysisSession::new();
//! let analysis = session.analyze(body)?;
//!
//! // the addition consumes both parameter loads
//! let operands: Vec<u32> = analysis.operands(2).iter().map(|i| i.index()).collect();
//! assert_eq!(operands, vec![1, 0]);
//! # Ok::<(), classflow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`bytecode`] - the instruction model: opcodes, payloads, descriptors, method bodies,
//!   and the static stack-effect table
//! - [`analysis`] - the passes: [`analysis::ControlFlowGraph`],
//!   [`analysis::ControlDependenceGraph`], [`analysis::frames`],
//!   [`analysis::DependencyGraph`], all bundled by [`analysis::MethodAnalysis`]
//! - [`AnalysisSession`] - a concurrent build-once cache keyed by method
//! - [`utils`] - the generic directed-graph and dominator-tree machinery
//!
//! Analyses never mutate their input and hold no global state; everything shared lives in
//! an explicit session.

#[macro_use]
pub(crate) mod error;

pub mod analysis;
pub mod bytecode;
pub mod prelude;
pub mod session;
pub mod utils;

/// Convenience alias for `Result<T, classflow::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

pub use error::Error;
pub use session::AnalysisSession;
