//! The per-method analysis bundle.
//!
//! [`MethodAnalysis`] ties one method body to everything derived from it: the CFG, the
//! control-dependence graph, the simulated frames, and the variable-dependency graph.
//! Once published (wrapped in `Arc` by the session) it is immutable; the lazy pieces are
//! guarded by `OnceLock` so sharing across threads is safe without locks.

use std::sync::{Arc, OnceLock};

use crate::analysis::cdg::{ControlDependency, ControlDependenceGraph};
use crate::analysis::cfg::ControlFlowGraph;
use crate::analysis::dataflow::DependencyGraph;
use crate::analysis::frames::{self, Frame};
use crate::bytecode::{MethodBody, MethodKey};
use crate::Result;

/// Complete static analysis of one method.
///
/// # Examples
///
/// ```rust
/// use classflow::analysis::MethodAnalysis;
/// use classflow::bytecode::{opcode, AccessFlags, Instruction, MethodBody, Payload};
///
/// let insns = vec![
///     Instruction::new("Demo", "id", 0, 0, opcode::ILOAD_0, Payload::None),
///     Instruction::new("Demo", "id", 1, 1, opcode::IRETURN, Payload::None),
/// ];
/// let body = MethodBody::new("Demo", "id", "(I)I", AccessFlags::ACC_STATIC, 1, insns, vec![])
///     .unwrap();
/// let analysis = MethodAnalysis::analyze(body).unwrap();
/// assert_eq!(analysis.cfg().block_count(), 1);
/// assert!(analysis.frame(1).is_some());
/// ```
pub struct MethodAnalysis {
    body: Arc<MethodBody>,
    cfg: ControlFlowGraph,
    cdg: ControlDependenceGraph,
    frames: OnceLock<Vec<Option<Frame>>>,
    dependencies: OnceLock<DependencyGraph>,
}

impl MethodAnalysis {
    /// Runs the full pipeline on `body`: CFG, control dependencies, frame simulation.
    ///
    /// The variable-dependency graph is built lazily on first access.
    ///
    /// # Errors
    ///
    /// Propagates any [`crate::Error`] from graph construction or frame simulation.
    pub fn analyze(body: MethodBody) -> Result<Self> {
        let body = Arc::new(body);
        let cfg = ControlFlowGraph::build(Arc::clone(&body))?;
        let cdg = ControlDependenceGraph::build(&cfg)?;
        let analysis = MethodAnalysis {
            body,
            cfg,
            cdg,
            frames: OnceLock::new(),
            dependencies: OnceLock::new(),
        };
        let frames = frames::simulate(&analysis.body)?;
        analysis.attach_frames(frames)?;
        Ok(analysis)
    }

    /// Attaches simulated frames, exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Consistency`] when frames are already attached or the
    /// frame vector does not cover every instruction.
    pub fn attach_frames(&self, frames: Vec<Option<Frame>>) -> Result<()> {
        if frames.len() != self.body.len() {
            return Err(consistency_error!(
                "frame vector covers {} instructions, method {} has {}",
                frames.len(),
                self.body.key(),
                self.body.len()
            ));
        }
        self.frames
            .set(frames)
            .map_err(|_| consistency_error!("frames already attached to {}", self.body.key()))
    }

    /// The analyzed method body.
    #[must_use]
    pub fn body(&self) -> &Arc<MethodBody> {
        &self.body
    }

    /// The cache key of the analyzed method.
    #[must_use]
    pub fn key(&self) -> MethodKey {
        self.body.key()
    }

    /// The control-flow graph.
    #[must_use]
    pub fn cfg(&self) -> &ControlFlowGraph {
        &self.cfg
    }

    /// The control-dependence graph.
    #[must_use]
    pub fn cdg(&self) -> &ControlDependenceGraph {
        &self.cdg
    }

    /// All frames, indexed by instruction; `None` entries are unreachable instructions.
    #[must_use]
    pub fn frames(&self) -> &[Option<Frame>] {
        self.frames.get().map_or(&[], Vec::as_slice)
    }

    /// The pre-state frame of instruction `index`, when reachable.
    #[must_use]
    pub fn frame(&self, index: u32) -> Option<&Frame> {
        self.frames().get(index as usize).and_then(Option::as_ref)
    }

    /// The variable-dependency graph, built on first use.
    #[must_use]
    pub fn dependencies(&self) -> &DependencyGraph {
        self.dependencies
            .get_or_init(|| DependencyGraph::build(&self.body, self.frames()))
    }

    /// The control dependencies of the block containing instruction `index`.
    #[must_use]
    pub fn control_dependencies_of(&self, index: u32) -> &[ControlDependency] {
        match self.cfg.block_of_instruction(index) {
            Some(block) => self.cdg.dependencies(block),
            None => &[],
        }
    }
}
