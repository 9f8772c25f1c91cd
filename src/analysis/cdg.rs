//! Control-dependence computation.
//!
//! A block B is control dependent on a decision edge (X, outcome) when taking that edge
//! makes B's execution inevitable while the other outcome of X can avoid B. The classic
//! construction is used: post-dominators over the reverse CFG, augmented with a virtual
//! exit joined to every exit block, then for each decision edge X -> Y every block on the
//! post-dominator chain from Y up to (excluding) X's immediate post-dominator is dependent
//! on the edge. A loop header sits on that chain for its own exit test, so loop
//! self-dependency falls out naturally.
//!
//! Reachable blocks controlled by no branch at all (straight-line methods, code before
//! the first branch) carry the root sentinel dependency instead of an empty list, so
//! "depends on method entry" and "not computed" stay distinguishable. Unreachable blocks
//! execute on no path, so they carry no dependencies and no depth.

use std::fmt;

use log::debug;

use crate::analysis::cfg::ControlFlowGraph;
use crate::utils::graph::{DirectedGraph, DominatorTree, NodeId};
use crate::Result;

/// One control dependency: the branch instruction that controls a block, and which
/// outcome of that branch leads to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlDependency {
    branch: Option<u32>,
    outcome: bool,
}

impl ControlDependency {
    /// Dependency on a branch instruction with a specific outcome.
    #[must_use]
    pub fn on_branch(branch: u32, outcome: bool) -> Self {
        ControlDependency { branch: Some(branch), outcome }
    }

    /// The root sentinel: control depends only on the method being entered.
    #[must_use]
    pub fn root() -> Self {
        ControlDependency { branch: None, outcome: false }
    }

    /// `true` for the root sentinel.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.branch.is_none()
    }

    /// Index of the controlling branch instruction, `None` for the root sentinel.
    #[must_use]
    pub fn branch_instruction(&self) -> Option<u32> {
        self.branch
    }

    /// The branch outcome that reaches the dependent block. For switches, case edges
    /// count as `true` and the default edge as `false`.
    #[must_use]
    pub fn outcome(&self) -> bool {
        self.outcome
    }
}

impl fmt::Display for ControlDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.branch {
            Some(b) => write!(f, "I{}={}", b, self.outcome),
            None => f.write_str("root"),
        }
    }
}

/// The control-dependence graph of a method, indexed by CFG block id.
pub struct ControlDependenceGraph {
    deps: Vec<Vec<ControlDependency>>,
    depth: Vec<Option<u32>>,
}

impl ControlDependenceGraph {
    /// Builds control dependencies for every block of `cfg`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::GraphError`] when the post-dominance relation cannot be
    /// rooted (never the case for a validated CFG).
    pub fn build(cfg: &ControlFlowGraph) -> Result<Self> {
        let n = cfg.block_count();

        // Reverse CFG rooted at a virtual exit. A method with no normal exit (infinite
        // loop) wires the entry to the virtual exit so the relation stays total.
        let mut augmented = DirectedGraph::with_nodes(n + 1);
        let virtual_exit = NodeId(n);
        for edge in cfg.edges() {
            augmented.add_edge(edge.from, edge.to);
        }
        for &exit in cfg.exits() {
            augmented.add_edge(exit, virtual_exit);
        }
        if cfg.exits().is_empty() {
            augmented.add_edge(cfg.entry(), virtual_exit);
        }
        let postdom = DominatorTree::compute(&augmented.reversed(), virtual_exit);
        if !postdom.is_reachable(cfg.entry()) {
            return Err(crate::Error::GraphError(
                "entry block is not post-dominated by the exit".to_string(),
            ));
        }

        let mut deps: Vec<Vec<ControlDependency>> = vec![Vec::new(); n];
        for edge in cfg.edges() {
            let Some(outcome) = edge.kind.decision_outcome() else {
                continue;
            };
            let branch_insn = cfg.block(edge.from).last_index();
            let stop = postdom.immediate_dominator(edge.from);
            if stop.is_none() {
                debug!("decision block {} has no post-dominator, skipping its edges", edge.from);
                continue;
            }

            let dependency = ControlDependency::on_branch(branch_insn, outcome);
            let mut current = Some(edge.to);
            while let Some(block) = current {
                if Some(block) == stop || block == virtual_exit {
                    break;
                }
                let list = &mut deps[block.index()];
                if !list.contains(&dependency) {
                    list.push(dependency.clone());
                }
                current = postdom.immediate_dominator(block);
            }
        }

        for (i, list) in deps.iter_mut().enumerate() {
            if list.is_empty() && cfg.is_reachable(NodeId(i)) {
                list.push(ControlDependency::root());
            }
        }

        let depth = compute_depths(&deps, cfg);
        Ok(ControlDependenceGraph { deps, depth })
    }

    /// The control dependencies of `block`. Reachable blocks controlled by no branch
    /// carry the root sentinel; only unreachable blocks answer an empty list.
    #[must_use]
    pub fn dependencies(&self, block: NodeId) -> &[ControlDependency] {
        &self.deps[block.index()]
    }

    /// `true` when `block` executes on every path through the method.
    #[must_use]
    pub fn is_root_dependent(&self, block: NodeId) -> bool {
        self.deps[block.index()].iter().any(ControlDependency::is_root)
    }

    /// Number of nested control decisions guarding `block`: 0 for root-dependent blocks,
    /// otherwise one more than the shallowest controlling branch's block. `None` for
    /// unreachable blocks and when every dependence chain of the block is cyclic (a loop
    /// header controlled only by its own exit test).
    #[must_use]
    pub fn depth(&self, block: NodeId) -> Option<u32> {
        self.depth[block.index()]
    }
}

/// Shortest-chain depth over the dependence relation, breadth-first from the
/// root-dependent blocks. Cycles (loop self-dependencies) are handled by the
/// monotone-relaxation loop settling to the minimum.
fn compute_depths(deps: &[Vec<ControlDependency>], cfg: &ControlFlowGraph) -> Vec<Option<u32>> {
    let n = deps.len();
    let mut depth: Vec<Option<u32>> = vec![None; n];
    for (i, list) in deps.iter().enumerate() {
        if list.iter().any(ControlDependency::is_root) {
            depth[i] = Some(0);
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for (i, list) in deps.iter().enumerate() {
            for dep in list {
                let Some(branch) = dep.branch_instruction() else {
                    continue;
                };
                let Some(branch_block) = cfg.block_of_instruction(branch) else {
                    continue;
                };
                if let Some(d) = depth[branch_block.index()] {
                    let candidate = d + 1;
                    if depth[i].map_or(true, |current| candidate < current) {
                        depth[i] = Some(candidate);
                        changed = true;
                    }
                }
            }
        }
    }
    depth
}
