//! Control-flow edges and their kinds.

use std::fmt;

use crate::utils::graph::NodeId;

/// Why control may transfer from one block to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CfgEdgeKind {
    /// Sequential flow into the next block.
    Fallthrough,
    /// Unconditional jump (`goto`, `goto_w`, and the `jsr` target edge).
    Goto,
    /// Conditional jump; `outcome` is `true` for the taken edge, `false` for fallthrough.
    Branch {
        /// Decision outcome this edge represents.
        outcome: bool,
    },
    /// Switch dispatch; `key` is the case value, `None` for the default edge.
    Switch {
        /// Matched case value, `None` for default.
        key: Option<i32>,
    },
    /// Transfer into an exception handler from anywhere in its protected range.
    Exception {
        /// Internal name of the caught class, `None` for catch-all.
        catch_type: Option<String>,
    },
}

impl CfgEdgeKind {
    /// `true` for edges that represent a branch or switch decision.
    #[must_use]
    pub fn is_decision(&self) -> bool {
        matches!(self, CfgEdgeKind::Branch { .. } | CfgEdgeKind::Switch { .. })
    }

    /// The decision outcome this edge encodes, when it is a decision edge.
    ///
    /// Branch edges report their outcome directly; switch case edges count as `true` and
    /// the default edge as `false`.
    #[must_use]
    pub fn decision_outcome(&self) -> Option<bool> {
        match self {
            CfgEdgeKind::Branch { outcome } => Some(*outcome),
            CfgEdgeKind::Switch { key } => Some(key.is_some()),
            _ => None,
        }
    }
}

impl fmt::Display for CfgEdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CfgEdgeKind::Fallthrough => f.write_str("fallthrough"),
            CfgEdgeKind::Goto => f.write_str("goto"),
            CfgEdgeKind::Branch { outcome: true } => f.write_str("taken"),
            CfgEdgeKind::Branch { outcome: false } => f.write_str("not-taken"),
            CfgEdgeKind::Switch { key: Some(k) } => write!(f, "case {}", k),
            CfgEdgeKind::Switch { key: None } => f.write_str("default"),
            CfgEdgeKind::Exception { catch_type: Some(t) } => write!(f, "catch {}", t),
            CfgEdgeKind::Exception { catch_type: None } => f.write_str("catch-all"),
        }
    }
}

/// One edge of the control-flow graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgEdge {
    /// Source block.
    pub from: NodeId,
    /// Target block.
    pub to: NodeId,
    /// Transfer kind.
    pub kind: CfgEdgeKind,
}

impl CfgEdge {
    /// Sequential-flow edge.
    #[must_use]
    pub fn fallthrough(from: NodeId, to: NodeId) -> Self {
        CfgEdge { from, to, kind: CfgEdgeKind::Fallthrough }
    }

    /// Unconditional-jump edge.
    #[must_use]
    pub fn goto(from: NodeId, to: NodeId) -> Self {
        CfgEdge { from, to, kind: CfgEdgeKind::Goto }
    }

    /// Conditional-branch edge with its outcome.
    #[must_use]
    pub fn branch(from: NodeId, to: NodeId, outcome: bool) -> Self {
        CfgEdge { from, to, kind: CfgEdgeKind::Branch { outcome } }
    }

    /// Switch case edge (`key = None` for default).
    #[must_use]
    pub fn switch(from: NodeId, to: NodeId, key: Option<i32>) -> Self {
        CfgEdge { from, to, kind: CfgEdgeKind::Switch { key } }
    }

    /// Exception-handler edge.
    #[must_use]
    pub fn exception(from: NodeId, to: NodeId, catch_type: Option<String>) -> Self {
        CfgEdge { from, to, kind: CfgEdgeKind::Exception { catch_type } }
    }
}
