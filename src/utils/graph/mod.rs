//! Small owned directed-graph utility shared by the control-flow and control-dependence
//! builders.
//!
//! Nodes are dense indices ([`NodeId`]); edges live in forward and reverse adjacency lists
//! so both successor and predecessor queries are O(outdegree)/O(indegree). The graph is
//! append-only: analyses build it once and then only read it.

pub mod dominators;
pub mod traversal;

pub use dominators::DominatorTree;
pub use traversal::reverse_postorder;

use std::fmt;

/// Dense identifier of a node in a [`DirectedGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The underlying index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// An append-only directed graph over dense node indices.
///
/// # Examples
///
/// ```rust
/// use classflow::utils::graph::DirectedGraph;
///
/// let mut g = DirectedGraph::with_nodes(3);
/// let (a, b, c) = (g.node(0), g.node(1), g.node(2));
/// g.add_edge(a, b);
/// g.add_edge(b, c);
/// assert_eq!(g.successors(a), &[b]);
/// assert_eq!(g.predecessors(c), &[b]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DirectedGraph {
    successors: Vec<Vec<NodeId>>,
    predecessors: Vec<Vec<NodeId>>,
}

impl DirectedGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        DirectedGraph::default()
    }

    /// Creates a graph with `count` nodes and no edges.
    #[must_use]
    pub fn with_nodes(count: usize) -> Self {
        DirectedGraph {
            successors: vec![Vec::new(); count],
            predecessors: vec![Vec::new(); count],
        }
    }

    /// Appends a node, returning its id.
    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId(self.successors.len());
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        id
    }

    /// The id of node `index`. Panics when out of range; use only for known-valid indices.
    #[must_use]
    pub fn node(&self, index: usize) -> NodeId {
        assert!(index < self.successors.len(), "node index {} out of range", index);
        NodeId(index)
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.successors.len()
    }

    /// Adds an edge `from -> to`. Parallel edges are collapsed.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        if !self.successors[from.0].contains(&to) {
            self.successors[from.0].push(to);
            self.predecessors[to.0].push(from);
        }
    }

    /// Successor list of `node`, in insertion order.
    #[must_use]
    pub fn successors(&self, node: NodeId) -> &[NodeId] {
        &self.successors[node.0]
    }

    /// Predecessor list of `node`, in insertion order.
    #[must_use]
    pub fn predecessors(&self, node: NodeId) -> &[NodeId] {
        &self.predecessors[node.0]
    }

    /// The same graph with every edge reversed.
    #[must_use]
    pub fn reversed(&self) -> DirectedGraph {
        DirectedGraph {
            successors: self.predecessors.clone(),
            predecessors: self.successors.clone(),
        }
    }

    /// Iterator over all node ids.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.successors.len()).map(NodeId)
    }
}
