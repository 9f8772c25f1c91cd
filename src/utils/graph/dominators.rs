//! Dominator-tree computation.
//!
//! Uses the iterative reverse-postorder algorithm of Cooper, Harvey, and Kennedy ("A
//! Simple, Fast Dominance Algorithm"). The same routine serves post-dominance: run it on
//! the reversed graph with the (virtual) exit as entry.

use super::{reverse_postorder, DirectedGraph, NodeId};

/// The dominator tree of a rooted directed graph.
///
/// Nodes unreachable from the entry carry no tree data: their immediate dominator and
/// depth are `None` and they dominate nothing.
///
/// # Examples
///
/// ```rust
/// use classflow::utils::graph::{DirectedGraph, DominatorTree};
///
/// // 0 -> 1 -> 3, 0 -> 2 -> 3 (a diamond)
/// let mut g = DirectedGraph::with_nodes(4);
/// g.add_edge(g.node(0), g.node(1));
/// g.add_edge(g.node(0), g.node(2));
/// g.add_edge(g.node(1), g.node(3));
/// g.add_edge(g.node(2), g.node(3));
///
/// let dom = DominatorTree::compute(&g, g.node(0));
/// assert_eq!(dom.immediate_dominator(g.node(3)), Some(g.node(0)));
/// assert!(dom.dominates(g.node(0), g.node(3)));
/// assert!(!dom.strictly_dominates(g.node(1), g.node(3)));
/// ```
#[derive(Debug, Clone)]
pub struct DominatorTree {
    entry: NodeId,
    idom: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
    depth: Vec<Option<u32>>,
}

impl DominatorTree {
    /// Computes the dominator tree of `graph` rooted at `entry`.
    #[must_use]
    pub fn compute(graph: &DirectedGraph, entry: NodeId) -> Self {
        let n = graph.node_count();
        let order = reverse_postorder(graph, entry);

        // Position of each node in reverse postorder; unreachable nodes have none.
        let mut rpo_pos: Vec<Option<usize>> = vec![None; n];
        for (pos, &node) in order.iter().enumerate() {
            rpo_pos[node.index()] = Some(pos);
        }

        let mut idom: Vec<Option<NodeId>> = vec![None; n];
        idom[entry.index()] = Some(entry);

        let mut changed = true;
        while changed {
            changed = false;
            for &node in order.iter().skip(1) {
                let mut new_idom: Option<NodeId> = None;
                for &pred in graph.predecessors(node) {
                    if idom[pred.index()].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => intersect(&idom, &rpo_pos, pred, current),
                    });
                }
                if let Some(new_idom) = new_idom {
                    if idom[node.index()] != Some(new_idom) {
                        idom[node.index()] = Some(new_idom);
                        changed = true;
                    }
                }
            }
        }

        let mut children: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for &node in &order {
            if node != entry {
                if let Some(parent) = idom[node.index()] {
                    children[parent.index()].push(node);
                }
            }
        }

        // Reverse postorder visits parents before children, so depths fill in one pass.
        let mut depth: Vec<Option<u32>> = vec![None; n];
        depth[entry.index()] = Some(0);
        for &node in order.iter().skip(1) {
            if let Some(parent) = idom[node.index()] {
                depth[node.index()] = depth[parent.index()].map(|d| d + 1);
            }
        }

        DominatorTree { entry, idom, children, depth }
    }

    /// The root of the tree.
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// The immediate dominator of `node`.
    ///
    /// `None` for the entry itself and for nodes unreachable from the entry.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        if node == self.entry {
            return None;
        }
        self.idom[node.index()]
    }

    /// `true` when `a` dominates `b` (reflexively).
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        if self.depth[b.index()].is_none() {
            return false;
        }
        let mut current = b;
        loop {
            if current == a {
                return true;
            }
            match self.immediate_dominator(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// `true` when `a` dominates `b` and `a != b`.
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Nodes whose immediate dominator is `node`.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.children[node.index()]
    }

    /// Distance from the entry in tree edges; `None` for unreachable nodes.
    #[must_use]
    pub fn depth(&self, node: NodeId) -> Option<u32> {
        self.depth[node.index()]
    }

    /// `true` when `node` was reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.depth[node.index()].is_some()
    }

    /// Iterator over the dominators of `node`, from the node itself up to the entry.
    pub fn dominators(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = if self.is_reachable(node) { Some(node) } else { None };
        std::iter::successors(start, move |&current| {
            if current == self.entry {
                None
            } else {
                self.idom[current.index()]
            }
        })
    }
}

/// Walks two dominator-chain fingers up to their common ancestor, ordering by reverse
/// postorder position.
fn intersect(
    idom: &[Option<NodeId>],
    rpo_pos: &[Option<usize>],
    mut a: NodeId,
    mut b: NodeId,
) -> NodeId {
    let pos = |n: NodeId| rpo_pos[n.index()].unwrap_or(usize::MAX);
    while a != b {
        while pos(a) > pos(b) {
            a = idom[a.index()].unwrap_or(a);
        }
        while pos(b) > pos(a) {
            b = idom[b.index()].unwrap_or(b);
        }
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(n: usize, edges: &[(usize, usize)]) -> DirectedGraph {
        let mut g = DirectedGraph::with_nodes(n);
        for &(a, b) in edges {
            g.add_edge(g.node(a), g.node(b));
        }
        g
    }

    #[test]
    fn linear_chain() {
        let g = graph(3, &[(0, 1), (1, 2)]);
        let dom = DominatorTree::compute(&g, g.node(0));
        assert_eq!(dom.immediate_dominator(g.node(1)), Some(g.node(0)));
        assert_eq!(dom.immediate_dominator(g.node(2)), Some(g.node(1)));
        assert_eq!(dom.depth(g.node(2)), Some(2));
    }

    #[test]
    fn diamond() {
        let g = graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let dom = DominatorTree::compute(&g, g.node(0));
        assert_eq!(dom.immediate_dominator(g.node(3)), Some(g.node(0)));
        assert!(dom.dominates(g.node(0), g.node(3)));
        assert!(!dom.dominates(g.node(1), g.node(3)));
        assert!(!dom.dominates(g.node(2), g.node(3)));
    }

    #[test]
    fn loop_back_edge() {
        // 0 -> 1 -> 2 -> 1, 2 -> 3
        let g = graph(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]);
        let dom = DominatorTree::compute(&g, g.node(0));
        assert_eq!(dom.immediate_dominator(g.node(1)), Some(g.node(0)));
        assert_eq!(dom.immediate_dominator(g.node(2)), Some(g.node(1)));
        assert_eq!(dom.immediate_dominator(g.node(3)), Some(g.node(2)));
        assert!(dom.dominates(g.node(1), g.node(3)));
    }

    #[test]
    fn nested_branches() {
        // 0 -> 1, 0 -> 2; 1 -> 3, 1 -> 4; 3 -> 5, 4 -> 5; 5 -> 6, 2 -> 6
        let g = graph(7, &[(0, 1), (0, 2), (1, 3), (1, 4), (3, 5), (4, 5), (5, 6), (2, 6)]);
        let dom = DominatorTree::compute(&g, g.node(0));
        assert_eq!(dom.immediate_dominator(g.node(5)), Some(g.node(1)));
        assert_eq!(dom.immediate_dominator(g.node(6)), Some(g.node(0)));
        assert!(dom.strictly_dominates(g.node(1), g.node(5)));
        assert!(!dom.strictly_dominates(g.node(3), g.node(5)));
    }

    #[test]
    fn unreachable_nodes_have_no_tree_data() {
        let g = graph(3, &[(0, 1)]);
        let dom = DominatorTree::compute(&g, g.node(0));
        assert!(!dom.is_reachable(g.node(2)));
        assert_eq!(dom.immediate_dominator(g.node(2)), None);
        assert_eq!(dom.depth(g.node(2)), None);
        assert!(!dom.dominates(g.node(0), g.node(2)));
    }

    #[test]
    fn dominator_chain_iterates_to_entry() {
        let g = graph(4, &[(0, 1), (1, 2), (2, 3)]);
        let dom = DominatorTree::compute(&g, g.node(0));
        let chain: Vec<_> = dom.dominators(g.node(3)).collect();
        assert_eq!(chain, vec![g.node(3), g.node(2), g.node(1), g.node(0)]);
    }

    #[test]
    fn children_lists() {
        let g = graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let dom = DominatorTree::compute(&g, g.node(0));
        let mut kids = dom.children(g.node(0)).to_vec();
        kids.sort();
        assert_eq!(kids, vec![g.node(1), g.node(2), g.node(3)]);
    }
}
