//! Graph traversal orders.

use super::{DirectedGraph, NodeId};

/// Reverse postorder of the nodes reachable from `entry`.
///
/// Iterative depth-first search; successors are explored in adjacency order. Unreachable
/// nodes are absent from the result.
#[must_use]
pub fn reverse_postorder(graph: &DirectedGraph, entry: NodeId) -> Vec<NodeId> {
    let mut visited = vec![false; graph.node_count()];
    let mut postorder = Vec::with_capacity(graph.node_count());
    // (node, next successor position) pairs form the explicit DFS stack
    let mut stack = vec![(entry, 0usize)];
    visited[entry.index()] = true;

    while let Some((node, pos)) = stack.last_mut() {
        let succs = graph.successors(*node);
        if let Some(&next) = succs.get(*pos) {
            *pos += 1;
            if !visited[next.index()] {
                visited[next.index()] = true;
                stack.push((next, 0));
            }
        } else {
            postorder.push(*node);
            stack.pop();
        }
    }

    postorder.reverse();
    postorder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_chain() {
        let mut g = DirectedGraph::with_nodes(3);
        g.add_edge(g.node(0), g.node(1));
        g.add_edge(g.node(1), g.node(2));
        assert_eq!(reverse_postorder(&g, g.node(0)), vec![g.node(0), g.node(1), g.node(2)]);
    }

    #[test]
    fn diamond_puts_join_last() {
        let mut g = DirectedGraph::with_nodes(4);
        g.add_edge(g.node(0), g.node(1));
        g.add_edge(g.node(0), g.node(2));
        g.add_edge(g.node(1), g.node(3));
        g.add_edge(g.node(2), g.node(3));
        let order = reverse_postorder(&g, g.node(0));
        assert_eq!(order.first(), Some(&g.node(0)));
        assert_eq!(order.last(), Some(&g.node(3)));
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn skips_unreachable() {
        let mut g = DirectedGraph::with_nodes(3);
        g.add_edge(g.node(0), g.node(1));
        let order = reverse_postorder(&g, g.node(0));
        assert_eq!(order, vec![g.node(0), g.node(1)]);
    }

    #[test]
    fn handles_cycles() {
        let mut g = DirectedGraph::with_nodes(3);
        g.add_edge(g.node(0), g.node(1));
        g.add_edge(g.node(1), g.node(2));
        g.add_edge(g.node(2), g.node(1));
        let order = reverse_postorder(&g, g.node(0));
        assert_eq!(order.len(), 3);
        assert_eq!(order[0], g.node(0));
    }
}
