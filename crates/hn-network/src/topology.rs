//! Connectivity over the links that currently carry flow.

use hn_core::LinkId;
use petgraph::unionfind::UnionFind;

use crate::indexing::NetworkIndex;

/// Mark every node reachable from a fixed-head node through links for which
/// `open` returns true.
///
/// Junctions left `false` are hydraulically isolated: the solver pins their
/// head to the elevation and drops their demand.
pub fn supplied_nodes(index: &NetworkIndex, open: impl Fn(LinkId) -> bool) -> Vec<bool> {
    let n = index.node_count();
    let mut sets = UnionFind::<usize>::new(n);

    for link in index.links().filter(|&l| open(l)) {
        let (a, b) = index.endpoints(link);
        sets.union(a.ix(), b.ix());
    }

    let sourced: Vec<usize> = index
        .fixed_head_nodes()
        .map(|node| sets.find_mut(node.ix()))
        .collect();

    (0..n)
        .map(|i| {
            let root = sets.find_mut(i);
            sourced.contains(&root)
        })
        .collect()
}
