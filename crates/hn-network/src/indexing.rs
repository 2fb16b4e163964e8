//! Dense indexing for solver integration.
//!
//! Junctions take the first `junction_count` node slots so the unknown heads
//! form a contiguous prefix; tanks and reservoirs follow. Links are ordered
//! pipes, then pumps, then valves. Within each group the network order is
//! kept, which makes the mapping deterministic.

use std::collections::HashMap;

use hn_core::{LinkId, NodeId};

use crate::error::{NetworkError, NetworkResult};
use crate::model::WaterNetwork;

/// One entry of a node's incidence list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Incidence {
    pub link: LinkId,
    /// -1.0 when the node is the link's start (flow leaves), +1.0 at the end.
    pub sign: f64,
}

/// Index map between network ids/positions and dense solver indices.
#[derive(Debug, Clone)]
pub struct NetworkIndex {
    /// Dense node index -> position in `WaterNetwork::nodes`.
    node_order: Vec<usize>,
    /// Position in `WaterNetwork::nodes` -> dense node index.
    node_slot: Vec<NodeId>,
    /// Dense link index -> position in `WaterNetwork::links`.
    link_order: Vec<usize>,
    /// Position in `WaterNetwork::links` -> dense link index.
    link_slot: Vec<LinkId>,

    node_lookup: HashMap<String, NodeId>,
    link_lookup: HashMap<String, LinkId>,

    junction_count: usize,

    /// (start, end) per dense link.
    endpoints: Vec<(NodeId, NodeId)>,

    /// Node i's incident links are in incidence[offsets[i]..offsets[i+1]].
    incidence_offsets: Vec<usize>,
    incidence: Vec<Incidence>,
}

impl NetworkIndex {
    /// Build the index for a network.
    ///
    /// Fails only if a link endpoint does not resolve to a node.
    pub fn build(network: &WaterNetwork) -> NetworkResult<Self> {
        let junctions = network
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_junction())
            .map(|(i, _)| i);
        let fixed = network
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_fixed_head())
            .map(|(i, _)| i);
        let node_order: Vec<usize> = junctions.chain(fixed).collect();
        let junction_count = network.nodes.iter().filter(|n| n.is_junction()).count();

        let mut node_slot = vec![NodeId::from_index(0); network.nodes.len()];
        let mut node_lookup = HashMap::with_capacity(network.nodes.len());
        for (dense, &pos) in node_order.iter().enumerate() {
            let id = NodeId::from_index(dense as u32);
            node_slot[pos] = id;
            node_lookup.insert(network.nodes[pos].id.clone(), id);
        }

        let mut link_order: Vec<usize> = (0..network.links.len()).collect();
        // stable sort keeps network order within each link kind
        link_order.sort_by_key(|&i| network.links[i].kind.rank());

        let mut link_slot = vec![LinkId::from_index(0); network.links.len()];
        let mut link_lookup = HashMap::with_capacity(network.links.len());
        let mut endpoints = Vec::with_capacity(network.links.len());
        for (dense, &pos) in link_order.iter().enumerate() {
            let link = &network.links[pos];
            let id = LinkId::from_index(dense as u32);
            link_slot[pos] = id;
            link_lookup.insert(link.id.clone(), id);

            let resolve = |node: &str| -> NetworkResult<NodeId> {
                node_lookup
                    .get(node)
                    .copied()
                    .ok_or_else(|| NetworkError::MissingNode {
                        link: link.id.clone(),
                        node: node.to_string(),
                    })
            };
            endpoints.push((resolve(&link.start_node)?, resolve(&link.end_node)?));
        }

        let (incidence_offsets, incidence) = Self::build_incidence(node_order.len(), &endpoints);

        Ok(Self {
            node_order,
            node_slot,
            link_order,
            link_slot,
            node_lookup,
            link_lookup,
            junction_count,
            endpoints,
            incidence_offsets,
            incidence,
        })
    }

    /// Compact incidence lists: for each dense node, its links and signs.
    fn build_incidence(
        node_count: usize,
        endpoints: &[(NodeId, NodeId)],
    ) -> (Vec<usize>, Vec<Incidence>) {
        let mut per_node: Vec<Vec<Incidence>> = vec![Vec::new(); node_count];
        for (l, &(start, end)) in endpoints.iter().enumerate() {
            let link = LinkId::from_index(l as u32);
            per_node[start.ix()].push(Incidence { link, sign: -1.0 });
            per_node[end.ix()].push(Incidence { link, sign: 1.0 });
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut flat = Vec::with_capacity(2 * endpoints.len());
        offsets.push(0);
        for list in per_node {
            flat.extend(list);
            offsets.push(flat.len());
        }
        (offsets, flat)
    }

    pub fn node_count(&self) -> usize {
        self.node_order.len()
    }

    pub fn link_count(&self) -> usize {
        self.link_order.len()
    }

    /// Number of unknown-head nodes; they occupy indices `0..junction_count`.
    pub fn junction_count(&self) -> usize {
        self.junction_count
    }

    pub fn fixed_head_count(&self) -> usize {
        self.node_count() - self.junction_count
    }

    pub fn is_junction(&self, node: NodeId) -> bool {
        node.ix() < self.junction_count
    }

    /// Dense index for a node id.
    pub fn node_id(&self, id: &str) -> NetworkResult<NodeId> {
        self.node_lookup
            .get(id)
            .copied()
            .ok_or_else(|| NetworkError::UnknownId {
                what: "node",
                id: id.to_string(),
            })
    }

    /// Dense index for a link id.
    pub fn link_id(&self, id: &str) -> NetworkResult<LinkId> {
        self.link_lookup
            .get(id)
            .copied()
            .ok_or_else(|| NetworkError::UnknownId {
                what: "link",
                id: id.to_string(),
            })
    }

    /// Position in `WaterNetwork::nodes` of a dense node.
    pub fn node_position(&self, node: NodeId) -> usize {
        self.node_order[node.ix()]
    }

    /// Position in `WaterNetwork::links` of a dense link.
    pub fn link_position(&self, link: LinkId) -> usize {
        self.link_order[link.ix()]
    }

    /// Dense node for a position in `WaterNetwork::nodes`.
    pub fn node_at(&self, position: usize) -> NodeId {
        self.node_slot[position]
    }

    /// Dense link for a position in `WaterNetwork::links`.
    pub fn link_at(&self, position: usize) -> LinkId {
        self.link_slot[position]
    }

    pub fn endpoints(&self, link: LinkId) -> (NodeId, NodeId) {
        self.endpoints[link.ix()]
    }

    /// Links incident to a node with their flow signs.
    pub fn incident(&self, node: NodeId) -> &[Incidence] {
        let idx = node.ix();
        if idx >= self.node_count() {
            return &[];
        }
        &self.incidence[self.incidence_offsets[idx]..self.incidence_offsets[idx + 1]]
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.node_count()).map(|i| NodeId::from_index(i as u32))
    }

    pub fn junctions(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.junction_count).map(|i| NodeId::from_index(i as u32))
    }

    pub fn fixed_head_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (self.junction_count..self.node_count()).map(|i| NodeId::from_index(i as u32))
    }

    pub fn links(&self) -> impl Iterator<Item = LinkId> + '_ {
        (0..self.link_count()).map(|i| LinkId::from_index(i as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NetworkBuilder;
    use crate::model::{PumpCurve, ValveType};

    fn mixed() -> WaterNetwork {
        let mut b = NetworkBuilder::new("mixed");
        b.junction("J1", 10.0, 1.0)
            .reservoir("R1", 50.0)
            .junction("J2", 12.0, 1.0)
            .cylinder_tank("T1", 40.0, 10.0, (0.5, 2.0, 4.0))
            .valve("V1", "J2", "T1", ValveType::Tcv, 200.0, 1.0)
            .pump(
                "PU1",
                "R1",
                "J1",
                PumpCurve::PowerFunction {
                    a: 40.0,
                    b: 0.01,
                    c: 2.0,
                },
            )
            .pipe("P1", "J1", "J2", 100.0, 200.0, 120.0);
        b.build().unwrap()
    }

    #[test]
    fn junctions_come_first() {
        let net = mixed();
        let idx = NetworkIndex::build(&net).unwrap();

        assert_eq!(idx.junction_count(), 2);
        assert_eq!(idx.fixed_head_count(), 2);
        assert_eq!(idx.node_id("J1").unwrap().ix(), 0);
        assert_eq!(idx.node_id("J2").unwrap().ix(), 1);
        assert_eq!(idx.node_id("R1").unwrap().ix(), 2);
        assert_eq!(idx.node_id("T1").unwrap().ix(), 3);
        assert!(idx.is_junction(idx.node_id("J2").unwrap()));
        assert!(!idx.is_junction(idx.node_id("T1").unwrap()));
    }

    #[test]
    fn links_ordered_pipe_pump_valve() {
        let net = mixed();
        let idx = NetworkIndex::build(&net).unwrap();

        assert_eq!(idx.link_id("P1").unwrap().ix(), 0);
        assert_eq!(idx.link_id("PU1").unwrap().ix(), 1);
        assert_eq!(idx.link_id("V1").unwrap().ix(), 2);
    }

    #[test]
    fn positions_round_trip() {
        let net = mixed();
        let idx = NetworkIndex::build(&net).unwrap();

        for pos in 0..net.nodes.len() {
            assert_eq!(idx.node_position(idx.node_at(pos)), pos);
        }
        for pos in 0..net.links.len() {
            assert_eq!(idx.link_position(idx.link_at(pos)), pos);
        }
    }

    #[test]
    fn incidence_signs() {
        let net = mixed();
        let idx = NetworkIndex::build(&net).unwrap();
        let j1 = idx.node_id("J1").unwrap();
        let p1 = idx.link_id("P1").unwrap();
        let pu1 = idx.link_id("PU1").unwrap();

        let inc = idx.incident(j1);
        assert_eq!(inc.len(), 2);
        assert!(inc.contains(&Incidence { link: p1, sign: -1.0 }));
        assert!(inc.contains(&Incidence { link: pu1, sign: 1.0 }));
    }

    #[test]
    fn unknown_id_is_error() {
        let net = mixed();
        let idx = NetworkIndex::build(&net).unwrap();
        assert!(idx.node_id("nope").is_err());
        assert!(idx.link_id("nope").is_err());
    }

    #[test]
    fn dangling_endpoint_fails_build() {
        let mut b = NetworkBuilder::new("dangling");
        b.reservoir("R1", 10.0)
            .pipe("P1", "R1", "ghost", 10.0, 100.0, 100.0);
        let net = b.build_unchecked();
        assert!(matches!(
            NetworkIndex::build(&net),
            Err(NetworkError::MissingNode { .. })
        ));
    }
}
