//! Node-Centric Analyzer (§4.9, SUPPLEMENT): thin metrics layer over the
//! Graph Store and Circular-Dependency Detector — fan-in/out,
//! instability, criticality, impact radius, and local clustering for a
//! single node, the kind of per-node summary a CLI `stats` or `inspect`
//! command surfaces.

use std::collections::{HashSet, VecDeque};

use crate::cycles::{detect_cycles, CycleDetectionOptions};
use crate::model::NodeId;
use crate::store::Store;

pub struct NodeCentricAnalyzer<'a> {
    store: &'a Store,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeMetrics {
    pub fan_in: usize,
    pub fan_out: usize,
    /// `fan_out / (fan_in + fan_out)`, Martin's instability metric;
    /// `0.0` for an isolated node.
    pub instability: f64,
    /// Higher is more load-bearing: weighted combination of fan-in and
    /// cycle participation.
    pub criticality: f64,
    pub participates_in_cycle: bool,
}

impl<'a> NodeCentricAnalyzer<'a> {
    pub fn new(store: &'a Store) -> Self {
        NodeCentricAnalyzer { store }
    }

    pub fn fan_in(&self, id: NodeId) -> usize {
        self.store.find_node_dependents(id, None).len()
    }

    pub fn fan_out(&self, id: NodeId) -> usize {
        self.store.find_node_dependencies(id, None).len()
    }

    pub fn instability(&self, id: NodeId) -> f64 {
        let fan_in = self.fan_in(id) as f64;
        let fan_out = self.fan_out(id) as f64;
        if fan_in + fan_out == 0.0 {
            0.0
        } else {
            fan_out / (fan_in + fan_out)
        }
    }

    /// `true` iff `id` appears in any cycle detected within `max_depth`
    /// hops of itself. Bounded so a single node's metrics don't require
    /// a whole-graph cycle sweep.
    pub fn participates_in_cycle(&self, id: NodeId, max_depth: u32) -> bool {
        let opts = CycleDetectionOptions { max_depth, max_cycles: 50, ..Default::default() };
        let result = detect_cycles(self.store, &opts);
        result.cycles.iter().any(|c| c.nodes.contains(&id))
    }

    pub fn criticality(&self, id: NodeId) -> f64 {
        let fan_in = self.fan_in(id) as f64;
        let cycle_bonus = if self.participates_in_cycle(id, 10) { 10.0 } else { 0.0 };
        fan_in + cycle_bonus
    }

    pub fn metrics(&self, id: NodeId) -> NodeMetrics {
        let fan_in = self.fan_in(id);
        let fan_out = self.fan_out(id);
        let participates = self.participates_in_cycle(id, 10);
        NodeMetrics {
            fan_in,
            fan_out,
            instability: if fan_in + fan_out == 0 { 0.0 } else { fan_out as f64 / (fan_in + fan_out) as f64 },
            criticality: fan_in as f64 + if participates { 10.0 } else { 0.0 },
            participates_in_cycle: participates,
        }
    }

    /// Every node transitively dependent on `id` (i.e. would need
    /// re-checking if `id` changed), within `max_depth` hops.
    pub fn impact_radius(&self, id: NodeId, max_depth: u32) -> HashSet<NodeId> {
        let mut visited = HashSet::new();
        visited.insert(id);
        let mut queue = VecDeque::new();
        queue.push_back((id, 0u32));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for edge in self.store.find_node_dependents(current, None) {
                if visited.insert(edge.from_node_id) {
                    queue.push_back((edge.from_node_id, depth + 1));
                }
            }
        }
        visited.remove(&id);
        visited
    }

    /// Local clustering coefficient: the fraction of pairs among `id`'s
    /// immediate neighbors (both directions) that are themselves
    /// directly connected. `0.0` for nodes with fewer than two
    /// neighbors.
    pub fn clustering_coefficient(&self, id: NodeId) -> f64 {
        let mut neighbors: HashSet<NodeId> = self.store.find_node_dependencies(id, None).into_iter().map(|e| e.to_node_id).collect();
        neighbors.extend(self.store.find_node_dependents(id, None).into_iter().map(|e| e.from_node_id));
        neighbors.remove(&id);

        let n = neighbors.len();
        if n < 2 {
            return 0.0;
        }

        let neighbor_list: Vec<NodeId> = neighbors.into_iter().collect();
        let mut connected_pairs = 0usize;
        for i in 0..neighbor_list.len() {
            for j in 0..neighbor_list.len() {
                if i == j {
                    continue;
                }
                let a = neighbor_list[i];
                let b = neighbor_list[j];
                if self.store.find_node_dependencies(a, None).iter().any(|e| e.to_node_id == b) {
                    connected_pairs += 1;
                }
            }
        }
        let possible_pairs = n * (n - 1);
        connected_pairs as f64 / possible_pairs as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge_types::names;
    use crate::model::{EdgeId, GraphEdge, GraphNode, NodeType};
    use std::collections::HashMap;

    fn node(store: &Store, identifier: &str) -> NodeId {
        store
            .upsert_node(GraphNode {
                id: NodeId(0),
                identifier: identifier.to_string(),
                node_type: NodeType::File,
                name: identifier.to_string(),
                source_file: None,
                language: None,
                metadata: HashMap::new(),
                start_line: None,
                start_column: None,
                end_line: None,
                end_column: None,
            })
            .unwrap()
    }

    fn edge(store: &Store, from: NodeId, to: NodeId) {
        store
            .upsert_relationship(GraphEdge {
                id: EdgeId(0),
                from_node_id: from,
                to_node_id: to,
                edge_type: names::DEPENDS_ON.to_string(),
                label: None,
                metadata: HashMap::new(),
                weight: 1.0,
                source_file: None,
            })
            .unwrap();
    }

    #[test]
    fn fan_in_and_out_count_distinct_edges() {
        let store = Store::open_in_memory().unwrap();
        let a = node(&store, "p/a");
        let b = node(&store, "p/b");
        let c = node(&store, "p/c");
        edge(&store, a, b);
        edge(&store, c, b);

        let nca = NodeCentricAnalyzer::new(&store);
        assert_eq!(nca.fan_in(b), 2);
        assert_eq!(nca.fan_out(a), 1);
    }

    #[test]
    fn instability_of_a_pure_consumer_is_zero() {
        let store = Store::open_in_memory().unwrap();
        let a = node(&store, "p/a");
        let b = node(&store, "p/b");
        edge(&store, a, b);

        let nca = NodeCentricAnalyzer::new(&store);
        assert_eq!(nca.instability(b), 0.0);
        assert_eq!(nca.instability(a), 1.0);
    }

    #[test]
    fn impact_radius_follows_dependents_transitively() {
        let store = Store::open_in_memory().unwrap();
        let a = node(&store, "p/a");
        let b = node(&store, "p/b");
        let c = node(&store, "p/c");
        edge(&store, a, b);
        edge(&store, b, c);

        let nca = NodeCentricAnalyzer::new(&store);
        let radius = nca.impact_radius(c, 10);
        assert!(radius.contains(&a));
        assert!(radius.contains(&b));
    }

    #[test]
    fn criticality_is_higher_for_a_node_in_a_cycle() {
        let store = Store::open_in_memory().unwrap();
        let a = node(&store, "p/a");
        let b = node(&store, "p/b");
        edge(&store, a, b);
        edge(&store, b, a);

        let nca = NodeCentricAnalyzer::new(&store);
        assert!(nca.metrics(a).participates_in_cycle);
        assert!(nca.criticality(a) >= 10.0);
    }
}
