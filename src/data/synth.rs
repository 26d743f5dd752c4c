use std::collections::HashSet;

use crate::util::hash_unit_pair;

use super::model::{EdgeKind, GraphData, GraphEdge, GraphNode};

const LABEL_GROUPS: [&str; 6] = ["core", "net", "store", "ui", "auth", "tools"];

/// Deterministic preferential-attachment generator. The same (nodes,
/// links_per_node, seed) triple always yields the same graph.
pub fn generate_graph(nodes: usize, links_per_node: usize, seed: u64) -> GraphData {
    let node_total = nodes.max(1);
    let mut graph_nodes = Vec::with_capacity(node_total);
    let mut degrees = vec![0usize; node_total];
    let mut edges = Vec::new();
    let mut seen = HashSet::new();

    for index in 0..node_total {
        let (group_draw, _) = hash_unit_pair(seed ^ (index as u64).wrapping_mul(0x517c_c1b7_2722_0a95));
        let group = LABEL_GROUPS[(group_draw * LABEL_GROUPS.len() as f32) as usize % LABEL_GROUPS.len()];
        graph_nodes.push(GraphNode {
            id: format!("{group}/node-{index:04}"),
            label: None,
            weight: 1.0,
            color: None,
            seed_pos: None,
        });
    }

    for index in 1..node_total {
        let fanout = links_per_node.max(1).min(index);
        for attempt in 0..fanout {
            let draw_seed = seed
                ^ (index as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
                ^ (attempt as u64).wrapping_mul(0xd134_2543_de82_ef95);
            let (a, b) = hash_unit_pair(draw_seed);

            // two draws, keep the lower-degree-biased one: earlier nodes
            // accumulate degree, so favoring the smaller draw approximates
            // preferential attachment without tracking a degree table
            let first = (a * index as f32) as usize % index;
            let second = (b * index as f32) as usize % index;
            let target = if degrees[first] >= degrees[second] {
                first
            } else {
                second
            };

            if seen.insert((index, target)) {
                edges.push(GraphEdge {
                    source: index,
                    target,
                    weight: 1.0,
                    kind: EdgeKind::Link,
                });
                degrees[index] += 1;
                degrees[target] += 1;
            }
        }
    }

    for (index, degree) in degrees.iter().enumerate() {
        graph_nodes[index].weight = 1.0 + *degree as f32;
    }

    GraphData::new(
        format!("synthetic-{node_total}"),
        graph_nodes,
        edges,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_graph() {
        let a = generate_graph(64, 2, 7);
        let b = generate_graph(64, 2, 7);
        assert_eq!(a.node_count(), b.node_count());
        assert_eq!(a.edge_count(), b.edge_count());
        for (ea, eb) in a.edges.iter().zip(b.edges.iter()) {
            assert_eq!((ea.source, ea.target), (eb.source, eb.target));
        }
    }

    #[test]
    fn edges_stay_in_range_and_acyclic_by_construction() {
        let graph = generate_graph(40, 3, 11);
        for edge in &graph.edges {
            assert!(edge.source < graph.node_count());
            assert!(edge.target < edge.source, "targets attach to earlier nodes");
        }
    }

    #[test]
    fn root_is_heaviest_node() {
        let graph = generate_graph(50, 2, 3);
        let max_weight = graph
            .nodes
            .iter()
            .map(|node| node.weight)
            .fold(0.0f32, f32::max);
        assert_eq!(graph.nodes[graph.root_index].weight, max_weight);
    }
}
