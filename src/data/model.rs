use std::collections::HashMap;

use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    #[default]
    Link,
    Dependency,
    Reference,
}

#[derive(Clone, Debug)]
pub struct GraphNode {
    pub id: String,
    pub label: Option<String>,
    pub weight: f32,
    pub color: Option<[u8; 3]>,
    pub seed_pos: Option<(f32, f32)>,
}

impl GraphNode {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GraphEdge {
    pub source: usize,
    pub target: usize,
    pub weight: f32,
    pub kind: EdgeKind,
}

#[derive(Clone, Debug)]
pub struct GraphData {
    pub name: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub index_by_id: HashMap<String, usize>,
    pub root_index: usize,
}

impl GraphData {
    pub fn new(name: String, nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        let mut index_by_id = HashMap::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            index_by_id.insert(node.id.clone(), index);
        }

        let root_index = nodes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.weight.total_cmp(&b.1.weight))
            .map(|(index, _)| index)
            .unwrap_or(0);

        Self {
            name,
            nodes,
            edges,
            index_by_id,
            root_index,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
