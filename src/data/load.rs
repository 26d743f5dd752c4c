use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::Deserialize;

use super::model::{EdgeKind, GraphData, GraphEdge, GraphNode};

#[derive(Clone, Debug, Deserialize)]
struct RawGraphFile {
    #[serde(default)]
    name: Option<String>,
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawNode {
    id: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    weight: Option<f32>,
    #[serde(default)]
    color: Option<[u8; 3]>,
    #[serde(default)]
    x: Option<f32>,
    #[serde(default)]
    y: Option<f32>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawEdge {
    source: String,
    target: String,
    #[serde(default)]
    weight: Option<f32>,
    #[serde(default)]
    kind: Option<EdgeKind>,
}

pub fn load_graph(path: &Path) -> Result<GraphData> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read graph file {}", path.display()))?;
    let parsed: RawGraphFile = serde_json::from_str(&raw)
        .with_context(|| format!("invalid graph JSON in {}", path.display()))?;

    if parsed.nodes.is_empty() {
        return Err(anyhow!("graph file {} contains no nodes", path.display()));
    }

    let mut nodes = Vec::with_capacity(parsed.nodes.len());
    let mut index_by_id = HashMap::with_capacity(parsed.nodes.len());
    for raw_node in parsed.nodes {
        if index_by_id.contains_key(&raw_node.id) {
            warn!("duplicate node id {:?} in graph file; keeping first", raw_node.id);
            continue;
        }

        let seed_pos = match (raw_node.x, raw_node.y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        };

        index_by_id.insert(raw_node.id.clone(), nodes.len());
        nodes.push(GraphNode {
            id: raw_node.id,
            label: raw_node.label,
            weight: raw_node.weight.unwrap_or(1.0).max(0.0),
            color: raw_node.color,
            seed_pos,
        });
    }

    let mut edges = Vec::with_capacity(parsed.edges.len());
    let mut seen = HashSet::new();
    let mut dropped = 0usize;
    for raw_edge in parsed.edges {
        let (Some(&source), Some(&target)) = (
            index_by_id.get(&raw_edge.source),
            index_by_id.get(&raw_edge.target),
        ) else {
            dropped += 1;
            continue;
        };

        if source == target || !seen.insert((source, target)) {
            continue;
        }

        edges.push(GraphEdge {
            source,
            target,
            weight: raw_edge.weight.unwrap_or(1.0).max(0.0),
            kind: raw_edge.kind.unwrap_or_default(),
        });
    }

    if dropped > 0 {
        warn!("dropped {dropped} edges referencing unknown node ids");
    }

    let name = parsed.name.unwrap_or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "graph".to_owned())
    });

    Ok(GraphData::new(name, nodes, edges))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "forcescope-load-test-{}-{}.json",
            std::process::id(),
            contents.len()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_nodes_and_resolves_edges() {
        let path = write_temp(
            r#"{
                "name": "tiny",
                "nodes": [
                    {"id": "a", "weight": 3.0},
                    {"id": "b", "label": "Bee"},
                    {"id": "c", "color": [10, 20, 30]}
                ],
                "edges": [
                    {"source": "a", "target": "b", "weight": 2.0},
                    {"source": "b", "target": "c", "kind": "dependency"},
                    {"source": "a", "target": "b"},
                    {"source": "a", "target": "ghost"}
                ]
            }"#,
        );

        let graph = load_graph(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(graph.node_count(), 3);
        // duplicate and dangling edges are dropped
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.root_index, graph.index_by_id["a"]);
        assert_eq!(graph.nodes[graph.index_by_id["b"]].display_label(), "Bee");
        assert_eq!(graph.edges[1].kind, EdgeKind::Dependency);
    }

    #[test]
    fn rejects_empty_node_list() {
        let path = write_temp(r#"{"nodes": [], "edges": []}"#);
        let result = load_graph(&path);
        fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}
