use std::collections::HashMap;

use eframe::egui::{Color32, vec2};

use super::super::render_utils::node_radius;
use super::super::sim::{BodySeed, LinkSpec, SimulationEvent};
use super::super::{RenderEdge, RenderGraph, RenderNode, ViewModel, ViewScratch};

impl ViewModel {
    pub(in crate::app) fn rebuild_render_graph(&mut self) {
        self.render_graph_revision = self.render_graph_revision.wrapping_add(1);
        self.search_match_cache = None;
        self.path_cache = None;

        let mut min_weight = f32::MAX;
        let mut max_weight = 1.0f32;
        for node in &self.graph.nodes {
            let weight = node.weight.max(1.0);
            min_weight = min_weight.min(weight);
            max_weight = max_weight.max(weight);
        }
        if min_weight > max_weight {
            min_weight = 1.0;
        }

        let mut prior_positions = HashMap::new();
        if let Some(cache) = self.graph_cache.take() {
            for node in cache.nodes {
                if let Some(pos) = node.world_pos {
                    prior_positions.insert(node.id, pos);
                }
            }
        }

        let base_size = self.base_node_size;
        let nodes = self
            .graph
            .nodes
            .iter()
            .map(|data_node| {
                let weight = data_node.weight.max(1.0);
                let world_pos = prior_positions
                    .remove(&data_node.id)
                    .or_else(|| data_node.seed_pos.map(|(x, y)| vec2(x, y)));
                RenderNode {
                    id: data_node.id.clone(),
                    label: data_node.label.clone(),
                    world_pos,
                    weight,
                    base_radius: node_radius(weight, min_weight, max_weight, base_size),
                    color: data_node
                        .color
                        .map(|[r, g, b]| Color32::from_rgb(r, g, b)),
                }
            })
            .collect::<Vec<_>>();

        let edges = self
            .graph
            .edges
            .iter()
            .map(|edge| RenderEdge {
                source: edge.source,
                target: edge.target,
                weight: edge.weight,
                kind: edge.kind,
            })
            .collect::<Vec<_>>();

        // render nodes are built in data order, so the data-layer index map
        // carries over unchanged
        let index_by_id = self.graph.index_by_id.clone();

        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];
        for edge in &edges {
            outgoing[edge.source].push(edge.target);
            incoming[edge.target].push(edge.source);
        }

        let first_build = self.sim_area == eframe::egui::Vec2::ZERO;

        let side = ((nodes.len() as f32).sqrt() * 160.0).clamp(600.0, 24_000.0);
        self.sim_area = vec2(side, side);

        self.graph_cache = Some(RenderGraph {
            nodes,
            edges,
            index_by_id,
            outgoing,
            incoming,
            root_index: self.graph.root_index,
            min_weight,
            max_weight,
            view_scratch: ViewScratch {
                draw_order_dirty: true,
                ..ViewScratch::default()
            },
        });

        if first_build {
            // frame the simulated area: world center lands on screen center
            self.zoom = (900.0 / side).clamp(0.05, 1.0);
            self.pan = vec2(-side * 0.5, -side * 0.5) * self.zoom;
        }

        self.graph_dirty = false;
        self.start_layout();
    }

    pub(in crate::app) fn start_layout(&mut self) {
        let Some(cache) = &self.graph_cache else {
            return;
        };

        // stale snapshots from a replaced engine must not land on this graph
        for _ in self.sim.drain() {}

        let seeds = cache
            .nodes
            .iter()
            .map(|node| BodySeed {
                id: node.id.clone(),
                pos: node.world_pos,
                mass: 1.0,
                radius: node.base_radius,
            })
            .collect::<Vec<_>>();
        let links = cache
            .edges
            .iter()
            .map(|edge| LinkSpec {
                source: edge.source,
                target: edge.target,
                weight: edge.weight.max(0.1),
            })
            .collect::<Vec<_>>();

        self.sim
            .start(seeds, links, self.sim_area.x, self.sim_area.y, self.layout);
        self.sim_running = true;
        self.sim_settled = false;
        self.sim_error = None;
    }

    pub(in crate::app) fn reheat_layout(&mut self) {
        self.sim.restart(1.0);
        self.sim_running = true;
        self.sim_settled = false;
    }

    pub(in crate::app) fn stop_layout(&mut self) {
        self.sim.stop();
        self.sim_running = false;
    }

    /// Applies pending worker events. Snapshots land as whole arrays; a
    /// snapshot whose length disagrees with the current graph is stale and
    /// dropped.
    pub(in crate::app) fn apply_sim_events(&mut self) {
        let events = self.sim.drain().collect::<Vec<_>>();
        if events.is_empty() {
            return;
        }

        for event in events {
            match event {
                SimulationEvent::Tick { bodies } => {
                    self.apply_snapshot(&bodies);
                }
                SimulationEvent::End { bodies } => {
                    self.apply_snapshot(&bodies);
                    self.sim_running = false;
                    self.sim_settled = true;
                }
                SimulationEvent::Error { message } => {
                    self.sim_error = Some(message);
                    self.sim_running = false;
                }
            }
        }
    }

    fn apply_snapshot(&mut self, bodies: &[super::super::sim::SimPoint]) {
        let Some(cache) = self.graph_cache.as_mut() else {
            return;
        };
        if bodies.len() != cache.nodes.len() {
            return;
        }

        for body in bodies {
            if let Some(node) = cache.nodes.get_mut(body.index) {
                node.world_pos = Some(body.pos);
            }
        }
    }
}
