use std::collections::{HashSet, VecDeque};

use eframe::egui::{self, Align, Context, Layout, Vec2};

use crate::data::GraphData;

use super::super::culling::FrustumCuller;
use super::super::lod::LodSettings;
use super::super::sim::{LayoutOptions, SimulationHandle};
use super::super::textures::TextureCache;
use super::super::{GraphSource, RenderStats, ViewModel};

impl ViewModel {
    pub(in crate::app) fn new(graph: GraphData) -> Self {
        Self {
            search: String::new(),
            selected: HashSet::new(),
            selected_primary: None,
            hovered_id: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            base_node_size: 16.0,
            enable_glow: true,
            enable_labels: true,
            transition_duration: 0.6,
            layout: LayoutOptions::default(),
            lod: LodSettings::default(),
            sim: SimulationHandle::spawn(),
            sim_running: false,
            sim_settled: false,
            sim_error: None,
            sim_area: Vec2::ZERO,
            graph_dirty: true,
            render_graph_revision: 0,
            graph_cache: None,
            search_match_cache: None,
            textures: TextureCache::new(),
            culler: FrustumCuller::new(),
            playback: None,
            path_cache: None,
            stats: RenderStats::default(),
            show_fps_bar: true,
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
            graph,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        source: &GraphSource,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        self.update_fps_counter(ctx);
        if self.graph_dirty {
            self.rebuild_render_graph();
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("forcescope");
                    ui.separator();
                    ui.label(format!("graph: {}", self.graph.name));
                    ui.label(format!("nodes: {}", self.graph.node_count()));
                    ui.label(format!("edges: {}", self.graph.edge_count()));
                    ui.label(self.layout_status_text());
                    if let GraphSource::File(path) = source {
                        ui.label(format!("file: {}", path.display()));
                    }
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload graph"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                        ui.label(self.render_stats_text());
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if is_loading {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Loading graph...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_graph(ui);
            }
        });
    }

    fn layout_status_text(&self) -> &'static str {
        if self.sim_error.is_some() {
            "layout: failed"
        } else if self.sim_running {
            "layout: running"
        } else if self.sim_settled {
            "layout: settled"
        } else {
            "layout: idle"
        }
    }

    pub(in crate::app) fn set_selected(&mut self, selected: Option<String>) {
        match selected {
            Some(id) => self.select_by_id(&id),
            None => self.apply_graph_selection(None, false),
        }
    }
}
