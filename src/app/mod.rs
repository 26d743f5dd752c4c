use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Color32, Context, Pos2, Vec2};

use crate::data::{EdgeKind, GraphData, generate_graph, load_graph};

mod culling;
mod graph;
mod highlight;
mod lod;
mod render_utils;
mod sim;
mod textures;
mod ui;

use culling::FrustumCuller;
use lod::LodSettings;
use sim::{LayoutOptions, SimulationHandle};
use textures::TextureCache;

#[derive(Clone, Debug)]
pub enum GraphSource {
    File(PathBuf),
    Synthetic {
        nodes: usize,
        links_per_node: usize,
        seed: u64,
    },
}

pub struct ForceScopeApp {
    source: GraphSource,
    state: AppState,
    reload_rx: Option<Receiver<Result<GraphData, String>>>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<GraphData, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    graph: GraphData,
    search: String,
    selected: HashSet<String>,
    selected_primary: Option<String>,
    hovered_id: Option<String>,
    pan: Vec2,
    zoom: f32,

    base_node_size: f32,
    enable_glow: bool,
    enable_labels: bool,
    transition_duration: f32,
    layout: LayoutOptions,
    lod: LodSettings,

    sim: SimulationHandle,
    sim_running: bool,
    sim_settled: bool,
    sim_error: Option<String>,
    sim_area: Vec2,

    graph_dirty: bool,
    render_graph_revision: u64,
    graph_cache: Option<RenderGraph>,
    search_match_cache: Option<SearchMatchCache>,
    textures: TextureCache,
    culler: FrustumCuller,
    playback: Option<Playback>,
    path_cache: Option<PathCache>,
    stats: RenderStats,

    show_fps_bar: bool,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
}

struct SearchMatchCache {
    query: String,
    graph_revision: u64,
    matches: Arc<HashSet<usize>>,
}

struct RenderGraph {
    nodes: Vec<RenderNode>,
    edges: Vec<RenderEdge>,
    index_by_id: HashMap<String, usize>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    root_index: usize,
    min_weight: f32,
    max_weight: f32,
    view_scratch: ViewScratch,
}

struct RenderNode {
    id: String,
    label: Option<String>,
    world_pos: Option<Vec2>,
    weight: f32,
    base_radius: f32,
    color: Option<Color32>,
}

impl RenderNode {
    fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or_else(|| crate::util::short_name(&self.id))
    }
}

#[derive(Clone, Copy)]
struct RenderEdge {
    source: usize,
    target: usize,
    weight: f32,
    kind: EdgeKind,
}

#[derive(Default)]
struct ViewScratch {
    world_positions: Vec<Option<Vec2>>,
    screen_positions: Vec<Pos2>,
    visible_indices: Vec<usize>,
    visible_mask: Vec<bool>,
    lod_levels: Vec<u8>,
    draw_order: Vec<usize>,
    draw_order_dirty: bool,
}

/// Observational per-frame counters surfaced in the top bar; never fed back
/// into the render algorithm.
#[derive(Clone, Copy, Default)]
struct RenderStats {
    total: usize,
    visible: usize,
    culled: usize,
    lod_counts: [usize; 4],
    labels: usize,
    visible_edges: usize,
    texture_bytes: usize,
}

struct Playback {
    path: Vec<usize>,
    cursor: usize,
    last_step: f64,
}

struct PathCache {
    selected_id: String,
    graph_revision: u64,
    highlight: Option<highlight::PathHighlight>,
}

impl Drop for ViewModel {
    fn drop(&mut self) {
        // the worker stops through SimulationHandle::drop; textures are
        // released here so two stacked views never share cache state
        self.sim.stop();
        self.textures.destroy();
    }
}

impl ForceScopeApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, source: GraphSource) -> Self {
        let state = Self::start_load(source.clone());
        Self {
            source,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(source: GraphSource) -> Receiver<Result<GraphData, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = match source {
                GraphSource::File(path) => {
                    load_graph(&path).map_err(|error| format!("{error:#}"))
                }
                GraphSource::Synthetic {
                    nodes,
                    links_per_node,
                    seed,
                } => Ok(generate_graph(nodes, links_per_node, seed)),
            };
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(source: GraphSource) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(source),
        }
    }
}

impl eframe::App for ForceScopeApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(graph) => AppState::Ready(Box::new(ViewModel::new(graph))),
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.source.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.source, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.source.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => {
                            transition = Some(match result {
                                Ok(graph) => AppState::Ready(Box::new(ViewModel::new(graph))),
                                Err(error) => AppState::Error(error),
                            });
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(AppState::Error("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
