use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{
    self, Align2, Color32, FontId, Rect, Sense, Stroke, Ui, pos2, vec2,
};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use log::debug;

use super::super::culling::Viewport;
use super::super::highlight::{PathHighlight, path_from_root};
use super::super::lod::{
    LOD_CULLED, edge_width_multiplier, label_alpha, should_render_details, should_render_label,
    size_multiplier,
};
use super::super::render_utils::{blend_color, dim_color, draw_background, weight_color};
use super::super::textures::VisualState;
use super::super::{PathCache, Playback, RenderGraph, RenderStats, SearchMatchCache, ViewModel};
use super::interaction::node_at_position;

/// Interaction context for one frame, supplied by the selection and playback
/// state around the draw pass.
pub(in crate::app) struct FrameContext<'a> {
    pub hovered: Option<usize>,
    pub playing: Option<usize>,
    pub selected: &'a HashSet<usize>,
    pub path: Option<&'a PathHighlight>,
}

/// Fixed precedence: playing > hovered > selected > path or waypoint >
/// default. Path endpoints render as `Path`, interior nodes as `Waypoint`.
pub(in crate::app) fn resolve_visual_state(
    index: usize,
    context: &FrameContext<'_>,
) -> VisualState {
    if context.playing == Some(index) {
        return VisualState::Playing;
    }
    if context.hovered == Some(index) {
        return VisualState::Hovered;
    }
    if context.selected.contains(&index) {
        return VisualState::Selected;
    }
    if let Some(path) = context.path
        && path.contains(index)
    {
        return if path.is_endpoint(index) {
            VisualState::Path
        } else {
            VisualState::Waypoint
        };
    }
    VisualState::Default
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

fn ensure_draw_order(cache: &mut RenderGraph) {
    if !cache.view_scratch.draw_order_dirty
        && cache.view_scratch.draw_order.len() == cache.nodes.len()
    {
        return;
    }

    cache.view_scratch.draw_order.clear();
    cache.view_scratch.draw_order.extend(0..cache.nodes.len());
    cache
        .view_scratch
        .draw_order
        .sort_by(|a, b| cache.nodes[*a].weight.total_cmp(&cache.nodes[*b].weight));
    cache.view_scratch.draw_order_dirty = false;
}

impl ViewModel {
    fn cached_search_matches(&mut self) -> Option<Arc<HashSet<usize>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.graph_revision == self.render_graph_revision
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let query = query.to_owned();
        let cache = self.graph_cache.as_ref()?;
        let matcher = SkimMatcherV2::default();
        let matches = cache
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                fuzzy_match_score(&matcher, node.display_label(), &query).map(|_| index)
            })
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query,
            graph_revision: self.render_graph_revision,
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    fn refresh_path_cache(&mut self) {
        let Some(primary) = self.selected_primary.clone() else {
            self.path_cache = None;
            return;
        };

        let current = self.path_cache.as_ref().is_some_and(|cached| {
            cached.selected_id == primary && cached.graph_revision == self.render_graph_revision
        });
        if current {
            return;
        }

        let highlight = self.graph_cache.as_ref().and_then(|cache| {
            cache
                .index_by_id
                .get(&primary)
                .and_then(|&target| path_from_root(cache, target))
        });

        self.path_cache = Some(PathCache {
            selected_id: primary,
            graph_revision: self.render_graph_revision,
            highlight,
        });
    }

    pub(in crate::app) fn start_path_playback(&mut self, now: f64) {
        let Some(path) = self
            .path_cache
            .as_ref()
            .and_then(|cached| cached.highlight.as_ref())
        else {
            return;
        };

        self.playback = Some(Playback {
            path: path.ordered().to_vec(),
            cursor: 0,
            last_step: now,
        });
    }

    pub(in crate::app) fn stop_path_playback(&mut self) {
        self.playback = None;
    }

    fn advance_playback(&mut self, ctx: &egui::Context) {
        let step = self.transition_duration.max(0.1) as f64;
        let now = ctx.input(|input| input.time);

        let mut finished = false;
        if let Some(playback) = self.playback.as_mut()
            && now - playback.last_step >= step
        {
            playback.last_step = now;
            playback.cursor += 1;
            finished = playback.cursor >= playback.path.len();
        }
        if finished {
            self.playback = None;
        }
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        if self.graph_dirty {
            self.rebuild_render_graph();
        }
        self.apply_sim_events();

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, self.pan, self.zoom);

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);
        self.advance_playback(ui.ctx());
        self.refresh_path_cache();

        let pseudo_matches = self.cached_search_matches();

        // one consistent viewport per frame, pushed before any per-node query
        let viewport = Viewport::new(rect.width(), rect.height(), self.zoom, self.pan);
        self.culler.update_viewport(viewport);

        let enable_glow = self.enable_glow;
        let enable_labels = self.enable_labels;
        let lod_settings = self.lod;
        let zoom = self.zoom;
        let zoom_sqrt = zoom.sqrt();
        let playing_cursor = self
            .playback
            .as_ref()
            .and_then(|playback| playback.path.get(playback.cursor).copied());
        let multi_select = ui.input(|input| input.modifiers.ctrl);
        let pointer = response.hover_pos();

        if self.sim_running || self.playback.is_some() {
            ui.ctx().request_repaint();
        }

        let ViewModel {
            graph_cache,
            textures,
            culler,
            selected,
            path_cache,
            stats,
            hovered_id,
            sim_error,
            ..
        } = self;

        let Some(cache) = graph_cache.as_mut() else {
            *stats = RenderStats::default();
            ui.label("Graph is empty.");
            return;
        };

        let node_count = cache.nodes.len();
        let edge_count = cache.edges.len();

        cache.view_scratch.world_positions.clear();
        for node in &cache.nodes {
            cache.view_scratch.world_positions.push(node.world_pos);
        }
        let missing_positions = cache
            .view_scratch
            .world_positions
            .iter()
            .filter(|world| world.is_none())
            .count();
        if missing_positions > 0 {
            debug!("{missing_positions} nodes lack positions; treated as culled");
        }

        culler.visible_indices(
            &cache.view_scratch.world_positions,
            &mut cache.view_scratch.visible_indices,
        );
        cache.view_scratch.visible_mask.clear();
        cache.view_scratch.visible_mask.resize(node_count, false);
        for &index in &cache.view_scratch.visible_indices {
            if let Some(entry) = cache.view_scratch.visible_mask.get_mut(index) {
                *entry = true;
            }
        }

        cache.view_scratch.screen_positions.clear();
        for node in &cache.nodes {
            let screen = match node.world_pos {
                Some(world) => rect.min + culler.world_to_screen(world),
                None => rect.min,
            };
            cache.view_scratch.screen_positions.push(screen);
        }

        cache.view_scratch.lod_levels.clear();
        for (index, node) in cache.nodes.iter().enumerate() {
            let in_view = cache
                .view_scratch
                .visible_mask
                .get(index)
                .copied()
                .unwrap_or(false);
            let lod_level = if in_view {
                lod_settings.node_lod(node.world_pos, &viewport, node_count, edge_count)
            } else {
                LOD_CULLED
            };
            if lod_level == LOD_CULLED
                && let Some(entry) = cache.view_scratch.visible_mask.get_mut(index)
            {
                // explicit cull: sprites persist across frames, so anything
                // outside the visible set is forced invisible rather than
                // merely skipped
                *entry = false;
            }
            cache.view_scratch.lod_levels.push(lod_level);
        }

        let hovered = pointer.and_then(|pos| {
            node_at_position(culler, &cache.view_scratch.world_positions, rect, pos)
        });
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }
        *hovered_id = hovered.and_then(|index| cache.nodes.get(index).map(|node| node.id.clone()));

        let selected_indices = selected
            .iter()
            .filter_map(|id| cache.index_by_id.get(id).copied())
            .collect::<HashSet<_>>();
        let path = path_cache
            .as_ref()
            .and_then(|cached| cached.highlight.as_ref());
        let playing = playing_cursor.filter(|&index| index < node_count);
        let context = FrameContext {
            hovered,
            playing,
            selected: &selected_indices,
            path,
        };

        let mut frame_stats = RenderStats {
            total: node_count,
            ..RenderStats::default()
        };

        for edge in &cache.edges {
            if cache.view_scratch.world_positions[edge.source].is_none()
                || cache.view_scratch.world_positions[edge.target].is_none()
            {
                continue;
            }

            let source_lod = cache.view_scratch.lod_levels[edge.source];
            let target_lod = cache.view_scratch.lod_levels[edge.target];
            let edge_lod = lod_settings.edge_lod(source_lod, target_lod);
            if edge_lod >= LOD_CULLED {
                continue;
            }

            let start = cache.view_scratch.screen_positions[edge.source];
            let end = cache.view_scratch.screen_positions[edge.target];
            let on_path = path.is_some_and(|p| p.covers_edge(edge.source, edge.target));

            let (width, color) = if on_path {
                (
                    (3.3 * zoom_sqrt).clamp(1.7, 5.8),
                    Color32::from_rgb(246, 206, 104),
                )
            } else {
                let width_mult = edge_width_multiplier(edge_lod);
                let base = match edge.kind {
                    crate::data::EdgeKind::Link => Color32::from_rgba_unmultiplied(72, 72, 72, 165),
                    crate::data::EdgeKind::Dependency => {
                        Color32::from_rgba_unmultiplied(70, 88, 102, 165)
                    }
                    crate::data::EdgeKind::Reference => {
                        Color32::from_rgba_unmultiplied(86, 80, 64, 165)
                    }
                };
                (
                    (1.18 * zoom_sqrt * (0.8 + edge.weight.min(3.0) * 0.2) * width_mult)
                        .clamp(0.4, 3.4),
                    base,
                )
            };

            painter.line_segment([start, end], Stroke::new(width, color));
            frame_stats.visible_edges += 1;
        }

        let pseudo_active = pseudo_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());
        let match_tint = blend_color(Color32::WHITE, Color32::from_rgb(103, 196, 255), 0.45);
        let dim_tint = dim_color(Color32::WHITE, 0.45);

        ensure_draw_order(cache);
        for index in cache.view_scratch.draw_order.iter().copied() {
            if !cache
                .view_scratch
                .visible_mask
                .get(index)
                .copied()
                .unwrap_or(false)
            {
                continue;
            }

            let node = &cache.nodes[index];
            let lod_level = cache.view_scratch.lod_levels[index];
            let position = cache.view_scratch.screen_positions[index];
            let state = resolve_visual_state(index, &context);

            let color_override = match state {
                VisualState::Default => node.color.or_else(|| {
                    Some(weight_color(node.weight, cache.min_weight, cache.max_weight))
                }),
                _ => node.color,
            };
            let texture = textures.texture_for(ui.ctx(), node.base_radius, state, color_override);

            let screen_radius = node.base_radius * zoom * size_multiplier(lod_level);
            if screen_radius <= 0.1 {
                continue;
            }

            let sprite_extent = texture.size()[0] as f32;
            let sprite_scale = screen_radius / node.base_radius.round().max(1.0);
            let draw_size = sprite_extent * sprite_scale;

            let tint = if pseudo_active {
                let is_match = pseudo_matches
                    .as_ref()
                    .is_some_and(|matches| matches.contains(&index));
                if is_match { match_tint } else { dim_tint }
            } else {
                Color32::WHITE
            };

            painter.image(
                texture.id(),
                Rect::from_center_size(position, vec2(draw_size, draw_size)),
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                tint,
            );

            if enable_glow && state.has_glow() {
                let glow = textures.state_color(state);
                painter.circle_filled(
                    position,
                    screen_radius * 1.45,
                    Color32::from_rgba_unmultiplied(glow.r(), glow.g(), glow.b(), 26),
                );
            }

            if enable_labels && should_render_label(lod_level) {
                let alpha = (label_alpha(lod_level) * 255.0) as u8;
                if alpha > 0 {
                    painter.text(
                        position + vec2(screen_radius + 5.0, 0.0),
                        Align2::LEFT_CENTER,
                        node.display_label(),
                        FontId::proportional(12.0),
                        Color32::from_rgba_unmultiplied(238, 238, 238, alpha),
                    );
                    frame_stats.labels += 1;
                }
            }
        }

        for &lod_level in &cache.view_scratch.lod_levels {
            frame_stats.lod_counts[lod_level.min(LOD_CULLED) as usize] += 1;
        }
        frame_stats.visible = cache
            .view_scratch
            .visible_mask
            .iter()
            .filter(|&&visible| visible)
            .count();
        frame_stats.culled = node_count - frame_stats.visible;
        frame_stats.texture_bytes = textures.approx_bytes();
        *stats = frame_stats;

        let hovered_lod = hovered
            .and_then(|index| cache.view_scratch.lod_levels.get(index).copied())
            .unwrap_or(LOD_CULLED);
        if let Some(index) = hovered
            && let Some(node) = cache.nodes.get(index)
            && should_render_details(hovered_lod)
        {
            let panel_text = format!(
                "{}  |  weight {:.1}  |  out {} in {}",
                node.display_label(),
                node.weight,
                cache.outgoing[index].len(),
                cache.incoming[index].len()
            );
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if let Some(message) = sim_error.as_ref() {
            painter.text(
                rect.left_bottom() + vec2(10.0, -10.0),
                Align2::LEFT_BOTTOM,
                format!("layout worker failed: {message} (showing static layout)"),
                FontId::proportional(13.0),
                Color32::from_rgb(240, 120, 110),
            );
        }

        let pending_selection = if response.clicked_by(egui::PointerButton::Primary) {
            Some(hovered.and_then(|index| cache.nodes.get(index).map(|node| node.id.clone())))
        } else {
            None
        };

        if let Some(clicked) = pending_selection {
            self.apply_graph_selection(clicked, multi_select);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_143() -> PathHighlight {
        PathHighlight::from_ordered(vec![1, 4, 3])
    }

    #[test]
    fn playing_outranks_every_other_state() {
        let selected = HashSet::from([3usize]);
        let path = path_143();
        let context = FrameContext {
            hovered: Some(3),
            playing: Some(3),
            selected: &selected,
            path: Some(&path),
        };
        assert_eq!(resolve_visual_state(3, &context), VisualState::Playing);
    }

    #[test]
    fn hovered_outranks_selected_and_path() {
        let selected = HashSet::from([4usize]);
        let path = path_143();
        let context = FrameContext {
            hovered: Some(4),
            playing: None,
            selected: &selected,
            path: Some(&path),
        };
        assert_eq!(resolve_visual_state(4, &context), VisualState::Hovered);
    }

    #[test]
    fn selected_outranks_path_membership() {
        let selected = HashSet::from([1usize]);
        let path = path_143();
        let context = FrameContext {
            hovered: None,
            playing: None,
            selected: &selected,
            path: Some(&path),
        };
        assert_eq!(resolve_visual_state(1, &context), VisualState::Selected);
    }

    #[test]
    fn path_endpoints_and_interior_nodes_differ() {
        let selected = HashSet::new();
        let path = path_143();
        let context = FrameContext {
            hovered: None,
            playing: None,
            selected: &selected,
            path: Some(&path),
        };
        assert_eq!(resolve_visual_state(1, &context), VisualState::Path);
        assert_eq!(resolve_visual_state(3, &context), VisualState::Path);
        assert_eq!(resolve_visual_state(4, &context), VisualState::Waypoint);
    }

    #[test]
    fn unremarkable_nodes_fall_through_to_default() {
        let selected = HashSet::new();
        let context = FrameContext {
            hovered: None,
            playing: None,
            selected: &selected,
            path: None,
        };
        assert_eq!(resolve_visual_state(9, &context), VisualState::Default);
    }
}
