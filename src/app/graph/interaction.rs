use eframe::egui::{self, Pos2, Rect, Ui, vec2};

use super::super::ViewModel;
use super::super::culling::FrustumCuller;

const HIT_TEST_SCREEN_RADIUS: f32 = 24.0;

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let local = pointer - rect.min;
        let center = vec2(rect.width() * 0.5, rect.height() * 0.5);
        let world_before = (local - center - self.pan) / self.zoom;

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.02, 6.0);

        // keep the point under the cursor fixed while zooming
        self.pan = local - center - (world_before * self.zoom);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    pub(in crate::app) fn apply_graph_selection(&mut self, clicked: Option<String>, multi: bool) {
        match clicked {
            Some(id) => {
                if multi {
                    if !self.selected.insert(id.clone()) {
                        self.selected.remove(&id);
                        if self.selected_primary.as_deref() == Some(id.as_str()) {
                            self.selected_primary = self.selected.iter().next().cloned();
                        }
                        return;
                    }
                } else {
                    self.selected.clear();
                    self.selected.insert(id.clone());
                }
                self.selected_primary = Some(id);
            }
            None => {
                if !multi {
                    self.selected.clear();
                    self.selected_primary = None;
                    self.playback = None;
                }
            }
        }
    }

    pub(in crate::app) fn select_by_id(&mut self, id: &str) {
        self.apply_graph_selection(Some(id.to_owned()), false);
    }
}

/// Hit test for the external input layer: nearest node to a screen point,
/// within a fixed screen-space pick radius.
pub(in crate::app) fn node_at_position(
    culler: &FrustumCuller,
    world_positions: &[Option<eframe::egui::Vec2>],
    rect: Rect,
    screen: Pos2,
) -> Option<usize> {
    let local = screen - rect.min;
    let world = culler.screen_to_world(vec2(local.x, local.y));
    let pick_radius = HIT_TEST_SCREEN_RADIUS / culler.viewport().zoom;
    culler
        .find_nearest(world, pick_radius, world_positions)
        .map(|(index, _)| index)
}
