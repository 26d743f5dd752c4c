use eframe::egui::{self, Slider, Ui};

use super::super::ViewModel;
use super::super::textures::VisualState;

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Search");
        ui.add_space(4.0);

        let search_response = ui.text_edit_singleline(&mut self.search);
        if !self.search.trim().is_empty() {
            let match_count = self
                .search_match_cache
                .as_ref()
                .filter(|cached| cached.graph_revision == self.render_graph_revision)
                .map(|cached| cached.matches.len());
            match match_count {
                Some(count) => {
                    ui.label(format!("{count} matches"));
                }
                None => {
                    ui.label("searching...");
                }
            }

            let select_first = search_response.lost_focus()
                && ui.input(|input| input.key_pressed(egui::Key::Enter));
            if select_first && let Some(id) = self.first_search_match() {
                self.set_selected(Some(id));
            }
        }

        ui.add_space(10.0);
        ui.separator();
        ui.heading("Layout");
        ui.add_space(4.0);

        let mut layout_changed = false;
        layout_changed |= ui
            .add(Slider::new(&mut self.layout.theta, 0.1..=1.5).text("theta (approximation)"))
            .drag_stopped();
        layout_changed |= ui
            .add(Slider::new(&mut self.layout.repulsion, 1.0..=200.0).text("repulsion"))
            .drag_stopped();
        layout_changed |= ui
            .add(Slider::new(&mut self.layout.link_distance, 10.0..=240.0).text("link distance"))
            .drag_stopped();
        layout_changed |= ui
            .add(Slider::new(&mut self.layout.link_strength, 0.0..=1.0).text("link strength"))
            .drag_stopped();
        layout_changed |= ui
            .add(
                Slider::new(&mut self.layout.collision_strength, 0.0..=2.0)
                    .text("collision strength"),
            )
            .drag_stopped();
        layout_changed |= ui
            .add(Slider::new(&mut self.layout.alpha_decay, 0.001..=0.1).text("alpha decay"))
            .drag_stopped();
        layout_changed |= ui
            .add(Slider::new(&mut self.layout.velocity_decay, 0.05..=0.95).text("velocity decay"))
            .drag_stopped();
        if layout_changed {
            // positions carry over; the worker swaps in a fresh engine with
            // the new options
            self.start_layout();
        }

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            if ui.button("Reheat").clicked() {
                self.reheat_layout();
            }
            if ui.button("Stop").clicked() {
                self.stop_layout();
            }
        });

        ui.add_space(10.0);
        ui.separator();
        ui.heading("Rendering");
        ui.add_space(4.0);

        let size_response =
            ui.add(Slider::new(&mut self.base_node_size, 4.0..=40.0).text("base node size"));
        if size_response.drag_stopped() || size_response.lost_focus() {
            self.graph_dirty = true;
        }

        ui.checkbox(&mut self.enable_glow, "glow overlays");
        ui.checkbox(&mut self.enable_labels, "labels");
        ui.checkbox(&mut self.show_fps_bar, "FPS readout");
        ui.add(
            Slider::new(&mut self.transition_duration, 0.1..=2.0).text("playback step (s)"),
        );

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.label("selection color");
            let mut color = self.textures.state_color(VisualState::Selected);
            if ui.color_edit_button_srgba(&mut color).changed() {
                self.textures.update_color(VisualState::Selected, color);
            }
        });

        ui.add_space(10.0);
        ui.separator();
        ui.heading("Level of detail");
        ui.add_space(4.0);

        ui.add(Slider::new(&mut self.lod.thresholds.near, 0.1..=1.2).text("near"));
        ui.add(Slider::new(&mut self.lod.thresholds.medium, 0.1..=1.3).text("medium"));
        ui.add(Slider::new(&mut self.lod.thresholds.far, 0.1..=1.5).text("far"));
        // keep the cut points ordered no matter how the sliders land
        self.lod.thresholds.medium = self.lod.thresholds.medium.max(self.lod.thresholds.near);
        self.lod.thresholds.far = self.lod.thresholds.far.max(self.lod.thresholds.medium);

        ui.add(
            Slider::new(&mut self.lod.density_scale, 0.3..=1.0).text("dense-graph scale"),
        );
    }

    fn first_search_match(&self) -> Option<String> {
        let cache = self.graph_cache.as_ref()?;
        let matches = self
            .search_match_cache
            .as_ref()
            .filter(|cached| cached.graph_revision == self.render_graph_revision)?;

        // lowest index is stable across frames, which beats hash-set order
        // jumping around while the user types
        let index = matches.matches.iter().copied().min()?;
        cache.nodes.get(index).map(|node| node.id.clone())
    }
}
