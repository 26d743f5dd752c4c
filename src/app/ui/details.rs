use eframe::egui::{self, RichText, Ui};

use crate::util::short_name;

use super::super::ViewModel;

const NEIGHBOR_ROW_LIMIT: usize = 24;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Details");
        ui.add_space(6.0);

        let Some(primary) = self.selected_primary.clone() else {
            match &self.hovered_id {
                Some(id) => {
                    ui.label(format!("hovering {}", short_name(id)));
                }
                None => {
                    ui.label("Click a node to inspect it.");
                    ui.label("Ctrl-click adds to the selection; right-drag pans; scroll zooms.");
                }
            }
            return;
        };

        let playing = self.playback.is_some();
        let selection_count = self.selected.len();

        let mut play_clicked = false;
        let mut stop_clicked = false;
        let mut clicked_neighbor = None;
        let mut clear_clicked = false;

        let Some(cache) = self.graph_cache.as_ref() else {
            return;
        };
        let Some(&index) = cache.index_by_id.get(&primary) else {
            ui.label("Selected node is not in the current graph.");
            return;
        };

        let node = &cache.nodes[index];
        ui.label(RichText::new(node.display_label().to_owned()).strong());
        ui.label(format!("id: {}", node.id));
        ui.label(format!("weight: {:.1}", node.weight));
        ui.label(format!(
            "links: {} out / {} in",
            cache.outgoing[index].len(),
            cache.incoming[index].len()
        ));
        if selection_count > 1 {
            ui.label(format!("{selection_count} nodes selected"));
        }

        ui.add_space(8.0);
        ui.separator();
        ui.heading("Path from root");
        ui.add_space(4.0);

        let path_rows = self
            .path_cache
            .as_ref()
            .filter(|cached| cached.selected_id == primary)
            .and_then(|cached| cached.highlight.as_ref())
            .map(|highlight| {
                highlight
                    .ordered()
                    .iter()
                    .filter_map(|&step| cache.nodes.get(step))
                    .map(|step_node| step_node.display_label().to_owned())
                    .collect::<Vec<_>>()
            });

        match path_rows {
            Some(rows) => {
                ui.label(format!("{} hops", rows.len().saturating_sub(1)));
                for (depth, row) in rows.iter().enumerate() {
                    ui.label(format!("{}{}", "  ".repeat(depth.min(6)), row));
                }

                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    if !playing && ui.button("Play path").clicked() {
                        play_clicked = true;
                    }
                    if playing && ui.button("Stop playback").clicked() {
                        stop_clicked = true;
                    }
                });
            }
            None => {
                ui.label("No path from the root reaches this node.");
            }
        }

        ui.add_space(8.0);
        ui.separator();
        ui.heading("Neighbors");
        ui.add_space(4.0);

        let mut neighbor_rows = Vec::new();
        for &neighbor in cache.outgoing[index].iter().take(NEIGHBOR_ROW_LIMIT) {
            if let Some(neighbor_node) = cache.nodes.get(neighbor) {
                neighbor_rows.push((
                    neighbor_node.display_label().to_owned(),
                    neighbor_node.id.clone(),
                    true,
                ));
            }
        }
        for &neighbor in cache.incoming[index].iter().take(NEIGHBOR_ROW_LIMIT) {
            if let Some(neighbor_node) = cache.nodes.get(neighbor) {
                neighbor_rows.push((
                    neighbor_node.display_label().to_owned(),
                    neighbor_node.id.clone(),
                    false,
                ));
            }
        }

        egui::ScrollArea::vertical()
            .max_height(280.0)
            .show(ui, |ui| {
                for (label, id, outgoing) in &neighbor_rows {
                    let arrow = if *outgoing { "→" } else { "←" };
                    if ui.button(format!("{arrow} {label}")).clicked() {
                        clicked_neighbor = Some(id.clone());
                    }
                }
            });

        ui.add_space(8.0);
        if ui.button("Clear selection").clicked() {
            clear_clicked = true;
        }

        if play_clicked {
            let now = ui.input(|input| input.time);
            self.start_path_playback(now);
        }
        if stop_clicked {
            self.stop_path_playback();
        }
        if let Some(id) = clicked_neighbor {
            self.set_selected(Some(id));
        }
        if clear_clicked {
            self.set_selected(None);
        }
    }
}
