use eframe::egui::Context;

use crate::util::format_bytes;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn update_fps_counter(&mut self, ctx: &Context) {
        const FPS_SAMPLE_WINDOW: usize = 180;

        let dt = ctx.input(|input| input.stable_dt);
        if dt <= f32::EPSILON {
            return;
        }

        self.fps_current = (1.0 / dt).clamp(0.0, 1000.0);
        self.fps_samples.push_back(self.fps_current);
        while self.fps_samples.len() > FPS_SAMPLE_WINDOW {
            self.fps_samples.pop_front();
        }
    }

    pub(in crate::app) fn fps_display_text(&self) -> Option<String> {
        if !self.show_fps_bar {
            return None;
        }

        let mut parts = vec![format!("FPS {:.0}", self.fps_current)];
        if !self.fps_samples.is_empty() {
            let avg = self.fps_samples.iter().sum::<f32>() / self.fps_samples.len() as f32;
            parts.push(format!("avg {:.1}", avg));
        }
        if self.fps_current > f32::EPSILON {
            parts.push(format!("{:.1} ms", 1000.0 / self.fps_current));
        }

        Some(parts.join(" | "))
    }

    pub(in crate::app) fn render_stats_text(&self) -> String {
        let stats = &self.stats;
        format!(
            "visible {}/{} | culled {} | lod {}/{}/{}/{} | labels {} | edges {} | textures {}",
            stats.visible,
            stats.total,
            stats.culled,
            stats.lod_counts[0],
            stats.lod_counts[1],
            stats.lod_counts[2],
            stats.lod_counts[3],
            stats.labels,
            stats.visible_edges,
            format_bytes(stats.texture_bytes),
        )
    }
}
