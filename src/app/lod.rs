use eframe::egui::Vec2;

use super::culling::Viewport;

/// Fully culled tier; only missing positions or off-screen nodes land here.
pub(in crate::app) const LOD_CULLED: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct LodThresholds {
    pub near: f32,
    pub medium: f32,
    pub far: f32,
}

impl Default for LodThresholds {
    fn default() -> Self {
        Self {
            near: 0.5,
            medium: 0.7,
            far: 0.9,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct LodSettings {
    pub thresholds: LodThresholds,
    pub high_node_count: usize,
    pub high_edge_count: usize,
    pub density_scale: f32,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            thresholds: LodThresholds::default(),
            high_node_count: 5_000,
            high_edge_count: 10_000,
            density_scale: 0.8,
        }
    }
}

impl LodSettings {
    /// Dense graphs tighten the thresholds so detail degrades earlier at the
    /// same screen distance.
    pub(in crate::app) fn density_adjustment(&self, node_count: usize, edge_count: usize) -> f32 {
        if node_count > self.high_node_count || edge_count > self.high_edge_count {
            self.density_scale
        } else {
            1.0
        }
    }

    pub(in crate::app) fn node_lod(
        &self,
        world_pos: Option<Vec2>,
        viewport: &Viewport,
        node_count: usize,
        edge_count: usize,
    ) -> u8 {
        let Some(world) = world_pos else {
            return LOD_CULLED;
        };

        let screen = viewport.world_to_screen(world);
        if !viewport.contains_screen(screen) {
            return LOD_CULLED;
        }

        let normalized = (screen - viewport.center()).length() / viewport.diagonal().max(1.0);
        let scale = self.density_adjustment(node_count, edge_count);

        let tiers = [
            (self.thresholds.near, 0u8),
            (self.thresholds.medium, 1),
            (self.thresholds.far, 2),
        ];
        for (threshold, tier) in tiers {
            if normalized < threshold * scale {
                return tier;
            }
        }

        // distance alone never culls; past `far` stays at the coarsest
        // visible tier so distant context remains on screen
        2
    }

    /// An edge stays as detailed as its most detailed endpoint.
    pub(in crate::app) fn edge_lod(&self, source_lod: u8, target_lod: u8) -> u8 {
        source_lod.min(target_lod)
    }
}

pub(in crate::app) fn size_multiplier(lod: u8) -> f32 {
    match lod {
        0 => 1.0,
        1 => 0.8,
        2 => 0.6,
        _ => 0.0,
    }
}

pub(in crate::app) fn edge_width_multiplier(lod: u8) -> f32 {
    match lod {
        0 => 1.0,
        1 => 0.7,
        2 => 0.5,
        _ => 0.0,
    }
}

pub(in crate::app) fn label_alpha(lod: u8) -> f32 {
    match lod {
        0 => 1.0,
        1 => 0.7,
        _ => 0.0,
    }
}

pub(in crate::app) fn should_render_label(lod: u8) -> bool {
    lod <= 1
}

pub(in crate::app) fn should_render_details(lod: u8) -> bool {
    lod == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{Vec2 as EVec2, vec2};

    fn viewport() -> Viewport {
        Viewport::new(800.0, 600.0, 1.0, EVec2::ZERO)
    }

    fn world_at_ratio(viewport: &Viewport, ratio: f32) -> EVec2 {
        // place along +x from the screen center at the given fraction of the
        // diagonal, then map back to world space
        let screen = viewport.center() + vec2(ratio * viewport.diagonal(), 0.0);
        viewport.screen_to_world(screen)
    }

    #[test]
    fn distance_buckets_match_default_thresholds() {
        let settings = LodSettings::default();
        let viewport = viewport();

        let cases = [(0.3, 0u8), (0.6, 1u8), (0.8, 2u8)];
        for (ratio, expected) in cases {
            let world = world_at_ratio(&viewport, ratio);
            assert_eq!(
                settings.node_lod(Some(world), &viewport, 100, 100),
                expected,
                "ratio {ratio}"
            );
        }
    }

    #[test]
    fn lod_never_decreases_with_distance() {
        let settings = LodSettings::default();
        let viewport = viewport();

        let mut previous = 0u8;
        for step in 0..40 {
            let ratio = step as f32 * 0.02;
            let world = world_at_ratio(&viewport, ratio);
            let lod = settings.node_lod(Some(world), &viewport, 100, 100);
            assert!(lod >= previous, "detail regressed at ratio {ratio}");
            assert!(lod < LOD_CULLED, "in-view distance must not cull");
            previous = lod;
        }
    }

    #[test]
    fn far_in_view_distance_stays_at_tier_two() {
        let settings = LodSettings::default();
        let viewport = viewport();
        // 0.95 of the diagonal is past `far` but still inside the buffered
        // viewport; policy keeps it visible at the coarsest tier
        let world = world_at_ratio(&viewport, 0.95);
        assert_eq!(settings.node_lod(Some(world), &viewport, 100, 100), 2);
    }

    #[test]
    fn missing_or_offscreen_positions_cull() {
        let settings = LodSettings::default();
        let viewport = viewport();

        assert_eq!(settings.node_lod(None, &viewport, 10, 10), LOD_CULLED);

        let far_left = viewport.screen_to_world(vec2(-900.0, 300.0));
        assert_eq!(
            settings.node_lod(Some(far_left), &viewport, 10, 10),
            LOD_CULLED
        );
    }

    #[test]
    fn dense_graphs_tighten_thresholds() {
        let settings = LodSettings::default();
        let viewport = viewport();

        // ratio 0.45 is tier 0 normally, tier 1 once the density scale kicks in
        let world = world_at_ratio(&viewport, 0.45);
        assert_eq!(settings.node_lod(Some(world), &viewport, 100, 100), 0);
        assert_eq!(settings.node_lod(Some(world), &viewport, 6_000, 100), 1);
        assert_eq!(settings.node_lod(Some(world), &viewport, 100, 20_000), 1);
    }

    #[test]
    fn edge_lod_follows_the_sharper_endpoint() {
        let settings = LodSettings::default();
        assert_eq!(settings.edge_lod(0, 2), 0);
        assert_eq!(settings.edge_lod(2, 1), 1);
        assert_eq!(settings.edge_lod(LOD_CULLED, 2), 2);
        assert_eq!(settings.edge_lod(LOD_CULLED, LOD_CULLED), LOD_CULLED);
    }

    #[test]
    fn derived_multipliers_are_total() {
        for lod in 0..=3u8 {
            let _ = size_multiplier(lod);
            let _ = edge_width_multiplier(lod);
            let _ = label_alpha(lod);
        }
        assert_eq!(size_multiplier(0), 1.0);
        assert_eq!(size_multiplier(3), 0.0);
        assert!(should_render_label(1));
        assert!(!should_render_label(2));
        assert!(should_render_details(0));
        assert!(!should_render_details(1));
    }
}
