use eframe::egui::{Vec2, vec2};

/// Base margin around the viewport; the effective cull buffer is twice this,
/// so nodes just off screen stay live and never pop in.
pub(in crate::app) const VIEW_CULL_PADDING: f32 = 400.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Viewport {
    pub width: f32,
    pub height: f32,
    pub zoom: f32,
    pub pan: Vec2,
}

impl Viewport {
    pub(in crate::app) fn new(width: f32, height: f32, zoom: f32, pan: Vec2) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            zoom: zoom.max(0.001),
            pan,
        }
    }

    pub(in crate::app) fn center(&self) -> Vec2 {
        vec2(self.width * 0.5, self.height * 0.5)
    }

    pub(in crate::app) fn diagonal(&self) -> f32 {
        (self.width * self.width + self.height * self.height).sqrt()
    }

    pub(in crate::app) fn world_to_screen(&self, world: Vec2) -> Vec2 {
        world * self.zoom + self.pan + self.center()
    }

    pub(in crate::app) fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        (screen - self.pan - self.center()) / self.zoom
    }

    pub(in crate::app) fn contains_screen(&self, screen: Vec2) -> bool {
        let buffer = VIEW_CULL_PADDING * 2.0;
        screen.x >= -buffer
            && screen.x <= self.width + buffer
            && screen.y >= -buffer
            && screen.y <= self.height + buffer
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0, Vec2::ZERO)
    }
}

/// Keeps its own copy of the viewport (replaced wholesale once per frame) and
/// answers visibility and nearest-node queries over the node position slice.
pub(in crate::app) struct FrustumCuller {
    viewport: Viewport,
}

impl FrustumCuller {
    pub(in crate::app) fn new() -> Self {
        Self {
            viewport: Viewport::default(),
        }
    }

    pub(in crate::app) fn update_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub(in crate::app) fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub(in crate::app) fn visible_indices(
        &self,
        positions: &[Option<Vec2>],
        out: &mut Vec<usize>,
    ) {
        out.clear();
        for (index, world) in positions.iter().enumerate() {
            let Some(world) = world else {
                continue;
            };
            if self.viewport.contains_screen(self.viewport.world_to_screen(*world)) {
                out.push(index);
            }
        }
    }

    pub(in crate::app) fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        self.viewport.screen_to_world(screen)
    }

    pub(in crate::app) fn world_to_screen(&self, world: Vec2) -> Vec2 {
        self.viewport.world_to_screen(world)
    }

    /// Nearest node to a world point within `radius`, by Euclidean distance.
    /// The box prefilter bounds the candidate set before the exact test.
    pub(in crate::app) fn find_nearest(
        &self,
        world: Vec2,
        radius: f32,
        positions: &[Option<Vec2>],
    ) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (index, candidate) in positions.iter().enumerate() {
            let Some(candidate) = candidate else {
                continue;
            };
            if (candidate.x - world.x).abs() > radius || (candidate.y - world.y).abs() > radius {
                continue;
            }

            let distance = (*candidate - world).length();
            if distance > radius {
                continue;
            }
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((index, distance));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn culler(width: f32, height: f32, zoom: f32, pan: Vec2) -> FrustumCuller {
        let mut culler = FrustumCuller::new();
        culler.update_viewport(Viewport::new(width, height, zoom, pan));
        culler
    }

    #[test]
    fn screen_transform_round_trips() {
        let culler = culler(800.0, 600.0, 1.7, vec2(40.0, -25.0));
        let world = vec2(123.0, -456.0);
        let screen = culler.world_to_screen(world);
        let back = culler.screen_to_world(screen);
        assert!((back - world).length() < 1e-3);
    }

    #[test]
    fn node_past_the_doubled_buffer_is_culled() {
        // 800x600 at zoom 1, pan (0,0): world -1300 maps to screen x = -900,
        // which is outside [-800, 1600] once the 400px padding is doubled
        let culler = culler(800.0, 600.0, 1.0, Vec2::ZERO);
        let outside = vec2(-1300.0, 0.0);
        assert_eq!(culler.world_to_screen(outside), vec2(-900.0, 300.0));

        let just_inside = vec2(-1150.0, 0.0);
        assert_eq!(culler.world_to_screen(just_inside), vec2(-750.0, 300.0));

        let positions = vec![Some(outside), Some(just_inside), None];
        let mut visible = Vec::new();
        culler.visible_indices(&positions, &mut visible);
        assert_eq!(visible, vec![1]);
    }

    #[test]
    fn missing_positions_are_never_visible() {
        let culler = culler(400.0, 400.0, 1.0, Vec2::ZERO);
        let positions = vec![None, Some(vec2(0.0, 0.0))];
        let mut visible = Vec::new();
        culler.visible_indices(&positions, &mut visible);
        assert_eq!(visible, vec![1]);
    }

    #[test]
    fn find_nearest_honors_the_radius_bound() {
        let culler = culler(400.0, 400.0, 1.0, Vec2::ZERO);
        let positions = vec![
            Some(vec2(10.0, 10.0)),
            Some(vec2(14.0, 10.0)),
            None,
            Some(vec2(100.0, 100.0)),
        ];

        let hit = culler.find_nearest(vec2(13.0, 10.0), 5.0, &positions);
        assert_eq!(hit.map(|(index, _)| index), Some(1));

        let miss = culler.find_nearest(vec2(200.0, 200.0), 30.0, &positions);
        assert!(miss.is_none());
    }
}
