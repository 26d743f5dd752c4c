use std::collections::HashMap;

use eframe::egui::{Color32, ColorImage, Context, TextureHandle, TextureOptions};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(in crate::app) enum VisualState {
    Default,
    Hovered,
    Selected,
    Playing,
    Path,
    Waypoint,
}

impl VisualState {
    pub(in crate::app) fn has_glow(self) -> bool {
        matches!(self, Self::Hovered | Self::Playing)
    }

    pub(in crate::app) fn has_ring(self) -> bool {
        matches!(self, Self::Selected)
    }

    fn default_color(self) -> Color32 {
        match self {
            Self::Default => Color32::from_rgb(96, 148, 210),
            Self::Hovered => Color32::from_rgb(255, 164, 101),
            Self::Selected => Color32::from_rgb(245, 206, 93),
            Self::Playing => Color32::from_rgb(120, 220, 130),
            Self::Path => Color32::from_rgb(247, 194, 111),
            Self::Waypoint => Color32::from_rgb(246, 137, 92),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct TextureKey {
    radius: u32,
    state: VisualState,
    color: Color32,
}

/// Memoized sprite factory. Identical (rounded radius, state, effective
/// color) keys return the identical texture handle, so the draw pass never
/// re-uploads a sprite it has already built.
pub(in crate::app) struct TextureCache {
    entries: HashMap<TextureKey, TextureHandle>,
    state_colors: HashMap<VisualState, Color32>,
}

impl TextureCache {
    pub(in crate::app) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            state_colors: HashMap::new(),
        }
    }

    pub(in crate::app) fn state_color(&self, state: VisualState) -> Color32 {
        self.state_colors
            .get(&state)
            .copied()
            .unwrap_or_else(|| state.default_color())
    }

    pub(in crate::app) fn texture_for(
        &mut self,
        ctx: &Context,
        radius: f32,
        state: VisualState,
        color_override: Option<Color32>,
    ) -> TextureHandle {
        let rounded = radius.round().max(1.0) as u32;
        let color = color_override.unwrap_or_else(|| self.state_color(state));
        let key = TextureKey {
            radius: rounded,
            state,
            color,
        };

        if let Some(handle) = self.entries.get(&key) {
            return handle.clone();
        }

        let image = render_sprite(rounded, state, color);
        let handle = ctx.load_texture(
            format!("node-{rounded}-{state:?}"),
            image,
            TextureOptions::LINEAR,
        );
        self.entries.insert(key, handle.clone());
        handle
    }

    /// Changes a state's default color and evicts exactly that state's
    /// entries; other states keep their cached sprites.
    pub(in crate::app) fn update_color(&mut self, state: VisualState, color: Color32) {
        self.state_colors.insert(state, color);
        self.entries.retain(|key, _| key.state != state);
    }

    pub(in crate::app) fn destroy(&mut self) {
        self.entries.clear();
        self.state_colors.clear();
    }

    pub(in crate::app) fn approx_bytes(&self) -> usize {
        self.entries
            .values()
            .map(|handle| {
                let [width, height] = handle.size();
                width * height * 4
            })
            .sum()
    }
}

fn sprite_padding(radius: u32, state: VisualState) -> u32 {
    if state.has_glow() || state.has_ring() {
        (radius / 2).max(4)
    } else {
        2
    }
}

/// Rasterizes one sprite. Layers render in a fixed order: outer glow,
/// selection ring, gradient base fill, inner highlight, state marker.
fn render_sprite(radius: u32, state: VisualState, color: Color32) -> ColorImage {
    let padding = sprite_padding(radius, state);
    let extent = ((radius + padding) * 2) as usize;
    let mut image = ColorImage::filled([extent, extent], Color32::TRANSPARENT);

    let center = extent as f32 * 0.5;
    let r = radius as f32;
    let pad = padding as f32;
    let rgb = [
        color.r() as f32 / 255.0,
        color.g() as f32 / 255.0,
        color.b() as f32 / 255.0,
    ];

    for y in 0..extent {
        for x in 0..extent {
            let dx = x as f32 + 0.5 - center;
            let dy = y as f32 + 0.5 - center;
            let distance = (dx * dx + dy * dy).sqrt();
            let mut pixel = [0.0f32; 4];

            if state.has_glow() && distance > r && distance <= r + pad {
                let falloff = 1.0 - (distance - r) / pad;
                blend_over(&mut pixel, rgb, falloff * falloff * 0.55);
            }

            if state.has_ring() {
                let ring_radius = r + pad * 0.5;
                if (distance - ring_radius).abs() <= 1.5 {
                    blend_over(&mut pixel, [1.0, 0.95, 0.75], 0.9);
                }
            }

            if distance <= r {
                let t = distance / r.max(1.0);
                let lift = 0.35 * (1.0 - t);
                let body = [
                    rgb[0] + (1.0 - rgb[0]) * lift,
                    rgb[1] + (1.0 - rgb[1]) * lift,
                    rgb[2] + (1.0 - rgb[2]) * lift,
                ];
                let edge_alpha = (r - distance).clamp(0.0, 1.0);
                blend_over(&mut pixel, body, edge_alpha);

                let hx = dx + r * 0.3;
                let hy = dy + r * 0.3;
                let highlight_r = r * 0.45;
                let highlight_d = (hx * hx + hy * hy).sqrt();
                if highlight_d < highlight_r {
                    blend_over(
                        &mut pixel,
                        [1.0, 1.0, 1.0],
                        0.35 * (1.0 - highlight_d / highlight_r),
                    );
                }

                match state {
                    VisualState::Waypoint => {
                        // concave four-point star via a fractional-power norm
                        let s = r * 0.55;
                        let shape =
                            (dx.abs() / s).powf(0.6) + (dy.abs() / s).powf(0.6);
                        if shape <= 1.0 {
                            blend_over(&mut pixel, [1.0, 1.0, 1.0], 0.9);
                        }
                    }
                    VisualState::Path => {
                        // right-pointing triangular arrow
                        let apex = r * 0.45;
                        let base = -r * 0.25;
                        if dx >= base && dx <= apex {
                            let half_height = r * 0.35 * (apex - dx) / (apex - base);
                            if dy.abs() <= half_height {
                                blend_over(&mut pixel, [1.0, 1.0, 1.0], 0.9);
                            }
                        }
                    }
                    _ => {}
                }
            }

            if pixel[3] > 0.0 {
                image.pixels[y * extent + x] = Color32::from_rgba_unmultiplied(
                    (pixel[0] * 255.0).round() as u8,
                    (pixel[1] * 255.0).round() as u8,
                    (pixel[2] * 255.0).round() as u8,
                    (pixel[3] * 255.0).round() as u8,
                );
            }
        }
    }

    image
}

fn blend_over(dst: &mut [f32; 4], rgb: [f32; 3], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }

    let out_alpha = alpha + dst[3] * (1.0 - alpha);
    if out_alpha <= 0.0 {
        return;
    }

    for channel in 0..3 {
        dst[channel] =
            (rgb[channel] * alpha + dst[channel] * dst[3] * (1.0 - alpha)) / out_alpha;
    }
    dst[3] = out_alpha;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_keys_return_the_identical_texture() {
        let ctx = Context::default();
        let mut cache = TextureCache::new();

        let first = cache.texture_for(&ctx, 8.0, VisualState::Selected, None);
        let second = cache.texture_for(&ctx, 8.0, VisualState::Selected, None);
        assert_eq!(first.id(), second.id());
        assert_eq!(cache.entries.len(), 1);

        // rounding folds nearby radii onto the same sprite
        let rounded = cache.texture_for(&ctx, 8.4, VisualState::Selected, None);
        assert_eq!(first.id(), rounded.id());

        let other_state = cache.texture_for(&ctx, 8.0, VisualState::Hovered, None);
        assert_ne!(first.id(), other_state.id());
    }

    #[test]
    fn update_color_evicts_only_the_matching_state() {
        let ctx = Context::default();
        let mut cache = TextureCache::new();

        let selected = cache.texture_for(&ctx, 8.0, VisualState::Selected, None);
        let default = cache.texture_for(&ctx, 8.0, VisualState::Default, None);
        assert_eq!(cache.entries.len(), 2);

        cache.update_color(VisualState::Selected, Color32::from_rgb(10, 200, 30));
        assert_eq!(cache.entries.len(), 1);

        let selected_after = cache.texture_for(&ctx, 8.0, VisualState::Selected, None);
        assert_ne!(selected.id(), selected_after.id());

        let default_after = cache.texture_for(&ctx, 8.0, VisualState::Default, None);
        assert_eq!(default.id(), default_after.id());
    }

    #[test]
    fn override_color_keys_separately_from_state_default() {
        let ctx = Context::default();
        let mut cache = TextureCache::new();

        let plain = cache.texture_for(&ctx, 6.0, VisualState::Default, None);
        let tinted = cache.texture_for(
            &ctx,
            6.0,
            VisualState::Default,
            Some(Color32::from_rgb(200, 40, 40)),
        );
        assert_ne!(plain.id(), tinted.id());
        assert_eq!(cache.entries.len(), 2);
    }

    #[test]
    fn destroy_clears_everything() {
        let ctx = Context::default();
        let mut cache = TextureCache::new();
        cache.texture_for(&ctx, 5.0, VisualState::Waypoint, None);
        cache.texture_for(&ctx, 5.0, VisualState::Path, None);
        assert!(cache.approx_bytes() > 0);

        cache.destroy();
        assert_eq!(cache.entries.len(), 0);
        assert_eq!(cache.approx_bytes(), 0);
    }

    #[test]
    fn glow_states_render_larger_sprites() {
        let ctx = Context::default();
        let mut cache = TextureCache::new();

        let plain = cache.texture_for(&ctx, 10.0, VisualState::Default, None);
        let glowing = cache.texture_for(&ctx, 10.0, VisualState::Playing, None);
        assert!(glowing.size()[0] > plain.size()[0]);
    }
}
