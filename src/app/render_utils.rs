use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + pan;

    let mut x = origin.x.rem_euclid(step);
    while x < rect.right() {
        painter.line_segment(
            [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70)),
        );
        x += step;
    }

    let mut y = origin.y.rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment(
            [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70)),
        );
        y += step;
    }
}

fn normalize_log(value: f32, min: f32, max: f32) -> f32 {
    let min = (min as f64).max(1.0);
    let max = (max as f64).max(min);
    let value = (value as f64).max(1.0);

    let denominator = max.ln() - min.ln();
    if denominator.abs() < f64::EPSILON {
        return 0.5;
    }

    ((value.ln() - min.ln()) / denominator).clamp(0.0, 1.0) as f32
}

/// World-space node radius from its weight; `base_size` is the configured
/// world diameter before LOD/zoom scaling.
pub(super) fn node_radius(weight: f32, min: f32, max: f32, base_size: f32) -> f32 {
    let t = normalize_log(weight, min, max);
    (base_size * 0.4) + (t * base_size * 1.6)
}

const WEIGHT_COLOR_STEPS: usize = 8;

/// Weight-derived fill color, quantized to a small palette so the texture
/// cache stays bounded no matter how many distinct weights a graph carries.
pub(super) fn weight_color(weight: f32, min: f32, max: f32) -> Color32 {
    let t = normalize_log(weight, min, max);
    let step = ((t * (WEIGHT_COLOR_STEPS - 1) as f32).round()) / (WEIGHT_COLOR_STEPS - 1) as f32;
    let r = (55.0 + (190.0 * step)) as u8;
    let g = (150.0 - (70.0 * step)) as u8;
    let b = (215.0 - (155.0 * step)) as u8;
    Color32::from_rgb(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_color_is_quantized() {
        let mut distinct = std::collections::HashSet::new();
        for step in 0..1000 {
            let weight = 1.0 + step as f32;
            distinct.insert(weight_color(weight, 1.0, 1000.0));
        }
        assert!(distinct.len() <= WEIGHT_COLOR_STEPS);
        assert!(distinct.len() > 1);
    }

    #[test]
    fn node_radius_grows_with_weight() {
        let small = node_radius(1.0, 1.0, 100.0, 16.0);
        let large = node_radius(100.0, 1.0, 100.0, 16.0);
        assert!(large > small);
        assert!((small - 6.4).abs() < 0.1);
        assert!((large - 32.0).abs() < 0.1);
    }
}
