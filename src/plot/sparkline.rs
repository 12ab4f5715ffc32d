//! One-line Unicode sparkline.
//!
//! Deterministic output (fixed glyph ramp, min/max scaling) so cards can be
//! compared in golden tests.

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render one glyph per value, scaled between the series min and max.
///
/// Non-finite values render as a blank; a flat series renders at mid height.
pub fn sparkline(values: &[f64]) -> String {
    let Some((min, max)) = value_range(values) else {
        return " ".repeat(values.len());
    };
    let span = max - min;

    values
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                ' '
            } else if span <= f64::EPSILON * max.abs().max(1.0) {
                BARS[BARS.len() / 2]
            } else {
                let u = ((v - min) / span).clamp(0.0, 1.0);
                BARS[(u * (BARS.len() as f64 - 1.0)).round() as usize]
            }
        })
        .collect()
}

fn value_range(values: &[f64]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values.iter().filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    (min.is_finite() && max.is_finite()).then_some((min, max))
}
