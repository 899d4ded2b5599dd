//! Unified theme and color constants for the viewer.
//!
//! Colors for both canvases (causal graph and agent simulation) and the side
//! panels live here so that legends and rendered shapes always agree.

use crate::agents::Stance;
use egui::Color32;

/// Background colors for different layers
pub mod bg {
    use super::*;

    /// Causal graph canvas
    pub const GRAPH: Color32 = Color32::from_rgb(14, 17, 23);

    /// Agent simulation canvas
    pub const AGENTS: Color32 = Color32::from_rgb(3, 7, 18);

    /// Panel backgrounds - slightly lighter than the canvases
    pub const PANEL: Color32 = Color32::from_rgb(20, 22, 28);
}

/// Accent colors
pub mod accent {
    use super::*;

    pub const GREEN: Color32 = Color32::from_rgb(34, 197, 94);
    pub const RED: Color32 = Color32::from_rgb(239, 68, 68);
    pub const BLUE: Color32 = Color32::from_rgb(59, 130, 246);
    pub const GRAY: Color32 = Color32::from_rgb(107, 114, 128);
    pub const PURPLE: Color32 = Color32::from_rgb(168, 85, 247);
    pub const AMBER: Color32 = Color32::from_rgb(245, 158, 11);
}

/// Text colors at different emphasis levels
pub mod text {
    use super::*;

    /// Primary text - high contrast
    pub const PRIMARY: Color32 = Color32::from_rgb(240, 240, 245);

    /// Node labels on the graph canvas
    pub const LABEL: Color32 = Color32::from_rgb(156, 163, 175);

    /// Muted text - low contrast for less important info
    pub const MUTED: Color32 = Color32::from_rgb(120, 125, 135);
}

/// Edge colors by causal direction
pub mod edge {
    use super::*;

    pub const POSITIVE: Color32 = super::accent::GREEN;
    pub const NEGATIVE: Color32 = super::accent::RED;

    /// Stroke opacity applied to every edge line
    pub const OPACITY: f32 = 0.5;
}

/// Agent canvas colors
pub mod agent {
    use super::*;

    /// Faint social connection lines
    pub const CONNECTION: Color32 = Color32::from_rgb(107, 114, 128);

    /// Connection line opacity
    pub const CONNECTION_OPACITY: f32 = 0.08;

    /// Glow halo opacity (relative to the stance color)
    pub const GLOW_OPACITY: f32 = 0.19;

    /// Ring around the selected agent
    pub const SELECTED_RING: Color32 = Color32::WHITE;
}

/// Color used for an agent stance, shared by the canvas and the legend
pub fn stance_color(stance: Stance) -> Color32 {
    match stance {
        Stance::Government => accent::BLUE,
        Stance::Opposition => accent::RED,
        Stance::Neutral => accent::GRAY,
        Stance::Undecided => accent::PURPLE,
    }
}

/// Red → yellow → green stops of the confidence ramp
const DIVERGING_STOPS: [(f32, [u8; 3]); 5] = [
    (0.0, [165, 0, 38]),
    (0.25, [244, 109, 67]),
    (0.5, [255, 255, 191]),
    (0.75, [102, 189, 99]),
    (1.0, [0, 104, 55]),
];

/// Diverging low→high color ramp used for node confidence.
///
/// `t` is clamped into `[0, 1]`; NaN maps to the low end.
pub fn diverging_ramp(t: f32) -> Color32 {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

    for pair in DIVERGING_STOPS.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let local = (t - t0) / (t1 - t0);
            return Color32::from_rgb(
                lerp_u8(c0[0], c1[0], local),
                lerp_u8(c0[1], c1[1], local),
                lerp_u8(c0[2], c1[2], local),
            );
        }
    }

    let [r, g, b] = DIVERGING_STOPS[DIVERGING_STOPS.len() - 1].1;
    Color32::from_rgb(r, g, b)
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let result = a as f32 + (b as f32 - a as f32) * t;
    result.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_endpoints_match_stops() {
        assert_eq!(diverging_ramp(0.0), Color32::from_rgb(165, 0, 38));
        assert_eq!(diverging_ramp(1.0), Color32::from_rgb(0, 104, 55));
        assert_eq!(diverging_ramp(0.5), Color32::from_rgb(255, 255, 191));
    }

    #[test]
    fn ramp_clamps_out_of_range() {
        assert_eq!(diverging_ramp(-3.0), diverging_ramp(0.0));
        assert_eq!(diverging_ramp(7.0), diverging_ramp(1.0));
        assert_eq!(diverging_ramp(f32::NAN), diverging_ramp(0.0));
    }

    #[test]
    fn low_confidence_is_redder_than_high() {
        let low = diverging_ramp(0.1);
        let high = diverging_ramp(0.9);
        assert!(low.r() > high.r());
        assert!(low.g() < high.g());
    }

    #[test]
    fn stances_have_distinct_colors() {
        let colors: Vec<_> = Stance::ALL.iter().map(|s| stance_color(*s)).collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
