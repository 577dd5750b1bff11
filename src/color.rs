use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| hsl_to_color32((i as f32 / n as f32) * 360.0, 0.75, 0.45))
        .collect()
}

// ---------------------------------------------------------------------------
// Series styling
// ---------------------------------------------------------------------------

/// Colours for the two overlaid series of every plot.
#[derive(Debug, Clone, Copy)]
pub struct SeriesColors {
    /// All events / mu+ (drawn as points).
    pub primary: Color32,
    /// Same-sign / mu- (drawn as filled bars).
    pub secondary: Color32,
}

impl Default for SeriesColors {
    fn default() -> Self {
        Self {
            primary: Color32::BLACK,
            secondary: hsl_to_color32(195.0, 0.75, 0.55),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_distinct_entries() {
        let colors = generate_palette(6);
        assert_eq!(colors.len(), 6);
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }
}
