//! Catppuccin Mocha colours converted for an sRGB surface

use catppuccin::PALETTE;

/// sRGB transfer function inverse, per channel
pub fn srgb_to_linear(channel: f32) -> f32 {
    if channel <= 0.04045 {
        channel / 12.92
    } else {
        ((channel + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_rgb(color: &catppuccin::Color) -> [f32; 3] {
    let rgb = color.rgb;
    [rgb.r, rgb.g, rgb.b].map(|c| srgb_to_linear(f32::from(c) / 255.0))
}

/// Background for both render paths (Mocha base)
pub fn clear_color() -> wgpu::Color {
    let [r, g, b] = linear_rgb(&PALETTE.mocha.colors.base);
    wgpu::Color {
        r: f64::from(r),
        g: f64::from(g),
        b: f64::from(b),
        a: 1.0,
    }
}

/// Colour for particles at rest
pub fn slow_color() -> [f32; 4] {
    let [r, g, b] = linear_rgb(&PALETTE.mocha.colors.blue);
    [r, g, b, 0.85]
}

/// Colour for particles at or above the reference speed
pub fn fast_color() -> [f32; 4] {
    let [r, g, b] = linear_rgb(&PALETTE.mocha.colors.peach);
    [r, g, b, 1.0]
}

/// Accent colours handed out to particle types in the batched path
pub fn accents() -> [[f32; 3]; 8] {
    let colors = &PALETTE.mocha.colors;
    [
        &colors.rosewater,
        &colors.mauve,
        &colors.red,
        &colors.peach,
        &colors.yellow,
        &colors.green,
        &colors.sky,
        &colors.lavender,
    ]
    .map(linear_rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_to_linear_endpoints() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!(srgb_to_linear(0.5) < 0.5);
    }

    #[test]
    fn test_clear_color_is_mocha_base() {
        // #1e1e2e
        let color = clear_color();
        assert!((color.r - 0.01298).abs() < 1e-3);
        assert!((color.g - color.r).abs() < 1e-9);
        assert!((color.b - 0.02732).abs() < 1e-3);
        assert_eq!(color.a, 1.0);
    }

    #[test]
    fn test_accents_are_distinct() {
        let accents = accents();
        for (i, a) in accents.iter().enumerate() {
            for b in &accents[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
