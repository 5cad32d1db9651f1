//! Tunable simulation parameters and pointer state

use glam::Vec2;

use crate::constants::*;

/// Uniform simulation constants, read once per compute dispatch
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationParameters {
    pub delta_t: f32,
    pub pointer_radius: f32,
    pub velocity_multiplier: f32,
    pub canvas_width: f32,
    pub canvas_height: f32,
}

impl SimulationParameters {
    pub fn new(canvas_width: f32, canvas_height: f32) -> Self {
        Self {
            canvas_width,
            canvas_height,
            ..Default::default()
        }
    }

    pub fn with_canvas(self, canvas_width: f32, canvas_height: f32) -> Self {
        Self {
            canvas_width,
            canvas_height,
            ..self
        }
    }

    /// Clamp every field into its editable range. NaN falls back to the default.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            delta_t: clamp_or(self.delta_t, DELTA_T_RANGE, defaults.delta_t),
            pointer_radius: clamp_or(
                self.pointer_radius,
                POINTER_RADIUS_RANGE,
                defaults.pointer_radius,
            ),
            velocity_multiplier: clamp_or(
                self.velocity_multiplier,
                VELOCITY_MULTIPLIER_RANGE,
                defaults.velocity_multiplier,
            ),
            canvas_width: clamp_or(self.canvas_width, 1.0..=f32::MAX, defaults.canvas_width),
            canvas_height: clamp_or(self.canvas_height, 1.0..=f32::MAX, defaults.canvas_height),
        }
    }

    pub fn is_sanitized(&self) -> bool {
        *self == self.sanitized()
    }

    pub fn canvas(&self) -> Vec2 {
        Vec2::new(self.canvas_width, self.canvas_height)
    }
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            delta_t: DELTA_T,
            pointer_radius: POINTER_RADIUS,
            velocity_multiplier: VELOCITY_MULTIPLIER,
            canvas_width: 800.0,
            canvas_height: 600.0,
        }
    }
}

fn clamp_or(value: f32, range: std::ops::RangeInclusive<f32>, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(*range.start(), *range.end())
    }
}

/// Latest pointer sample
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerState {
    pub position: Vec2,
    /// Primary button held: attract instead of repel
    pub button_down: bool,
}

impl PointerState {
    pub fn new(position: Vec2, button_down: bool) -> Self {
        Self {
            position,
            button_down,
        }
    }

    /// Pointer parked far outside a `width` x `height` canvas.
    ///
    /// Used before the first pointer event so no particle feels a force.
    pub fn outside(width: f32, height: f32) -> Self {
        Self {
            position: Vec2::new(
                width + POINTER_SENTINEL_OFFSET,
                height + POINTER_SENTINEL_OFFSET,
            ),
            button_down: false,
        }
    }
}
