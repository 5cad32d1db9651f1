//! Simulation constants
//!
//! Defaults and editable ranges for the tunable parameters, in canvas pixels
//! and simulation seconds.

use std::ops::RangeInclusive;

/// Default integration time step
pub const DELTA_T: f32 = 0.1;

/// Default radius of the pointer interaction field
pub const POINTER_RADIUS: f32 = 150.0;

/// Default scale of the pointer acceleration
pub const VELOCITY_MULTIPLIER: f32 = 6.0;

/// Editable range for the time step
pub const DELTA_T_RANGE: RangeInclusive<f32> = 0.01..=1.0;

/// Editable range for the pointer radius
pub const POINTER_RADIUS_RANGE: RangeInclusive<f32> = 1.0..=1000.0;

/// Editable range for the velocity multiplier
pub const VELOCITY_MULTIPLIER_RANGE: RangeInclusive<f32> = 0.5..=20.0;

/// Distance below which the pointer falloff stops growing (prevents r → 0 blow-up)
pub const MIN_POINTER_DISTANCE: f32 = 1.0;

/// How far outside the canvas (on both axes) the idle pointer is parked.
/// Must stay >= the upper end of `POINTER_RADIUS_RANGE`.
pub const POINTER_SENTINEL_OFFSET: f32 = 1000.0;

/// Particle count used when nothing else is requested
pub const DEFAULT_PARTICLE_COUNT: usize = 10_000;

/// Radius given to scattered particles
pub const PARTICLE_RADIUS: f32 = 1.0;

/// Mass given to scattered particles
pub const PARTICLE_MASS: f32 = 1.0;
