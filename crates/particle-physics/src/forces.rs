//! Pointer force and integration step
//!
//! NOTE: These are reference implementations for documentation and testing.
//! The running simulation uses the `update.wgsl` compute shader, which must
//! follow the same formulas line for line.

use glam::Vec2;

use crate::constants::MIN_POINTER_DISTANCE;
use crate::params::{PointerState, SimulationParameters};
use crate::particle::{Particle, ParticleSet};

/// Acceleration the pointer field applies at `position`.
///
/// Inside the pointer radius R the magnitude is `m * R / max(r, MIN_POINTER_DISTANCE)`
/// (m = velocity multiplier), pointing at the pointer while the button is down
/// and away from it otherwise. Zero outside the radius and at r == 0.
pub fn pointer_acceleration(
    position: Vec2,
    params: &SimulationParameters,
    pointer: &PointerState,
) -> Vec2 {
    let to_pointer = pointer.position - position;
    let distance = to_pointer.length();

    if distance <= 0.0 || distance >= params.pointer_radius {
        return Vec2::ZERO;
    }

    let direction = to_pointer / distance;
    let sign = if pointer.button_down { 1.0 } else { -1.0 };
    let falloff = params.pointer_radius / distance.max(MIN_POINTER_DISTANCE);

    direction * (sign * params.velocity_multiplier * falloff)
}

/// Map a coordinate into `[0, extent)`. Values already inside are returned unchanged.
pub fn wrap_coordinate(value: f32, extent: f32) -> f32 {
    if extent <= 0.0 {
        return value;
    }
    let wrapped = value - (value / extent).floor() * extent;
    if wrapped >= extent {
        0.0
    } else {
        wrapped
    }
}

/// Semi-implicit Euler step for one particle, followed by toroidal wrap
pub fn integrate(
    particle: &Particle,
    params: &SimulationParameters,
    pointer: &PointerState,
) -> Particle {
    let acceleration = pointer_acceleration(particle.position(), params, pointer);
    let velocity = particle.velocity() + acceleration * params.delta_t;
    let moved = particle.position() + velocity * params.delta_t;
    let position = Vec2::new(
        wrap_coordinate(moved.x, params.canvas_width),
        wrap_coordinate(moved.y, params.canvas_height),
    );

    Particle {
        position: position.to_array(),
        velocity: velocity.to_array(),
        ..*particle
    }
}

/// Advance a whole set by one step (CPU mirror of one compute dispatch)
pub fn step(set: &ParticleSet, params: &SimulationParameters, pointer: &PointerState) -> ParticleSet {
    let mut next = set.clone();
    for (out, p) in next.particles_mut().iter_mut().zip(set.particles()) {
        *out = integrate(p, params, pointer);
    }
    next
}
