//! # Particle Physics
//!
//! Particle state store for the pointer-driven particle field: the packed
//! particle record shared with the GPU stages, simulation parameters, pointer
//! state, and a CPU reference of the per-particle integrator.

pub mod constants;
pub mod error;
pub mod forces;
pub mod params;
pub mod particle;

pub use constants::*;
pub use error::*;
pub use forces::*;
pub use params::*;
pub use particle::*;
