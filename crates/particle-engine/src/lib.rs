//! # Particle Engine
//!
//! Frame driver and host-facing facade over the simulation and renderer
//! crates, plus the CPU-driven scene for the batched render path.

pub mod batched;
pub mod engine;
pub mod error;
pub mod frame;

pub use batched::*;
pub use engine::*;
pub use error::*;
pub use frame::*;
