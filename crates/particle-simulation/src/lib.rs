//! # Particle Simulation
//!
//! GPU compute stage: double-buffered particle storage, the uniform blocks
//! the update shader reads, and the dispatch that advances one frame.

pub mod double_buffer;
pub mod error;
pub mod params;
pub mod simulation;
pub mod storage;

pub use double_buffer::*;
pub use error::*;
pub use params::*;
pub use simulation::*;
pub use storage::*;
