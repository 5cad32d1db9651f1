//! # Particle Renderer
//!
//! Render stage for the simulated particle field, plus the batched
//! type-partitioned path used when particles are positioned on the CPU.

pub mod batch;
pub mod batch_renderer;
pub mod camera;
pub mod palette;
pub mod pipeline_cache;
pub mod pool;
pub mod renderer;

pub use batch::*;
pub use batch_renderer::*;
pub use camera::*;
pub use pipeline_cache::*;
pub use pool::*;
pub use renderer::*;
