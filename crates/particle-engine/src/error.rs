use particle_physics::LayoutError;
use particle_simulation::SimulationError;
use thiserror::Error;

use crate::frame::FramePhase;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("failed to create {label}: {source}")]
    ResourceCreation {
        label: &'static str,
        source: wgpu::Error,
    },
    #[error("frame out of order: expected {expected:?} phase, found {found:?}")]
    FrameOrder {
        expected: FramePhase,
        found: FramePhase,
    },
}
