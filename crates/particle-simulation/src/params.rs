//! Uniform blocks consumed by the compute stage

use bytemuck::{Pod, Zeroable};
use particle_physics::{PointerState, SimulationParameters};

/// Matches `SimParams` in `update.wgsl`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SimParamsUniform {
    pub delta_t: f32,
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub pointer_radius: f32,
    pub velocity_multiplier: f32,
    pub _padding: [f32; 3],
}

impl From<&SimulationParameters> for SimParamsUniform {
    fn from(params: &SimulationParameters) -> Self {
        Self {
            delta_t: params.delta_t,
            canvas_width: params.canvas_width,
            canvas_height: params.canvas_height,
            pointer_radius: params.pointer_radius,
            velocity_multiplier: params.velocity_multiplier,
            _padding: [0.0; 3],
        }
    }
}

/// Matches `Pointer` in `update.wgsl`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PointerUniform {
    pub position: [f32; 2],
    /// 1.0 while the primary button is held, 0.0 otherwise
    pub button_down: f32,
    pub _padding: f32,
}

impl From<&PointerState> for PointerUniform {
    fn from(pointer: &PointerState) -> Self {
        Self {
            position: pointer.position.to_array(),
            button_down: if pointer.button_down { 1.0 } else { 0.0 },
            _padding: 0.0,
        }
    }
}

/// Both uniform blocks for one dispatch, written together so a dispatch
/// never sees parameters from one edit and pointer data from another.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformSnapshot {
    pub params: SimParamsUniform,
    pub pointer: PointerUniform,
}

impl UniformSnapshot {
    pub fn new(params: &SimulationParameters, pointer: &PointerState) -> Self {
        Self {
            params: params.into(),
            pointer: pointer.into(),
        }
    }
}
