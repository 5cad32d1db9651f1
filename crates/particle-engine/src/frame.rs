//! Per-frame ordering: pending edits -> compute -> render -> parity advance

use particle_physics::{PointerState, SimulationParameters};
use particle_simulation::{Parity, UniformSnapshot};

use crate::error::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramePhase {
    Compute,
    Render,
}

/// External edit, applied at the start of the next frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameUpdate {
    Pointer(PointerState),
    /// Drop the last pointer sample and park the pointer outside the canvas
    ClearPointer,
    /// Only Δt, pointer radius and velocity multiplier are taken; the canvas
    /// extents follow `Resize`.
    Parameters(SimulationParameters),
    Resize { width: u32, height: u32 },
}

/// What the compute stage needs for one dispatch
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComputeTicket {
    pub frame: u64,
    pub parity: Parity,
    /// Set only when the snapshot differs from the last uploaded one
    pub uniforms: Option<UniformSnapshot>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum PointerSample {
    At(PointerState),
    Cleared,
}

#[derive(Clone, Copy, Debug, Default)]
struct PendingUpdates {
    pointer: Option<PointerSample>,
    parameters: Option<SimulationParameters>,
    canvas: Option<(u32, u32)>,
}

impl PendingUpdates {
    fn merge(&mut self, update: FrameUpdate) {
        match update {
            FrameUpdate::Pointer(pointer) => self.pointer = Some(PointerSample::At(pointer)),
            FrameUpdate::ClearPointer => self.pointer = Some(PointerSample::Cleared),
            FrameUpdate::Parameters(parameters) => self.parameters = Some(parameters),
            FrameUpdate::Resize { width, height } => self.canvas = Some((width, height)),
        }
    }

    fn is_empty(&self) -> bool {
        self.pointer.is_none() && self.parameters.is_none() && self.canvas.is_none()
    }
}

#[derive(Debug)]
pub struct FrameDriver {
    phase: FramePhase,
    frame: u64,
    parameters: SimulationParameters,
    pointer: PointerState,
    // False until a real sample arrives, and again after `ClearPointer`
    pointer_sampled: bool,
    uploaded: UniformSnapshot,
    pending: PendingUpdates,
}

impl FrameDriver {
    /// Starts with the pointer parked outside the canvas
    pub fn new(parameters: SimulationParameters) -> Self {
        let parameters = parameters.sanitized();
        let pointer = PointerState::outside(parameters.canvas_width, parameters.canvas_height);
        Self {
            phase: FramePhase::Compute,
            frame: 0,
            uploaded: UniformSnapshot::new(&parameters, &pointer),
            parameters,
            pointer,
            pointer_sampled: false,
            pending: PendingUpdates::default(),
        }
    }

    /// Queue an edit; later edits of the same kind replace earlier ones
    pub fn submit(&mut self, update: FrameUpdate) {
        self.pending.merge(update);
    }

    /// Apply pending edits as one snapshot and enter the render phase
    pub fn begin_compute(&mut self) -> Result<ComputeTicket, EngineError> {
        self.expect_phase(FramePhase::Compute)?;

        if !self.pending.is_empty() {
            self.apply_pending();
        }

        let snapshot = self.snapshot();
        let uniforms = (snapshot != self.uploaded).then(|| {
            self.uploaded = snapshot;
            snapshot
        });

        self.phase = FramePhase::Render;
        Ok(ComputeTicket {
            frame: self.frame,
            parity: self.parity(),
            uniforms,
        })
    }

    /// Parity of the frame being drawn; its next region holds the fresh state
    pub fn begin_render(&self) -> Result<Parity, EngineError> {
        self.expect_phase(FramePhase::Render)?;
        Ok(self.parity())
    }

    pub fn finish_frame(&mut self) -> Result<Parity, EngineError> {
        self.expect_phase(FramePhase::Render)?;
        self.frame += 1;
        self.phase = FramePhase::Compute;
        Ok(self.parity())
    }

    fn apply_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);

        if let Some(edit) = pending.parameters {
            self.parameters = self.merge_edit(edit);
        }
        if let Some((width, height)) = pending.canvas {
            self.parameters = self
                .parameters
                .with_canvas(width as f32, height as f32)
                .sanitized();
        }
        match pending.pointer {
            Some(PointerSample::At(pointer)) => {
                self.pointer = pointer;
                self.pointer_sampled = true;
            }
            Some(PointerSample::Cleared) => self.pointer_sampled = false,
            None => {}
        }
        // The parking spot follows the canvas it has to stay clear of.
        if !self.pointer_sampled {
            self.pointer =
                PointerState::outside(self.parameters.canvas_width, self.parameters.canvas_height);
        }
    }

    fn merge_edit(&self, edit: SimulationParameters) -> SimulationParameters {
        SimulationParameters {
            canvas_width: self.parameters.canvas_width,
            canvas_height: self.parameters.canvas_height,
            ..edit
        }
        .sanitized()
    }

    fn expect_phase(&self, expected: FramePhase) -> Result<(), EngineError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(EngineError::FrameOrder {
                expected,
                found: self.phase,
            })
        }
    }

    pub fn snapshot(&self) -> UniformSnapshot {
        UniformSnapshot::new(&self.parameters, &self.pointer)
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn parity(&self) -> Parity {
        Parity::from_frame(self.frame)
    }

    /// Frames completed so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn parameters(&self) -> &SimulationParameters {
        &self.parameters
    }

    /// Parameters as they will be once pending edits apply; base further
    /// edits on this so several edits within one frame accumulate
    pub fn latest_parameters(&self) -> SimulationParameters {
        match self.pending.parameters {
            Some(edit) => self.merge_edit(edit),
            None => self.parameters,
        }
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use particle_physics::pointer_acceleration;

    fn driver() -> FrameDriver {
        FrameDriver::new(SimulationParameters::new(800.0, 600.0))
    }

    fn run_frame(driver: &mut FrameDriver) -> ComputeTicket {
        let ticket = driver.begin_compute().unwrap();
        assert_eq!(driver.begin_render().unwrap(), ticket.parity);
        driver.finish_frame().unwrap();
        ticket
    }

    #[test]
    fn test_parity_alternates_with_frames() {
        let mut driver = driver();
        for k in 0..10u64 {
            assert_eq!(driver.parity().value() as u64, k % 2);
            let ticket = run_frame(&mut driver);
            assert_eq!(ticket.frame, k);
        }
        assert_eq!(driver.frame(), 10);
    }

    #[test]
    fn test_render_before_compute_is_rejected() {
        let mut driver = driver();
        assert!(matches!(
            driver.begin_render(),
            Err(EngineError::FrameOrder {
                expected: FramePhase::Render,
                found: FramePhase::Compute
            })
        ));
        assert!(driver.finish_frame().is_err());
    }

    #[test]
    fn test_compute_twice_is_rejected() {
        let mut driver = driver();
        driver.begin_compute().unwrap();
        assert!(matches!(
            driver.begin_compute(),
            Err(EngineError::FrameOrder {
                expected: FramePhase::Compute,
                found: FramePhase::Render
            })
        ));
        // The failed call leaves the frame intact.
        driver.begin_render().unwrap();
        driver.finish_frame().unwrap();
        assert_eq!(driver.phase(), FramePhase::Compute);
    }

    #[test]
    fn test_unchanged_snapshot_uploads_nothing() {
        let mut driver = driver();
        assert_eq!(run_frame(&mut driver).uniforms, None);

        let pointer = PointerState::new(Vec2::new(10.0, 20.0), true);
        driver.submit(FrameUpdate::Pointer(pointer));
        let ticket = run_frame(&mut driver);
        let uniforms = ticket.uniforms.expect("pointer change uploads");
        assert_eq!(uniforms.pointer.position, [10.0, 20.0]);
        assert_eq!(uniforms.pointer.button_down, 1.0);

        driver.submit(FrameUpdate::Pointer(pointer));
        assert_eq!(run_frame(&mut driver).uniforms, None);
    }

    #[test]
    fn test_repeated_parameter_edit_is_idempotent() {
        let mut once = driver();
        let mut twice = driver();
        let edit = SimulationParameters {
            delta_t: 0.5,
            pointer_radius: 90.0,
            velocity_multiplier: 2.0,
            ..SimulationParameters::default()
        };

        once.submit(FrameUpdate::Parameters(edit));
        twice.submit(FrameUpdate::Parameters(edit));
        twice.submit(FrameUpdate::Parameters(edit));

        let a = run_frame(&mut once);
        let b = run_frame(&mut twice);
        assert_eq!(a.uniforms, b.uniforms);

        twice.submit(FrameUpdate::Parameters(edit));
        assert_eq!(run_frame(&mut twice).uniforms, None);
        assert_eq!(once.parameters(), twice.parameters());
    }

    #[test]
    fn test_latest_edit_wins_within_a_frame() {
        let mut driver = driver();
        driver.submit(FrameUpdate::Pointer(PointerState::new(Vec2::ONE, false)));
        driver.submit(FrameUpdate::Pointer(PointerState::new(Vec2::new(3.0, 4.0), true)));

        let uniforms = run_frame(&mut driver).uniforms.unwrap();
        assert_eq!(uniforms.pointer.position, [3.0, 4.0]);
    }

    #[test]
    fn test_resize_owns_canvas_extents() {
        let mut driver = driver();
        driver.submit(FrameUpdate::Resize {
            width: 1024,
            height: 768,
        });
        // Parameter edits carry a stale canvas; it must not win.
        driver.submit(FrameUpdate::Parameters(SimulationParameters::new(10.0, 10.0)));

        let uniforms = run_frame(&mut driver).uniforms.unwrap();
        assert_eq!(uniforms.params.canvas_width, 1024.0);
        assert_eq!(uniforms.params.canvas_height, 768.0);
        assert_eq!(driver.parameters().canvas().x, 1024.0);
    }

    #[test]
    fn test_idle_pointer_follows_canvas_growth() {
        let mut driver = driver();
        driver.submit(FrameUpdate::Resize {
            width: 2560,
            height: 1440,
        });
        driver.submit(FrameUpdate::Parameters(SimulationParameters {
            pointer_radius: 1000.0,
            ..SimulationParameters::default()
        }));
        run_frame(&mut driver);

        let canvas = driver.parameters().canvas();
        assert_eq!(canvas, Vec2::new(2560.0, 1440.0));
        assert!(driver.pointer().position.cmpgt(canvas).all());
        assert_eq!(
            pointer_acceleration(Vec2::new(1700.0, 1400.0), driver.parameters(), driver.pointer()),
            Vec2::ZERO
        );
    }

    #[test]
    fn test_cleared_pointer_uses_pending_canvas() {
        let mut driver = driver();
        driver.submit(FrameUpdate::Pointer(PointerState::new(Vec2::new(400.0, 300.0), true)));
        run_frame(&mut driver);

        driver.submit(FrameUpdate::ClearPointer);
        driver.submit(FrameUpdate::Resize {
            width: 2560,
            height: 1440,
        });
        driver.submit(FrameUpdate::Parameters(SimulationParameters {
            pointer_radius: 1000.0,
            ..SimulationParameters::default()
        }));
        run_frame(&mut driver);

        assert_eq!(*driver.pointer(), PointerState::outside(2560.0, 1440.0));
        assert_eq!(
            pointer_acceleration(Vec2::new(1700.0, 1400.0), driver.parameters(), driver.pointer()),
            Vec2::ZERO
        );

        // A fresh sample after the clear is taken as-is.
        let sample = PointerState::new(Vec2::new(5.0, 5.0), false);
        driver.submit(FrameUpdate::Pointer(sample));
        driver.submit(FrameUpdate::Resize {
            width: 3000,
            height: 2000,
        });
        run_frame(&mut driver);
        assert_eq!(*driver.pointer(), sample);
    }

    #[test]
    fn test_edits_within_a_frame_accumulate() {
        let mut driver = driver();
        let base = driver.parameters().delta_t;

        for _ in 0..2 {
            let latest = driver.latest_parameters();
            driver.submit(FrameUpdate::Parameters(SimulationParameters {
                delta_t: latest.delta_t + 0.05,
                ..latest
            }));
        }
        assert_eq!(driver.parameters().delta_t, base);

        run_frame(&mut driver);
        assert!((driver.parameters().delta_t - (base + 0.1)).abs() < 1e-6);
        assert_eq!(driver.latest_parameters(), *driver.parameters());
    }

    #[test]
    fn test_out_of_range_edit_is_clamped() {
        let mut driver = driver();
        driver.submit(FrameUpdate::Parameters(SimulationParameters {
            delta_t: 50.0,
            ..SimulationParameters::default()
        }));
        run_frame(&mut driver);
        assert!(driver.parameters().is_sanitized());
        assert_eq!(driver.parameters().delta_t, 1.0);
    }
}
