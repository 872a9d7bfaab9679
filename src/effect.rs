//! Per-frame orchestration
//!
//! The host owns the clock and the surface; [`CursorEffect`] owns everything
//! the simulation needs between frames. A frame applies input, steps the
//! fluid and composites, in that order.

use crate::config::SimulationConfig;
use crate::fluid::{clamp_timestep, get_resolution, CompositeOptions, FieldSize, FluidBackend, SimulationStepper};
use crate::input::{CanvasMetrics, PointerEvent, PointerInputTracker};

/// Simulation and dye field sizes for a canvas
pub fn field_sizes(config: &SimulationConfig, canvas: CanvasMetrics) -> (FieldSize, FieldSize) {
    (
        get_resolution(config.sim_resolution, canvas.width, canvas.height),
        get_resolution(config.dye_resolution, canvas.width, canvas.height),
    )
}

pub struct CursorEffect<B: FluidBackend> {
    backend: B,
    stepper: SimulationStepper,
    tracker: PointerInputTracker,
    last_frame_ms: Option<f64>,
}

impl<B: FluidBackend> CursorEffect<B> {
    pub fn new(backend: B, config: SimulationConfig, canvas: CanvasMetrics) -> Self {
        Self::with_tracker(backend, config, PointerInputTracker::new(canvas))
    }

    /// Build around an existing tracker, e.g. a seeded one
    pub fn with_tracker(mut backend: B, config: SimulationConfig, tracker: PointerInputTracker) -> Self {
        let (sim, dye) = field_sizes(&config, tracker.canvas());
        backend.resize(sim, dye);
        log::info!(
            "[CursorEffect::new] canvas {}x{} @{}x, sim {}x{}, dye {}x{}",
            tracker.canvas().width,
            tracker.canvas().height,
            tracker.canvas().pixel_ratio,
            sim.width,
            sim.height,
            dye.width,
            dye.height
        );
        Self {
            backend,
            stepper: SimulationStepper::new(config),
            tracker,
            last_frame_ms: None,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        self.stepper.config()
    }

    pub fn canvas(&self) -> CanvasMetrics {
        self.tracker.canvas()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn tracker(&self) -> &PointerInputTracker {
        &self.tracker
    }

    /// Follow a canvas size change. Fields are only reallocated when the
    /// drawing buffer size actually changed; returns whether it did.
    pub fn resize(&mut self, canvas: CanvasMetrics) -> bool {
        let current = self.tracker.canvas();
        if (canvas.width, canvas.height) == (current.width, current.height) {
            if canvas.pixel_ratio != current.pixel_ratio {
                self.tracker.set_canvas(canvas);
            }
            return false;
        }

        self.tracker.set_canvas(canvas);
        let (sim, dye) = field_sizes(self.stepper.config(), canvas);
        self.backend.resize(sim, dye);
        log::info!(
            "[CursorEffect::resize] canvas {}x{}, sim {}x{}, dye {}x{}",
            canvas.width,
            canvas.height,
            sim.width,
            sim.height,
            dye.width,
            dye.height
        );
        true
    }

    pub fn handle_event(&mut self, event: &PointerEvent) {
        self.tracker.handle(event);
    }

    /// Run one frame at host time `now_ms`. Returns the timestep used.
    pub fn frame(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_frame_ms {
            Some(previous) => clamp_timestep(((now_ms - previous) / 1000.0) as f32),
            None => 0.0,
        };
        self.last_frame_ms = Some(now_ms);

        self.stepper.update_colors(dt, &mut self.tracker);
        let splats = self.stepper.apply_inputs(&mut self.backend, &mut self.tracker);
        self.stepper.step(&mut self.backend, dt);

        let config = self.stepper.config();
        self.backend.composite(&CompositeOptions {
            shading: config.shading,
            transparent: config.transparent,
            back_color: config.back_color,
        });

        log::trace!("[CursorEffect::frame] dt {:.4}s, {} splats", dt, splats);
        dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_TIMESTEP;
    use crate::fluid::{FluidPass, Splat, SplatShape};
    use crate::input::{PointerButton, PointerId};

    #[derive(Default)]
    struct Recorder {
        passes: Vec<FluidPass>,
        sizes: Vec<(FieldSize, FieldSize)>,
        composites: Vec<CompositeOptions>,
    }

    impl FluidBackend for Recorder {
        fn resize(&mut self, sim: FieldSize, dye: FieldSize) {
            self.sizes.push((sim, dye));
        }
        fn splat(&mut self, _splat: &Splat, _shape: SplatShape) {
            self.passes.push(FluidPass::Splat);
        }
        fn curl(&mut self) {
            self.passes.push(FluidPass::Curl);
        }
        fn vorticity(&mut self, _strength: f32, _dt: f32) {
            self.passes.push(FluidPass::Vorticity);
        }
        fn divergence(&mut self) {
            self.passes.push(FluidPass::Divergence);
        }
        fn seed_pressure(&mut self, _value: f32) {
            self.passes.push(FluidPass::SeedPressure);
        }
        fn relax_pressure(&mut self) {
            self.passes.push(FluidPass::RelaxPressure);
        }
        fn subtract_gradient(&mut self) {
            self.passes.push(FluidPass::SubtractGradient);
        }
        fn advect_velocity(&mut self, _dt: f32, _dissipation: f32) {
            self.passes.push(FluidPass::AdvectVelocity);
        }
        fn advect_dye(&mut self, _dt: f32, _dissipation: f32) {
            self.passes.push(FluidPass::AdvectDye);
        }
        fn composite(&mut self, options: &CompositeOptions) {
            self.passes.push(FluidPass::Composite);
            self.composites.push(*options);
        }
    }

    fn effect() -> CursorEffect<Recorder> {
        let tracker = PointerInputTracker::with_seed(CanvasMetrics::new(1920, 1080, 1.0), 3);
        CursorEffect::with_tracker(Recorder::default(), SimulationConfig::default(), tracker)
    }

    #[test]
    fn test_fields_are_sized_on_creation() {
        let effect = effect();
        assert_eq!(
            effect.backend().sizes,
            vec![(FieldSize::new(228, 128), FieldSize::new(2560, 1440))]
        );
    }

    #[test]
    fn test_resize_only_reallocates_on_change() {
        let mut effect = effect();
        assert!(!effect.resize(CanvasMetrics::new(1920, 1080, 1.0)));
        assert!(!effect.resize(CanvasMetrics::new(1920, 1080, 2.0)));
        assert_eq!(effect.canvas().pixel_ratio, 2.0);
        assert_eq!(effect.backend().sizes.len(), 1);

        assert!(effect.resize(CanvasMetrics::new(1080, 1920, 1.0)));
        assert_eq!(effect.backend().sizes[1].0, FieldSize::new(128, 228));
    }

    #[test]
    fn test_first_frame_has_zero_timestep() {
        let mut effect = effect();
        assert_eq!(effect.frame(5000.0), 0.0);
        assert!((effect.frame(5008.0) - 0.008).abs() < 1e-6);
        // a stalled tab does not produce a huge step
        assert_eq!(effect.frame(9000.0), MAX_TIMESTEP);
    }

    #[test]
    fn test_frame_composites_last() {
        let mut effect = effect();
        effect.handle_event(&PointerEvent::Down {
            id: PointerId::Primary,
            x: 960.0,
            y: 540.0,
            button: PointerButton::Primary,
        });
        effect.frame(0.0);

        let passes = &effect.backend().passes;
        assert_eq!(passes.first(), Some(&FluidPass::Splat));
        assert_eq!(passes.last(), Some(&FluidPass::Composite));
        assert_eq!(passes.iter().filter(|pass| **pass == FluidPass::Splat).count(), 1);

        let options = effect.backend().composites[0];
        assert!(options.shading && options.transparent);
    }
}
