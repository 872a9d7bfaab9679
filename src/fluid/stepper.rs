//! Per-frame simulation pipeline
//!
//! The pass order is part of the numerical method: curl, vorticity,
//! divergence, pressure seed, Jacobi iterations, gradient subtraction, then
//! advection of velocity and dye. Nothing here reorders or skips a pass.

use crate::config::{SimulationConfig, MAX_TIMESTEP};
use crate::fluid::{correct_radius, FluidBackend, Splat, SplatShape};
use crate::input::PointerInputTracker;

/// Clamp a measured frame interval (seconds) to a stable simulation step
pub fn clamp_timestep(elapsed: f32) -> f32 {
    if elapsed.is_finite() {
        elapsed.clamp(0.0, MAX_TIMESTEP)
    } else {
        0.0
    }
}

/// Identifies a pass, mostly for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FluidPass {
    Splat,
    Curl,
    Vorticity,
    Divergence,
    SeedPressure,
    RelaxPressure,
    SubtractGradient,
    AdvectVelocity,
    AdvectDye,
    Composite,
}

pub struct SimulationStepper {
    config: SimulationConfig,
    color_timer: f32,
}

impl SimulationStepper {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            color_timer: 0.0,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Advance the color cycle; on wrap every pointer gets a new color.
    /// Returns true when colors changed.
    pub fn update_colors(&mut self, dt: f32, tracker: &mut PointerInputTracker) -> bool {
        self.color_timer += dt * self.config.color_update_speed;
        if self.color_timer >= 1.0 {
            self.color_timer = wrap(self.color_timer, 0.0, 1.0);
            tracker.recolor_all();
            return true;
        }
        false
    }

    /// Inject splats for moved pointers and queued click bursts.
    /// Each pointer's moved flag is consumed here. Returns the number of splats.
    pub fn apply_inputs<B: FluidBackend>(
        &self,
        backend: &mut B,
        tracker: &mut PointerInputTracker,
    ) -> usize {
        let aspect_ratio = tracker.canvas().aspect_ratio();
        let shape = SplatShape {
            aspect_ratio,
            radius: correct_radius(self.config.splat_radius / 100.0, aspect_ratio),
        };

        let mut splats = Vec::new();
        for pointer in tracker.pointers_mut() {
            if pointer.moved {
                pointer.moved = false;
                splats.push(Splat {
                    point: pointer.texcoord,
                    force: pointer.delta * self.config.splat_force,
                    color: pointer.color,
                });
            }
        }
        splats.extend(tracker.drain_clicks().map(|burst| Splat {
            point: burst.point,
            force: burst.force,
            color: burst.color,
        }));

        for splat in &splats {
            backend.splat(splat, shape);
        }
        splats.len()
    }

    /// Advance the fluid by one clamped timestep
    pub fn step<B: FluidBackend>(&self, backend: &mut B, dt: f32) {
        let dt = clamp_timestep(dt);

        backend.curl();
        backend.vorticity(self.config.curl, dt);
        backend.divergence();

        // Reseeded every frame, no warm start from the previous solution
        backend.seed_pressure(self.config.pressure);
        for _ in 0..self.config.pressure_iterations {
            backend.relax_pressure();
        }

        backend.subtract_gradient();
        backend.advect_velocity(dt, self.config.velocity_dissipation);
        backend.advect_dye(dt, self.config.density_dissipation);
    }
}

fn wrap(value: f32, min: f32, max: f32) -> f32 {
    let range = max - min;
    if range == 0.0 {
        return min;
    }
    (value - min).rem_euclid(range) + min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fluid::{CompositeOptions, FieldSize};
    use crate::input::{CanvasMetrics, PointerButton, PointerId};

    #[derive(Default)]
    struct Recorder {
        passes: Vec<FluidPass>,
        splats: Vec<Splat>,
        dts: Vec<f32>,
    }

    impl FluidBackend for Recorder {
        fn resize(&mut self, _sim: FieldSize, _dye: FieldSize) {}
        fn splat(&mut self, splat: &Splat, _shape: SplatShape) {
            self.passes.push(FluidPass::Splat);
            self.splats.push(*splat);
        }
        fn curl(&mut self) {
            self.passes.push(FluidPass::Curl);
        }
        fn vorticity(&mut self, _strength: f32, dt: f32) {
            self.passes.push(FluidPass::Vorticity);
            self.dts.push(dt);
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
        fn advect_velocity(&mut self, dt: f32, _dissipation: f32) {
            self.passes.push(FluidPass::AdvectVelocity);
            self.dts.push(dt);
        }
        fn advect_dye(&mut self, dt: f32, _dissipation: f32) {
            self.passes.push(FluidPass::AdvectDye);
            self.dts.push(dt);
        }
        fn composite(&mut self, _options: &CompositeOptions) {
            self.passes.push(FluidPass::Composite);
        }
    }

    fn tracker() -> PointerInputTracker {
        PointerInputTracker::with_seed(CanvasMetrics::new(800, 600, 1.0), 11)
    }

    #[test]
    fn test_timestep_is_clamped() {
        assert_eq!(clamp_timestep(5.0), MAX_TIMESTEP);
        assert_eq!(clamp_timestep(0.001), 0.001);
        assert_eq!(clamp_timestep(-0.5), 0.0);
        assert_eq!(clamp_timestep(f32::NAN), 0.0);
    }

    #[test]
    fn test_step_runs_passes_in_fixed_order() {
        let mut config = SimulationConfig::default();
        config.pressure_iterations = 3;
        let stepper = SimulationStepper::new(config);
        let mut backend = Recorder::default();

        stepper.step(&mut backend, 1.0 / 120.0);

        assert_eq!(
            backend.passes,
            vec![
                FluidPass::Curl,
                FluidPass::Vorticity,
                FluidPass::Divergence,
                FluidPass::SeedPressure,
                FluidPass::RelaxPressure,
                FluidPass::RelaxPressure,
                FluidPass::RelaxPressure,
                FluidPass::SubtractGradient,
                FluidPass::AdvectVelocity,
                FluidPass::AdvectDye,
            ]
        );
    }

    #[test]
    fn test_step_never_exceeds_max_timestep() {
        let stepper = SimulationStepper::new(SimulationConfig::default());
        let mut backend = Recorder::default();
        stepper.step(&mut backend, 3.0);
        assert!(backend.dts.iter().all(|dt| *dt <= MAX_TIMESTEP));
    }

    #[test]
    fn test_moved_flag_is_consumed_once() {
        let stepper = SimulationStepper::new(SimulationConfig::default());
        let mut tracker = tracker();
        let mut backend = Recorder::default();

        tracker.pointer_move(PointerId::Primary, 100.0, 100.0);
        tracker.pointer_move(PointerId::Primary, 140.0, 100.0);

        assert_eq!(stepper.apply_inputs(&mut backend, &mut tracker), 1);
        assert_eq!(stepper.apply_inputs(&mut backend, &mut tracker), 0);

        // 40px of 800 is 0.05 in texture space
        let splat = backend.splats[0];
        assert!((splat.force.x - 0.05 * 6000.0).abs() < 1e-2);
        assert_eq!(splat.force.y, 0.0);
    }

    #[test]
    fn test_click_adds_exactly_one_boosted_splat() {
        let stepper = SimulationStepper::new(SimulationConfig::default());
        let mut tracker = tracker();
        let mut backend = Recorder::default();

        tracker.pointer_move(PointerId::Primary, 390.0, 300.0);
        tracker.pointer_move(PointerId::Primary, 400.0, 300.0);
        tracker.pointer_down(PointerId::Primary, 400.0, 300.0, PointerButton::Primary);

        // the down resets the drag state, so only the burst remains
        assert_eq!(stepper.apply_inputs(&mut backend, &mut tracker), 1);
        let boosted = backend
            .splats
            .iter()
            .filter(|splat| splat.color.max_element() > 1.0)
            .count();
        assert_eq!(boosted, 1);

        tracker.pointer_move(PointerId::Primary, 420.0, 300.0);
        tracker.pointer_down(PointerId::Primary, 420.0, 300.0, PointerButton::Primary);
        tracker.pointer_move(PointerId::Primary, 430.0, 300.0);
        backend.splats.clear();
        assert_eq!(stepper.apply_inputs(&mut backend, &mut tracker), 2);
        assert_eq!(
            backend
                .splats
                .iter()
                .filter(|splat| splat.color.max_element() > 1.0)
                .count(),
            1
        );
    }

    #[test]
    fn test_color_cycle_wraps() {
        let mut config = SimulationConfig::default();
        config.color_update_speed = 10.0;
        let mut stepper = SimulationStepper::new(config);
        let mut tracker = tracker();
        tracker.pointer_move(PointerId::Primary, 1.0, 1.0);

        assert!(!stepper.update_colors(0.05, &mut tracker));
        assert!(stepper.update_colors(0.06, &mut tracker));
        assert!(stepper.color_timer < 1.0);
    }

    #[test]
    fn test_wrap() {
        assert!((wrap(1.25, 0.0, 1.0) - 0.25).abs() < 1e-6);
        assert_eq!(wrap(3.0, 2.0, 2.0), 2.0);
    }
}
