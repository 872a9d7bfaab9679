//! Fluid simulation core
//!
//! The numerical pipeline is expressed against [`FluidBackend`], one method per
//! render pass. The GPU backend issues wgpu render passes; the CPU backend runs
//! the same kernels on plain grids and is what the numerical tests exercise.

pub mod cpu;
pub mod ping_pong;
pub mod resolution;
pub mod stepper;

use glam::{Vec2, Vec3};

pub use cpu::{CpuBackend, Grid};
pub use ping_pong::PingPong;
pub use resolution::{correct_radius, get_resolution, scale_to_device_pixels, FieldSize};
pub use stepper::{clamp_timestep, FluidPass, SimulationStepper};

/// A localized injection of velocity and color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splat {
    /// Texture-space position, bottom-left origin, range [0, 1]
    pub point: Vec2,
    /// Velocity added at the center, in texels per second
    pub force: Vec2,
    pub color: Vec3,
}

/// Shape parameters shared by every splat in a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatShape {
    /// Canvas width over height
    pub aspect_ratio: f32,
    /// Gaussian falloff radius, already aspect corrected
    pub radius: f32,
}

/// How the dye field is blended onto the visible surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeOptions {
    pub shading: bool,
    pub transparent: bool,
    pub back_color: Vec3,
}

/// Storage and passes of one fluid simulation.
///
/// Each pass reads the current fields and writes its result; double-buffered
/// fields are swapped by the backend before the method returns.
pub trait FluidBackend {
    /// Reallocate every field at new sizes
    fn resize(&mut self, sim: FieldSize, dye: FieldSize);

    /// Add a Gaussian blob of velocity and of color
    fn splat(&mut self, splat: &Splat, shape: SplatShape);

    fn curl(&mut self);

    fn vorticity(&mut self, strength: f32, dt: f32);

    fn divergence(&mut self);

    /// Fill pressure with a constant before the Jacobi iterations
    fn seed_pressure(&mut self, value: f32);

    /// One Jacobi iteration of the pressure Poisson equation
    fn relax_pressure(&mut self);

    fn subtract_gradient(&mut self);

    fn advect_velocity(&mut self, dt: f32, dissipation: f32);

    fn advect_dye(&mut self, dt: f32, dissipation: f32);

    /// Blend the dye field onto the output
    fn composite(&mut self, options: &CompositeOptions);
}
