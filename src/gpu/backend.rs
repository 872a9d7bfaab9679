//! wgpu implementation of the fluid passes
//!
//! Every pass is one full-screen draw into a field target. Field textures are
//! stored top row first, so splat positions and forces are mirrored vertically
//! on the way in; the remaining passes do not depend on the vertical
//! orientation.

use std::sync::Arc;

use crate::fluid::{CompositeOptions, FieldSize, FluidBackend, Splat, SplatShape};
use crate::gpu::capabilities::GraphicsCapabilities;
use crate::gpu::framebuffer::FramebufferPool;
use crate::gpu::program::{Blend, DrawTarget};
use crate::gpu::registry::{ShaderKind, ShaderProgramRegistry};

/// Where the composite pass draws: usually the current surface texture
pub struct OutputTarget {
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
}

pub struct GpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    registry: ShaderProgramRegistry,
    pool: FramebufferPool,
    output: Option<OutputTarget>,
}

impl GpuBackend {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        capabilities: GraphicsCapabilities,
        shading: bool,
        sim: FieldSize,
        dye: FieldSize,
    ) -> Self {
        let registry = ShaderProgramRegistry::new(&device, capabilities.linear_filtering, shading);
        let pool = FramebufferPool::new(&device, capabilities, sim, dye);
        Self {
            device,
            queue,
            registry,
            pool,
            output: None,
        }
    }

    /// Target for the next composite; `None` makes compositing a no-op
    pub fn set_output(&mut self, output: Option<OutputTarget>) {
        self.output = output;
    }

    pub fn pool(&self) -> &FramebufferPool {
        &self.pool
    }
}

impl FluidBackend for GpuBackend {
    fn resize(&mut self, sim: FieldSize, dye: FieldSize) {
        let copy = self.registry.program(&self.device, ShaderKind::Copy);
        self.pool.resize(&self.device, &self.queue, copy, sim, dye);
    }

    fn splat(&mut self, splat: &Splat, shape: SplatShape) {
        let Some(program) = self.registry.program(&self.device, ShaderKind::Splat) else {
            return;
        };
        let pool = &mut self.pool;

        program.set_uniform("point", [splat.point.x, 1.0 - splat.point.y]);
        program.set_uniform("aspect_ratio", shape.aspect_ratio);
        program.set_uniform("radius", shape.radius);

        program.set_uniform("color", [splat.force.x, -splat.force.y, 0.0f32]);
        program.draw(
            &self.device,
            &self.queue,
            pool.velocity.write().draw_target(),
            &[("u_target", pool.velocity.read().view())],
            pool.sampler(),
        );
        pool.velocity.swap();

        program.set_uniform("color", splat.color.to_array());
        program.draw(
            &self.device,
            &self.queue,
            pool.dye.write().draw_target(),
            &[("u_target", pool.dye.read().view())],
            pool.sampler(),
        );
        pool.dye.swap();
    }

    fn curl(&mut self) {
        let Some(program) = self.registry.program(&self.device, ShaderKind::Curl) else {
            return;
        };
        let pool = &self.pool;
        program.set_uniform("texel_size", pool.velocity.read().texel_size());
        program.draw(
            &self.device,
            &self.queue,
            pool.curl.draw_target(),
            &[("u_velocity", pool.velocity.read().view())],
            pool.sampler(),
        );
    }

    fn vorticity(&mut self, strength: f32, dt: f32) {
        let Some(program) = self.registry.program(&self.device, ShaderKind::Vorticity) else {
            return;
        };
        let pool = &mut self.pool;
        program.set_uniform("texel_size", pool.velocity.read().texel_size());
        program.set_uniform("curl", strength);
        program.set_uniform("dt", dt);
        program.draw(
            &self.device,
            &self.queue,
            pool.velocity.write().draw_target(),
            &[
                ("u_velocity", pool.velocity.read().view()),
                ("u_curl", pool.curl.view()),
            ],
            pool.sampler(),
        );
        pool.velocity.swap();
    }

    fn divergence(&mut self) {
        let Some(program) = self.registry.program(&self.device, ShaderKind::Divergence) else {
            return;
        };
        let pool = &self.pool;
        program.set_uniform("texel_size", pool.velocity.read().texel_size());
        program.draw(
            &self.device,
            &self.queue,
            pool.divergence.draw_target(),
            &[("u_velocity", pool.velocity.read().view())],
            pool.sampler(),
        );
    }

    fn seed_pressure(&mut self, value: f32) {
        let Some(program) = self.registry.program(&self.device, ShaderKind::Clear) else {
            return;
        };
        let pool = &mut self.pool;
        program.set_uniform("scale", 0.0f32);
        program.set_uniform("fill", [value, 0.0, 0.0, 1.0f32]);
        program.draw(
            &self.device,
            &self.queue,
            pool.pressure.write().draw_target(),
            &[("u_source", pool.pressure.read().view())],
            pool.sampler(),
        );
        pool.pressure.swap();
    }

    fn relax_pressure(&mut self) {
        let Some(program) = self.registry.program(&self.device, ShaderKind::Pressure) else {
            return;
        };
        let pool = &mut self.pool;
        program.set_uniform("texel_size", pool.pressure.read().texel_size());
        program.draw(
            &self.device,
            &self.queue,
            pool.pressure.write().draw_target(),
            &[
                ("u_pressure", pool.pressure.read().view()),
                ("u_divergence", pool.divergence.view()),
            ],
            pool.sampler(),
        );
        pool.pressure.swap();
    }

    fn subtract_gradient(&mut self) {
        let Some(program) = self.registry.program(&self.device, ShaderKind::GradientSubtract) else {
            return;
        };
        let pool = &mut self.pool;
        program.set_uniform("texel_size", pool.velocity.read().texel_size());
        program.draw(
            &self.device,
            &self.queue,
            pool.velocity.write().draw_target(),
            &[
                ("u_pressure", pool.pressure.read().view()),
                ("u_velocity", pool.velocity.read().view()),
            ],
            pool.sampler(),
        );
        pool.velocity.swap();
    }

    fn advect_velocity(&mut self, dt: f32, dissipation: f32) {
        let Some(program) = self.registry.program(&self.device, ShaderKind::Advection) else {
            return;
        };
        let pool = &mut self.pool;
        let texel_size = pool.velocity.read().texel_size();
        program.set_uniform("texel_size", texel_size);
        program.set_uniform("source_texel_size", texel_size);
        program.set_uniform("dt", dt);
        program.set_uniform("dissipation", dissipation);
        program.draw(
            &self.device,
            &self.queue,
            pool.velocity.write().draw_target(),
            &[
                ("u_velocity", pool.velocity.read().view()),
                ("u_source", pool.velocity.read().view()),
            ],
            pool.sampler(),
        );
        pool.velocity.swap();
    }

    fn advect_dye(&mut self, dt: f32, dissipation: f32) {
        let Some(program) = self.registry.program(&self.device, ShaderKind::Advection) else {
            return;
        };
        let pool = &mut self.pool;
        program.set_uniform("texel_size", pool.velocity.read().texel_size());
        program.set_uniform("source_texel_size", pool.dye.read().texel_size());
        program.set_uniform("dt", dt);
        program.set_uniform("dissipation", dissipation);
        program.draw(
            &self.device,
            &self.queue,
            pool.dye.write().draw_target(),
            &[
                ("u_velocity", pool.velocity.read().view()),
                ("u_source", pool.dye.read().view()),
            ],
            pool.sampler(),
        );
        pool.dye.swap();
    }

    fn composite(&mut self, options: &CompositeOptions) {
        let Some(output) = &self.output else {
            log::trace!("[GpuBackend::composite] No output target, skipping");
            return;
        };
        self.registry.set_shading(options.shading);
        let Some(program) = self.registry.program(&self.device, ShaderKind::Display) else {
            return;
        };

        let clear = if options.transparent {
            wgpu::Color::TRANSPARENT
        } else {
            wgpu::Color {
                r: options.back_color.x as f64,
                g: options.back_color.y as f64,
                b: options.back_color.z as f64,
                a: 1.0,
            }
        };

        program.set_uniform("texel_size", self.pool.dye.read().texel_size());
        program.draw(
            &self.device,
            &self.queue,
            DrawTarget {
                view: &output.view,
                format: output.format,
                load: wgpu::LoadOp::Clear(clear),
                blend: Blend::PremultipliedOver,
            },
            &[("u_dye", self.pool.dye.read().view())],
            self.pool.sampler(),
        );
    }
}
