//! Off-screen render targets for the fluid fields
//!
//! Velocity, dye and pressure are double-buffered; divergence and curl are
//! recomputed from scratch every frame and need a single target. New textures
//! are zero-initialised by wgpu, so freshly allocated fields start empty.

use crate::fluid::{FieldSize, PingPong};
use crate::gpu::capabilities::GraphicsCapabilities;
use crate::gpu::program::{DrawTarget, ShaderProgram};

pub struct RenderTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: FieldSize,
    format: wgpu::TextureFormat,
}

impl RenderTarget {
    pub fn new(device: &wgpu::Device, label: &str, size: FieldSize, format: wgpu::TextureFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            _texture: texture,
            view,
            size,
            format,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> FieldSize {
        self.size
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn texel_size(&self) -> [f32; 2] {
        self.size.texel_size()
    }

    /// This target as the destination of a field pass
    pub fn draw_target(&self) -> DrawTarget<'_> {
        DrawTarget::field(&self.view, self.format)
    }
}

pub type DoubleTarget = PingPong<RenderTarget>;

fn double_target(device: &wgpu::Device, label: &str, size: FieldSize, format: wgpu::TextureFormat) -> DoubleTarget {
    PingPong::new(
        RenderTarget::new(device, &format!("{label} (read)"), size, format),
        RenderTarget::new(device, &format!("{label} (write)"), size, format),
    )
}

/// Clamp a texture size to what the device allows
pub fn validate_texture_dimensions(
    requested_width: u32,
    requested_height: u32,
    max_dimension: u32,
) -> (u32, u32, bool) {
    let clamped_width = requested_width.min(max_dimension);
    let clamped_height = requested_height.min(max_dimension);
    let was_clamped = clamped_width != requested_width || clamped_height != requested_height;

    (clamped_width, clamped_height, was_clamped)
}

fn clamp_field_size(size: FieldSize, max_dimension: u32, field: &str) -> FieldSize {
    let (width, height, was_clamped) = validate_texture_dimensions(size.width, size.height, max_dimension);
    if was_clamped {
        log::warn!(
            "[FramebufferPool] {} field clamped from {}x{} to {}x{} (max: {})",
            field,
            size.width,
            size.height,
            width,
            height,
            max_dimension
        );
    }
    FieldSize::new(width, height)
}

pub struct FramebufferPool {
    pub velocity: DoubleTarget,
    pub dye: DoubleTarget,
    pub pressure: DoubleTarget,
    pub divergence: RenderTarget,
    pub curl: RenderTarget,
    sampler: wgpu::Sampler,
    capabilities: GraphicsCapabilities,
    max_dimension: u32,
}

impl FramebufferPool {
    pub fn new(device: &wgpu::Device, capabilities: GraphicsCapabilities, sim: FieldSize, dye: FieldSize) -> Self {
        let max_dimension = device.limits().max_texture_dimension_2d;
        let sim = clamp_field_size(sim, max_dimension, "simulation");
        let dye = clamp_field_size(dye, max_dimension, "dye");
        let formats = capabilities.formats;

        let filter = if capabilities.linear_filtering {
            wgpu::FilterMode::Linear
        } else {
            wgpu::FilterMode::Nearest
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Field Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        log::info!(
            "[FramebufferPool::new] sim {}x{}, dye {}x{}",
            sim.width,
            sim.height,
            dye.width,
            dye.height
        );

        Self {
            velocity: double_target(device, "Velocity", sim, formats.rg),
            dye: double_target(device, "Dye", dye, formats.rgba),
            pressure: double_target(device, "Pressure", sim, formats.r),
            divergence: RenderTarget::new(device, "Divergence", sim, formats.r),
            curl: RenderTarget::new(device, "Curl", sim, formats.r),
            sampler,
            capabilities,
            max_dimension,
        }
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn sim_size(&self) -> FieldSize {
        self.velocity.read().size()
    }

    pub fn dye_size(&self) -> FieldSize {
        self.dye.read().size()
    }

    /// Reallocate for new sizes. Velocity and dye are resampled into the new
    /// targets with `copy`; the scalar fields start from zero.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        mut copy: Option<&mut ShaderProgram>,
        sim: FieldSize,
        dye: FieldSize,
    ) {
        let sim = clamp_field_size(sim, self.max_dimension, "simulation");
        let dye = clamp_field_size(dye, self.max_dimension, "dye");
        let formats = self.capabilities.formats;

        if sim != self.sim_size() {
            let velocity = double_target(device, "Velocity", sim, formats.rg);
            self.velocity = self.resampled(device, queue, copy.as_deref_mut(), &self.velocity, velocity);
            self.pressure = double_target(device, "Pressure", sim, formats.r);
            self.divergence = RenderTarget::new(device, "Divergence", sim, formats.r);
            self.curl = RenderTarget::new(device, "Curl", sim, formats.r);
        }
        if dye != self.dye_size() {
            let colors = double_target(device, "Dye", dye, formats.rgba);
            self.dye = self.resampled(device, queue, copy, &self.dye, colors);
        }
        log::info!(
            "[FramebufferPool::resize] sim {}x{}, dye {}x{}",
            sim.width,
            sim.height,
            dye.width,
            dye.height
        );
    }

    fn resampled(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        copy: Option<&mut ShaderProgram>,
        old: &DoubleTarget,
        new: DoubleTarget,
    ) -> DoubleTarget {
        if let Some(copy) = copy {
            copy.draw(
                device,
                queue,
                new.read().draw_target(),
                &[("u_source", old.read().view())],
                &self.sampler,
            );
        }
        new
    }
}
