//! Graphics context initialisation
//!
//! Backends are tried in priority order. The first one that yields a surface
//! and a compatible adapter wins; if none does, the platform is unsupported
//! and the caller runs without the effect.

use std::sync::Arc;

use crate::error::{CursorError, CursorResult};
use crate::gpu::capabilities::{negotiate_capabilities, AdapterProbe, GraphicsCapabilities};

/// What the drawing surface is created from
pub enum SurfaceSource {
    #[cfg(not(target_arch = "wasm32"))]
    Window(Arc<winit::window::Window>),
    #[cfg(target_arch = "wasm32")]
    Canvas(web_sys::HtmlCanvasElement),
}

impl SurfaceSource {
    fn target(&self) -> wgpu::SurfaceTarget<'static> {
        match self {
            #[cfg(not(target_arch = "wasm32"))]
            SurfaceSource::Window(window) => window.clone().into(),
            #[cfg(target_arch = "wasm32")]
            SurfaceSource::Canvas(canvas) => wgpu::SurfaceTarget::Canvas(canvas.clone()),
        }
    }
}

/// Backend sets to try, most capable first.
/// The web build only compiles wgpu's WebGL2 backend.
pub fn backend_priority() -> &'static [wgpu::Backends] {
    #[cfg(target_arch = "wasm32")]
    {
        &[wgpu::Backends::GL]
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        &[wgpu::Backends::PRIMARY, wgpu::Backends::SECONDARY]
    }
}

/// Prefer a linear (non-sRGB) format: the passes write display values directly
pub fn choose_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|format| !format.is_srgb())
        .or_else(|| formats.first().copied())
}

/// Premultiplied alpha for a see-through overlay, opaque otherwise
pub fn choose_alpha_mode(modes: &[wgpu::CompositeAlphaMode], transparent: bool) -> wgpu::CompositeAlphaMode {
    let preferred = if transparent {
        wgpu::CompositeAlphaMode::PreMultiplied
    } else {
        wgpu::CompositeAlphaMode::Opaque
    };
    if modes.contains(&preferred) {
        preferred
    } else {
        modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto)
    }
}

pub struct GpuContext {
    adapter: wgpu::Adapter,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    capabilities: GraphicsCapabilities,
}

impl GpuContext {
    pub async fn new(source: SurfaceSource, width: u32, height: u32, transparent: bool) -> CursorResult<Self> {
        log::info!("[GpuContext::new] Starting GPU initialization");

        let (surface, adapter) = Self::request_adapter(&source).await?;
        let info = adapter.get_info();
        log::info!("[GpuContext::new] Adapter: {} ({:?})", info.name, info.device_type);
        log::info!("[GpuContext::new] Backend: {:?}", info.backend);

        let capabilities = negotiate_capabilities(&AdapterProbe::new(&adapter))?;

        let limits = wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits());
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Fluid Cursor Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                },
                None,
            )
            .await
            .map_err(|error| CursorError::DeviceRequest(error.to_string()))?;

        device.on_uncaptured_error(Box::new(|error| {
            log::error!("[GPU] Uncaptured device error: {}", error);
        }));

        let surface_caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&surface_caps.formats)
            .ok_or_else(|| CursorError::SurfaceCreation("surface reports no formats".to_string()))?;
        let alpha_mode = choose_alpha_mode(&surface_caps.alpha_modes, transparent);
        log::info!(
            "[GpuContext::new] Surface format {:?}, alpha mode {:?}",
            format,
            alpha_mode
        );

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        Ok(Self {
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
            surface,
            config,
            capabilities,
        })
    }

    async fn request_adapter(source: &SurfaceSource) -> CursorResult<(wgpu::Surface<'static>, wgpu::Adapter)> {
        let mut last_error = CursorError::NoAdapter;

        for backends in backend_priority() {
            let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
                backends: *backends,
                ..Default::default()
            });

            let surface = match instance.create_surface(source.target()) {
                Ok(surface) => surface,
                Err(error) => {
                    log::warn!("[GpuContext::request_adapter] {:?}: no surface ({})", backends, error);
                    last_error = CursorError::SurfaceCreation(error.to_string());
                    continue;
                }
            };

            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: Some(&surface),
                    force_fallback_adapter: false,
                })
                .await;
            match adapter {
                Some(adapter) => return Ok((surface, adapter)),
                None => {
                    log::warn!("[GpuContext::request_adapter] {:?}: no compatible adapter", backends);
                    last_error = CursorError::NoAdapter;
                }
            }
        }

        Err(last_error)
    }

    pub fn device(&self) -> Arc<wgpu::Device> {
        self.device.clone()
    }

    pub fn queue(&self) -> Arc<wgpu::Queue> {
        self.queue.clone()
    }

    pub fn capabilities(&self) -> GraphicsCapabilities {
        self.capabilities
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Reconfigure the surface; returns true when the size actually changed
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || (width, height) == self.size() {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        log::info!("[GpuContext::resize] Surface resized to {}x{}", width, height);
        true
    }

    /// Next surface texture, or `None` when this frame should be skipped
    pub fn current_texture(&mut self) -> Option<wgpu::SurfaceTexture> {
        match self.surface.get_current_texture() {
            Ok(frame) => Some(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("[GpuContext::current_texture] Surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                None
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::trace!("[GpuContext::current_texture] Surface timeout");
                None
            }
            Err(error) => {
                log::error!("[GpuContext::current_texture] {}", error);
                None
            }
        }
    }
}
