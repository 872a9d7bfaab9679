//! Desktop runner
//!
//! Opens a transparent window and drives the effect from winit's redraw
//! requests. If no graphics context can be created the window stays open
//! without the effect.

use std::sync::Arc;
use std::time::Instant;

use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::{ElementState, Event, MouseButton, TouchPhase, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowBuilder};

use crate::config::CursorConfig;
use crate::effect::{field_sizes, CursorEffect};
use crate::error::{CursorError, CursorResult};
use crate::gpu::{GpuBackend, GpuContext, OutputTarget, SurfaceSource};
use crate::input::{CanvasMetrics, PointerButton, PointerEvent, PointerId};
use crate::lifecycle::{FrameLoop, FrameScheduler, Mount};

/// Frame scheduling through `Window::request_redraw`.
/// A redraw request cannot be withdrawn; a cancelled loop ignores it instead.
pub struct RedrawScheduler {
    window: Arc<Window>,
    requests: u64,
}

impl RedrawScheduler {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window, requests: 0 }
    }
}

impl FrameScheduler for RedrawScheduler {
    type Handle = u64;

    fn request(&mut self) -> u64 {
        self.requests += 1;
        self.window.request_redraw();
        self.requests
    }

    fn cancel(&mut self, _handle: u64) {}
}

struct Running {
    context: GpuContext,
    effect: CursorEffect<GpuBackend>,
    mount: Mount<RedrawScheduler, ()>,
}

impl Running {
    fn render(&mut self, now_ms: f64) {
        if !self.mount.frame_loop_mut().on_frame() {
            return;
        }
        let Some(frame) = self.context.current_texture() else {
            return;
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let format = self.context.surface_format();
        self.effect
            .backend_mut()
            .set_output(Some(OutputTarget { view, format }));
        self.effect.frame(now_ms);
        self.effect.backend_mut().set_output(None);
        frame.present();
    }

    fn resize(&mut self, width: u32, height: u32, scale_factor: f64) {
        if !is_drawable(width, height) {
            log::debug!("[Running::resize] {}x{} window, keeping the fields", width, height);
            return;
        }
        self.context.resize(width, height);
        self.effect
            .resize(CanvasMetrics::new(width, height, scale_factor as f32));
    }
}

fn map_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Right => PointerButton::Secondary,
        MouseButton::Middle => PointerButton::Middle,
        _ => PointerButton::Other,
    }
}

/// Minimised windows report a zero size; resampling to it would wipe the fields
fn is_drawable(width: u32, height: u32) -> bool {
    width > 0 && height > 0
}

/// Physical window position to the logical pixels the tracker expects
fn logical(position: PhysicalPosition<f64>, scale_factor: f64) -> (f32, f32) {
    let position = position.to_logical::<f64>(scale_factor);
    (position.x as f32, position.y as f32)
}

async fn start(window: Arc<Window>, config: &CursorConfig) -> CursorResult<Running> {
    let size = window.inner_size();
    let context = GpuContext::new(
        SurfaceSource::Window(window.clone()),
        size.width,
        size.height,
        config.simulation.transparent,
    )
    .await?;

    let simulation = config.simulation.with_capabilities(&context.capabilities());
    let canvas = CanvasMetrics::new(size.width, size.height, window.scale_factor() as f32);
    let (sim, dye) = field_sizes(&simulation, canvas);
    let backend = GpuBackend::new(
        context.device(),
        context.queue(),
        context.capabilities(),
        simulation.shading,
        sim,
        dye,
    );
    let effect = CursorEffect::new(backend, simulation, canvas);
    let mount = Mount::new(FrameLoop::new(RedrawScheduler::new(window)), Vec::new());

    Ok(Running {
        context,
        effect,
        mount,
    })
}

pub fn run(config: CursorConfig) -> CursorResult<()> {
    log::info!("[native::run] Creating window...");
    let event_loop = EventLoop::new().map_err(|e| CursorError::Windowing(e.to_string()))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(&config.window.title)
            .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
            .with_transparent(config.simulation.transparent)
            .build(&event_loop)
            .map_err(|e| CursorError::Windowing(e.to_string()))?,
    );

    let mut running = match pollster::block_on(start(window.clone(), &config)) {
        Ok(running) => Some(running),
        Err(e) => {
            log::error!("[native::run] Fluid cursor unavailable: {}", e);
            None
        }
    };

    let started = Instant::now();
    let mut cursor = (0.0f32, 0.0f32);

    event_loop
        .run(move |event, elwt| {
            let Event::WindowEvent { event, window_id } = event else {
                return;
            };
            if window_id != window.id() {
                return;
            }
            let scale_factor = window.scale_factor();

            let pointer_event = match event {
                WindowEvent::CloseRequested => {
                    if let Some(mut running) = running.take() {
                        running.mount.unmount();
                    }
                    elwt.exit();
                    None
                }
                WindowEvent::Resized(size) => {
                    if let Some(running) = running.as_mut() {
                        running.resize(size.width, size.height, scale_factor);
                    }
                    None
                }
                WindowEvent::RedrawRequested => {
                    if let Some(running) = running.as_mut() {
                        running.render(started.elapsed().as_secs_f64() * 1000.0);
                    }
                    None
                }
                WindowEvent::CursorMoved { position, .. } => {
                    cursor = logical(position, scale_factor);
                    Some(PointerEvent::Move {
                        id: PointerId::Primary,
                        x: cursor.0,
                        y: cursor.1,
                    })
                }
                WindowEvent::MouseInput { state, button, .. } => match state {
                    ElementState::Pressed => Some(PointerEvent::Down {
                        id: PointerId::Primary,
                        x: cursor.0,
                        y: cursor.1,
                        button: map_button(button),
                    }),
                    ElementState::Released => Some(PointerEvent::Up {
                        id: PointerId::Primary,
                    }),
                },
                WindowEvent::Touch(touch) => {
                    let id = PointerId::Touch(touch.id as i32);
                    let (x, y) = logical(touch.location, scale_factor);
                    match touch.phase {
                        TouchPhase::Started => Some(PointerEvent::Down {
                            id,
                            x,
                            y,
                            button: PointerButton::Primary,
                        }),
                        TouchPhase::Moved => Some(PointerEvent::Move { id, x, y }),
                        TouchPhase::Ended | TouchPhase::Cancelled => Some(PointerEvent::Up { id }),
                    }
                }
                _ => None,
            };

            if let (Some(event), Some(running)) = (pointer_event, running.as_mut()) {
                running.effect.handle_event(&event);
            }
        })
        .map_err(|e| CursorError::Windowing(e.to_string()))
}
