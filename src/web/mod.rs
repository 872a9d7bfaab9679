//! Browser entry point
//!
//! `mountFluidCursor` creates a full-viewport canvas above the page, starts a
//! `requestAnimationFrame` loop and listens for pointer input on `window`.
//! The returned handle's `unmount` cancels the pending frame, removes every
//! listener and the canvas. A browser without a usable graphics context gets
//! no effect and a log line; the promise still resolves.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{AddEventListenerOptions, EventTarget, HtmlCanvasElement, MouseEvent, TouchEvent};

use crate::config::CursorConfig;
use crate::effect::{field_sizes, CursorEffect};
use crate::error::{unsupported_platform, CursorError, CursorResult};
use crate::fluid::scale_to_device_pixels;
use crate::gpu::{GpuBackend, GpuContext, OutputTarget, SurfaceSource};
use crate::input::{CanvasMetrics, PointerButton, PointerEvent, PointerId};
use crate::lifecycle::{FrameLoop, FrameScheduler, Mount, UnmountRequest};

type FrameCallback = Closure<dyn FnMut(f64)>;

fn js_error(value: JsValue) -> CursorError {
    CursorError::Js(format!("{:?}", value))
}

/// `requestAnimationFrame` / `cancelAnimationFrame`
pub struct RafScheduler {
    window: web_sys::Window,
    callback: Rc<RefCell<Option<FrameCallback>>>,
}

impl FrameScheduler for RafScheduler {
    type Handle = i32;

    fn request(&mut self) -> i32 {
        let callback = self.callback.borrow();
        let Some(callback) = callback.as_ref() else {
            return 0;
        };
        match self.window.request_animation_frame(callback.as_ref().unchecked_ref()) {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("[RafScheduler::request] {:?}", e);
                0
            }
        }
    }

    fn cancel(&mut self, handle: i32) {
        if let Err(e) = self.window.cancel_animation_frame(handle) {
            log::warn!("[RafScheduler::cancel] {:?}", e);
        }
    }
}

impl Drop for RafScheduler {
    fn drop(&mut self) {
        self.callback.borrow_mut().take();
    }
}

/// Event listener registration, removed from its target when dropped
pub struct DomListener {
    target: EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

impl DomListener {
    pub fn new(
        target: &EventTarget,
        kind: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> CursorResult<Self> {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web_sys::Event)>);
        let mut options = AddEventListenerOptions::new();
        options.passive(true);
        target
            .add_event_listener_with_callback_and_add_event_listener_options(
                kind,
                closure.as_ref().unchecked_ref(),
                &options,
            )
            .map_err(js_error)?;

        Ok(Self {
            target: target.clone(),
            kind,
            closure,
        })
    }
}

impl Drop for DomListener {
    fn drop(&mut self) {
        if let Err(e) = self
            .target
            .remove_event_listener_with_callback(self.kind, self.closure.as_ref().unchecked_ref())
        {
            log::warn!("[DomListener::drop] Failed to remove '{}' listener: {:?}", self.kind, e);
        }
    }
}

struct WebState {
    window: web_sys::Window,
    canvas: HtmlCanvasElement,
    context: GpuContext,
    effect: CursorEffect<GpuBackend>,
    mount: Option<Mount<RafScheduler, DomListener>>,
}

impl WebState {
    fn frame(&mut self, now_ms: f64) {
        let Some(mount) = self.mount.as_mut() else {
            return;
        };
        if !mount.frame_loop_mut().on_frame() {
            return;
        }

        self.sync_size();
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

    /// Match the drawing buffer to the canvas' CSS size times the pixel ratio
    fn sync_size(&mut self) {
        let metrics = canvas_metrics(&self.window, &self.canvas);
        if self.canvas.width() == metrics.width && self.canvas.height() == metrics.height {
            self.effect.resize(metrics);
            return;
        }
        self.canvas.set_width(metrics.width);
        self.canvas.set_height(metrics.height);
        self.context.resize(metrics.width, metrics.height);
        self.effect.resize(metrics);
    }

    /// The mount stays in place so the frame callback is not freed while it
    /// runs; it goes with the state. Removing a detached canvas is a no-op.
    fn unmount(&mut self) {
        if let Some(mount) = self.mount.as_mut() {
            mount.unmount();
        }
        self.canvas.remove();
    }

    fn is_mounted(&self) -> bool {
        self.mount.as_ref().map_or(false, Mount::is_mounted)
    }
}

impl Drop for WebState {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn canvas_metrics(window: &web_sys::Window, canvas: &HtmlCanvasElement) -> CanvasMetrics {
    let pixel_ratio = window.device_pixel_ratio() as f32;
    CanvasMetrics::new(
        scale_to_device_pixels(canvas.client_width() as f32, pixel_ratio),
        scale_to_device_pixels(canvas.client_height() as f32, pixel_ratio),
        pixel_ratio,
    )
}

fn mouse_button(button: i16) -> PointerButton {
    match button {
        0 => PointerButton::Primary,
        1 => PointerButton::Middle,
        2 => PointerButton::Secondary,
        _ => PointerButton::Other,
    }
}

fn mouse_events(kind: &str, event: &web_sys::Event) -> Vec<PointerEvent> {
    let Some(event) = event.dyn_ref::<MouseEvent>() else {
        return Vec::new();
    };
    let (x, y) = (event.client_x() as f32, event.client_y() as f32);
    let id = PointerId::Primary;
    match kind {
        "mousedown" => vec![PointerEvent::Down {
            id,
            x,
            y,
            button: mouse_button(event.button()),
        }],
        "mousemove" => vec![PointerEvent::Move { id, x, y }],
        "mouseup" => vec![PointerEvent::Up { id }],
        _ => Vec::new(),
    }
}

fn touch_events(kind: &str, event: &web_sys::Event) -> Vec<PointerEvent> {
    let Some(event) = event.dyn_ref::<TouchEvent>() else {
        return Vec::new();
    };
    let touches = event.changed_touches();
    (0..touches.length())
        .filter_map(|index| touches.get(index))
        .filter_map(|touch| {
            let id = PointerId::Touch(touch.identifier());
            let (x, y) = (touch.client_x() as f32, touch.client_y() as f32);
            match kind {
                "touchstart" => Some(PointerEvent::Down {
                    id,
                    x,
                    y,
                    button: PointerButton::Primary,
                }),
                "touchmove" => Some(PointerEvent::Move { id, x, y }),
                "touchend" | "touchcancel" => Some(PointerEvent::Up { id }),
                _ => None,
            }
        })
        .collect()
}

const MOUSE_EVENTS: [&str; 3] = ["mousedown", "mousemove", "mouseup"];
const TOUCH_EVENTS: [&str; 4] = ["touchstart", "touchmove", "touchend", "touchcancel"];

fn listen(
    window: &web_sys::Window,
    state: &Rc<RefCell<WebState>>,
    kind: &'static str,
    translate: fn(&str, &web_sys::Event) -> Vec<PointerEvent>,
) -> CursorResult<DomListener> {
    let weak: Weak<RefCell<WebState>> = Rc::downgrade(state);
    DomListener::new(window.as_ref(), kind, move |event| {
        let Some(state) = weak.upgrade() else {
            return;
        };
        let Ok(mut state) = state.try_borrow_mut() else {
            return;
        };
        for pointer_event in translate(kind, &event) {
            state.effect.handle_event(&pointer_event);
        }
    })
}

fn create_canvas(document: &web_sys::Document) -> CursorResult<HtmlCanvasElement> {
    let canvas = document
        .create_element("canvas")
        .map_err(js_error)?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| CursorError::Js("Not a canvas element".into()))?;

    let style = canvas.style();
    for (property, value) in [
        ("position", "fixed"),
        ("top", "0"),
        ("left", "0"),
        ("width", "100vw"),
        ("height", "100vh"),
        ("pointer-events", "none"),
        ("z-index", "50"),
    ] {
        style.set_property(property, value).map_err(js_error)?;
    }

    let body = document.body().ok_or_else(|| unsupported_platform("document has no body"))?;
    body.append_child(&canvas).map_err(js_error)?;
    Ok(canvas)
}

async fn mount(config: CursorConfig, request: UnmountRequest) -> CursorResult<Rc<RefCell<WebState>>> {
    let window = web_sys::window().ok_or_else(|| unsupported_platform("no window"))?;
    let document = window.document().ok_or_else(|| unsupported_platform("no document"))?;
    let canvas = create_canvas(&document)?;

    let metrics = canvas_metrics(&window, &canvas);
    canvas.set_width(metrics.width);
    canvas.set_height(metrics.height);

    let context = match GpuContext::new(
        SurfaceSource::Canvas(canvas.clone()),
        metrics.width,
        metrics.height,
        config.simulation.transparent,
    )
    .await
    {
        Ok(context) => context,
        Err(e) => {
            canvas.remove();
            return Err(e);
        }
    };

    let simulation = config.simulation.with_capabilities(&context.capabilities());
    let (sim, dye) = field_sizes(&simulation, metrics);
    let backend = GpuBackend::new(
        context.device(),
        context.queue(),
        context.capabilities(),
        simulation.shading,
        sim,
        dye,
    );
    let effect = CursorEffect::new(backend, simulation, metrics);

    let state = Rc::new(RefCell::new(WebState {
        window: window.clone(),
        canvas,
        context,
        effect,
        mount: None,
    }));

    let callback: Rc<RefCell<Option<FrameCallback>>> = Rc::new(RefCell::new(None));
    let weak = Rc::downgrade(&state);
    *callback.borrow_mut() = Some(Closure::wrap(Box::new(move |now: f64| {
        let Some(state) = weak.upgrade() else {
            return;
        };
        let Ok(mut state) = state.try_borrow_mut() else {
            return;
        };
        if request.take() {
            state.unmount();
        } else {
            state.frame(now);
        }
    }) as Box<dyn FnMut(f64)>));

    let mut listeners = Vec::with_capacity(MOUSE_EVENTS.len() + TOUCH_EVENTS.len());
    for kind in MOUSE_EVENTS {
        listeners.push(listen(&window, &state, kind, mouse_events)?);
    }
    for kind in TOUCH_EVENTS {
        listeners.push(listen(&window, &state, kind, touch_events)?);
    }

    let scheduler = RafScheduler {
        window: window.clone(),
        callback,
    };
    let mount = Mount::new(FrameLoop::new(scheduler), listeners);
    state.borrow_mut().mount = Some(mount);
    Ok(state)
}

/// Handle to a mounted effect
#[wasm_bindgen]
pub struct FluidCursor {
    state: Rc<RefCell<WebState>>,
    request: UnmountRequest,
}

#[wasm_bindgen]
impl FluidCursor {
    /// Stop the animation loop, detach listeners and remove the canvas.
    /// Called while a frame is running, it happens on the next frame.
    pub fn unmount(&self) {
        self.request.unmount_or_defer(&self.state, WebState::unmount);
    }

    #[wasm_bindgen(js_name = isMounted)]
    pub fn is_mounted(&self) -> bool {
        !self.request.is_pending()
            && self
                .state
                .try_borrow()
                .map_or(true, |state| state.is_mounted())
    }
}

/// Mount the effect. Resolves to a `FluidCursor`, or `null` when the effect
/// cannot run in this browser.
#[wasm_bindgen(js_name = mountFluidCursor)]
pub async fn mount_fluid_cursor(config_toml: Option<String>) -> JsValue {
    console_error_panic_hook::set_once();
    // already initialised when mounted twice
    let _ = console_log::init_with_level(log::Level::Info);

    let config = match config_toml.as_deref().map(CursorConfig::from_toml_str) {
        None => CursorConfig::default(),
        Some(Ok(config)) => config,
        Some(Err(e)) => {
            log::error!("[mountFluidCursor] {}", e);
            return JsValue::NULL;
        }
    };

    let request = UnmountRequest::new();
    match mount(config, request.clone()).await {
        Ok(state) => {
            log::info!("[mountFluidCursor] Fluid cursor mounted");
            JsValue::from(FluidCursor { state, request })
        }
        Err(e) => {
            log::error!("[mountFluidCursor] Fluid cursor unavailable: {}", e);
            JsValue::NULL
        }
    }
}
