//! Fluid simulation cursor effect
//!
//! A real-time incompressible fluid solver driven by pointer input and drawn
//! as a full-screen overlay. The solver passes sit behind [`FluidBackend`]:
//! [`GpuBackend`] renders them with wgpu (native or WebGL2), [`CpuBackend`]
//! runs the same kernels on the CPU.

pub mod config;
pub mod effect;
pub mod error;
pub mod fluid;
pub mod gpu;
pub mod input;
pub mod lifecycle;

#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
pub mod native;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub mod web;

pub use config::{CursorConfig, SimulationConfig, WindowConfig};
pub use effect::{field_sizes, CursorEffect};
pub use error::{CursorError, CursorResult};
pub use fluid::{CompositeOptions, CpuBackend, FieldSize, FluidBackend, SimulationStepper, Splat, SplatShape};
pub use gpu::{GpuBackend, GpuContext, GraphicsCapabilities, OutputTarget};
pub use input::{CanvasMetrics, PointerButton, PointerEvent, PointerId, PointerInputTracker};
pub use lifecycle::{FrameLoop, FrameScheduler, Mount, UnmountRequest};
