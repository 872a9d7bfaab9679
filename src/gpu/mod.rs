//! GPU side of the effect
//!
//! Capability negotiation, shader compilation and reflection, render targets
//! and the wgpu implementation of [`crate::fluid::FluidBackend`].

pub mod backend;
pub mod bindings;
pub mod capabilities;
pub mod context;
pub mod framebuffer;
pub mod preprocessor;
pub mod program;
pub mod registry;

pub use backend::{GpuBackend, OutputTarget};
pub use bindings::{BindingTypeInfo, BindingUsage, ProgramLayout, UniformSlot};
pub use capabilities::{negotiate_capabilities, AdapterProbe, FieldFormats, FormatProbe, GraphicsCapabilities};
pub use context::{GpuContext, SurfaceSource};
pub use framebuffer::{validate_texture_dimensions, DoubleTarget, FramebufferPool, RenderTarget};
pub use preprocessor::{preprocess, KeywordSet};
pub use program::{compile_module, Blend, DrawTarget, Material, ShaderProgram};
pub use registry::{ShaderKind, ShaderProgramRegistry};
