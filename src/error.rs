//! Error taxonomy for the fluid cursor effect
//!
//! Every failure stays inside this crate. Callers log the error and carry on
//! without the effect; nothing here is meant to reach a user-facing surface.

use std::path::PathBuf;

/// Result alias used across the crate
pub type CursorResult<T> = Result<T, CursorError>;

#[derive(Debug, thiserror::Error)]
pub enum CursorError {
    #[error("No compatible graphics context: {reason}")]
    UnsupportedPlatform { reason: String },

    #[error("Failed to get a GPU adapter for any backend")]
    NoAdapter,

    #[error("Failed to create drawing surface: {0}")]
    SurfaceCreation(String),

    #[error("Failed to get GPU device: {0}")]
    DeviceRequest(String),

    #[error("No renderable floating-point format for {purpose} fields")]
    NoRenderableFormat { purpose: &'static str },

    #[error("Shader '{name}' failed to compile:\n{diagnostics}")]
    ShaderCompile { name: String, diagnostics: String },

    #[error("Shader '{name}' failed validation: {diagnostics}")]
    ShaderValidation { name: String, diagnostics: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to read configuration {path}: {error}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("Window or event loop error: {0}")]
    Windowing(String),

    #[error("JavaScript error: {0}")]
    Js(String),
}

impl CursorError {
    /// True for errors that mean the effect cannot run on this platform at all
    pub fn is_unsupported_platform(&self) -> bool {
        matches!(
            self,
            CursorError::UnsupportedPlatform { .. }
                | CursorError::NoAdapter
                | CursorError::SurfaceCreation(_)
                | CursorError::DeviceRequest(_)
                | CursorError::NoRenderableFormat { .. }
        )
    }
}

/// Create an unsupported platform error
pub fn unsupported_platform(reason: impl std::fmt::Display) -> CursorError {
    CursorError::UnsupportedPlatform {
        reason: reason.to_string(),
    }
}

/// Create an invalid configuration error
pub fn invalid_config(message: impl std::fmt::Display) -> CursorError {
    CursorError::InvalidConfig(message.to_string())
}
