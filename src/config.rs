//! Effect configuration
//!
//! Tunables are fixed for the lifetime of a mounted effect. They can come
//! from defaults, a TOML file (native) or a TOML string (web).

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{invalid_config, CursorError, CursorResult};
use crate::gpu::GraphicsCapabilities;

/// Dye resolution used when the platform cannot linearly filter float textures
pub const FALLBACK_DYE_RESOLUTION: u32 = 512;

/// Largest timestep a single frame may advance the simulation by (seconds)
pub const MAX_TIMESTEP: f32 = 1.0 / 60.0;

/// Fluid solver tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Base resolution of velocity, pressure, divergence and curl fields
    pub sim_resolution: u32,
    /// Base resolution of the dye field
    pub dye_resolution: u32,
    pub density_dissipation: f32,
    pub velocity_dissipation: f32,
    /// Value the pressure field is seeded with before each solve
    pub pressure: f32,
    pub pressure_iterations: u32,
    /// Vorticity confinement strength
    pub curl: f32,
    pub splat_radius: f32,
    pub splat_force: f32,
    pub shading: bool,
    pub color_update_speed: f32,
    pub transparent: bool,
    pub back_color: Vec3,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sim_resolution: 128,
            dye_resolution: 1440,
            density_dissipation: 3.5,
            velocity_dissipation: 2.0,
            pressure: 0.1,
            pressure_iterations: 20,
            curl: 3.0,
            splat_radius: 0.2,
            splat_force: 6000.0,
            shading: true,
            color_update_speed: 10.0,
            transparent: true,
            back_color: Vec3::new(0.5, 0.0, 0.0),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> CursorResult<()> {
        if self.sim_resolution == 0 || self.dye_resolution == 0 {
            return Err(invalid_config("field resolutions must be at least 1"));
        }
        if self.pressure_iterations == 0 {
            return Err(invalid_config("pressure_iterations must be at least 1"));
        }
        if self.density_dissipation < 0.0 || self.velocity_dissipation < 0.0 {
            return Err(invalid_config("dissipation rates cannot be negative"));
        }
        if !(self.splat_radius > 0.0) {
            return Err(invalid_config("splat_radius must be positive"));
        }
        if self.color_update_speed < 0.0 {
            return Err(invalid_config("color_update_speed cannot be negative"));
        }
        Ok(())
    }

    /// Effective configuration for a negotiated set of capabilities.
    ///
    /// Without linear float filtering the dye field drops to the fallback
    /// resolution and shading is turned off.
    pub fn with_capabilities(&self, capabilities: &GraphicsCapabilities) -> Self {
        let mut effective = self.clone();
        if !capabilities.linear_filtering {
            log::warn!(
                "[SimulationConfig::with_capabilities] Linear float filtering unsupported, dye resolution {} -> {}, shading disabled",
                self.dye_resolution,
                FALLBACK_DYE_RESOLUTION
            );
            effective.dye_resolution = FALLBACK_DYE_RESOLUTION;
            effective.shading = false;
        }
        effective
    }
}

/// Native window settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Fluid Cursor".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Top-level configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    pub window: WindowConfig,
    pub simulation: SimulationConfig,
}

impl CursorConfig {
    pub fn from_toml_str(raw: &str) -> CursorResult<Self> {
        let config: CursorConfig = toml::from_str(raw)?;
        config.simulation.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> CursorResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|error| CursorError::ConfigIo {
            path: path.to_path_buf(),
            error,
        })?;
        log::info!("[CursorConfig::load] Loaded configuration from {}", path.display());
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::FieldFormats;

    fn capabilities(linear_filtering: bool) -> GraphicsCapabilities {
        GraphicsCapabilities {
            formats: FieldFormats {
                rgba: wgpu::TextureFormat::Rgba16Float,
                rg: wgpu::TextureFormat::Rg16Float,
                r: wgpu::TextureFormat::R16Float,
            },
            linear_filtering,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_degenerate_values() {
        let mut config = SimulationConfig::default();
        config.sim_resolution = 0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.pressure_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.velocity_dissipation = -1.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.splat_radius = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_linear_filtering_downgrades_dye_and_shading() {
        let config = SimulationConfig::default();
        let effective = config.with_capabilities(&capabilities(false));
        assert_eq!(effective.dye_resolution, FALLBACK_DYE_RESOLUTION);
        assert!(!effective.shading);
        assert_eq!(effective.sim_resolution, config.sim_resolution);
    }

    #[test]
    fn test_linear_filtering_keeps_configuration() {
        let config = SimulationConfig::default();
        assert_eq!(config.with_capabilities(&capabilities(true)), config);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = CursorConfig::from_toml_str(
            r#"
            [window]
            title = "Portfolio"

            [simulation]
            curl = 30.0
            shading = false
            back_color = [0.0, 0.1, 0.2]
            "#,
        )
        .expect("valid config");

        assert_eq!(config.window.title, "Portfolio");
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.simulation.curl, 30.0);
        assert!(!config.simulation.shading);
        assert_eq!(config.simulation.back_color, Vec3::new(0.0, 0.1, 0.2));
        assert_eq!(config.simulation.pressure_iterations, 20);
    }

    #[test]
    fn test_invalid_toml_values_are_rejected() {
        let result = CursorConfig::from_toml_str("[simulation]\npressure_iterations = 0\n");
        assert!(matches!(result, Err(CursorError::InvalidConfig(_))));

        let result = CursorConfig::from_toml_str("[simulation]\ncurl = \"strong\"\n");
        assert!(matches!(result, Err(CursorError::ConfigParse(_))));
    }
}
