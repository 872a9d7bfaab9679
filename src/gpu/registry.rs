//! The fixed set of fluid shaders
//!
//! Every fragment shader is prefixed with the shared full-screen vertex stage
//! before preprocessing, so each program is a single self-contained module.

use rustc_hash::FxHashMap;

use crate::gpu::preprocessor::KeywordSet;
use crate::gpu::program::{Material, ShaderProgram};

pub const MANUAL_FILTERING: &str = "MANUAL_FILTERING";
pub const SHADING: &str = "SHADING";

const COMMON: &str = include_str!("shaders/common.wgsl");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Copy,
    Clear,
    Splat,
    Advection,
    Divergence,
    Curl,
    Vorticity,
    Pressure,
    GradientSubtract,
    Display,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 10] = [
        ShaderKind::Copy,
        ShaderKind::Clear,
        ShaderKind::Splat,
        ShaderKind::Advection,
        ShaderKind::Divergence,
        ShaderKind::Curl,
        ShaderKind::Vorticity,
        ShaderKind::Pressure,
        ShaderKind::GradientSubtract,
        ShaderKind::Display,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShaderKind::Copy => "copy",
            ShaderKind::Clear => "clear",
            ShaderKind::Splat => "splat",
            ShaderKind::Advection => "advection",
            ShaderKind::Divergence => "divergence",
            ShaderKind::Curl => "curl",
            ShaderKind::Vorticity => "vorticity",
            ShaderKind::Pressure => "pressure",
            ShaderKind::GradientSubtract => "gradient_subtract",
            ShaderKind::Display => "display",
        }
    }

    fn fragment_source(self) -> &'static str {
        match self {
            ShaderKind::Copy => include_str!("shaders/copy.wgsl"),
            ShaderKind::Clear => include_str!("shaders/clear.wgsl"),
            ShaderKind::Splat => include_str!("shaders/splat.wgsl"),
            ShaderKind::Advection => include_str!("shaders/advection.wgsl"),
            ShaderKind::Divergence => include_str!("shaders/divergence.wgsl"),
            ShaderKind::Curl => include_str!("shaders/curl.wgsl"),
            ShaderKind::Vorticity => include_str!("shaders/vorticity.wgsl"),
            ShaderKind::Pressure => include_str!("shaders/pressure.wgsl"),
            ShaderKind::GradientSubtract => include_str!("shaders/gradient_subtract.wgsl"),
            ShaderKind::Display => include_str!("shaders/display.wgsl"),
        }
    }

    /// Vertex stage plus fragment stage, before keyword preprocessing
    pub fn source(self) -> String {
        format!("{}\n{}", COMMON, self.fragment_source())
    }

    /// Keywords this shader is specialised with for a given platform and config
    pub fn keywords(self, linear_filtering: bool, shading: bool) -> KeywordSet {
        let mut keywords = KeywordSet::new();
        match self {
            ShaderKind::Advection if !linear_filtering => keywords.insert(MANUAL_FILTERING),
            ShaderKind::Display if shading => keywords.insert(SHADING),
            _ => {}
        }
        keywords
    }
}

/// Compiled programs for every pass.
///
/// All variants the effect will use are compiled up front so shader problems
/// surface at mount time, not mid-animation.
pub struct ShaderProgramRegistry {
    materials: FxHashMap<ShaderKind, Material>,
    linear_filtering: bool,
    shading: bool,
}

impl ShaderProgramRegistry {
    pub fn new(device: &wgpu::Device, linear_filtering: bool, shading: bool) -> Self {
        let mut registry = Self::empty(linear_filtering, shading);

        for kind in ShaderKind::ALL {
            let mut material = Material::new(kind.name(), kind.source(), linear_filtering);
            let keywords = registry.active_keywords(kind);
            if material.variant(device, &keywords).is_none() {
                log::error!(
                    "[ShaderProgramRegistry::new] '{}' unavailable, its pass will be skipped",
                    kind.name()
                );
            }
            registry.materials.insert(kind, material);
        }

        let compiled = registry
            .materials
            .values()
            .map(Material::compiled_variants)
            .sum::<usize>();
        log::info!(
            "[ShaderProgramRegistry::new] {} of {} programs compiled",
            compiled,
            ShaderKind::ALL.len()
        );
        registry
    }

    fn empty(linear_filtering: bool, shading: bool) -> Self {
        Self {
            materials: FxHashMap::default(),
            linear_filtering,
            shading,
        }
    }

    /// Switch the display variant; the other one is compiled on first use
    pub fn set_shading(&mut self, shading: bool) {
        if self.shading != shading {
            log::debug!("[ShaderProgramRegistry::set_shading] shading {}", shading);
            self.shading = shading;
        }
    }

    pub fn shading(&self) -> bool {
        self.shading
    }

    /// Keywords `program` currently selects for `kind`
    pub fn active_keywords(&self, kind: ShaderKind) -> KeywordSet {
        kind.keywords(self.linear_filtering, self.shading)
    }

    /// The active variant of a shader, `None` if it failed to compile
    pub fn program(&mut self, device: &wgpu::Device, kind: ShaderKind) -> Option<&mut ShaderProgram> {
        let keywords = self.active_keywords(kind);
        self.materials.get_mut(&kind)?.variant(device, &keywords)
    }
}
