//! Float render target negotiation
//!
//! The fields need formats that can be both sampled and rendered to. Each
//! field kind walks a candidate list from the narrowest half-float format up
//! to wider ones; the first one the device renders to wins.

use wgpu::{TextureFormat, TextureFormatFeatureFlags, TextureUsages};

use crate::error::{CursorError, CursorResult};

/// Candidates for single-channel fields (pressure, divergence, curl)
pub const R_CANDIDATES: [TextureFormat; 3] = [
    TextureFormat::R16Float,
    TextureFormat::Rg16Float,
    TextureFormat::Rgba16Float,
];

/// Candidates for velocity
pub const RG_CANDIDATES: [TextureFormat; 2] = [TextureFormat::Rg16Float, TextureFormat::Rgba16Float];

/// Candidates for dye
pub const RGBA_CANDIDATES: [TextureFormat; 2] = [TextureFormat::Rgba16Float, TextureFormat::Rgba32Float];

/// Answers format questions about a device
pub trait FormatProbe {
    /// Can be sampled in a shader and used as a color attachment
    fn is_renderable(&self, format: TextureFormat) -> bool;

    /// Supports linear filtering when sampled
    fn is_filterable(&self, format: TextureFormat) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldFormats {
    pub rgba: TextureFormat,
    pub rg: TextureFormat,
    pub r: TextureFormat,
}

/// What the device can do for the fluid fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsCapabilities {
    pub formats: FieldFormats,
    /// Every chosen format can be sampled with linear filtering
    pub linear_filtering: bool,
}

fn pick_format(
    probe: &impl FormatProbe,
    candidates: &[TextureFormat],
    purpose: &'static str,
) -> CursorResult<TextureFormat> {
    candidates
        .iter()
        .copied()
        .find(|format| probe.is_renderable(*format))
        .ok_or(CursorError::NoRenderableFormat { purpose })
}

pub fn negotiate_capabilities(probe: &impl FormatProbe) -> CursorResult<GraphicsCapabilities> {
    let formats = FieldFormats {
        rgba: pick_format(probe, &RGBA_CANDIDATES, "dye")?,
        rg: pick_format(probe, &RG_CANDIDATES, "velocity")?,
        r: pick_format(probe, &R_CANDIDATES, "scalar")?,
    };
    let linear_filtering = [formats.rgba, formats.rg, formats.r]
        .iter()
        .all(|format| probe.is_filterable(*format));

    log::info!(
        "[negotiate_capabilities] dye {:?}, velocity {:?}, scalar {:?}, linear filtering {}",
        formats.rgba,
        formats.rg,
        formats.r,
        linear_filtering
    );
    if !linear_filtering {
        log::warn!("[negotiate_capabilities] Float textures cannot be filtered, using manual bilinear filtering");
    }

    Ok(GraphicsCapabilities {
        formats,
        linear_filtering,
    })
}

/// Format probe backed by a real adapter
pub struct AdapterProbe<'a> {
    adapter: &'a wgpu::Adapter,
}

impl<'a> AdapterProbe<'a> {
    pub fn new(adapter: &'a wgpu::Adapter) -> Self {
        Self { adapter }
    }
}

impl FormatProbe for AdapterProbe<'_> {
    fn is_renderable(&self, format: TextureFormat) -> bool {
        self.adapter
            .get_texture_format_features(format)
            .allowed_usages
            .contains(TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING)
    }

    fn is_filterable(&self, format: TextureFormat) -> bool {
        self.adapter
            .get_texture_format_features(format)
            .flags
            .contains(TextureFormatFeatureFlags::FILTERABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProbe {
        renderable: Vec<TextureFormat>,
        filterable: Vec<TextureFormat>,
    }

    impl FormatProbe for FakeProbe {
        fn is_renderable(&self, format: TextureFormat) -> bool {
            self.renderable.contains(&format)
        }

        fn is_filterable(&self, format: TextureFormat) -> bool {
            self.filterable.contains(&format)
        }
    }

    #[test]
    fn test_prefers_narrowest_formats() {
        let all = vec![
            TextureFormat::R16Float,
            TextureFormat::Rg16Float,
            TextureFormat::Rgba16Float,
        ];
        let probe = FakeProbe {
            renderable: all.clone(),
            filterable: all,
        };
        let capabilities = negotiate_capabilities(&probe).expect("supported");
        assert_eq!(capabilities.formats.r, TextureFormat::R16Float);
        assert_eq!(capabilities.formats.rg, TextureFormat::Rg16Float);
        assert_eq!(capabilities.formats.rgba, TextureFormat::Rgba16Float);
        assert!(capabilities.linear_filtering);
    }

    #[test]
    fn test_falls_back_to_wider_formats() {
        // only four-channel half floats render, as on some WebGL2 drivers
        let probe = FakeProbe {
            renderable: vec![TextureFormat::Rgba16Float],
            filterable: vec![],
        };
        let capabilities = negotiate_capabilities(&probe).expect("supported");
        assert_eq!(capabilities.formats.r, TextureFormat::Rgba16Float);
        assert_eq!(capabilities.formats.rg, TextureFormat::Rgba16Float);
        assert!(!capabilities.linear_filtering);
    }

    #[test]
    fn test_partial_filtering_disables_linear_filtering() {
        let probe = FakeProbe {
            renderable: vec![TextureFormat::R16Float, TextureFormat::Rg16Float, TextureFormat::Rgba16Float],
            filterable: vec![TextureFormat::Rgba16Float],
        };
        assert!(!negotiate_capabilities(&probe).expect("supported").linear_filtering);
    }

    #[test]
    fn test_no_renderable_format_is_an_error() {
        let probe = FakeProbe {
            renderable: vec![TextureFormat::R16Float],
            filterable: vec![],
        };
        let error = negotiate_capabilities(&probe).expect_err("dye has no format");
        assert!(matches!(error, CursorError::NoRenderableFormat { purpose: "dye" }));
        assert!(error.is_unsupported_platform());
    }
}
