//! Every shader variant the effect can select compiles and exposes the
//! bindings its pass binds. Runs without a GPU.

use fluid_cursor::gpu::{compile_module, preprocess, BindingTypeInfo, KeywordSet, ProgramLayout, ShaderKind};

fn layout(kind: ShaderKind, keywords: &KeywordSet) -> ProgramLayout {
    let source = preprocess(&kind.source(), keywords);
    let module = compile_module(kind.name(), &source)
        .unwrap_or_else(|error| panic!("{} [{}]: {}", kind.name(), keywords, error));
    ProgramLayout::from_module(&module)
}

#[test]
fn test_all_platform_variants_compile() {
    for linear_filtering in [true, false] {
        for shading in [true, false] {
            for kind in ShaderKind::ALL {
                let keywords = kind.keywords(linear_filtering, shading);
                let layout = layout(kind, &keywords);
                assert!(
                    layout.binding("field_sampler").is_some(),
                    "{} has no sampler",
                    kind.name()
                );
            }
        }
    }
}

#[test]
fn test_pass_textures_match_bindings() {
    let expected: [(ShaderKind, &[&str]); 10] = [
        (ShaderKind::Copy, &["u_source"]),
        (ShaderKind::Clear, &["u_source"]),
        (ShaderKind::Splat, &["u_target"]),
        (ShaderKind::Advection, &["u_velocity", "u_source"]),
        (ShaderKind::Divergence, &["u_velocity"]),
        (ShaderKind::Curl, &["u_velocity"]),
        (ShaderKind::Vorticity, &["u_velocity", "u_curl"]),
        (ShaderKind::Pressure, &["u_pressure", "u_divergence"]),
        (ShaderKind::GradientSubtract, &["u_pressure", "u_velocity"]),
        (ShaderKind::Display, &["u_dye"]),
    ];

    for (kind, textures) in expected {
        let layout = layout(kind, &KeywordSet::new());
        assert_eq!(layout.textures().collect::<Vec<_>>(), textures, "{}", kind.name());
    }
}

#[test]
fn test_uniforms_written_by_each_pass_exist() {
    let expected: [(ShaderKind, &[&str]); 8] = [
        (ShaderKind::Clear, &["fill", "scale"]),
        (ShaderKind::Splat, &["color", "point", "aspect_ratio", "radius"]),
        (ShaderKind::Advection, &["texel_size", "source_texel_size", "dt", "dissipation"]),
        (ShaderKind::Divergence, &["texel_size"]),
        (ShaderKind::Curl, &["texel_size"]),
        (ShaderKind::Vorticity, &["texel_size", "curl", "dt"]),
        (ShaderKind::Pressure, &["texel_size"]),
        (ShaderKind::Display, &["texel_size"]),
    ];

    for (kind, names) in expected {
        let layout = layout(kind, &KeywordSet::new());
        assert_eq!(
            layout.binding("params").map(|usage| &usage.ty),
            Some(&BindingTypeInfo::UniformBuffer)
        );
        for name in names {
            assert!(layout.uniform(name).is_some(), "{} lacks uniform '{}'", kind.name(), name);
        }
        assert_eq!(layout.uniform_size() % 16, 0);
    }

    let copy = layout(ShaderKind::Copy, &KeywordSet::new());
    assert!(!copy.has_uniforms());
    assert_eq!(copy.uniform_size(), 0);
}

#[test]
fn test_manual_filtering_only_changes_advection() {
    let advection = ShaderKind::Advection.keywords(false, true);
    assert!(advection.contains("MANUAL_FILTERING"));
    assert!(ShaderKind::Advection.keywords(true, true).is_empty());

    let display = ShaderKind::Display.keywords(false, true);
    assert!(display.contains("SHADING"));
    assert!(!display.contains("MANUAL_FILTERING"));
    assert!(ShaderKind::Curl.keywords(false, true).is_empty());
}
