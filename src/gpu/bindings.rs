//! Binding layouts derived from shader reflection
//!
//! Programs never hard-code binding indices or uniform offsets. The parsed
//! naga module is walked once: every group 0 resource becomes a layout entry
//! and each member of the uniform struct becomes a named slot, so uniforms are
//! written by name at the offset the WGSL layout rules gave them.

use naga::{AddressSpace, TypeInner};
use rustc_hash::FxHashMap;
use wgpu::{BindingType, BufferBindingType, ShaderStages};

/// Byte range of one uniform struct member, including trailing padding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub offset: u32,
    pub size: u32,
}

/// Simplified binding type information
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingTypeInfo {
    UniformBuffer,
    Texture2D,
    Sampler,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingUsage {
    pub name: String,
    pub binding: u32,
    pub ty: BindingTypeInfo,
}

#[derive(Debug, Clone, Default)]
pub struct ProgramLayout {
    bindings: Vec<BindingUsage>,
    uniforms: FxHashMap<String, UniformSlot>,
    uniform_size: u32,
}

fn padded_uniform_size(span: u32) -> u32 {
    span.max(16).div_ceil(16) * 16
}

impl ProgramLayout {
    pub fn from_module(module: &naga::Module) -> Self {
        let mut layout = Self::default();

        for (_, variable) in module.global_variables.iter() {
            let (Some(name), Some(binding)) = (&variable.name, &variable.binding) else {
                continue;
            };
            if binding.group != 0 {
                log::warn!(
                    "[ProgramLayout::from_module] Ignoring '{}' in bind group {}",
                    name,
                    binding.group
                );
                continue;
            }

            let ty = match (variable.space, &module.types[variable.ty].inner) {
                (AddressSpace::Uniform, TypeInner::Struct { members, span }) => {
                    for (index, member) in members.iter().enumerate() {
                        let end = members.get(index + 1).map_or(*span, |next| next.offset);
                        if let Some(member_name) = &member.name {
                            layout.uniforms.insert(
                                member_name.clone(),
                                UniformSlot {
                                    offset: member.offset,
                                    size: end - member.offset,
                                },
                            );
                        }
                    }
                    layout.uniform_size = padded_uniform_size(*span);
                    BindingTypeInfo::UniformBuffer
                }
                (AddressSpace::Handle, TypeInner::Image { .. }) => BindingTypeInfo::Texture2D,
                (AddressSpace::Handle, TypeInner::Sampler { .. }) => BindingTypeInfo::Sampler,
                _ => {
                    log::warn!(
                        "[ProgramLayout::from_module] Unsupported resource '{}' at binding {}",
                        name,
                        binding.binding
                    );
                    continue;
                }
            };

            layout.bindings.push(BindingUsage {
                name: name.clone(),
                binding: binding.binding,
                ty,
            });
        }

        layout.bindings.sort_by_key(|usage| usage.binding);
        layout
    }

    pub fn bindings(&self) -> &[BindingUsage] {
        &self.bindings
    }

    pub fn binding(&self, name: &str) -> Option<&BindingUsage> {
        self.bindings.iter().find(|usage| usage.name == name)
    }

    pub fn uniform(&self, name: &str) -> Option<UniformSlot> {
        self.uniforms.get(name).copied()
    }

    /// Size of the uniform buffer, padded to 16 bytes; zero when there is none
    pub fn uniform_size(&self) -> u32 {
        self.uniform_size
    }

    pub fn has_uniforms(&self) -> bool {
        self.bindings
            .iter()
            .any(|usage| usage.ty == BindingTypeInfo::UniformBuffer)
    }

    /// Names of sampled textures, in binding order
    pub fn textures(&self) -> impl Iterator<Item = &str> {
        self.bindings
            .iter()
            .filter(|usage| usage.ty == BindingTypeInfo::Texture2D)
            .map(|usage| usage.name.as_str())
    }

    /// Generate bind group layout entries.
    ///
    /// `filterable` selects between a filtering sampler over filterable float
    /// textures and a non-filtering sampler over unfilterable ones.
    pub fn layout_entries(&self, filterable: bool) -> Vec<wgpu::BindGroupLayoutEntry> {
        self.bindings
            .iter()
            .map(|usage| {
                let ty = match usage.ty {
                    BindingTypeInfo::UniformBuffer => BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    BindingTypeInfo::Texture2D => BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    BindingTypeInfo::Sampler => BindingType::Sampler(if filterable {
                        wgpu::SamplerBindingType::Filtering
                    } else {
                        wgpu::SamplerBindingType::NonFiltering
                    }),
                };

                wgpu::BindGroupLayoutEntry {
                    binding: usage.binding,
                    visibility: ShaderStages::VERTEX_FRAGMENT,
                    ty,
                    count: None,
                }
            })
            .collect()
    }
}
