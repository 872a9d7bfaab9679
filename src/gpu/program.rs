//! Compiled shader programs and their keyword variants
//!
//! A program owns its uniform buffer, a CPU-side copy of the uniform bytes and
//! one render pipeline per (target format, blend) it has been drawn with.
//! Programs that fail to compile are stored as `None`; drawing with a missing
//! program is a no-op, so a single bad shader disables one pass instead of
//! taking the host down.

use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use crate::error::{CursorError, CursorResult};
use crate::gpu::bindings::{BindingTypeInfo, ProgramLayout};
use crate::gpu::preprocessor::{preprocess, KeywordSet};

/// How a pass combines its output with the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Blend {
    Replace,
    /// `src + dst * (1 - src.a)`, for premultiplied colors
    PremultipliedOver,
}

impl Blend {
    fn state(self) -> Option<wgpu::BlendState> {
        match self {
            Blend::Replace => None,
            Blend::PremultipliedOver => Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
        }
    }
}

/// Where a draw lands and how
pub struct DrawTarget<'a> {
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub load: wgpu::LoadOp<wgpu::Color>,
    pub blend: Blend,
}

impl<'a> DrawTarget<'a> {
    /// Overwrite every texel of a field
    pub fn field(view: &'a wgpu::TextureView, format: wgpu::TextureFormat) -> Self {
        Self {
            view,
            format,
            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            blend: Blend::Replace,
        }
    }
}

/// Parse and validate WGSL, rendering naga's diagnostics into the error
pub fn compile_module(name: &str, source: &str) -> CursorResult<naga::Module> {
    let module = naga::front::wgsl::parse_str(source).map_err(|error| CursorError::ShaderCompile {
        name: name.to_string(),
        diagnostics: error.emit_to_string(source),
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|error| CursorError::ShaderValidation {
            name: name.to_string(),
            diagnostics: error.emit_to_string(source),
        })?;

    Ok(module)
}

pub struct ShaderProgram {
    name: String,
    layout: ProgramLayout,
    module: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_buffer: Option<wgpu::Buffer>,
    uniform_data: Vec<u8>,
    pipelines: FxHashMap<(wgpu::TextureFormat, Blend), wgpu::RenderPipeline>,
}

impl ShaderProgram {
    pub fn new(device: &wgpu::Device, name: &str, source: &str, filterable: bool) -> CursorResult<Self> {
        let naga_module = compile_module(name, source)?;
        let layout = ProgramLayout::from_module(&naga_module);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(name),
            entries: &layout.layout_entries(filterable),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(name),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let uniform_data = vec![0u8; layout.uniform_size() as usize];
        let uniform_buffer = layout.has_uniforms().then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(name),
                contents: &uniform_data,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        });

        log::debug!(
            "[ShaderProgram::new] '{}' with {} bindings, {} uniform bytes",
            name,
            layout.bindings().len(),
            uniform_data.len()
        );

        Ok(Self {
            name: name.to_string(),
            layout,
            module,
            bind_group_layout,
            pipeline_layout,
            uniform_buffer,
            uniform_data,
            pipelines: FxHashMap::default(),
        })
    }

    /// Like [`ShaderProgram::new`] but logs a failure and yields no program
    pub fn try_new(device: &wgpu::Device, name: &str, source: &str, filterable: bool) -> Option<Self> {
        match Self::new(device, name, source, filterable) {
            Ok(program) => Some(program),
            Err(error) => {
                log::error!("[ShaderProgram::try_new] {}", error);
                None
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &ProgramLayout {
        &self.layout
    }

    /// Stage a uniform value by member name. Returns false when the program
    /// has no such member (the value is dropped).
    pub fn set_uniform<T: bytemuck::Pod>(&mut self, name: &str, value: T) -> bool {
        let Some(slot) = self.layout.uniform(name) else {
            log::trace!("[ShaderProgram::set_uniform] '{}' has no uniform '{}'", self.name, name);
            return false;
        };
        let bytes = bytemuck::bytes_of(&value);
        if bytes.len() > slot.size as usize {
            log::warn!(
                "[ShaderProgram::set_uniform] '{}.{}' holds {} bytes, got {}",
                self.name,
                name,
                slot.size,
                bytes.len()
            );
            return false;
        }
        let start = slot.offset as usize;
        self.uniform_data[start..start + bytes.len()].copy_from_slice(bytes);
        true
    }

    fn pipeline(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat, blend: Blend) {
        if self.pipelines.contains_key(&(format, blend)) {
            return;
        }
        log::debug!(
            "[ShaderProgram::pipeline] Creating '{}' pipeline for {:?} ({:?})",
            self.name,
            format,
            blend
        );
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&self.name),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.module,
                entry_point: "vs_main",
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.module,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: blend.state(),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });
        self.pipelines.insert((format, blend), pipeline);
    }

    /// Draw the full-screen quad into `target`, sampling the named textures.
    ///
    /// Each draw is its own submission so the staged uniforms written here
    /// are the ones this pass sees.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: DrawTarget<'_>,
        textures: &[(&str, &wgpu::TextureView)],
        sampler: &wgpu::Sampler,
    ) {
        self.pipeline(device, target.format, target.blend);

        let mut entries = Vec::with_capacity(self.layout.bindings().len());
        for usage in self.layout.bindings() {
            let resource = match usage.ty {
                BindingTypeInfo::UniformBuffer => match &self.uniform_buffer {
                    Some(buffer) => buffer.as_entire_binding(),
                    None => return,
                },
                BindingTypeInfo::Texture2D => {
                    match textures.iter().find(|(name, _)| *name == usage.name) {
                        Some((_, view)) => wgpu::BindingResource::TextureView(view),
                        None => {
                            log::error!(
                                "[ShaderProgram::draw] '{}' needs texture '{}'",
                                self.name,
                                usage.name
                            );
                            return;
                        }
                    }
                }
                BindingTypeInfo::Sampler => wgpu::BindingResource::Sampler(sampler),
            };
            entries.push(wgpu::BindGroupEntry {
                binding: usage.binding,
                resource,
            });
        }

        if let Some(buffer) = &self.uniform_buffer {
            queue.write_buffer(buffer, 0, &self.uniform_data);
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&self.name),
            layout: &self.bind_group_layout,
            entries: &entries,
        });

        let Some(pipeline) = self.pipelines.get(&(target.format, target.blend)) else {
            return;
        };
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(&self.name),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(&self.name),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: target.load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..4, 0..1);
        }
        queue.submit(std::iter::once(encoder.finish()));
    }
}

/// A shader source plus its compiled keyword variants
pub struct Material {
    name: &'static str,
    source: String,
    filterable: bool,
    variants: FxHashMap<KeywordSet, Option<ShaderProgram>>,
}

impl Material {
    pub fn new(name: &'static str, source: String, filterable: bool) -> Self {
        Self {
            name,
            source,
            filterable,
            variants: FxHashMap::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The program specialised for `keywords`, compiled on first use.
    /// A variant that failed once stays empty.
    pub fn variant(&mut self, device: &wgpu::Device, keywords: &KeywordSet) -> Option<&mut ShaderProgram> {
        if !self.variants.contains_key(keywords) {
            let source = preprocess(&self.source, keywords);
            let label = format!("{}[{}]", self.name, keywords);
            let program = ShaderProgram::try_new(device, &label, &source, self.filterable);
            self.variants.insert(keywords.clone(), program);
        }
        self.variants.get_mut(keywords).and_then(Option::as_mut)
    }

    pub fn compiled_variants(&self) -> usize {
        self.variants.values().filter(|program| program.is_some()).count()
    }
}
