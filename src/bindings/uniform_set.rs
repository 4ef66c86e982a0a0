// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Uniform sets and their per-shader argument buffers.

A [UniformSet] is a list of resources bound at one set index.  Before a shader can see
them, they have to be written into an argument buffer laid out the way *that shader*
expects ([UniformSetLayout]).  The result, a [BoundUniformSet], is cached on the uniform
set keyed by shader, so binding the same set to the same shader twice is free.

The cache lives exactly as long as the uniform set.  Binding at a different set index
does not invalidate it; the index is applied when the argument buffer is bound to an
encoder, not when it is built.
*/
use crate::bindings::visible_to::{ShaderStage, ShaderStageUsage, StageResourceUsage};
use crate::images::shader::Shader;
use crate::imp;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Argument buffer alignment for each stage's region.
const STAGE_REGION_ALIGNMENT: usize = 16;

/// Where one uniform lands in one stage's argument buffer region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingInfo {
    pub data_type: imp::DataType,
    pub index: u32,
    pub access: imp::BindingAccess,
    pub usage: imp::ResourceUsage,
    pub array_length: u32,
}

impl BindingInfo {
    fn argument(&self) -> imp::ArgumentDescriptor {
        imp::ArgumentDescriptor {
            data_type: self.data_type,
            index: self.index,
            access: self.access,
            array_length: self.array_length,
        }
    }
}

/// Reflection data for one uniform of a set.
#[derive(Debug, Clone, Default)]
pub struct UniformInfo {
    pub binding: u32,
    pub active_stages: ShaderStageUsage,
    pub bindings: HashMap<ShaderStage, BindingInfo>,
    /// Second slot, for uniforms that occupy two (a texture and its sampler).
    pub bindings_secondary: HashMap<ShaderStage, BindingInfo>,
}

/// How a shader lays out one uniform set.
#[derive(Debug, Clone)]
pub struct UniformSetLayout {
    uniforms: Vec<UniformInfo>,
    buffer_size: usize,
    offsets: HashMap<ShaderStage, usize>,
    encoders: HashMap<ShaderStage, imp::ArgumentEncoder>,
}

impl UniformSetLayout {
    /// Builds per-stage argument encoders and lays their regions out back to back.
    pub fn new(device: &imp::Device, uniforms: Vec<UniformInfo>) -> Self {
        let mut offsets = HashMap::new();
        let mut encoders = HashMap::new();
        let mut buffer_size = 0;
        for stage in ShaderStage::ALL {
            let arguments: Vec<_> = uniforms
                .iter()
                .flat_map(|u| {
                    u.bindings
                        .get(&stage)
                        .into_iter()
                        .chain(u.bindings_secondary.get(&stage))
                })
                .map(BindingInfo::argument)
                .collect();
            if arguments.is_empty() {
                continue;
            }
            let encoder = device.new_argument_encoder(arguments);
            offsets.insert(stage, buffer_size);
            buffer_size += encoder.encoded_length().next_multiple_of(STAGE_REGION_ALIGNMENT);
            encoders.insert(stage, encoder);
        }
        UniformSetLayout {
            uniforms,
            buffer_size,
            offsets,
            encoders,
        }
    }

    pub fn uniforms(&self) -> &[UniformInfo] {
        &self.uniforms
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Offset of `stage`'s region in the argument buffer, if the stage has one.
    pub fn offset(&self, stage: ShaderStage) -> Option<usize> {
        self.offsets.get(&stage).copied()
    }

    pub fn encoder(&self, stage: ShaderStage) -> Option<&imp::ArgumentEncoder> {
        self.encoders.get(&stage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Sampler,
    SamplerWithTexture,
    Texture,
    Image,
    UniformBuffer,
    StorageBuffer,
    InputAttachment,
}

#[derive(Debug, Clone)]
pub enum UniformResource {
    Buffer(imp::Buffer),
    Texture(imp::Texture),
    Sampler(imp::SamplerState),
}

/// One uniform's resources, in binding order.
///
/// A [UniformType::SamplerWithTexture] lists sampler/texture pairs.
#[derive(Debug, Clone)]
pub struct BoundUniform {
    pub uniform_type: UniformType,
    pub binding: u32,
    pub ids: Vec<UniformResource>,
}

impl BoundUniform {
    fn textures(&self) -> Vec<imp::Texture> {
        self.ids
            .iter()
            .filter_map(|r| match r {
                UniformResource::Texture(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    fn samplers(&self) -> Vec<imp::SamplerState> {
        self.ids
            .iter()
            .filter_map(|r| match r {
                UniformResource::Sampler(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn buffer(&self) -> &imp::Buffer {
        self.ids
            .iter()
            .find_map(|r| match r {
                UniformResource::Buffer(b) => Some(b),
                _ => None,
            })
            .unwrap_or_else(|| panic!("{:?} uniform at binding {} has no buffer", self.uniform_type, self.binding))
    }
}

/// A uniform set resolved for one shader: an argument buffer, and the usage of every
/// resource it references.
#[derive(Debug)]
pub struct BoundUniformSet {
    buffer: Option<imp::Buffer>,
    resources: HashMap<imp::Resource, StageResourceUsage>,
}

impl BoundUniformSet {
    /// `None` when the shader's layout for this set occupies no bytes.
    pub fn buffer(&self) -> Option<&imp::Buffer> {
        self.buffer.as_ref()
    }

    pub fn usage(&self, resource: &imp::Resource) -> Option<StageResourceUsage> {
        self.resources.get(resource).copied()
    }

    /// Resources with their merged usage, ordered by identity.
    pub fn resources(&self) -> Vec<(&imp::Resource, StageResourceUsage)> {
        let mut v: Vec<_> = self.resources.iter().map(|(r, u)| (r, *u)).collect();
        v.sort_by_key(|(r, _)| r.id());
        v
    }
}

#[derive(Debug)]
pub struct UniformSet {
    index: u32,
    uniforms: Vec<BoundUniform>,
    bound: Mutex<HashMap<imp::ObjectId, Arc<BoundUniformSet>>>,
}

impl UniformSet {
    /// `index` is the set of the shader layout these uniforms were written against.
    pub fn new(index: u32, uniforms: Vec<BoundUniform>) -> Self {
        UniformSet {
            index,
            uniforms,
            bound: Mutex::new(HashMap::new()),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn uniforms(&self) -> &[BoundUniform] {
        &self.uniforms
    }

    /// Number of shaders this set has been resolved for.
    pub fn bound_shader_count(&self) -> usize {
        self.bound.lock().unwrap().len()
    }

    /// The argument buffer and resource usage of this set as `shader` sees it.
    ///
    /// Built on first use per shader, then returned from the cache.
    ///
    /// # Panics
    /// If `shader` has no layout at this set's index, or the layout's uniform count
    /// disagrees with this set's.
    pub fn bound_uniform_set(&self, shader: &Shader, device: &imp::Device) -> Arc<BoundUniformSet> {
        let mut bound = self.bound.lock().unwrap();
        if let Some(b) = bound.get(&shader.id()) {
            return b.clone();
        }
        let layout = shader.set(self.index).unwrap_or_else(|| {
            panic!("shader {} has no uniform set {}", shader.name(), self.index)
        });
        assert_eq!(
            layout.uniforms().len(),
            self.uniforms.len(),
            "uniform set {} does not match shader {}",
            self.index,
            shader.name()
        );
        let b = Arc::new(self.build(layout, device));
        logwise::trace_sync!(
            "built argument buffer for set {index} of shader {shader}",
            index = self.index,
            shader = logwise::privacy::LogIt(shader.name())
        );
        bound.insert(shader.id(), b.clone());
        b
    }

    fn build(&self, layout: &UniformSetLayout, device: &imp::Device) -> BoundUniformSet {
        let mut resources: HashMap<imp::Resource, StageResourceUsage> = HashMap::new();
        let mut add_usage = |resource: imp::Resource, stage: ShaderStage, usage: imp::ResourceUsage| {
            *resources.entry(resource).or_default() |= StageResourceUsage::new(stage, usage);
        };

        let buffer = if layout.buffer_size() > 0 {
            Some(device.new_buffer(layout.buffer_size(), &format!("uniform set {}", self.index)))
        } else {
            None
        };
        if let Some(buffer) = &buffer {
            for stage in ShaderStage::ALL {
                let (Some(encoder), Some(offset)) = (layout.encoder(stage), layout.offset(stage))
                else {
                    continue;
                };
                encoder.set_argument_buffer(buffer, offset);
                for (uniform, info) in self.uniforms.iter().zip(layout.uniforms()) {
                    let Some(bi) = info.bindings.get(&stage) else {
                        continue;
                    };
                    if !info.active_stages.contains(stage.usage()) {
                        continue;
                    }
                    match uniform.uniform_type {
                        UniformType::Sampler => {
                            encoder.set_sampler_states(&uniform.samplers(), bi.index);
                        }
                        UniformType::SamplerWithTexture => {
                            let textures = uniform.textures();
                            encoder.set_textures(&textures, bi.index);
                            if let Some(secondary) = info.bindings_secondary.get(&stage) {
                                encoder.set_sampler_states(&uniform.samplers(), secondary.index);
                            }
                            for t in textures {
                                add_usage(imp::Resource::Texture(t), stage, bi.usage);
                            }
                        }
                        UniformType::Texture | UniformType::Image | UniformType::InputAttachment => {
                            let textures = uniform.textures();
                            encoder.set_textures(&textures, bi.index);
                            for t in textures {
                                add_usage(imp::Resource::Texture(t), stage, bi.usage);
                            }
                        }
                        UniformType::UniformBuffer | UniformType::StorageBuffer => {
                            let b = uniform.buffer();
                            encoder.set_buffer(b, 0, bi.index);
                            add_usage(imp::Resource::Buffer(b.clone()), stage, bi.usage);
                        }
                    }
                }
            }
        }
        BoundUniformSet { buffer, resources }
    }
}
