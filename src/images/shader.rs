// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Compiled shaders and their reflected binding layout.
use crate::bindings::uniform_set::UniformSetLayout;
use crate::bindings::visible_to::ShaderStage;
use crate::imp;
use std::collections::HashMap;
use std::sync::Arc;

/// Where push constants land, per stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushConstantLayout {
    /// Size in bytes.
    pub size: u32,
    /// Buffer index each stage reads push constants from.
    pub bindings: HashMap<ShaderStage, u32>,
}

#[derive(Debug, Clone)]
pub enum ShaderKind {
    Render {
        vertex: imp::Function,
        fragment: Option<imp::Function>,
    },
    Compute {
        kernel: imp::Function,
        local_size: imp::Size,
    },
}

/// The encoder push constants are written to.
#[derive(Debug, Clone, Copy)]
pub enum PushConstantTarget<'a> {
    Render(&'a imp::RenderCommandEncoder),
    Compute(&'a imp::ComputeCommandEncoder),
}

#[derive(Debug)]
pub struct Shader {
    id: imp::ObjectId,
    name: String,
    kind: ShaderKind,
    sets: Vec<UniformSetLayout>,
    push_constants: Option<PushConstantLayout>,
}

impl Shader {
    pub fn new_render(
        device: &imp::Device,
        name: &str,
        vertex: imp::Function,
        fragment: Option<imp::Function>,
        sets: Vec<UniformSetLayout>,
        push_constants: Option<PushConstantLayout>,
    ) -> Arc<Self> {
        Arc::new(Shader {
            id: device.next_object_id(),
            name: name.to_string(),
            kind: ShaderKind::Render { vertex, fragment },
            sets,
            push_constants,
        })
    }

    pub fn new_compute(
        device: &imp::Device,
        name: &str,
        kernel: imp::Function,
        local_size: imp::Size,
        sets: Vec<UniformSetLayout>,
        push_constants: Option<PushConstantLayout>,
    ) -> Arc<Self> {
        Arc::new(Shader {
            id: device.next_object_id(),
            name: name.to_string(),
            kind: ShaderKind::Compute { kernel, local_size },
            sets,
            push_constants,
        })
    }

    pub fn id(&self) -> imp::ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ShaderKind {
        &self.kind
    }

    pub fn sets(&self) -> &[UniformSetLayout] {
        &self.sets
    }

    pub fn set(&self, index: u32) -> Option<&UniformSetLayout> {
        self.sets.get(index as usize)
    }

    pub fn push_constants(&self) -> Option<&PushConstantLayout> {
        self.push_constants.as_ref()
    }

    /// Writes `data` to every stage that declares push constants.
    ///
    /// # Panics
    /// If `data` is larger than the declared push constant block.
    pub fn encode_push_constant_data(&self, data: &[u32], target: PushConstantTarget<'_>) {
        let Some(layout) = &self.push_constants else {
            return;
        };
        let bytes: Vec<u8> = data.iter().flat_map(|w| w.to_le_bytes()).collect();
        assert!(
            bytes.len() <= layout.size as usize,
            "{} bytes of push constants exceed {}'s block of {}",
            bytes.len(),
            self.name,
            layout.size
        );
        match target {
            PushConstantTarget::Render(encoder) => {
                if let Some(index) = layout.bindings.get(&ShaderStage::Vertex) {
                    encoder.set_vertex_bytes(&bytes, *index);
                }
                if let Some(index) = layout.bindings.get(&ShaderStage::Fragment) {
                    encoder.set_fragment_bytes(&bytes, *index);
                }
            }
            PushConstantTarget::Compute(encoder) => {
                if let Some(index) = layout.bindings.get(&ShaderStage::Compute) {
                    encoder.set_bytes(&bytes, *index);
                }
            }
        }
    }
}
