// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Render and compute pipelines as the command buffer consumes them.
use crate::images::shader::{Shader, ShaderKind};
use crate::imp;
use std::fmt::Formatter;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DepthBias {
    pub enabled: bool,
    pub depth_bias: f32,
    pub slope_scale: f32,
    pub clamp: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StencilReferences {
    pub enabled: bool,
    pub front: u32,
    pub back: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlendConstants {
    pub enabled: bool,
    pub color: [f32; 4],
}

/// Fixed-function state a render pipeline carries but the native pipeline object does
/// not, applied to the encoder whenever the pipeline is (re)bound.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RasterState {
    pub cull_mode: imp::CullMode,
    pub fill_mode: imp::TriangleFillMode,
    pub clip_mode: imp::DepthClipMode,
    pub winding: imp::Winding,
    pub depth_bias: DepthBias,
    pub stencil: StencilReferences,
    pub blend: BlendConstants,
}

impl RasterState {
    pub fn apply(&self, encoder: &imp::RenderCommandEncoder) {
        encoder.set_cull_mode(self.cull_mode);
        encoder.set_triangle_fill_mode(self.fill_mode);
        encoder.set_depth_clip_mode(self.clip_mode);
        encoder.set_front_facing_winding(self.winding);
        if self.depth_bias.enabled {
            encoder.set_depth_bias(
                self.depth_bias.depth_bias,
                self.depth_bias.slope_scale,
                self.depth_bias.clamp,
            );
        }
        if self.stencil.enabled {
            encoder.set_stencil_reference_values(self.stencil.front, self.stencil.back);
        }
        if self.blend.enabled {
            encoder.set_blend_color(self.blend.color);
        }
    }
}

/// What to build a [RenderPipeline] for.
#[derive(Debug, Clone, Default)]
pub struct RenderPipelineDescription {
    pub label: String,
    pub color_formats: Vec<imp::PixelFormat>,
    pub depth_format: imp::PixelFormat,
    pub stencil_format: imp::PixelFormat,
    pub sample_count: u32,
    pub primitive: imp::PrimitiveType,
    pub raster_state: RasterState,
    pub depth_stencil: Option<imp::DepthStencilDescriptor>,
}

#[derive(Debug)]
pub struct PipelineError(imp::Error);
impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}
impl std::error::Error for PipelineError {}

#[derive(Debug)]
pub struct RenderPipeline {
    state: imp::RenderPipelineState,
    depth_stencil: Option<imp::DepthStencilState>,
    shader: Arc<Shader>,
    primitive: imp::PrimitiveType,
    raster_state: RasterState,
}

impl RenderPipeline {
    /// # Panics
    /// If `shader` is not a render shader.
    pub fn new(
        device: &imp::Device,
        shader: Arc<Shader>,
        description: &RenderPipelineDescription,
    ) -> Result<Arc<Self>, PipelineError> {
        let ShaderKind::Render { vertex, fragment } = shader.kind() else {
            panic!("{} is not a render shader", shader.name());
        };
        let mut descriptor = imp::RenderPipelineDescriptor {
            label: description.label.clone(),
            vertex_function: Some(vertex.clone()),
            fragment_function: fragment.clone(),
            depth_format: description.depth_format,
            stencil_format: description.stencil_format,
            sample_count: description.sample_count.max(1),
            ..Default::default()
        };
        for (slot, format) in descriptor
            .color_formats
            .iter_mut()
            .zip(&description.color_formats)
        {
            *slot = *format;
        }
        let state = device
            .new_render_pipeline_state(&descriptor)
            .map_err(PipelineError)?;
        let depth_stencil = description
            .depth_stencil
            .clone()
            .map(|d| device.new_depth_stencil_state(d));
        Ok(Arc::new(RenderPipeline {
            state,
            depth_stencil,
            shader,
            primitive: description.primitive,
            raster_state: description.raster_state,
        }))
    }

    pub fn state(&self) -> &imp::RenderPipelineState {
        &self.state
    }

    pub fn depth_stencil(&self) -> Option<&imp::DepthStencilState> {
        self.depth_stencil.as_ref()
    }

    pub fn shader(&self) -> &Arc<Shader> {
        &self.shader
    }

    pub fn primitive(&self) -> imp::PrimitiveType {
        self.primitive
    }

    pub fn raster_state(&self) -> &RasterState {
        &self.raster_state
    }
}

#[derive(Debug)]
pub struct ComputePipeline {
    state: imp::ComputePipelineState,
    shader: Arc<Shader>,
    local_size: imp::Size,
}

impl ComputePipeline {
    /// # Panics
    /// If `shader` is not a compute shader.
    pub fn new(device: &imp::Device, shader: Arc<Shader>) -> Result<Arc<Self>, PipelineError> {
        let ShaderKind::Compute { kernel, local_size } = shader.kind() else {
            panic!("{} is not a compute shader", shader.name());
        };
        let local_size = *local_size;
        let state = device
            .new_compute_pipeline_state(kernel, local_size)
            .map_err(PipelineError)?;
        Ok(Arc::new(ComputePipeline {
            state,
            shader,
            local_size,
        }))
    }

    pub fn state(&self) -> &imp::ComputePipelineState {
        &self.state
    }

    pub fn shader(&self) -> &Arc<Shader> {
        &self.shader
    }

    /// Threads per threadgroup, fixed by the shader.
    pub fn local_size(&self) -> imp::Size {
        self.local_size
    }
}

/// Either kind of pipeline.
#[derive(Debug, Clone)]
pub enum Pipeline {
    Render(Arc<RenderPipeline>),
    Compute(Arc<ComputePipeline>),
}

impl From<Arc<RenderPipeline>> for Pipeline {
    fn from(p: Arc<RenderPipeline>) -> Self {
        Pipeline::Render(p)
    }
}

impl From<Arc<ComputePipeline>> for Pipeline {
    fn from(p: Arc<ComputePipeline>) -> Self {
        Pipeline::Compute(p)
    }
}
