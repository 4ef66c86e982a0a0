// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Render, compute and blit encoders.
//!
//! An encoder is consumed by `end_encoding`.  Dropping one without ending it is a bug in
//! the caller; it is logged and the command buffer stays unusable for further encoders.
use super::journal::{BindTarget, EncoderKind, NativeCall};
use super::objects::{
    Buffer, ComputePipelineState, CullMode, DepthClipMode, DepthStencilState, IndexType,
    LoadAction, MAX_COLOR_ATTACHMENTS, PrimitiveType, RenderPipelineState, RenderStages,
    Resource, ResourceUsage, ScissorRect, Size, StoreAction, Texture, TriangleFillMode, Viewport,
    Winding,
};
use super::queue::NativeCommandBuffer;

#[derive(Debug, Clone)]
pub struct ColorAttachmentDescriptor {
    pub texture: Texture,
    pub load_action: LoadAction,
    pub store_action: StoreAction,
    pub clear_color: [f64; 4],
}

#[derive(Debug, Clone)]
pub struct DepthAttachmentDescriptor {
    pub texture: Texture,
    pub load_action: LoadAction,
    pub store_action: StoreAction,
    pub clear_depth: f64,
}

#[derive(Debug, Clone)]
pub struct StencilAttachmentDescriptor {
    pub texture: Texture,
    pub load_action: LoadAction,
    pub store_action: StoreAction,
    pub clear_stencil: u32,
}

/// Native description of the targets for one render encoder.
#[derive(Debug, Clone)]
pub struct RenderPassDescriptor {
    pub color_attachments: [Option<ColorAttachmentDescriptor>; MAX_COLOR_ATTACHMENTS],
    pub depth_attachment: Option<DepthAttachmentDescriptor>,
    pub stencil_attachment: Option<StencilAttachmentDescriptor>,
}

impl Default for RenderPassDescriptor {
    fn default() -> Self {
        RenderPassDescriptor {
            color_attachments: std::array::from_fn(|_| None),
            depth_attachment: None,
            stencil_attachment: None,
        }
    }
}

impl RenderPassDescriptor {
    /// Load actions in slot order: colors, then depth, then stencil.
    pub fn load_actions(&self) -> Vec<LoadAction> {
        self.color_attachments
            .iter()
            .flatten()
            .map(|c| c.load_action)
            .chain(self.depth_attachment.iter().map(|d| d.load_action))
            .chain(self.stencil_attachment.iter().map(|s| s.load_action))
            .collect()
    }

    /// Turns every load action into [LoadAction::Load], for restarting a pass.
    pub fn with_load_actions_preserved(&self) -> Self {
        let mut copy = self.clone();
        for c in copy.color_attachments.iter_mut().flatten() {
            c.load_action = LoadAction::Load;
        }
        if let Some(d) = copy.depth_attachment.as_mut() {
            d.load_action = LoadAction::Load;
        }
        if let Some(s) = copy.stencil_attachment.as_mut() {
            s.load_action = LoadAction::Load;
        }
        copy
    }
}

#[derive(Debug)]
pub struct RenderCommandEncoder {
    command_buffer: NativeCommandBuffer,
    ended: bool,
}

impl RenderCommandEncoder {
    pub(super) fn new(command_buffer: NativeCommandBuffer) -> Self {
        RenderCommandEncoder {
            command_buffer,
            ended: false,
        }
    }

    fn record(&self, call: NativeCall) {
        self.command_buffer.journal().record(call)
    }

    pub fn set_render_pipeline_state(&self, state: &RenderPipelineState) {
        self.record(NativeCall::SetRenderPipelineState(state.id()));
    }
    pub fn set_cull_mode(&self, mode: CullMode) {
        self.record(NativeCall::SetCullMode(mode));
    }
    pub fn set_triangle_fill_mode(&self, mode: TriangleFillMode) {
        self.record(NativeCall::SetTriangleFillMode(mode));
    }
    pub fn set_depth_clip_mode(&self, mode: DepthClipMode) {
        self.record(NativeCall::SetDepthClipMode(mode));
    }
    pub fn set_front_facing_winding(&self, winding: Winding) {
        self.record(NativeCall::SetFrontFacingWinding(winding));
    }
    pub fn set_depth_bias(&self, depth_bias: f32, slope_scale: f32, clamp: f32) {
        self.record(NativeCall::SetDepthBias {
            depth_bias,
            slope_scale,
            clamp,
        });
    }
    pub fn set_stencil_reference_values(&self, front: u32, back: u32) {
        self.record(NativeCall::SetStencilReferenceValues { front, back });
    }
    pub fn set_blend_color(&self, color: [f32; 4]) {
        self.record(NativeCall::SetBlendColor(color));
    }
    pub fn set_depth_stencil_state(&self, state: &DepthStencilState) {
        self.record(NativeCall::SetDepthStencilState(state.id()));
    }
    pub fn set_viewports(&self, viewports: &[Viewport]) {
        self.record(NativeCall::SetViewports(viewports.to_vec()));
    }
    pub fn set_scissor_rect(&self, rect: ScissorRect) {
        self.record(NativeCall::SetScissorRect(rect));
    }
    pub fn set_vertex_buffer(&self, buffer: &Buffer, offset: u64, index: u32) {
        self.record(NativeCall::SetBuffer {
            target: BindTarget::Vertex,
            index,
            buffer: buffer.id(),
            offset,
        });
    }
    pub fn set_fragment_buffer(&self, buffer: &Buffer, offset: u64, index: u32) {
        self.record(NativeCall::SetBuffer {
            target: BindTarget::Fragment,
            index,
            buffer: buffer.id(),
            offset,
        });
    }
    pub fn set_vertex_bytes(&self, bytes: &[u8], index: u32) {
        self.record(NativeCall::SetBytes {
            target: BindTarget::Vertex,
            index,
            bytes: bytes.to_vec(),
        });
    }
    pub fn set_fragment_bytes(&self, bytes: &[u8], index: u32) {
        self.record(NativeCall::SetBytes {
            target: BindTarget::Fragment,
            index,
            bytes: bytes.to_vec(),
        });
    }
    pub fn use_resource(&self, resource: &Resource, usage: ResourceUsage, stages: RenderStages) {
        self.record(NativeCall::UseResource {
            resource: resource.id(),
            usage,
            stages,
        });
    }
    pub fn draw_primitives(
        &self,
        primitive: PrimitiveType,
        vertex_start: u32,
        vertex_count: u32,
        instance_count: u32,
        base_instance: u32,
    ) {
        self.record(NativeCall::DrawPrimitives {
            primitive,
            vertex_start,
            vertex_count,
            instance_count,
            base_instance,
        });
    }
    #[allow(clippy::too_many_arguments)]
    pub fn draw_indexed_primitives(
        &self,
        primitive: PrimitiveType,
        index_count: u32,
        index_type: IndexType,
        index_buffer: &Buffer,
        index_buffer_offset: u64,
        instance_count: u32,
        base_vertex: i32,
        base_instance: u32,
    ) {
        self.record(NativeCall::DrawIndexedPrimitives {
            primitive,
            index_count,
            index_type,
            index_buffer: index_buffer.id(),
            index_buffer_offset,
            instance_count,
            base_vertex,
            base_instance,
        });
    }

    pub fn end_encoding(mut self) {
        self.ended = true;
        self.command_buffer.end_encoder(EncoderKind::Render);
    }
}

impl Drop for RenderCommandEncoder {
    fn drop(&mut self) {
        if !self.ended {
            logwise::warn_sync!("render encoder dropped without end_encoding");
        }
    }
}

#[derive(Debug)]
pub struct ComputeCommandEncoder {
    command_buffer: NativeCommandBuffer,
    ended: bool,
}

impl ComputeCommandEncoder {
    pub(super) fn new(command_buffer: NativeCommandBuffer) -> Self {
        ComputeCommandEncoder {
            command_buffer,
            ended: false,
        }
    }

    fn record(&self, call: NativeCall) {
        self.command_buffer.journal().record(call)
    }

    pub fn set_compute_pipeline_state(&self, state: &ComputePipelineState) {
        self.record(NativeCall::SetComputePipelineState(state.id()));
    }
    pub fn set_buffer(&self, buffer: &Buffer, offset: u64, index: u32) {
        self.record(NativeCall::SetBuffer {
            target: BindTarget::Compute,
            index,
            buffer: buffer.id(),
            offset,
        });
    }
    pub fn set_bytes(&self, bytes: &[u8], index: u32) {
        self.record(NativeCall::SetBytes {
            target: BindTarget::Compute,
            index,
            bytes: bytes.to_vec(),
        });
    }
    pub fn use_resource(&self, resource: &Resource, usage: ResourceUsage) {
        self.record(NativeCall::UseResource {
            resource: resource.id(),
            usage,
            stages: RenderStages::empty(),
        });
    }
    pub fn dispatch_threadgroups(&self, threadgroups: Size, threads_per_threadgroup: Size) {
        self.record(NativeCall::DispatchThreadgroups {
            threadgroups,
            threads_per_threadgroup,
        });
    }
    pub fn dispatch_threadgroups_indirect(
        &self,
        buffer: &Buffer,
        offset: u64,
        threads_per_threadgroup: Size,
    ) {
        self.record(NativeCall::DispatchThreadgroupsIndirect {
            buffer: buffer.id(),
            offset,
            threads_per_threadgroup,
        });
    }

    pub fn end_encoding(mut self) {
        self.ended = true;
        self.command_buffer.end_encoder(EncoderKind::Compute);
    }
}

impl Drop for ComputeCommandEncoder {
    fn drop(&mut self) {
        if !self.ended {
            logwise::warn_sync!("compute encoder dropped without end_encoding");
        }
    }
}

#[derive(Debug)]
pub struct BlitCommandEncoder {
    command_buffer: NativeCommandBuffer,
    ended: bool,
}

impl BlitCommandEncoder {
    pub(super) fn new(command_buffer: NativeCommandBuffer) -> Self {
        BlitCommandEncoder {
            command_buffer,
            ended: false,
        }
    }

    fn record(&self, call: NativeCall) {
        self.command_buffer.journal().record(call)
    }

    pub fn copy_from_buffer(
        &self,
        source: &Buffer,
        source_offset: u64,
        destination: &Buffer,
        destination_offset: u64,
        size: u64,
    ) {
        self.record(NativeCall::CopyBuffer {
            source: source.id(),
            source_offset,
            destination: destination.id(),
            destination_offset,
            size,
        });
    }
    pub fn fill_buffer(&self, buffer: &Buffer, range: std::ops::Range<u64>, value: u8) {
        self.record(NativeCall::FillBuffer {
            buffer: buffer.id(),
            offset: range.start,
            length: range.end - range.start,
            value,
        });
    }
    pub fn copy_from_texture(&self, source: &Texture, destination: &Texture) {
        self.record(NativeCall::CopyTexture {
            source: source.id(),
            destination: destination.id(),
        });
    }

    pub fn end_encoding(mut self) {
        self.ended = true;
        self.command_buffer.end_encoder(EncoderKind::Blit);
    }
}

impl Drop for BlitCommandEncoder {
    fn drop(&mut self) {
        if !self.ended {
            logwise::warn_sync!("blit encoder dropped without end_encoding");
        }
    }
}
