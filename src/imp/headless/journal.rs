// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A record of every native call a device has seen.

The headless backend has no GPU to talk to, so what it does instead is write down
what it was asked to do.  Tests (and debugging tools) read the journal back.

Recording is opt-in, see [super::DeviceDescriptor::record_calls].  A journal that is not
recording drops every call without taking a lock and always reads back empty.
*/
use super::objects::{
    CullMode, DepthClipMode, IndexType, LoadAction, ObjectId, PrimitiveType, RenderStages,
    ResourceUsage, ScissorRect, Size, TriangleFillMode, Viewport, Winding,
};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderKind {
    Render,
    Compute,
    Blit,
}

/// Where a buffer or bytes binding lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindTarget {
    Vertex,
    Fragment,
    Compute,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    // device
    NewBuffer { buffer: ObjectId, length: usize },
    NewTexture { texture: ObjectId, width: u32, height: u32 },
    NewLibrary { library: ObjectId, label: String },
    NewRenderPipelineState { pipeline: ObjectId, label: String },
    NewComputePipelineState { pipeline: ObjectId, label: String },
    NewDepthStencilState { state: ObjectId },
    // layer
    NextDrawable { layer: ObjectId, drawable: ObjectId },
    // command buffer
    NewCommandBuffer { command_buffer: ObjectId },
    BeginEncoder { command_buffer: ObjectId, kind: EncoderKind, load_actions: Vec<LoadAction> },
    EndEncoding { command_buffer: ObjectId, kind: EncoderKind },
    PresentDrawable { command_buffer: ObjectId, drawable: ObjectId },
    Commit { command_buffer: ObjectId },
    PushDebugGroup(String),
    PopDebugGroup,
    InsertDebugSignpost(String),
    // render encoder
    SetRenderPipelineState(ObjectId),
    SetCullMode(CullMode),
    SetTriangleFillMode(TriangleFillMode),
    SetDepthClipMode(DepthClipMode),
    SetFrontFacingWinding(Winding),
    SetDepthBias { depth_bias: f32, slope_scale: f32, clamp: f32 },
    SetStencilReferenceValues { front: u32, back: u32 },
    SetBlendColor([f32; 4]),
    SetDepthStencilState(ObjectId),
    SetViewports(Vec<Viewport>),
    SetScissorRect(ScissorRect),
    SetBuffer { target: BindTarget, index: u32, buffer: ObjectId, offset: u64 },
    SetBytes { target: BindTarget, index: u32, bytes: Vec<u8> },
    UseResource { resource: ObjectId, usage: ResourceUsage, stages: RenderStages },
    DrawPrimitives {
        primitive: PrimitiveType,
        vertex_start: u32,
        vertex_count: u32,
        instance_count: u32,
        base_instance: u32,
    },
    DrawIndexedPrimitives {
        primitive: PrimitiveType,
        index_count: u32,
        index_type: IndexType,
        index_buffer: ObjectId,
        index_buffer_offset: u64,
        instance_count: u32,
        base_vertex: i32,
        base_instance: u32,
    },
    // compute encoder
    SetComputePipelineState(ObjectId),
    DispatchThreadgroups { threadgroups: Size, threads_per_threadgroup: Size },
    DispatchThreadgroupsIndirect { buffer: ObjectId, offset: u64, threads_per_threadgroup: Size },
    // blit encoder
    CopyBuffer { source: ObjectId, source_offset: u64, destination: ObjectId, destination_offset: u64, size: u64 },
    FillBuffer { buffer: ObjectId, offset: u64, length: u64, value: u8 },
    CopyTexture { source: ObjectId, destination: ObjectId },
}

/// Shared, append-only call log.
///
/// The default journal does not record.
#[derive(Debug, Clone, Default)]
pub struct Journal(Option<Arc<Mutex<Vec<NativeCall>>>>);

impl Journal {
    /// A journal that keeps every call it is given.
    pub fn recording() -> Self {
        Journal(Some(Arc::new(Mutex::new(Vec::new()))))
    }

    pub fn is_recording(&self) -> bool {
        self.0.is_some()
    }

    pub(super) fn record(&self, call: NativeCall) {
        let Some(calls) = &self.0 else {
            return;
        };
        logwise::trace_sync!("native {call}", call = logwise::privacy::LogIt(&call));
        calls.lock().unwrap().push(call);
    }

    /// A snapshot of everything recorded so far.
    pub fn calls(&self) -> Vec<NativeCall> {
        self.0
            .as_ref()
            .map(|calls| calls.lock().unwrap().clone())
            .unwrap_or_default()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&NativeCall) -> bool) -> usize {
        self.0.as_ref().map_or(0, |calls| {
            calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
        })
    }

    pub fn len(&self) -> usize {
        self.0.as_ref().map_or(0, |calls| calls.lock().unwrap().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Some(calls) = &self.0 {
            calls.lock().unwrap().clear();
        }
    }
}
