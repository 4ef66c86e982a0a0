// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Headless native backend.

Models an explicit-encoder GPU API (queues, command buffers, render/compute/blit
encoders, compositor drawables, argument encoders) without a GPU.  When the device is
created with [DeviceDescriptor::record_calls] set, every call is written to its [Journal].
*/
mod encoder;
mod error;
mod journal;
mod layer;
mod objects;
mod queue;

pub use encoder::{
    BlitCommandEncoder, ColorAttachmentDescriptor, ComputeCommandEncoder,
    DepthAttachmentDescriptor, RenderCommandEncoder, RenderPassDescriptor,
    StencilAttachmentDescriptor,
};
pub use error::Error;
pub use journal::{BindTarget, EncoderKind, Journal, NativeCall};
pub use layer::{Drawable, Layer};
pub use objects::*;
pub use queue::{CommandBufferStatus, CommandQueue, NativeCommandBuffer};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// What the device can do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLimits {
    pub max_color_attachments: u32,
    /// Sample counts accepted by render pipelines and textures.
    pub supported_sample_counts: Vec<u32>,
    pub max_threads_per_threadgroup: u32,
    pub max_per_stage_buffer_count: u32,
    pub supports_depth24_stencil8: bool,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        DeviceLimits {
            max_color_attachments: MAX_COLOR_ATTACHMENTS as u32,
            supported_sample_counts: vec![1, 2, 4, 8],
            max_threads_per_threadgroup: 1024,
            max_per_stage_buffer_count: 31,
            supports_depth24_stencil8: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub label: String,
    pub limits: DeviceLimits,
    /// Keep every native call in the device's [Journal].  Off by default; the journal
    /// grows without bound while this is set.
    pub record_calls: bool,
}

impl Default for DeviceDescriptor {
    fn default() -> Self {
        DeviceDescriptor {
            label: "headless".to_string(),
            limits: DeviceLimits::default(),
            record_calls: false,
        }
    }
}

#[derive(Debug)]
struct DeviceShared {
    descriptor: DeviceDescriptor,
    next_id: AtomicU64,
    journal: Journal,
}

#[derive(Debug, Clone)]
pub struct Device(Arc<DeviceShared>);

impl Device {
    pub fn new(descriptor: DeviceDescriptor) -> Self {
        logwise::info_sync!(
            "headless device {label} created",
            label = logwise::privacy::LogIt(&descriptor.label)
        );
        let journal = if descriptor.record_calls {
            Journal::recording()
        } else {
            Journal::default()
        };
        Device(Arc::new(DeviceShared {
            descriptor,
            next_id: AtomicU64::new(1),
            journal,
        }))
    }

    pub fn system_default() -> Self {
        Self::new(DeviceDescriptor::default())
    }

    pub fn label(&self) -> &str {
        &self.0.descriptor.label
    }

    pub fn limits(&self) -> &DeviceLimits {
        &self.0.descriptor.limits
    }

    pub fn journal(&self) -> &Journal {
        &self.0.journal
    }

    /// Allocates an identity for an object owned by a higher layer.
    pub fn next_object_id(&self) -> ObjectId {
        ObjectId(self.0.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn supports_sample_count(&self, count: u32) -> bool {
        self.limits().supported_sample_counts.contains(&count)
    }

    pub fn new_command_queue(&self, label: &str) -> Result<CommandQueue, Error> {
        CommandQueue::new(self.clone(), label)
    }

    pub fn new_buffer(&self, length: usize, label: &str) -> Buffer {
        let buffer = Buffer::new(self.next_object_id(), length, label);
        self.journal().record(NativeCall::NewBuffer {
            buffer: buffer.id(),
            length,
        });
        buffer
    }

    pub fn new_texture(&self, descriptor: TextureDescriptor) -> Texture {
        let texture = Texture::new(self.next_object_id(), descriptor);
        self.journal().record(NativeCall::NewTexture {
            texture: texture.id(),
            width: texture.width(),
            height: texture.height(),
        });
        texture
    }

    pub fn new_sampler_state(&self) -> SamplerState {
        SamplerState::new(self.next_object_id())
    }

    /// Compiles shading-language source.
    ///
    /// Entry points are the functions declared `vertex`, `fragment` or `kernel`.  A source
    /// with none of them fails to compile.
    pub fn new_library_with_source(&self, source: &str, label: &str) -> Result<Library, Error> {
        let mut functions = Vec::new();
        for line in source.lines() {
            let mut tokens = line.split_whitespace();
            let stage = match tokens.next() {
                Some("vertex") => FunctionStage::Vertex,
                Some("fragment") => FunctionStage::Fragment,
                Some("kernel") => FunctionStage::Kernel,
                _ => continue,
            };
            //return type, then name
            let Some(name) = tokens.nth(1) else { continue };
            let name = name.split('(').next().unwrap_or(name);
            if name.is_empty() {
                continue;
            }
            functions.push(Function::new(
                self.next_object_id(),
                name.to_string(),
                stage,
            ));
        }
        if functions.is_empty() {
            return Err(Error::Compile {
                label: label.to_string(),
                message: "no entry points".to_string(),
            });
        }
        let library = Library::new(self.next_object_id(), label, functions);
        self.journal().record(NativeCall::NewLibrary {
            library: library.id(),
            label: label.to_string(),
        });
        Ok(library)
    }

    pub fn new_render_pipeline_state(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineState, Error> {
        match &descriptor.vertex_function {
            Some(f) if f.stage() == FunctionStage::Vertex => {}
            _ => return Err(Error::MissingFunction(descriptor.label.clone())),
        }
        if !self.supports_sample_count(descriptor.sample_count) {
            return Err(Error::UnsupportedSampleCount(descriptor.sample_count));
        }
        for (i, format) in descriptor.color_formats.iter().enumerate() {
            if *format != PixelFormat::Invalid && !format.is_color() {
                return Err(Error::InvalidPixelFormat {
                    slot: format!("color attachment {i}"),
                    format: *format,
                });
            }
        }
        if descriptor.depth_format != PixelFormat::Invalid && !descriptor.depth_format.has_depth() {
            return Err(Error::InvalidPixelFormat {
                slot: "depth attachment".to_string(),
                format: descriptor.depth_format,
            });
        }
        if descriptor.stencil_format != PixelFormat::Invalid
            && !descriptor.stencil_format.has_stencil()
        {
            return Err(Error::InvalidPixelFormat {
                slot: "stencil attachment".to_string(),
                format: descriptor.stencil_format,
            });
        }
        let state = RenderPipelineState::new(self.next_object_id(), descriptor);
        self.journal().record(NativeCall::NewRenderPipelineState {
            pipeline: state.id(),
            label: descriptor.label.clone(),
        });
        Ok(state)
    }

    pub fn new_compute_pipeline_state(
        &self,
        function: &Function,
        threads_per_threadgroup: Size,
    ) -> Result<ComputePipelineState, Error> {
        if function.stage() != FunctionStage::Kernel {
            return Err(Error::MissingFunction(function.name().to_string()));
        }
        let requested = threads_per_threadgroup.width
            * threads_per_threadgroup.height
            * threads_per_threadgroup.depth;
        let limit = self.limits().max_threads_per_threadgroup;
        if requested > limit {
            return Err(Error::ThreadgroupTooLarge { requested, limit });
        }
        let state = ComputePipelineState::new(self.next_object_id(), function.name(), limit);
        self.journal().record(NativeCall::NewComputePipelineState {
            pipeline: state.id(),
            label: function.name().to_string(),
        });
        Ok(state)
    }

    pub fn new_depth_stencil_state(&self, descriptor: DepthStencilDescriptor) -> DepthStencilState {
        let state = DepthStencilState::new(self.next_object_id(), descriptor);
        self.journal()
            .record(NativeCall::NewDepthStencilState { state: state.id() });
        state
    }

    pub fn new_argument_encoder(&self, arguments: Vec<ArgumentDescriptor>) -> ArgumentEncoder {
        ArgumentEncoder::new(arguments)
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
