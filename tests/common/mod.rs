// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use encoders_and_drawables::bindings::uniform_set::{
    BindingInfo, BoundUniform, UniformInfo, UniformResource, UniformSet, UniformSetLayout, UniformType,
};
use encoders_and_drawables::bindings::visible_to::{ShaderStage, ShaderStageUsage};
use encoders_and_drawables::images::framebuffer::FrameBuffer;
use encoders_and_drawables::images::pipeline::{RenderPipeline, RenderPipelineDescription};
use encoders_and_drawables::images::render_pass::{Attachment, RenderPassDescriptor, Subpass};
use encoders_and_drawables::images::shader::{PushConstantLayout, Shader};
use encoders_and_drawables::images::BoundDevice;
use encoders_and_drawables::imp;
use encoders_and_drawables::pixel_formats::DataFormat;
use std::collections::HashMap;
use std::sync::Arc;

pub const RENDER_SOURCE: &str = "
vertex float4 vert_main(uint vid [[vertex_id]]) { return float4(0); }
fragment float4 frag_main() { return float4(1); }
";

pub const KERNEL_SOURCE: &str = "
kernel void blur(uint id [[thread_position_in_grid]]) { }
";

/// A device whose journal records, so tests can see what was encoded.
pub fn descriptor() -> imp::DeviceDescriptor {
    imp::DeviceDescriptor {
        record_calls: true,
        ..imp::DeviceDescriptor::default()
    }
}

pub fn device() -> BoundDevice {
    BoundDevice::bind(descriptor()).unwrap()
}

/// One RGBA8 color attachment, cleared and stored.
pub fn color_pass(device: &BoundDevice) -> Arc<RenderPassDescriptor> {
    let color = Attachment::new(
        device.pixel_formats(),
        DataFormat::R8G8B8A8Unorm,
        1,
        imp::LoadAction::Clear,
        imp::StoreAction::Store,
    );
    let subpass = Subpass {
        color_references: vec![0],
        ..Default::default()
    };
    Arc::new(RenderPassDescriptor::new(vec![color], vec![subpass]).unwrap())
}

/// RGBA8 color plus a 32-bit float depth attachment, both cleared.
pub fn color_depth_pass(device: &BoundDevice, subpasses: usize) -> Arc<RenderPassDescriptor> {
    let color = Attachment::new(
        device.pixel_formats(),
        DataFormat::R8G8B8A8Unorm,
        1,
        imp::LoadAction::Clear,
        imp::StoreAction::Store,
    );
    let depth = Attachment::new(
        device.pixel_formats(),
        DataFormat::D32Sfloat,
        1,
        imp::LoadAction::Clear,
        imp::StoreAction::DontCare,
    );
    let subpass = Subpass {
        color_references: vec![0],
        input_references: Vec::new(),
        depth_stencil_reference: Some(1),
    };
    Arc::new(RenderPassDescriptor::new(vec![color, depth], vec![subpass; subpasses]).unwrap())
}

pub fn frame_buffer(device: &BoundDevice, pass: &RenderPassDescriptor, width: u32, height: u32) -> FrameBuffer {
    let textures = pass
        .attachments()
        .iter()
        .map(|a| {
            device
                .device()
                .new_texture(imp::TextureDescriptor::render_target(a.format, width, height))
        })
        .collect();
    FrameBuffer::new(textures, width, height)
}

fn binding(data_type: imp::DataType, index: u32) -> BindingInfo {
    BindingInfo {
        data_type,
        index,
        access: imp::BindingAccess::ReadOnly,
        usage: imp::ResourceUsage::READ,
        array_length: 0,
    }
}

/// Set 0: a uniform buffer seen by both render stages, and a texture seen by the fragment stage.
pub fn uniform_layout(device: &BoundDevice) -> UniformSetLayout {
    let buffer = UniformInfo {
        binding: 0,
        active_stages: ShaderStageUsage::VERTEX | ShaderStageUsage::FRAGMENT,
        bindings: HashMap::from([
            (ShaderStage::Vertex, binding(imp::DataType::Pointer, 0)),
            (ShaderStage::Fragment, binding(imp::DataType::Pointer, 0)),
        ]),
        bindings_secondary: HashMap::new(),
    };
    let texture = UniformInfo {
        binding: 1,
        active_stages: ShaderStageUsage::FRAGMENT,
        bindings: HashMap::from([(ShaderStage::Fragment, binding(imp::DataType::Texture, 1))]),
        bindings_secondary: HashMap::new(),
    };
    UniformSetLayout::new(device.device(), vec![buffer, texture])
}

pub fn uniform_set(device: &BoundDevice) -> (Arc<UniformSet>, imp::Buffer, imp::Texture) {
    let buffer = device.device().new_buffer(256, "uniforms");
    let texture = device
        .device()
        .new_texture(imp::TextureDescriptor::render_target(imp::PixelFormat::RGBA8Unorm, 4, 4));
    let set = UniformSet::new(
        0,
        vec![
            BoundUniform {
                uniform_type: UniformType::UniformBuffer,
                binding: 0,
                ids: vec![UniformResource::Buffer(buffer.clone())],
            },
            BoundUniform {
                uniform_type: UniformType::Texture,
                binding: 1,
                ids: vec![UniformResource::Texture(texture.clone())],
            },
        ],
    );
    (Arc::new(set), buffer, texture)
}

pub fn render_shader(device: &BoundDevice, name: &str, push_constants: Option<PushConstantLayout>) -> Arc<Shader> {
    let library = device
        .device()
        .new_library_with_source(RENDER_SOURCE, name)
        .unwrap();
    Shader::new_render(
        device.device(),
        name,
        library.function("vert_main").unwrap(),
        library.function("frag_main"),
        vec![uniform_layout(device)],
        push_constants,
    )
}

pub fn render_pipeline(device: &BoundDevice, shader: Arc<Shader>, pass: &RenderPassDescriptor) -> Arc<RenderPipeline> {
    let description = RenderPipelineDescription {
        label: shader.name().to_string(),
        color_formats: pass.color_indices().map(|i| pass.attachments()[i].format).collect(),
        depth_format: pass
            .depth_index()
            .map_or(imp::PixelFormat::Invalid, |i| pass.attachments()[i].format),
        sample_count: pass.sample_count(),
        ..Default::default()
    };
    RenderPipeline::new(device.device(), shader, &description).unwrap()
}

pub fn compute_shader(device: &BoundDevice) -> Arc<Shader> {
    let library = device
        .device()
        .new_library_with_source(KERNEL_SOURCE, "blur")
        .unwrap();
    Shader::new_compute(
        device.device(),
        "blur",
        library.function("blur").unwrap(),
        imp::Size::new(8, 8, 1),
        Vec::new(),
        None,
    )
}
