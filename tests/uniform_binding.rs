// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
mod common;

use encoders_and_drawables::bindings::visible_to::ShaderStage;
use encoders_and_drawables::imp::{self, NativeCall, ResourceUsage};
use std::sync::Arc;

#[test]
fn same_shader_reuses_argument_buffer() {
    let device = common::device();
    let shader = common::render_shader(&device, "lit", None);
    let (set, _, _) = common::uniform_set(&device);
    let a = set.bound_uniform_set(&shader, device.device());
    let b = set.bound_uniform_set(&shader, device.device());
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(set.bound_shader_count(), 1);
}

#[test]
fn another_shader_gets_its_own_argument_buffer() {
    let device = common::device();
    let first = common::render_shader(&device, "first", None);
    let second = common::render_shader(&device, "second", None);
    let (set, _, _) = common::uniform_set(&device);
    let a = set.bound_uniform_set(&first, device.device());
    let b = set.bound_uniform_set(&second, device.device());
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(!a.buffer().unwrap().ptr_eq(b.buffer().unwrap()));
    assert_eq!(set.bound_shader_count(), 2);
}

#[test]
fn usage_is_recorded_per_stage() {
    let device = common::device();
    let shader = common::render_shader(&device, "lit", None);
    let (set, buffer, texture) = common::uniform_set(&device);
    let bound = set.bound_uniform_set(&shader, device.device());

    let buffer_usage = bound.usage(&imp::Resource::Buffer(buffer)).unwrap();
    assert_eq!(buffer_usage.usage(ShaderStage::Vertex), ResourceUsage::READ);
    assert_eq!(buffer_usage.usage(ShaderStage::Fragment), ResourceUsage::READ);
    assert_eq!(buffer_usage.usage(ShaderStage::Compute), ResourceUsage::empty());

    let texture_usage = bound.usage(&imp::Resource::Texture(texture)).unwrap();
    assert_eq!(texture_usage.usage(ShaderStage::Vertex), ResourceUsage::empty());
    assert_eq!(texture_usage.usage(ShaderStage::Fragment), ResourceUsage::READ);
    assert_eq!(
        texture_usage.render_usage(),
        (ResourceUsage::READ, imp::RenderStages::FRAGMENT)
    );
    assert_eq!(bound.resources().len(), 2);
}

#[test]
fn argument_buffer_holds_each_stage_region() {
    let device = common::device();
    let shader = common::render_shader(&device, "lit", None);
    let (set, buffer, texture) = common::uniform_set(&device);
    let bound = set.bound_uniform_set(&shader, device.device());

    let layout = shader.set(0).unwrap();
    assert_eq!(layout.offset(ShaderStage::Vertex), Some(0));
    assert_eq!(layout.offset(ShaderStage::Fragment), Some(16));
    assert_eq!(layout.offset(ShaderStage::Compute), None);

    let contents = bound.buffer().unwrap().contents();
    assert_eq!(contents.len(), layout.buffer_size());
    let word = |at: usize| u64::from_le_bytes(contents[at..at + 8].try_into().unwrap());
    assert_eq!(word(0), buffer.gpu_address());
    assert_eq!(word(16), buffer.gpu_address());
    assert_eq!(word(24), texture.gpu_resource_id());
}

#[test]
fn building_allocates_once_per_shader() {
    let device = common::device();
    let shader = common::render_shader(&device, "lit", None);
    let (set, _, _) = common::uniform_set(&device);
    let is_argument_buffer = |c: &NativeCall| matches!(c, NativeCall::NewBuffer { length: 32, .. });
    let before = device.journal().count(is_argument_buffer);
    for _ in 0..3 {
        set.bound_uniform_set(&shader, device.device());
    }
    assert_eq!(device.journal().count(is_argument_buffer), before + 1);
}

#[test]
#[should_panic(expected = "has no uniform set 1")]
fn set_index_missing_from_shader_panics() {
    let device = common::device();
    let shader = common::render_shader(&device, "lit", None);
    let set = encoders_and_drawables::bindings::UniformSet::new(1, Vec::new());
    set.bound_uniform_set(&shader, device.device());
}
