// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
mod common;

use encoders_and_drawables::images::resource_cache::{ClearAttachmentKey, ResourceError};
use encoders_and_drawables::imp::{self, NativeCall, PixelFormat};
use std::collections::HashSet;

fn rgba_depth_key(sample_count: u32) -> ClearAttachmentKey {
    let mut key = ClearAttachmentKey::new(sample_count);
    key.set_color_format(0, PixelFormat::RGBA8Unorm);
    key.set_depth_format(PixelFormat::Depth32Float);
    key
}

fn is_new_pipeline(c: &NativeCall) -> bool {
    matches!(c, NativeCall::NewRenderPipelineState { .. })
}

#[test]
fn equal_keys_share_one_clear_pipeline() {
    let device = common::device();
    let cache = device.resource_cache();
    let a = cache.get_clear_render_pipeline_state(&rgba_depth_key(4)).unwrap();
    let b = cache.get_clear_render_pipeline_state(&rgba_depth_key(4)).unwrap();
    assert!(a.ptr_eq(&b));
    assert_eq!(cache.clear_pipeline_count(), 1);
    assert_eq!(device.journal().count(is_new_pipeline), 1);
}

#[test]
fn one_differing_slot_builds_another_pipeline() {
    let device = common::device();
    let cache = device.resource_cache();
    let a = cache.get_clear_render_pipeline_state(&rgba_depth_key(1)).unwrap();

    let mut other = rgba_depth_key(1);
    other.set_color_format(1, PixelFormat::RGBA8Unorm);
    let b = cache.get_clear_render_pipeline_state(&other).unwrap();
    assert!(!a.ptr_eq(&b));

    let c = cache.get_clear_render_pipeline_state(&rgba_depth_key(2)).unwrap();
    assert!(!a.ptr_eq(&c));
    assert_eq!(c.sample_count(), 2);
    assert_eq!(cache.clear_pipeline_count(), 3);
}

#[test]
fn clear_pipeline_uses_key_formats() {
    let device = common::device();
    let mut key = ClearAttachmentKey::new(1);
    key.set_color_format(2, PixelFormat::R32Uint);
    let state = device
        .resource_cache()
        .get_clear_render_pipeline_state(&key)
        .unwrap();
    assert_eq!(state.color_formats()[2], PixelFormat::R32Uint);
    assert_eq!(state.color_formats()[0], PixelFormat::Invalid);
}

#[test]
fn failed_construction_is_reported_and_not_cached() {
    let device = common::device();
    let cache = device.resource_cache();
    let key = rgba_depth_key(3);
    let err = cache.get_clear_render_pipeline_state(&key).unwrap_err();
    assert!(matches!(
        err,
        ResourceError::ClearPipeline {
            source: imp::Error::UnsupportedSampleCount(3),
            ..
        }
    ));
    assert_eq!(cache.clear_pipeline_count(), 0);
    //a second request tries again rather than replaying the failure
    assert!(cache.get_clear_render_pipeline_state(&key).is_err());
    assert_eq!(cache.clear_pipeline_count(), 0);
}

#[test]
fn depth_stencil_singletons_are_stable_and_distinct() {
    let device = common::device();
    let cache = device.resource_cache();
    let combos = [(false, false), (true, false), (false, true), (true, true)];
    let first: Vec<_> = combos
        .iter()
        .map(|&(d, s)| cache.get_depth_stencil_state(d, s))
        .collect();
    for (state, &(d, s)) in first.iter().zip(&combos) {
        assert!(state.ptr_eq(&cache.get_depth_stencil_state(d, s)));
        assert_eq!(state.descriptor().depth_write_enabled, d);
        assert_eq!(state.descriptor().front_stencil.is_some(), s);
        assert_eq!(state.descriptor().depth_compare, imp::CompareFunction::Always);
    }
    let ids: HashSet<_> = first.iter().map(|s| s.id()).collect();
    assert_eq!(ids.len(), 4);
    assert_eq!(
        device
            .journal()
            .count(|c| matches!(c, NativeCall::NewDepthStencilState { .. })),
        4
    );
}

#[test]
fn cache_is_shared_across_threads() {
    let device = common::device();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let device = device.clone();
            std::thread::spawn(move || {
                let key = rgba_depth_key(1);
                let state = device
                    .resource_cache()
                    .get_clear_render_pipeline_state(&key)
                    .unwrap();
                (state.id(), device.resource_cache().get_depth_stencil_state(true, true).id())
            })
        })
        .collect();
    let results: HashSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.len(), 1);
    assert_eq!(device.resource_cache().clear_pipeline_count(), 1);
}
