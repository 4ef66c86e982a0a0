// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Frame acquisition and retirement for both surface variants.
*/
mod common;

use encoders_and_drawables::images::surface::{
    DEFAULT_PRESENT_INTERVAL, PRESENT_INTERVAL_VAR, Presentation, Surface, SurfaceConfig, SurfaceStatus,
    VSyncMode,
};
use encoders_and_drawables::images::{BoundDevice, CommandBuffer};
use encoders_and_drawables::imp::{self, NativeCall, PixelFormat};
use raw_window_handle::{AppKitWindowHandle, RawWindowHandle, WebWindowHandle};
use std::ptr::NonNull;
use std::time::Duration;

fn surface(device: &BoundDevice, config: SurfaceConfig) -> Surface {
    let layer = imp::Layer::new(device.device(), PixelFormat::BGRA8Unorm);
    Surface::new(device, layer, &config)
}

fn offscreen(device: &BoundDevice, interval: Duration) -> Surface {
    let mut config = SurfaceConfig::new(32, 32);
    config.presentation = Presentation::Offscreen { interval };
    surface(device, config)
}

/// Presents the oldest frame and waits for the GPU.
fn present_and_wait(device: &BoundDevice, surface: &mut Surface) {
    let mut cb = CommandBuffer::new(device);
    cb.begin();
    surface.present(&cb);
    cb.commit().wait_until_completed();
}

fn next_drawables(device: &BoundDevice) -> usize {
    device
        .journal()
        .count(|c| matches!(c, NativeCall::NextDrawable { .. }))
}

#[test]
fn passthrough_holds_at_most_capacity_frames() {
    let device = common::device();
    let mut surface = surface(&device, SurfaceConfig::new(64, 48));
    assert_eq!(surface.resize(3), SurfaceStatus::Ready);
    assert_eq!(surface.capacity(), 3);
    let frames: Vec<_> = (0..3)
        .map(|_| surface.acquire_next_framebuffer().unwrap())
        .collect();
    assert_eq!(frames[0].size(), (64, 48));
    assert_eq!(frames[0].textures()[0].width(), 64);
    assert_eq!(surface.live_count(), 3);
    //full: skip instead of blocking
    assert!(surface.acquire_next_framebuffer().is_none());
    assert_eq!(next_drawables(&device), 3);

    present_and_wait(&device, &mut surface);
    assert_eq!(surface.live_count(), 2);
    assert!(surface.acquire_next_framebuffer().is_some());
    assert_eq!(
        device
            .journal()
            .count(|c| matches!(c, NativeCall::PresentDrawable { .. })),
        1
    );
}

#[test]
fn passthrough_frames_get_fresh_drawables() {
    let device = common::device();
    let mut surface = surface(&device, SurfaceConfig::new(16, 16));
    assert_eq!(surface.resize(2), SurfaceStatus::Ready);
    let first = surface.acquire_next_framebuffer().unwrap();
    present_and_wait(&device, &mut surface);
    let second = surface.acquire_next_framebuffer().unwrap();
    assert_ne!(first.textures()[0].id(), second.textures()[0].id());
}

#[test]
fn passthrough_capacity_is_clamped() {
    let device = common::device();
    let mut surface = surface(&device, SurfaceConfig::new(16, 16));
    assert_eq!(surface.resize(9), SurfaceStatus::Ready);
    assert_eq!(surface.capacity(), 3);
    assert_eq!(surface.resize(0), SurfaceStatus::Ready);
    assert_eq!(surface.capacity(), 1);
    assert!(surface.acquire_next_framebuffer().is_some());
    assert!(surface.acquire_next_framebuffer().is_none());
}

#[test]
fn present_with_nothing_live_does_nothing() {
    let device = common::device();
    let mut surface = surface(&device, SurfaceConfig::new(16, 16));
    assert_eq!(surface.resize(3), SurfaceStatus::Ready);
    present_and_wait(&device, &mut surface);
    assert_eq!(surface.live_count(), 0);
    assert_eq!(
        device
            .journal()
            .count(|c| matches!(c, NativeCall::PresentDrawable { .. })),
        0
    );
}

#[test]
fn zero_area_skips() {
    let device = common::device();
    let mut surface = surface(&device, SurfaceConfig::new(0, 64));
    assert_eq!(surface.resize(3), SurfaceStatus::Skip);
    assert!(surface.needs_resize());
    surface.set_size(64, 64);
    assert_eq!(surface.resize(3), SurfaceStatus::Ready);
    assert!(!surface.needs_resize());
}

#[test]
fn size_and_vsync_changes_request_resize() {
    let device = common::device();
    let mut surface = surface(&device, SurfaceConfig::new(32, 32));
    assert!(surface.needs_resize());
    assert_eq!(surface.resize(3), SurfaceStatus::Ready);
    assert!(!surface.needs_resize());

    surface.set_size(32, 32);
    assert!(!surface.needs_resize());
    surface.set_size(40, 32);
    assert!(surface.needs_resize());
    assert_eq!(surface.resize(3), SurfaceStatus::Ready);
    assert_eq!(surface.layer().drawable_size(), (40, 32));

    surface.set_vsync_mode(VSyncMode::Enabled);
    assert!(!surface.needs_resize());
    surface.set_vsync_mode(VSyncMode::Disabled);
    assert!(surface.needs_resize());
    assert_eq!(surface.resize(3), SurfaceStatus::Ready);
    assert!(!surface.layer().display_sync_enabled());
}

#[test]
fn offscreen_carries_the_last_frame_forward_between_drawables() {
    let device = common::device();
    let mut surface = offscreen(&device, Duration::from_secs(3600));
    assert!(!surface.layer().display_sync_enabled());
    assert_eq!(surface.resize(3), SurfaceStatus::Ready);

    let first = surface.acquire_next_framebuffer().unwrap();
    let drawn = first.textures()[0].id();
    present_and_wait(&device, &mut surface);
    let second = surface.acquire_next_framebuffer().unwrap();
    let pooled = second.textures()[0].id();
    //the presented drawable is never a render target again
    assert_ne!(pooled, drawn);
    assert_eq!(second.textures()[0].descriptor().storage_mode, imp::StorageMode::Private);
    present_and_wait(&device, &mut surface);

    assert_eq!(
        device.journal().count(|c| matches!(
            c,
            NativeCall::CopyTexture { source, destination } if *source == drawn && *destination == pooled
        )),
        1
    );
    assert_eq!(next_drawables(&device), 1);
    assert_eq!(
        device
            .journal()
            .count(|c| matches!(c, NativeCall::PresentDrawable { .. })),
        1
    );
}

#[test]
fn offscreen_releases_every_presented_frame() {
    let device = common::device();
    let mut surface = offscreen(&device, Duration::from_secs(3600));
    assert_eq!(surface.resize(3), SurfaceStatus::Ready);
    for _ in 0..3 {
        assert!(surface.acquire_next_framebuffer().is_some());
    }
    assert_eq!(surface.live_count(), 3);

    for expected in [2, 1, 0] {
        present_and_wait(&device, &mut surface);
        assert_eq!(surface.live_count(), expected);
    }
    assert_eq!(
        device
            .journal()
            .count(|c| matches!(c, NativeCall::PresentDrawable { .. })),
        1
    );

    //a fourth present has nothing left to retire
    present_and_wait(&device, &mut surface);
    assert_eq!(surface.live_count(), 0);
    for _ in 0..3 {
        assert!(surface.acquire_next_framebuffer().is_some());
    }
}

#[test]
fn offscreen_interval_comes_from_the_environment() {
    // SAFETY: no other test in this binary reads or writes the variable.
    unsafe { std::env::set_var(PRESENT_INTERVAL_VAR, "250") };
    assert_eq!(
        Presentation::offscreen(),
        Presentation::Offscreen {
            interval: Duration::from_millis(250)
        }
    );
    unsafe { std::env::set_var(PRESENT_INTERVAL_VAR, "soon") };
    assert_eq!(
        Presentation::offscreen(),
        Presentation::Offscreen {
            interval: DEFAULT_PRESENT_INTERVAL
        }
    );
    unsafe { std::env::remove_var(PRESENT_INTERVAL_VAR) };
    assert_eq!(
        Presentation::offscreen(),
        Presentation::Offscreen {
            interval: DEFAULT_PRESENT_INTERVAL
        }
    );
}

#[test]
fn offscreen_takes_a_drawable_once_the_interval_passes() {
    let device = common::device();
    let mut surface = offscreen(&device, Duration::ZERO);
    assert_eq!(surface.resize(3), SurfaceStatus::Ready);
    for _ in 0..3 {
        surface.acquire_next_framebuffer().unwrap();
        present_and_wait(&device, &mut surface);
    }
    assert_eq!(next_drawables(&device), 3);
}

#[test]
fn offscreen_skips_when_every_slot_is_live() {
    let device = common::device();
    let mut surface = offscreen(&device, Duration::from_secs(3600));
    assert_eq!(surface.resize(3), SurfaceStatus::Ready);
    for _ in 0..3 {
        assert!(surface.acquire_next_framebuffer().is_some());
    }
    assert_eq!(surface.live_count(), 3);
    assert!(surface.acquire_next_framebuffer().is_none());

    present_and_wait(&device, &mut surface);
    assert_eq!(surface.live_count(), 2);
    assert!(surface.acquire_next_framebuffer().is_some());
}

#[test]
fn offscreen_makes_a_texture_when_size_changes() {
    let device = common::device();
    let mut surface = offscreen(&device, Duration::from_secs(3600));
    assert_eq!(surface.resize(3), SurfaceStatus::Ready);
    let first = surface.acquire_next_framebuffer().unwrap();
    present_and_wait(&device, &mut surface);

    surface.set_size(48, 48);
    assert_eq!(surface.resize(3), SurfaceStatus::Ready);
    let second = surface.acquire_next_framebuffer().unwrap();
    assert_ne!(second.textures()[0].id(), first.textures()[0].id());
    assert_eq!(second.size(), (48, 48));
    assert_eq!(second.textures()[0].descriptor().storage_mode, imp::StorageMode::Private);
}

#[test]
fn surface_pass_matches_layer_format() {
    let device = common::device();
    let surface = surface(&device, SurfaceConfig::new(8, 8));
    let pass = surface.render_pass();
    assert_eq!(pass.attachments().len(), 1);
    assert_eq!(pass.attachments()[0].format, surface.pixel_format());
    assert_eq!(pass.attachments()[0].load_action, imp::LoadAction::Clear);
}

#[test]
fn frames_can_be_drawn_into() {
    let device = common::device();
    let mut surface = surface(&device, SurfaceConfig::new(16, 16));
    assert_eq!(surface.resize(3), SurfaceStatus::Ready);
    let pass = surface.render_pass().clone();
    let frame = surface.acquire_next_framebuffer().unwrap();

    let mut cb = CommandBuffer::new(&device);
    cb.begin();
    cb.render_begin_pass(
        &pass,
        &frame,
        frame.bounds(),
        &[encoders_and_drawables::images::render_pass::ClearValue::Color([0.0, 0.0, 0.0, 1.0])],
    )
    .unwrap();
    cb.render_end_pass();
    surface.present(&cb);
    cb.commit().wait_until_completed();
    assert_eq!(surface.live_count(), 0);
}

#[test]
fn window_surfaces_need_a_layer_backed_view() {
    let device = common::device();
    let mut view = 0u8;
    let appkit = RawWindowHandle::AppKit(AppKitWindowHandle::new(NonNull::from(&mut view).cast()));
    let surface = Surface::from_window(&device, appkit, &SurfaceConfig::new(8, 8)).unwrap();
    assert!(surface.layer().is_attached_to_view());

    let web = RawWindowHandle::Web(WebWindowHandle::new(1));
    assert!(Surface::from_window(&device, web, &SurfaceConfig::new(8, 8)).is_err());
}
