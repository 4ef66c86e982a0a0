// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
mod common;

use encoders_and_drawables::images::LocalDevice;
use encoders_and_drawables::imp::{self, NativeCall};
use std::sync::mpsc;
use std::time::Duration;

fn local_device() -> LocalDevice {
    LocalDevice::new(common::descriptor()).unwrap()
}

/// Holds the queue inside `cb`'s scheduled handler until the sender is used or dropped.
fn gate(local: &LocalDevice) -> (encoders_and_drawables::images::CommandBuffer, mpsc::Sender<()>) {
    let cb = local.command_buffer();
    let (sender, receiver) = mpsc::channel::<()>();
    cb.native().add_scheduled_handler(move |_| {
        let _ = receiver.recv();
    });
    (cb, sender)
}

#[test]
fn pushed_work_completes_on_sync() {
    let mut local = local_device();
    let buffer = local.device().device().new_buffer(64, "scratch");
    let mut cb = local.command_buffer();
    cb.blit_fill_buffer(&buffer, 0..64, 0xAB);
    cb.blit_end();
    local.push_command_buffers([cb]);
    local.sync();
    assert!(!local.is_waiting());
    assert_eq!(
        local
            .device()
            .journal()
            .count(|c| matches!(c, NativeCall::FillBuffer { value: 0xAB, .. })),
        1
    );
    local.free();
}

#[test]
fn batch_commits_in_order() {
    let mut local = local_device();
    let batch: Vec<_> = (0..3).map(|_| local.command_buffer()).collect();
    let ids: Vec<_> = batch.iter().map(|cb| cb.native().id()).collect();
    local.push_command_buffers(batch);
    local.sync();
    let committed: Vec<_> = local
        .device()
        .journal()
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            NativeCall::Commit { command_buffer } => Some(command_buffer),
            _ => None,
        })
        .collect();
    assert_eq!(committed, ids);
    local.free();
}

#[test]
fn sync_without_work_returns() {
    let mut local = local_device();
    local.sync();
    local.push_command_buffers(Vec::new());
    assert!(!local.is_waiting());
    local.sync();
    local.free();
}

#[test]
fn sync_waits_for_late_completion() {
    let mut local = local_device();
    let (cb, release) = gate(&local);
    local.push_command_buffers([cb]);
    assert!(local.is_waiting());
    let releaser = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        release.send(()).unwrap();
    });
    local.sync();
    assert!(!local.is_waiting());
    releaser.join().unwrap();
    local.free();
}

#[test]
fn device_is_reusable_after_sync() {
    let mut local = local_device();
    for _ in 0..3 {
        let cb = local.command_buffer();
        local.push_command_buffers([cb]);
        local.sync();
    }
    assert_eq!(
        local
            .device()
            .journal()
            .count(|c| matches!(c, NativeCall::Commit { .. })),
        3
    );
    local.free();
}

#[test]
#[should_panic(expected = "freed with unsynced work")]
fn free_with_unsynced_work_panics() {
    let mut local = local_device();
    let (cb, _release) = gate(&local);
    local.push_command_buffers([cb]);
    local.free();
}

#[test]
#[should_panic(expected = "pushed work while earlier work is unsynced")]
fn push_before_sync_panics() {
    let mut local = local_device();
    let (cb, _release) = gate(&local);
    local.push_command_buffers([cb]);
    let next = local.command_buffer();
    local.push_command_buffers([next]);
}

#[test]
#[should_panic(expected = "pushed with an open Blit encoder")]
fn push_with_open_encoder_panics() {
    let mut local = local_device();
    let buffer = local.device().device().new_buffer(16, "scratch");
    let mut cb = local.command_buffer();
    cb.blit_fill_buffer(&buffer, 0..16, 0);
    local.push_command_buffers([cb]);
}

#[test]
fn default_devices_keep_no_journal() {
    let mut local = LocalDevice::new(imp::DeviceDescriptor::default()).unwrap();
    let cb = local.command_buffer();
    local.push_command_buffers([cb]);
    local.sync();
    assert!(!local.device().journal().is_recording());
    assert!(local.device().journal().is_empty());
    local.free();
}
