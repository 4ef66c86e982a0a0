// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! A device with no surface, for compute and offscreen work.
//!
//! Work is pushed as a batch of command buffers and waited on with [LocalDevice::sync].
//! One batch may be outstanding at a time.
use crate::images::command_buffer::{CommandBuffer, EncoderType};
use crate::images::device::{BindError, BoundDevice};
use crate::imp;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct WaitState {
    waiting: AtomicBool,
    waker: Mutex<Option<r#continue::Sender<()>>>,
}

impl std::fmt::Debug for WaitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitState")
            .field("waiting", &self.waiting)
            .finish_non_exhaustive()
    }
}

impl WaitState {
    fn complete(&self) {
        let mut waker = self.waker.lock().unwrap();
        self.waiting.store(false, Ordering::Release);
        if let Some(sender) = waker.take() {
            sender.send(());
        }
    }
}

#[derive(Debug)]
pub struct LocalDevice {
    device: BoundDevice,
    wait: Arc<WaitState>,
}

impl LocalDevice {
    pub fn new(descriptor: imp::DeviceDescriptor) -> Result<Self, BindError> {
        Ok(Self::with_device(BoundDevice::bind(descriptor)?))
    }

    pub fn with_device(device: BoundDevice) -> Self {
        LocalDevice {
            device,
            wait: Arc::new(WaitState::default()),
        }
    }

    pub fn device(&self) -> &BoundDevice {
        &self.device
    }

    /// A command buffer already begun on this device.
    pub fn command_buffer(&self) -> CommandBuffer {
        let mut command_buffer = CommandBuffer::new(&self.device);
        command_buffer.begin();
        command_buffer
    }

    /// Whether pushed work has not been synced yet.
    pub fn is_waiting(&self) -> bool {
        self.wait.waiting.load(Ordering::Acquire)
    }

    /// Submits `command_buffers` in order.
    ///
    /// # Panics
    /// If earlier work was not synced, or any buffer has an open encoder.
    pub fn push_command_buffers<I: IntoIterator<Item = CommandBuffer>>(&mut self, command_buffers: I) {
        assert!(!self.is_waiting(), "pushed work while earlier work is unsynced");
        let mut command_buffers: Vec<CommandBuffer> = command_buffers.into_iter().collect();
        let Some(last) = command_buffers.last() else {
            return;
        };
        for (i, c) in command_buffers.iter().enumerate() {
            let open = c.encoder_type();
            assert_eq!(open, EncoderType::None, "command buffer {i} pushed with an open {open:?} encoder");
        }
        self.wait.waiting.store(true, Ordering::Release);
        let wait = self.wait.clone();
        last.native().add_completed_handler(move |_| wait.complete());
        logwise::trace_sync!("pushing {n} command buffers", n = command_buffers.len());
        for c in &mut command_buffers {
            c.commit();
        }
    }

    /// Blocks until pushed work completes.  Without pushed work, returns at once.
    pub fn sync(&mut self) {
        let future = {
            let mut waker = self.wait.waker.lock().unwrap();
            if !self.wait.waiting.load(Ordering::Acquire) {
                return;
            }
            let (sender, future) = r#continue::continuation();
            *waker = Some(sender);
            future
        };
        test_executors::sleep_on(future);
        assert!(!self.is_waiting(), "sync woke with work outstanding");
    }

    /// # Panics
    /// If pushed work was not synced.
    pub fn free(self) {
        assert!(!self.is_waiting(), "local device freed with unsynced work");
        logwise::trace_sync!("local device freed");
    }
}
