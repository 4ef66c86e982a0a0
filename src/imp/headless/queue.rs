// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Command queues and native command buffers.
//!
//! Each queue owns one worker thread.  Committed command buffers execute on it in commit
//! order; scheduled and completed handlers run there too, never on the committing thread.
use super::encoder::{
    BlitCommandEncoder, ComputeCommandEncoder, RenderCommandEncoder, RenderPassDescriptor,
};
use super::journal::{EncoderKind, Journal, NativeCall};
use super::layer::Drawable;
use super::objects::{LoadAction, ObjectId};
use super::{Device, Error};
use std::sync::mpsc::{Sender, channel};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandBufferStatus {
    NotEnqueued,
    Committed,
    Scheduled,
    Completed,
}

type Handler = Box<dyn FnOnce(CommandBufferStatus) + Send>;

#[derive(Debug)]
struct QueueShared {
    id: ObjectId,
    label: String,
    device: Device,
    sender: Sender<NativeCommandBuffer>,
}

#[derive(Debug, Clone)]
pub struct CommandQueue(Arc<QueueShared>);

impl CommandQueue {
    pub(super) fn new(device: Device, label: &str) -> Result<Self, Error> {
        let (sender, receiver) = channel::<NativeCommandBuffer>();
        std::thread::Builder::new()
            .name(format!("queue {label}"))
            .spawn(move || {
                for command_buffer in receiver {
                    command_buffer.execute();
                }
            })?;
        Ok(CommandQueue(Arc::new(QueueShared {
            id: device.next_object_id(),
            label: label.to_string(),
            device,
            sender,
        })))
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    pub fn device(&self) -> &Device {
        &self.0.device
    }

    pub fn command_buffer(&self) -> NativeCommandBuffer {
        let id = self.0.device.next_object_id();
        self.0
            .device
            .journal()
            .record(NativeCall::NewCommandBuffer { command_buffer: id });
        NativeCommandBuffer(Arc::new(CommandBufferShared {
            id,
            queue: self.0.clone(),
            state: Mutex::new(CommandBufferState {
                status: CommandBufferStatus::NotEnqueued,
                open_encoder: None,
                scheduled: Vec::new(),
                completed: Vec::new(),
                drawables: Vec::new(),
            }),
        }))
    }
}

struct CommandBufferState {
    status: CommandBufferStatus,
    open_encoder: Option<EncoderKind>,
    scheduled: Vec<Handler>,
    completed: Vec<Handler>,
    drawables: Vec<Drawable>,
}

struct CommandBufferShared {
    id: ObjectId,
    queue: Arc<QueueShared>,
    state: Mutex<CommandBufferState>,
}

impl std::fmt::Debug for CommandBufferShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBufferShared")
            .field("id", &self.id)
            .field("queue", &self.queue.id)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct NativeCommandBuffer(Arc<CommandBufferShared>);

impl NativeCommandBuffer {
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn device(&self) -> &Device {
        &self.0.queue.device
    }

    pub(super) fn journal(&self) -> &Journal {
        self.0.queue.device.journal()
    }

    pub fn status(&self) -> CommandBufferStatus {
        self.0.state.lock().unwrap().status
    }

    fn begin_encoder(&self, kind: EncoderKind, load_actions: Vec<LoadAction>) {
        {
            let mut state = self.0.state.lock().unwrap();
            assert_eq!(
                state.status,
                CommandBufferStatus::NotEnqueued,
                "encoding into a committed command buffer"
            );
            assert!(
                state.open_encoder.is_none(),
                "{:?} encoder requested while {:?} encoder is open",
                kind,
                state.open_encoder
            );
            state.open_encoder = Some(kind);
        }
        self.journal().record(NativeCall::BeginEncoder {
            command_buffer: self.0.id,
            kind,
            load_actions,
        });
    }

    pub(super) fn end_encoder(&self, kind: EncoderKind) {
        {
            let mut state = self.0.state.lock().unwrap();
            assert_eq!(state.open_encoder, Some(kind), "ending an encoder that is not open");
            state.open_encoder = None;
        }
        self.journal().record(NativeCall::EndEncoding {
            command_buffer: self.0.id,
            kind,
        });
    }

    pub fn render_command_encoder(&self, descriptor: &RenderPassDescriptor) -> RenderCommandEncoder {
        self.begin_encoder(EncoderKind::Render, descriptor.load_actions());
        RenderCommandEncoder::new(self.clone())
    }

    pub fn compute_command_encoder(&self) -> ComputeCommandEncoder {
        self.begin_encoder(EncoderKind::Compute, Vec::new());
        ComputeCommandEncoder::new(self.clone())
    }

    pub fn blit_command_encoder(&self) -> BlitCommandEncoder {
        self.begin_encoder(EncoderKind::Blit, Vec::new());
        BlitCommandEncoder::new(self.clone())
    }

    /// Schedules `drawable` for presentation once this command buffer completes.
    pub fn present_drawable(&self, drawable: &Drawable) {
        self.0.state.lock().unwrap().drawables.push(drawable.clone());
        self.journal().record(NativeCall::PresentDrawable {
            command_buffer: self.0.id,
            drawable: drawable.id(),
        });
    }

    pub fn add_scheduled_handler<F: FnOnce(CommandBufferStatus) + Send + 'static>(&self, handler: F) {
        let mut state = self.0.state.lock().unwrap();
        assert_eq!(
            state.status,
            CommandBufferStatus::NotEnqueued,
            "scheduled handlers must be added before commit"
        );
        state.scheduled.push(Box::new(handler));
    }

    /// Adds a handler that runs once the command buffer completes.
    ///
    /// If it already has, the handler runs immediately on the calling thread.
    pub fn add_completed_handler<F: FnOnce(CommandBufferStatus) + Send + 'static>(&self, handler: F) {
        let mut state = self.0.state.lock().unwrap();
        if state.status == CommandBufferStatus::Completed {
            drop(state);
            handler(CommandBufferStatus::Completed);
        } else {
            state.completed.push(Box::new(handler));
        }
    }

    pub fn push_debug_group(&self, label: &str) {
        self.journal()
            .record(NativeCall::PushDebugGroup(label.to_string()));
    }

    pub fn pop_debug_group(&self) {
        self.journal().record(NativeCall::PopDebugGroup);
    }

    pub fn insert_debug_signpost(&self, label: &str) {
        self.journal()
            .record(NativeCall::InsertDebugSignpost(label.to_string()));
    }

    pub fn commit(&self) {
        {
            let mut state = self.0.state.lock().unwrap();
            assert_eq!(
                state.status,
                CommandBufferStatus::NotEnqueued,
                "command buffer committed twice"
            );
            assert!(
                state.open_encoder.is_none(),
                "command buffer committed with an open encoder"
            );
            state.status = CommandBufferStatus::Committed;
        }
        self.journal().record(NativeCall::Commit {
            command_buffer: self.0.id,
        });
        if let Err(e) = self.0.queue.sender.send(self.clone()) {
            logwise::error_sync!(
                "queue {queue} is gone; completing inline",
                queue = logwise::privacy::LogIt(&self.0.queue.label)
            );
            e.0.execute();
        }
    }

    /// Blocks until the command buffer completes.
    ///
    /// # Panics
    /// If the command buffer was never committed.
    pub fn wait_until_completed(&self) {
        assert_ne!(
            self.status(),
            CommandBufferStatus::NotEnqueued,
            "waiting on a command buffer that was never committed"
        );
        let (sender, future) = r#continue::continuation();
        self.add_completed_handler(move |_| sender.send(()));
        test_executors::sleep_on(future);
    }

    fn execute(&self) {
        let scheduled = {
            let mut state = self.0.state.lock().unwrap();
            state.status = CommandBufferStatus::Scheduled;
            std::mem::take(&mut state.scheduled)
        };
        for handler in scheduled {
            handler(CommandBufferStatus::Scheduled);
        }
        let (completed, drawables) = {
            let mut state = self.0.state.lock().unwrap();
            state.status = CommandBufferStatus::Completed;
            (
                std::mem::take(&mut state.completed),
                std::mem::take(&mut state.drawables),
            )
        };
        for drawable in drawables {
            drawable.mark_presented();
        }
        for handler in completed {
            handler(CommandBufferStatus::Completed);
        }
    }
}
