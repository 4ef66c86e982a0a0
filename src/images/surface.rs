// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Presentable framebuffer rings.

A [Surface] hands out at most three framebuffers at a time and takes them back through
[Surface::present].  It never blocks waiting for one: when every slot is live,
[Surface::acquire_next_framebuffer] returns `None` and the caller skips the frame.

Two ring variants, chosen by [Presentation]:

* [Presentation::Layer] passes straight through to the compositor's drawable queue.  Every
  acquisition takes a fresh drawable; a slot retires when its frame is presented.
* [Presentation::Offscreen] renders into a pool of its own.  A new drawable is taken at most
  once per interval; between those, frames render into the slot's pool texture, which is
  first filled with a copy of the previous frame.  A drawable's texture is never drawn into
  after it has been presented.  A slot retires once the command buffer presenting it is
  scheduled.
*/
use crate::images::command_buffer::CommandBuffer;
use crate::images::device::BoundDevice;
use crate::images::framebuffer::FrameBuffer;
use crate::images::render_pass::{Attachment, AttachmentKind, RenderPassDescriptor, Subpass};
use crate::imp;
use crate::sys::time::{Duration, Instant};
use std::fmt::Formatter;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Most frames a surface keeps in flight.
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;
pub const DEFAULT_PRESENT_INTERVAL: Duration = Duration::from_secs(1);
/// Environment variable overriding [DEFAULT_PRESENT_INTERVAL], in milliseconds.
pub const PRESENT_INTERVAL_VAR: &str = "EAD_PRESENT_INTERVAL_MS";
/// Pixel format of layers created by [Surface::from_window].
pub const SCREEN_PIXEL_FORMAT: imp::PixelFormat = imp::PixelFormat::BGRA8Unorm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VSyncMode {
    Disabled,
    #[default]
    Enabled,
    Adaptive,
    Mailbox,
}

/// Outcome of [Surface::resize].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub enum SurfaceStatus {
    Ready,
    /// The surface has no area.  Skip presenting until it does.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presentation {
    #[default]
    Layer,
    Offscreen {
        /// Minimum time between drawable acquisitions.
        interval: Duration,
    },
}

impl Presentation {
    /// Offscreen presentation every [DEFAULT_PRESENT_INTERVAL], or every
    /// [PRESENT_INTERVAL_VAR] milliseconds when that is set.
    pub fn offscreen() -> Self {
        let interval = std::env::var(PRESENT_INTERVAL_VAR)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PRESENT_INTERVAL);
        Presentation::Offscreen { interval }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    pub vsync_mode: VSyncMode,
    pub presentation: Presentation,
}

impl SurfaceConfig {
    pub fn new(width: u32, height: u32) -> Self {
        SurfaceConfig {
            width,
            height,
            vsync_mode: VSyncMode::default(),
            presentation: Presentation::default(),
        }
    }
}

#[derive(Debug)]
pub struct Error(imp::Error);
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}
impl std::error::Error for Error {}

#[derive(Debug)]
struct Passthrough {
    frame_buffers: Vec<FrameBuffer>,
    drawables: Vec<Option<imp::Drawable>>,
    rear: usize,
    front: usize,
    count: usize,
}

impl Passthrough {
    fn new() -> Self {
        Passthrough {
            frame_buffers: Vec::new(),
            drawables: Vec::new(),
            rear: 0,
            front: 0,
            count: 0,
        }
    }

    fn resize(&mut self, layer: &imp::Layer, width: u32, height: u32, vsync_mode: VSyncMode, desired: u32) {
        let capacity = (desired as usize).clamp(1, MAX_FRAMES_IN_FLIGHT);
        if self.count > 0 {
            logwise::warn_sync!(
                "resizing with {count} frames live; they will not be presented",
                count = self.count
            );
        }
        if layer.drawable_size() != (width, height) {
            layer.set_drawable_size(width, height);
        }
        layer.set_maximum_drawable_count(capacity as u32);
        layer.set_display_sync_enabled(vsync_mode != VSyncMode::Disabled);
        self.frame_buffers = (0..capacity)
            .map(|_| FrameBuffer::new(Vec::new(), width, height))
            .collect();
        self.drawables = vec![None; capacity];
        self.rear = 0;
        self.front = 0;
        self.count = 0;
    }

    fn acquire(&mut self, layer: &imp::Layer) -> Option<FrameBuffer> {
        if self.count == self.frame_buffers.len() {
            return None;
        }
        let Some(drawable) = layer.next_drawable() else {
            panic!(
                "layer {:?} has no drawable with {} of {} frames live",
                layer.id(),
                self.count,
                self.frame_buffers.len()
            );
        };
        let slot = self.rear;
        self.frame_buffers[slot].set_textures(vec![drawable.texture().clone()]);
        self.drawables[slot] = Some(drawable);
        self.rear = (self.rear + 1) % self.frame_buffers.len();
        self.count += 1;
        Some(self.frame_buffers[slot].clone())
    }

    fn present(&mut self, command_buffer: &imp::NativeCommandBuffer) {
        if self.count == 0 {
            return;
        }
        let slot = self.front;
        self.frame_buffers[slot].set_textures(Vec::new());
        let drawable = self.drawables[slot].take();
        self.count -= 1;
        self.front = (self.front + 1) % self.frame_buffers.len();
        if let Some(drawable) = drawable {
            command_buffer.present_drawable(&drawable);
        }
    }

    fn live_count(&self) -> u32 {
        self.count as u32
    }
}

#[derive(Debug)]
struct Decoupled {
    frame_buffers: [FrameBuffer; MAX_FRAMES_IN_FLIGHT],
    textures: [Option<imp::Texture>; MAX_FRAMES_IN_FLIGHT],
    drawables: [Option<imp::Drawable>; MAX_FRAMES_IN_FLIGHT],
    last_texture: Option<imp::Texture>,
    rear: usize,
    front: usize,
    /// Frames acquired and not yet presented.
    unpresented: usize,
    /// Frames acquired and not yet scheduled.
    count: Arc<AtomicU32>,
    target_time: Instant,
    interval: Duration,
}

impl Decoupled {
    fn new(interval: Duration) -> Self {
        Decoupled {
            frame_buffers: Default::default(),
            textures: Default::default(),
            drawables: Default::default(),
            last_texture: None,
            rear: MAX_FRAMES_IN_FLIGHT - 1,
            front: 0,
            unpresented: 0,
            count: Arc::new(AtomicU32::new(0)),
            target_time: Instant::now(),
            interval,
        }
    }

    fn pool_texture(&mut self, device: &imp::Device, pixel_format: imp::PixelFormat, width: u32, height: u32) -> imp::Texture {
        if let Some(t) = &self.textures[self.rear]
            && t.width() == width
            && t.height() == height
        {
            return t.clone();
        }
        let texture = device.new_texture(imp::TextureDescriptor {
            pixel_format,
            width,
            height,
            sample_count: 1,
            usage: imp::TextureUsage::RENDER_TARGET,
            storage_mode: imp::StorageMode::Private,
            hazard_tracking_mode: imp::HazardTrackingMode::Tracked,
        });
        self.textures[self.rear] = Some(texture.clone());
        texture
    }

    /// Queues a copy of the previous frame into `texture` ahead of anything drawn into it.
    fn carry_forward(&self, device: &BoundDevice, texture: &imp::Texture) {
        let Some(last) = &self.last_texture else {
            return;
        };
        if last.id() == texture.id() || last.width() != texture.width() || last.height() != texture.height() {
            return;
        }
        let native = device.queue().command_buffer();
        native.push_debug_group("offscreen carry forward");
        let blit = native.blit_command_encoder();
        blit.copy_from_texture(last, texture);
        blit.end_encoding();
        native.pop_debug_group();
        native.commit();
    }

    fn acquire(&mut self, device: &BoundDevice, layer: &imp::Layer, width: u32, height: u32) -> Option<FrameBuffer> {
        if self.count.load(Ordering::Relaxed) as usize == MAX_FRAMES_IN_FLIGHT {
            return None;
        }
        self.rear = (self.rear + 1) % MAX_FRAMES_IN_FLIGHT;
        self.count.fetch_add(1, Ordering::Relaxed);

        let now = Instant::now();
        let texture = if now >= self.target_time {
            let Some(drawable) = layer.next_drawable() else {
                self.count.fetch_sub(1, Ordering::Relaxed);
                self.rear = (self.rear + MAX_FRAMES_IN_FLIGHT - 1) % MAX_FRAMES_IN_FLIGHT;
                logwise::warn_sync!(
                    "no drawable available from layer {layer}",
                    layer = logwise::privacy::LogIt(&layer.id())
                );
                return None;
            };
            self.target_time = now + self.interval;
            let texture = drawable.texture().clone();
            self.drawables[self.rear] = Some(drawable);
            texture
        } else {
            let texture = self.pool_texture(device.device(), layer.pixel_format(), width, height);
            self.carry_forward(device, &texture);
            texture
        };
        self.last_texture = Some(texture.clone());
        self.unpresented += 1;
        let frame_buffer = &mut self.frame_buffers[self.rear];
        frame_buffer.set_size(width, height);
        frame_buffer.set_textures(vec![texture]);
        Some(frame_buffer.clone())
    }

    fn present(&mut self, command_buffer: &imp::NativeCommandBuffer) {
        if self.unpresented == 0 {
            logwise::trace_sync!("offscreen present without an acquired frame");
            return;
        }
        let slot = self.front;
        self.front = (self.front + 1) % MAX_FRAMES_IN_FLIGHT;
        self.unpresented -= 1;
        if let Some(drawable) = self.drawables[slot].take() {
            command_buffer.present_drawable(&drawable);
        }
        let textures = self.frame_buffers[slot].textures().to_vec();
        self.frame_buffers[slot].set_textures(Vec::new());
        let count = self.count.clone();
        command_buffer.add_scheduled_handler(move |_| {
            drop(textures);
            count.fetch_sub(1, Ordering::Relaxed);
        });
    }

    fn live_count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
enum Ring {
    Passthrough(Passthrough),
    Decoupled(Box<Decoupled>),
}

#[derive(Debug)]
pub struct Surface {
    device: BoundDevice,
    layer: imp::Layer,
    render_pass: Arc<RenderPassDescriptor>,
    width: u32,
    height: u32,
    vsync_mode: VSyncMode,
    needs_resize: bool,
    ring: Ring,
}

impl Surface {
    pub fn new(device: &BoundDevice, layer: imp::Layer, config: &SurfaceConfig) -> Self {
        let ring = match config.presentation {
            Presentation::Layer => Ring::Passthrough(Passthrough::new()),
            Presentation::Offscreen { interval } => {
                layer.set_display_sync_enabled(false);
                Ring::Decoupled(Box::new(Decoupled::new(interval)))
            }
        };
        let attachment = Attachment {
            format: layer.pixel_format(),
            kind: AttachmentKind::COLOR,
            load_action: imp::LoadAction::Clear,
            store_action: imp::StoreAction::Store,
            stencil_load_action: imp::LoadAction::DontCare,
            stencil_store_action: imp::StoreAction::DontCare,
            sample_count: 1,
        };
        let subpass = Subpass {
            color_references: vec![0],
            ..Default::default()
        };
        let render_pass = RenderPassDescriptor::new(vec![attachment], vec![subpass])
            .expect("single color attachment pass is always valid");
        logwise::info_sync!(
            "surface {w}x{h} on layer {layer}",
            w = config.width,
            h = config.height,
            layer = logwise::privacy::LogIt(&layer.id())
        );
        Surface {
            device: device.clone(),
            layer,
            render_pass: Arc::new(render_pass),
            width: config.width,
            height: config.height,
            vsync_mode: config.vsync_mode,
            needs_resize: true,
            ring,
        }
    }

    /// A surface presenting to the view behind `handle`.
    pub fn from_window(
        device: &BoundDevice,
        handle: raw_window_handle::RawWindowHandle,
        config: &SurfaceConfig,
    ) -> Result<Self, Error> {
        let layer = imp::Layer::from_raw_window_handle(device.device(), handle, SCREEN_PIXEL_FORMAT)
            .map_err(Error)?;
        Ok(Self::new(device, layer, config))
    }

    pub fn layer(&self) -> &imp::Layer {
        &self.layer
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        if (self.width, self.height) == (width, height) {
            return;
        }
        logwise::info_sync!("surface size {w}x{h}", w = width, h = height);
        self.width = width;
        self.height = height;
        self.needs_resize = true;
    }

    pub fn vsync_mode(&self) -> VSyncMode {
        self.vsync_mode
    }

    pub fn set_vsync_mode(&mut self, mode: VSyncMode) {
        if self.vsync_mode == mode {
            return;
        }
        logwise::info_sync!(
            "surface vsync {mode}",
            mode = logwise::privacy::LogIt(&mode)
        );
        self.vsync_mode = mode;
        self.needs_resize = true;
    }

    /// Whether size or vsync changed since the last successful [Self::resize].
    pub fn needs_resize(&self) -> bool {
        self.needs_resize
    }

    /// Applies size and vsync mode and resets the ring to hold up to `desired_count` frames.
    ///
    /// The offscreen ring always holds [MAX_FRAMES_IN_FLIGHT].
    pub fn resize(&mut self, desired_count: u32) -> SurfaceStatus {
        if self.width == 0 || self.height == 0 {
            logwise::trace_sync!("surface has no area; skipping");
            return SurfaceStatus::Skip;
        }
        match &mut self.ring {
            Ring::Passthrough(p) => p.resize(&self.layer, self.width, self.height, self.vsync_mode, desired_count),
            Ring::Decoupled(_) => {
                if self.layer.drawable_size() != (self.width, self.height) {
                    self.layer.set_drawable_size(self.width, self.height);
                }
            }
        }
        self.needs_resize = false;
        SurfaceStatus::Ready
    }

    /// The next framebuffer to draw into, or `None` when every slot is live.
    pub fn acquire_next_framebuffer(&mut self) -> Option<FrameBuffer> {
        let frame_buffer = match &mut self.ring {
            Ring::Passthrough(p) => p.acquire(&self.layer),
            Ring::Decoupled(d) => d.acquire(&self.device, &self.layer, self.width, self.height),
        };
        if frame_buffer.is_none() {
            logwise::trace_sync!("no framebuffer available; frame skipped");
        }
        frame_buffer
    }

    /// Presents the oldest live frame when `command_buffer` completes.
    ///
    /// # Panics
    /// If `command_buffer` has no native command buffer begun, or (offscreen) it was already committed.
    pub fn present(&mut self, command_buffer: &CommandBuffer) {
        let native = command_buffer.native();
        match &mut self.ring {
            Ring::Passthrough(p) => p.present(native),
            Ring::Decoupled(d) => d.present(native),
        }
    }

    /// A pass that clears and stores the surface's single color attachment.
    pub fn render_pass(&self) -> &Arc<RenderPassDescriptor> {
        &self.render_pass
    }

    pub fn pixel_format(&self) -> imp::PixelFormat {
        self.layer.pixel_format()
    }

    /// Frames acquired and not yet retired.
    pub fn live_count(&self) -> u32 {
        match &self.ring {
            Ring::Passthrough(p) => p.live_count(),
            Ring::Decoupled(d) => d.live_count(),
        }
    }

    /// Frames the ring can hold at once.
    pub fn capacity(&self) -> usize {
        match &self.ring {
            Ring::Passthrough(p) => p.frame_buffers.len(),
            Ring::Decoupled(_) => MAX_FRAMES_IN_FLIGHT,
        }
    }
}
