// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The compositor's drawable queue.
use super::journal::NativeCall;
use super::objects::{ObjectId, PixelFormat, Texture, TextureDescriptor};
use super::{Device, Error};
use raw_window_handle::RawWindowHandle;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// How long [Layer::next_drawable] waits for a drawable before giving up.
pub const DRAWABLE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct LayerState {
    drawable_size: (u32, u32),
    maximum_drawable_count: u32,
    display_sync_enabled: bool,
    outstanding: u32,
}

#[derive(Debug)]
struct LayerShared {
    id: ObjectId,
    device: Device,
    pixel_format: PixelFormat,
    /// Address of the platform view this layer backs, if any.
    view: Option<usize>,
    state: Mutex<LayerState>,
    available: Condvar,
    presented: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct Layer(Arc<LayerShared>);

impl Layer {
    /// A layer not attached to any window.
    pub fn new(device: &Device, pixel_format: PixelFormat) -> Self {
        Self::with_view(device, pixel_format, None)
    }

    /// Attaches a layer to the view behind `handle`.
    ///
    /// Only AppKit and UIKit views carry a compositor layer.
    pub fn from_raw_window_handle(
        device: &Device,
        handle: RawWindowHandle,
        pixel_format: PixelFormat,
    ) -> Result<Self, Error> {
        let view = match handle {
            RawWindowHandle::AppKit(h) => h.ns_view.as_ptr() as usize,
            RawWindowHandle::UiKit(h) => h.ui_view.as_ptr() as usize,
            other => return Err(Error::UnsupportedWindowHandle(format!("{other:?}"))),
        };
        Ok(Self::with_view(device, pixel_format, Some(view)))
    }

    fn with_view(device: &Device, pixel_format: PixelFormat, view: Option<usize>) -> Self {
        Layer(Arc::new(LayerShared {
            id: device.next_object_id(),
            device: device.clone(),
            pixel_format,
            view,
            state: Mutex::new(LayerState {
                drawable_size: (0, 0),
                maximum_drawable_count: 3,
                display_sync_enabled: true,
                outstanding: 0,
            }),
            available: Condvar::new(),
            presented: AtomicU64::new(0),
        }))
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.0.pixel_format
    }

    pub fn is_attached_to_view(&self) -> bool {
        self.0.view.is_some()
    }

    pub fn drawable_size(&self) -> (u32, u32) {
        self.0.state.lock().unwrap().drawable_size
    }

    pub fn set_drawable_size(&self, width: u32, height: u32) {
        self.0.state.lock().unwrap().drawable_size = (width, height);
    }

    pub fn maximum_drawable_count(&self) -> u32 {
        self.0.state.lock().unwrap().maximum_drawable_count
    }

    /// Clamped to `2..=3`.
    pub fn set_maximum_drawable_count(&self, count: u32) {
        self.0.state.lock().unwrap().maximum_drawable_count = count.clamp(2, 3);
        self.0.available.notify_all();
    }

    pub fn display_sync_enabled(&self) -> bool {
        self.0.state.lock().unwrap().display_sync_enabled
    }

    pub fn set_display_sync_enabled(&self, enabled: bool) {
        self.0.state.lock().unwrap().display_sync_enabled = enabled;
    }

    /// Drawables handed out and not yet returned.
    pub fn outstanding_drawables(&self) -> u32 {
        self.0.state.lock().unwrap().outstanding
    }

    /// Drawables whose presenting command buffer has completed.
    pub fn presented_count(&self) -> u64 {
        self.0.presented.load(Ordering::Relaxed)
    }

    /// Waits up to [DRAWABLE_TIMEOUT] for a free drawable.
    pub fn next_drawable(&self) -> Option<Drawable> {
        let state = self.0.state.lock().unwrap();
        let (mut state, timeout) = self
            .0
            .available
            .wait_timeout_while(state, DRAWABLE_TIMEOUT, |s| {
                s.outstanding >= s.maximum_drawable_count
            })
            .unwrap();
        if timeout.timed_out() && state.outstanding >= state.maximum_drawable_count {
            return None;
        }
        state.outstanding += 1;
        let (width, height) = state.drawable_size;
        drop(state);

        let texture = self.0.device.new_texture(TextureDescriptor::render_target(
            self.0.pixel_format,
            width,
            height,
        ));
        let drawable = Drawable(Arc::new(DrawableInner {
            id: self.0.device.next_object_id(),
            texture,
            layer: self.0.clone(),
            presented: AtomicBool::new(false),
        }));
        self.0.device.journal().record(NativeCall::NextDrawable {
            layer: self.0.id,
            drawable: drawable.id(),
        });
        Some(drawable)
    }
}

#[derive(Debug)]
struct DrawableInner {
    id: ObjectId,
    texture: Texture,
    layer: Arc<LayerShared>,
    presented: AtomicBool,
}

impl Drop for DrawableInner {
    fn drop(&mut self) {
        let mut state = self.layer.state.lock().unwrap();
        state.outstanding -= 1;
        drop(state);
        self.layer.available.notify_one();
    }
}

/// A displayable texture on loan from a [Layer].  The slot returns when the last clone drops.
#[derive(Debug, Clone)]
pub struct Drawable(Arc<DrawableInner>);

impl Drawable {
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn texture(&self) -> &Texture {
        &self.0.texture
    }

    pub fn is_presented(&self) -> bool {
        self.0.presented.load(Ordering::Relaxed)
    }

    pub(super) fn mark_presented(&self) {
        if !self.0.presented.swap(true, Ordering::Relaxed) {
            self.0.layer.presented.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raw_window_handle::{AppKitWindowHandle, RawWindowHandle, WaylandWindowHandle};
    use std::ptr::NonNull;

    #[test]
    fn exhausted_layer_times_out() {
        let device = Device::system_default();
        let layer = Layer::new(&device, PixelFormat::BGRA8Unorm);
        layer.set_maximum_drawable_count(2);
        let a = layer.next_drawable().unwrap();
        let _b = layer.next_drawable().unwrap();
        assert!(layer.next_drawable().is_none());
        drop(a);
        assert!(layer.next_drawable().is_some());
    }

    #[test]
    fn drawable_count_is_clamped() {
        let device = Device::system_default();
        let layer = Layer::new(&device, PixelFormat::BGRA8Unorm);
        layer.set_maximum_drawable_count(7);
        assert_eq!(layer.maximum_drawable_count(), 3);
        layer.set_maximum_drawable_count(1);
        assert_eq!(layer.maximum_drawable_count(), 2);
    }

    #[test]
    fn window_handles() {
        let device = Device::system_default();
        let appkit = AppKitWindowHandle::new(NonNull::dangling());
        let layer = Layer::from_raw_window_handle(
            &device,
            RawWindowHandle::AppKit(appkit),
            PixelFormat::BGRA8Unorm,
        )
        .unwrap();
        assert!(layer.is_attached_to_view());
        let wayland = WaylandWindowHandle::new(NonNull::dangling());
        assert!(matches!(
            Layer::from_raw_window_handle(
                &device,
                RawWindowHandle::Wayland(wayland),
                PixelFormat::BGRA8Unorm
            ),
            Err(Error::UnsupportedWindowHandle(_))
        ));
    }
}
