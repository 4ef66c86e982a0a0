// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Memoized native objects the command buffer needs but nobody else owns.

Two families:

- clear pipelines, one per distinct [ClearAttachmentKey]
- depth-stencil states, one per (depth enabled, stencil enabled) combination

Both caches only ever grow.  Anything handed out stays valid for the cache's lifetime, and
the same input always yields the same object.  Construction failures are reported to the
caller and not remembered, so the next request tries again.
*/
use crate::images::resource_factory::ResourceFactory;
use crate::imp;
use crate::imp::{MAX_COLOR_ATTACHMENTS, PixelFormat};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// Slot of the depth format in a [ClearAttachmentKey].
pub const DEPTH_INDEX: usize = MAX_COLOR_ATTACHMENTS;
/// Slot of the stencil format in a [ClearAttachmentKey].
pub const STENCIL_INDEX: usize = DEPTH_INDEX + 1;
pub const ATTACHMENT_COUNT: usize = STENCIL_INDEX + 1;

/// Identifies a clear pipeline: sample count plus a format per slot, [PixelFormat::Invalid]
/// meaning the slot is not cleared.
///
/// Every field is a `u16`, so the derived equality and hash agree with comparing
/// [ClearAttachmentKey::as_bytes].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClearAttachmentKey {
    sample_count: u16,
    pixel_formats: [PixelFormat; ATTACHMENT_COUNT],
}

impl ClearAttachmentKey {
    pub fn new(sample_count: u32) -> Self {
        ClearAttachmentKey {
            sample_count: sample_count as u16,
            pixel_formats: [PixelFormat::Invalid; ATTACHMENT_COUNT],
        }
    }

    pub fn set_color_format(&mut self, index: usize, format: PixelFormat) {
        assert!(index < MAX_COLOR_ATTACHMENTS, "color slot {index} out of range");
        self.pixel_formats[index] = format;
    }

    pub fn set_depth_format(&mut self, format: PixelFormat) {
        self.pixel_formats[DEPTH_INDEX] = format;
    }

    pub fn set_stencil_format(&mut self, format: PixelFormat) {
        self.pixel_formats[STENCIL_INDEX] = format;
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count as u32
    }

    pub fn pixel_format(&self, index: usize) -> PixelFormat {
        self.pixel_formats[index]
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.pixel_formats[index] != PixelFormat::Invalid
    }

    pub fn is_depth_enabled(&self) -> bool {
        self.is_enabled(DEPTH_INDEX)
    }

    pub fn is_stencil_enabled(&self) -> bool {
        self.is_enabled(STENCIL_INDEX)
    }

    /// Enabled color slots.
    pub fn color_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_COLOR_ATTACHMENTS).filter(|i| self.is_enabled(*i))
    }

    /// Native-endian byte image of the key.
    pub fn as_bytes(&self) -> [u8; 2 * (ATTACHMENT_COUNT + 1)] {
        let mut bytes = [0; 2 * (ATTACHMENT_COUNT + 1)];
        bytes[0..2].copy_from_slice(&self.sample_count.to_ne_bytes());
        for (i, f) in self.pixel_formats.iter().enumerate() {
            bytes[2 + 2 * i..4 + 2 * i].copy_from_slice(&f.raw().to_ne_bytes());
        }
        bytes
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("could not build clear pipeline for {key:?}: {source}")]
    ClearPipeline {
        key: ClearAttachmentKey,
        #[source]
        source: imp::Error,
    },
}

#[derive(Debug)]
pub struct ResourceCache {
    factory: ResourceFactory,
    clear_states: Mutex<HashMap<ClearAttachmentKey, imp::RenderPipelineState>>,
    depth_stencil_states: [OnceLock<imp::DepthStencilState>; 4],
}

impl ResourceCache {
    pub fn new(factory: ResourceFactory) -> Self {
        ResourceCache {
            factory,
            clear_states: Mutex::new(HashMap::new()),
            depth_stencil_states: Default::default(),
        }
    }

    /// The clear pipeline for `key`, built on first request.
    pub fn get_clear_render_pipeline_state(
        &self,
        key: &ClearAttachmentKey,
    ) -> Result<imp::RenderPipelineState, ResourceError> {
        let mut states = self.clear_states.lock().unwrap();
        if let Some(state) = states.get(key) {
            return Ok(state.clone());
        }
        let state = self
            .factory
            .new_clear_pipeline_state(key)
            .map_err(|source| {
                logwise::error_sync!(
                    "clear pipeline construction failed: {source}",
                    source = logwise::privacy::LogIt(&source)
                );
                ResourceError::ClearPipeline { key: *key, source }
            })?;
        states.insert(*key, state.clone());
        Ok(state)
    }

    /// One of four singletons, by which aspects a pass has.
    pub fn get_depth_stencil_state(&self, use_depth: bool, use_stencil: bool) -> imp::DepthStencilState {
        let index = use_depth as usize | (use_stencil as usize) << 1;
        self.depth_stencil_states[index]
            .get_or_init(|| self.factory.new_depth_stencil_state(use_depth, use_stencil))
            .clone()
    }

    /// Clear pipelines built so far.
    pub fn clear_pipeline_count(&self) -> usize {
        self.clear_states.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_equality_is_bytewise() {
        let mut a = ClearAttachmentKey::new(4);
        a.set_color_format(0, PixelFormat::RGBA8Unorm);
        a.set_depth_format(PixelFormat::Depth32Float);
        let mut b = ClearAttachmentKey::new(4);
        b.set_depth_format(PixelFormat::Depth32Float);
        assert_ne!(a, b);
        assert_ne!(a.as_bytes(), b.as_bytes());
        b.set_color_format(0, PixelFormat::RGBA8Unorm);
        assert_eq!(a, b);
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a, ClearAttachmentKey { sample_count: 1, ..b });
    }

    #[test]
    fn key_slots() {
        let mut k = ClearAttachmentKey::new(1);
        k.set_color_format(2, PixelFormat::BGRA8Unorm);
        k.set_stencil_format(PixelFormat::Stencil8);
        assert_eq!(k.color_indices().collect::<Vec<_>>(), vec![2]);
        assert!(!k.is_depth_enabled());
        assert!(k.is_stencil_enabled());
        assert_eq!(&k.as_bytes()[6..8], &80u16.to_ne_bytes()[..]);
    }
}
