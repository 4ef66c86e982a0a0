// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Framebuffers: the textures a render pass draws into.
use crate::images::render_pass::{AttachmentKind, ClearValue, RenderPassDescriptor};
use crate::imp;

/// An integer rectangle in framebuffer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// The overlap of the two rectangles, if it has any area.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x as i64 || bottom <= y as i64 {
            return None;
        }
        Some(Rect::new(x, y, (right - x as i64) as u32, (bottom - y as i64) as u32))
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// As a native scissor.  Negative origins clamp to zero.
    pub fn scissor(&self) -> imp::ScissorRect {
        imp::ScissorRect {
            x: self.x.max(0) as u32,
            y: self.y.max(0) as u32,
            width: self.width,
            height: self.height,
        }
    }
}

/// One texture per render pass attachment, in attachment order.
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    textures: Vec<imp::Texture>,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    pub fn new(textures: Vec<imp::Texture>, width: u32, height: u32) -> Self {
        FrameBuffer {
            textures,
            width,
            height,
        }
    }

    pub fn textures(&self) -> &[imp::Texture] {
        &self.textures
    }

    pub(crate) fn set_textures(&mut self, textures: Vec<imp::Texture>) {
        self.textures = textures;
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub(crate) fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Native pass descriptor pointing `pass`'s attachments at these textures.
    ///
    /// Color attachment `i` lands in color slot `i`.  Missing clear values clear to zero.
    ///
    /// # Panics
    /// If the texture count differs from the pass's attachment count.
    pub fn native_render_pass_descriptor(
        &self,
        pass: &RenderPassDescriptor,
        clear_values: &[ClearValue],
    ) -> imp::RenderPassDescriptor {
        assert_eq!(
            self.textures.len(),
            pass.attachments().len(),
            "framebuffer has {} textures for {} attachments",
            self.textures.len(),
            pass.attachments().len()
        );
        let mut descriptor = imp::RenderPassDescriptor::default();
        for (i, (attachment, texture)) in pass.attachments().iter().zip(&self.textures).enumerate() {
            let clear = clear_values.get(i).copied().unwrap_or_default();
            if attachment.kind.contains(AttachmentKind::COLOR) {
                let clear_color = match clear {
                    ClearValue::Color(c) => c.map(f64::from),
                    ClearValue::DepthStencil { .. } => [0.0; 4],
                };
                descriptor.color_attachments[i] = Some(imp::ColorAttachmentDescriptor {
                    texture: texture.clone(),
                    load_action: attachment.load_action,
                    store_action: attachment.store_action,
                    clear_color,
                });
            }
            let (depth, stencil) = match clear {
                ClearValue::DepthStencil { depth, stencil } => (depth as f64, stencil),
                ClearValue::Color(_) => (1.0, 0),
            };
            if pass.depth_index() == Some(i) {
                descriptor.depth_attachment = Some(imp::DepthAttachmentDescriptor {
                    texture: texture.clone(),
                    load_action: attachment.load_action,
                    store_action: attachment.store_action,
                    clear_depth: depth,
                });
            }
            if pass.stencil_index() == Some(i) {
                descriptor.stencil_attachment = Some(imp::StencilAttachmentDescriptor {
                    texture: texture.clone(),
                    load_action: attachment.stencil_load_action,
                    store_action: attachment.stencil_store_action,
                    clear_stencil: stencil,
                });
            }
        }
        descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection() {
        let a = Rect::new(0, 0, 100, 100);
        assert_eq!(a.intersection(&Rect::new(50, 50, 100, 100)), Some(Rect::new(50, 50, 50, 50)));
        assert_eq!(a.intersection(&Rect::new(100, 0, 10, 10)), None);
        assert_eq!(a.intersection(&Rect::new(-10, -10, 20, 20)), Some(Rect::new(0, 0, 10, 10)));
        assert!(a.contains(&Rect::new(0, 0, 100, 100)));
        assert!(!a.contains(&Rect::new(1, 0, 100, 100)));
    }
}
