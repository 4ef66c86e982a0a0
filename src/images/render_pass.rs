// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Render pass descriptions.

A [RenderPassDescriptor] is immutable once built and shared (via `Arc`) by the
framebuffers, surfaces and command buffers that use it.  Building one validates it: every
attachment has the same sample count, and subpass references point at attachments of the
right kind.
*/
use crate::imp;
use crate::imp::{LoadAction, StoreAction};
use crate::pixel_formats::{DataFormat, PixelFormats};

bitflags::bitflags! {
    /// Aspects of an attachment.  A combined depth-stencil attachment is both.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttachmentKind: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attachment {
    pub format: imp::PixelFormat,
    pub kind: AttachmentKind,
    pub load_action: LoadAction,
    pub store_action: StoreAction,
    pub stencil_load_action: LoadAction,
    pub stencil_store_action: StoreAction,
    pub sample_count: u32,
}

impl Attachment {
    /// Translates `format` and derives the attachment's aspects from it.
    ///
    /// Stencil load/store follow `load_action`/`store_action`; override the fields to differ.
    pub fn new(
        formats: &PixelFormats,
        format: DataFormat,
        sample_count: u32,
        load_action: LoadAction,
        store_action: StoreAction,
    ) -> Self {
        let format = formats.native_format(format);
        let mut kind = AttachmentKind::empty();
        if formats.is_depth(format) {
            kind |= AttachmentKind::DEPTH;
        }
        if formats.is_stencil(format) {
            kind |= AttachmentKind::STENCIL;
        }
        if kind.is_empty() {
            kind = AttachmentKind::COLOR;
        }
        Attachment {
            format,
            kind,
            load_action,
            store_action,
            stencil_load_action: load_action,
            stencil_store_action: store_action,
            sample_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Subpass {
    pub color_references: Vec<usize>,
    pub input_references: Vec<usize>,
    pub depth_stencil_reference: Option<usize>,
}

/// Clear value for one attachment, by attachment index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

impl Default for ClearValue {
    fn default() -> Self {
        ClearValue::Color([0.0; 4])
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RenderPassError {
    #[error("attachment {index} has {found} samples, attachment 0 has {expected}")]
    MixedSampleCounts {
        index: usize,
        expected: u32,
        found: u32,
    },
    #[error("subpass {subpass} references attachment {attachment}, which is not a {expected}")]
    InvalidReference {
        subpass: usize,
        attachment: usize,
        expected: &'static str,
    },
    #[error("attachment {0} is a color attachment beyond the last color slot")]
    TooManyColorAttachments(usize),
    #[error("a render pass needs at least one subpass")]
    NoSubpasses,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPassDescriptor {
    attachments: Vec<Attachment>,
    subpasses: Vec<Subpass>,
    depth_index: Option<usize>,
    stencil_index: Option<usize>,
}

impl RenderPassDescriptor {
    pub fn new(attachments: Vec<Attachment>, subpasses: Vec<Subpass>) -> Result<Self, RenderPassError> {
        if subpasses.is_empty() {
            return Err(RenderPassError::NoSubpasses);
        }
        if let Some(first) = attachments.first() {
            for (index, a) in attachments.iter().enumerate() {
                if a.sample_count != first.sample_count {
                    return Err(RenderPassError::MixedSampleCounts {
                        index,
                        expected: first.sample_count,
                        found: a.sample_count,
                    });
                }
                if a.kind.contains(AttachmentKind::COLOR) && index >= imp::MAX_COLOR_ATTACHMENTS {
                    return Err(RenderPassError::TooManyColorAttachments(index));
                }
            }
        }
        let check = |subpass: usize, attachment: usize, kind: AttachmentKind, expected: &'static str| {
            match attachments.get(attachment) {
                Some(a) if a.kind.intersects(kind) => Ok(()),
                _ => Err(RenderPassError::InvalidReference {
                    subpass,
                    attachment,
                    expected,
                }),
            }
        };
        for (i, s) in subpasses.iter().enumerate() {
            for c in &s.color_references {
                check(i, *c, AttachmentKind::COLOR, "color attachment")?;
            }
            for c in &s.input_references {
                check(i, *c, AttachmentKind::all(), "attachment")?;
            }
            if let Some(d) = s.depth_stencil_reference {
                check(
                    i,
                    d,
                    AttachmentKind::DEPTH | AttachmentKind::STENCIL,
                    "depth or stencil attachment",
                )?;
            }
        }
        let depth_index = attachments
            .iter()
            .position(|a| a.kind.contains(AttachmentKind::DEPTH));
        let stencil_index = attachments
            .iter()
            .position(|a| a.kind.contains(AttachmentKind::STENCIL));
        Ok(RenderPassDescriptor {
            attachments,
            subpasses,
            depth_index,
            stencil_index,
        })
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn subpasses(&self) -> &[Subpass] {
        &self.subpasses
    }

    pub fn depth_index(&self) -> Option<usize> {
        self.depth_index
    }

    pub fn stencil_index(&self) -> Option<usize> {
        self.stencil_index
    }

    /// Sample count of the pass: that of attachment 0, or 1 if there are none.
    pub fn sample_count(&self) -> u32 {
        self.attachments.first().map_or(1, |a| a.sample_count)
    }

    /// Indices of the color attachments.
    pub fn color_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.attachments
            .iter()
            .enumerate()
            .filter(|(_, a)| a.kind.contains(AttachmentKind::COLOR))
            .map(|(i, _)| i)
    }
}
