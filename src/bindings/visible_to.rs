//! Shader stage visibility and per-stage resource usage.
//!
//! When a uniform set is bound, the native API needs to know which stages touch each
//! resource and how (read, write, or both), so it can make the resource resident and order
//! hazards.  This module provides the vocabulary for that:
//!
//! - [`ShaderStage`] - one programmable stage
//! - [`ShaderStageUsage`] - a set of stages, one bit each
//! - [`StageResourceUsage`] - a [`imp::ResourceUsage`] per stage, packed 2 bits per stage
//!
//! # Examples
//!
//! ```
//! use encoders_and_drawables::bindings::visible_to::{ShaderStage, StageResourceUsage};
//! use encoders_and_drawables::imp::ResourceUsage;
//!
//! // A storage buffer read by the vertex stage and written by the fragment stage
//! let mut usage = StageResourceUsage::new(ShaderStage::Vertex, ResourceUsage::READ);
//! usage |= StageResourceUsage::new(ShaderStage::Fragment, ResourceUsage::WRITE);
//!
//! assert_eq!(usage.usage(ShaderStage::Vertex), ResourceUsage::READ);
//! assert_eq!(usage.usage(ShaderStage::Fragment), ResourceUsage::WRITE);
//! ```
use crate::bittricks;
use crate::imp;

/// A programmable shader stage.
///
/// The discriminant is the stage's field index in [`StageResourceUsage`] and its bit
/// index in [`ShaderStageUsage`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    /// Runs once per vertex.
    Vertex = 0,
    /// Runs once per fragment.
    Fragment = 1,
    /// Tessellation control.
    ///
    /// Recorded for completeness of reflection data.  Render encoders bind nothing for it.
    TessellationControl = 2,
    /// Tessellation evaluation.  As with control, reflection only.
    TessellationEvaluation = 3,
    /// Compute kernels.
    Compute = 4,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 5] = [
        ShaderStage::Vertex,
        ShaderStage::Fragment,
        ShaderStage::TessellationControl,
        ShaderStage::TessellationEvaluation,
        ShaderStage::Compute,
    ];

    /// The single-stage usage mask for this stage.
    pub fn usage(self) -> ShaderStageUsage {
        ShaderStageUsage::from_bits_truncate(1 << self as u8)
    }

    /// The render-encoder stage this corresponds to, if any.
    pub fn render_stages(self) -> imp::RenderStages {
        match self {
            ShaderStage::Vertex => imp::RenderStages::VERTEX,
            ShaderStage::Fragment => imp::RenderStages::FRAGMENT,
            _ => imp::RenderStages::empty(),
        }
    }
}

bitflags::bitflags! {
    /// A set of shader stages.
    ///
    /// # Examples
    ///
    /// ```
    /// use encoders_and_drawables::bindings::visible_to::{ShaderStage, ShaderStageUsage};
    ///
    /// let both = ShaderStageUsage::VERTEX | ShaderStageUsage::FRAGMENT;
    /// assert!(both.contains(ShaderStage::Fragment.usage()));
    /// assert!(!both.contains(ShaderStage::Compute.usage()));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStageUsage: u8 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const TESSELATION_CONTROL = 1 << 2;
        const TESSELATION_EVALUATION = 1 << 3;
        const COMPUTE = 1 << 4;
    }
}

/// Per-stage resource usage, packed.
///
/// Each [`ShaderStage`] owns a 2-bit field holding its [`imp::ResourceUsage`] bits (read = 1,
/// write = 2).  Combining two values with `|` ORs every stage's usage independently, so
/// merging is how a resource seen by several uniforms accumulates its usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StageResourceUsage(u32);

impl StageResourceUsage {
    /// `usage` for `stage`, nothing for every other stage.
    pub fn new(stage: ShaderStage, usage: imp::ResourceUsage) -> Self {
        StageResourceUsage(bittricks::pack_2bit(stage as u32, usage.bits()))
    }

    /// The usage recorded for `stage`.
    pub fn usage(self, stage: ShaderStage) -> imp::ResourceUsage {
        imp::ResourceUsage::from_bits_truncate(bittricks::unpack_2bit(self.0, stage as u32))
    }

    /// Union of the usage over every render stage, and the render stages that have any.
    ///
    /// This is the shape a render encoder's residency call wants.
    pub fn render_usage(self) -> (imp::ResourceUsage, imp::RenderStages) {
        let mut usage = imp::ResourceUsage::empty();
        let mut stages = imp::RenderStages::empty();
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            let u = self.usage(stage);
            if !u.is_empty() {
                usage |= u;
                stages |= stage.render_stages();
            }
        }
        (usage, stages)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for StageResourceUsage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        StageResourceUsage(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for StageResourceUsage {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imp::ResourceUsage;

    #[test]
    fn stage_fields() {
        let u = StageResourceUsage::new(ShaderStage::Compute, ResourceUsage::READ | ResourceUsage::WRITE);
        assert_eq!(u.bits(), 0b11 << 8);
        for stage in ShaderStage::ALL {
            if stage != ShaderStage::Compute {
                assert!(u.usage(stage).is_empty());
            }
        }
    }

    #[test]
    fn merge_is_per_stage_or() {
        let mut u = StageResourceUsage::new(ShaderStage::Fragment, ResourceUsage::READ);
        u |= StageResourceUsage::new(ShaderStage::Fragment, ResourceUsage::WRITE);
        u |= StageResourceUsage::new(ShaderStage::Vertex, ResourceUsage::READ);
        assert_eq!(
            u.usage(ShaderStage::Fragment),
            ResourceUsage::READ | ResourceUsage::WRITE
        );
        assert_eq!(u.usage(ShaderStage::Vertex), ResourceUsage::READ);
        let (usage, stages) = u.render_usage();
        assert_eq!(usage, ResourceUsage::READ | ResourceUsage::WRITE);
        assert_eq!(stages, imp::RenderStages::VERTEX | imp::RenderStages::FRAGMENT);
    }

    #[test]
    fn stage_usage_bits() {
        assert_eq!(ShaderStage::Compute.usage(), ShaderStageUsage::COMPUTE);
        assert_eq!(ShaderStage::Vertex.usage(), ShaderStageUsage::VERTEX);
    }
}
