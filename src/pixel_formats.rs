// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Pixel format registry.
//!
//! Engine code speaks in [DataFormat]s; the native layer speaks in [imp::PixelFormat]s.
//! [PixelFormats] translates between the two for one device, and answers the questions the
//! rest of the crate asks about a native format:
//!
//! - how many bytes one block occupies
//! - whether it has a depth or stencil aspect
//! - what component type a shader writes to it
//!
//! # Substitution
//!
//! Not every device can render to every format.  When a device lacks
//! [DataFormat::D24UnormS8Uint], the registry substitutes
//! [imp::PixelFormat::Depth32FloatStencil8], which every device supports.

/*
Quick note on type design.  Zero-sized format types would let us
typecheck pixel writes, but nothing in here writes pixels.  Formats here come from render
pass descriptions at runtime and end up as keys in caches, so a plain enum it is.
*/

use crate::imp;
use crate::imp::PixelFormat;

/// Engine-facing format names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    R8Unorm,
    R8Uint,
    R16Sfloat,
    R8G8Unorm,
    R32Uint,
    R32Sint,
    R32Sfloat,
    R8G8B8A8Unorm,
    R8G8B8A8Srgb,
    R8G8B8A8Uint,
    R8G8B8A8Sint,
    B8G8R8A8Unorm,
    B8G8R8A8Srgb,
    A2B10G10R10Unorm,
    R16G16B16A16Sfloat,
    R32G32B32A32Uint,
    R32G32B32A32Sint,
    R32G32B32A32Sfloat,
    D16Unorm,
    D32Sfloat,
    S8Uint,
    D24UnormS8Uint,
    D32SfloatS8Uint,
}

/// What a shader reads from or writes to a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Float,
    Int,
    Uint,
}

impl ComponentType {
    /// Four-component shading-language vector type.
    pub fn vector_type(self) -> &'static str {
        match self {
            ComponentType::Float => "float4",
            ComponentType::Int => "int4",
            ComponentType::Uint => "uint4",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PixelFormats {
    supports_depth24_stencil8: bool,
}

impl PixelFormats {
    pub fn new(limits: &imp::DeviceLimits) -> Self {
        PixelFormats {
            supports_depth24_stencil8: limits.supports_depth24_stencil8,
        }
    }

    pub fn native_format(&self, format: DataFormat) -> PixelFormat {
        match format {
            DataFormat::R8Unorm => PixelFormat::R8Unorm,
            DataFormat::R8Uint => PixelFormat::R8Uint,
            DataFormat::R16Sfloat => PixelFormat::R16Float,
            DataFormat::R8G8Unorm => PixelFormat::RG8Unorm,
            DataFormat::R32Uint => PixelFormat::R32Uint,
            DataFormat::R32Sint => PixelFormat::R32Sint,
            DataFormat::R32Sfloat => PixelFormat::R32Float,
            DataFormat::R8G8B8A8Unorm => PixelFormat::RGBA8Unorm,
            DataFormat::R8G8B8A8Srgb => PixelFormat::RGBA8UnormSrgb,
            DataFormat::R8G8B8A8Uint => PixelFormat::RGBA8Uint,
            DataFormat::R8G8B8A8Sint => PixelFormat::RGBA8Sint,
            DataFormat::B8G8R8A8Unorm => PixelFormat::BGRA8Unorm,
            DataFormat::B8G8R8A8Srgb => PixelFormat::BGRA8UnormSrgb,
            DataFormat::A2B10G10R10Unorm => PixelFormat::RGB10A2Unorm,
            DataFormat::R16G16B16A16Sfloat => PixelFormat::RGBA16Float,
            DataFormat::R32G32B32A32Uint => PixelFormat::RGBA32Uint,
            DataFormat::R32G32B32A32Sint => PixelFormat::RGBA32Sint,
            DataFormat::R32G32B32A32Sfloat => PixelFormat::RGBA32Float,
            DataFormat::D16Unorm => PixelFormat::Depth16Unorm,
            DataFormat::D32Sfloat => PixelFormat::Depth32Float,
            DataFormat::S8Uint => PixelFormat::Stencil8,
            DataFormat::D24UnormS8Uint if self.supports_depth24_stencil8 => {
                PixelFormat::Depth24UnormStencil8
            }
            DataFormat::D24UnormS8Uint => {
                logwise::trace_sync!("substituting Depth32FloatStencil8 for D24UnormS8Uint");
                PixelFormat::Depth32FloatStencil8
            }
            DataFormat::D32SfloatS8Uint => PixelFormat::Depth32FloatStencil8,
        }
    }

    /// Bytes per block; every format here has 1x1 blocks.
    pub fn bytes_per_block(&self, format: PixelFormat) -> u32 {
        match format {
            PixelFormat::Invalid => 0,
            PixelFormat::R8Unorm | PixelFormat::R8Uint | PixelFormat::Stencil8 => 1,
            PixelFormat::R16Float | PixelFormat::RG8Unorm | PixelFormat::Depth16Unorm => 2,
            PixelFormat::R32Uint
            | PixelFormat::R32Sint
            | PixelFormat::R32Float
            | PixelFormat::RGBA8Unorm
            | PixelFormat::RGBA8UnormSrgb
            | PixelFormat::RGBA8Uint
            | PixelFormat::RGBA8Sint
            | PixelFormat::BGRA8Unorm
            | PixelFormat::BGRA8UnormSrgb
            | PixelFormat::RGB10A2Unorm
            | PixelFormat::Depth32Float
            | PixelFormat::Depth24UnormStencil8 => 4,
            PixelFormat::RGBA16Float | PixelFormat::Depth32FloatStencil8 => 8,
            PixelFormat::RGBA32Uint | PixelFormat::RGBA32Sint | PixelFormat::RGBA32Float => 16,
        }
    }

    pub fn is_depth(&self, format: PixelFormat) -> bool {
        format.has_depth()
    }

    pub fn is_stencil(&self, format: PixelFormat) -> bool {
        format.has_stencil()
    }

    pub fn component_type(&self, format: PixelFormat) -> ComponentType {
        match format {
            PixelFormat::R8Uint
            | PixelFormat::R32Uint
            | PixelFormat::RGBA8Uint
            | PixelFormat::RGBA32Uint
            | PixelFormat::Stencil8 => ComponentType::Uint,
            PixelFormat::R32Sint | PixelFormat::RGBA8Sint | PixelFormat::RGBA32Sint => {
                ComponentType::Int
            }
            _ => ComponentType::Float,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth24_substitution() {
        let mut limits = imp::DeviceLimits::default();
        limits.supports_depth24_stencil8 = false;
        let formats = PixelFormats::new(&limits);
        assert_eq!(
            formats.native_format(DataFormat::D24UnormS8Uint),
            PixelFormat::Depth32FloatStencil8
        );
        limits.supports_depth24_stencil8 = true;
        let formats = PixelFormats::new(&limits);
        assert_eq!(
            formats.native_format(DataFormat::D24UnormS8Uint),
            PixelFormat::Depth24UnormStencil8
        );
    }

    #[test]
    fn aspects() {
        let formats = PixelFormats::new(&imp::DeviceLimits::default());
        let ds = formats.native_format(DataFormat::D32SfloatS8Uint);
        assert!(formats.is_depth(ds) && formats.is_stencil(ds));
        let s = formats.native_format(DataFormat::S8Uint);
        assert!(!formats.is_depth(s) && formats.is_stencil(s));
        assert_eq!(formats.bytes_per_block(ds), 8);
        assert_eq!(
            formats.component_type(formats.native_format(DataFormat::R32G32B32A32Sint)),
            ComponentType::Int
        );
        assert_eq!(ComponentType::Uint.vector_type(), "uint4");
    }
}
