// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Builds the native objects [super::resource_cache::ResourceCache] memoizes.
//!
//! Clear pipelines draw a quad per cleared rect.  The vertex stage passes positions
//! through and takes depth from the clear-color table's depth slot; the fragment stage
//! writes each enabled color slot from the table, in that slot's component type.
use crate::images::resource_cache::{
    ATTACHMENT_COUNT, ClearAttachmentKey, DEPTH_INDEX, STENCIL_INDEX,
};
use crate::imp;
use crate::pixel_formats::PixelFormats;
use std::fmt::Write;

pub const CLEAR_VERTEX_FUNCTION: &str = "vertClear";
pub const CLEAR_FRAGMENT_FUNCTION: &str = "fragClear";
/// Buffer index the clear color table is bound at, in both stages.
pub const CLEAR_COLORS_INDEX: u32 = 0;
/// Buffer index the clear quad's vertices are bound at.
pub const CLEAR_VERTICES_INDEX: u32 = 1;

#[derive(Debug)]
pub struct ResourceFactory {
    device: imp::Device,
    formats: PixelFormats,
}

impl ResourceFactory {
    pub fn new(device: imp::Device, formats: PixelFormats) -> Self {
        ResourceFactory { device, formats }
    }

    fn clear_vertex_source() -> String {
        format!(
            "#include <metal_stdlib>
using namespace metal;

typedef struct {{
    float4 a_position [[attribute(0)]];
}} AttributesPos;

typedef struct {{
    float4 colors[{count}];
}} ClearColorsIn;

typedef struct {{
    float4 v_position [[position]];
    uint layer [[render_target_array_index]];
}} VaryingsPos;

vertex VaryingsPos {name}(AttributesPos attributes [[stage_in]], constant ClearColorsIn& ccIn [[buffer({colors})]]) {{
    VaryingsPos varyings;
    varyings.v_position = float4(attributes.a_position.x, -attributes.a_position.y, ccIn.colors[{depth}].r, 1.0);
    varyings.layer = uint(attributes.a_position.w);
    return varyings;
}}
",
            count = ATTACHMENT_COUNT,
            name = CLEAR_VERTEX_FUNCTION,
            colors = CLEAR_COLORS_INDEX,
            depth = DEPTH_INDEX,
        )
    }

    fn clear_fragment_source(&self, key: &ClearAttachmentKey) -> String {
        let mut outputs = String::new();
        let mut assignments = String::new();
        for i in key.color_indices() {
            let ty = self
                .formats
                .component_type(key.pixel_format(i))
                .vector_type();
            //writing to a String cannot fail
            let _ = writeln!(outputs, "    {ty} color{i} [[color({i})]];");
            let _ = writeln!(assignments, "    ccOut.color{i} = {ty}(ccIn.colors[{i}]);");
        }
        format!(
            "#include <metal_stdlib>
using namespace metal;

typedef struct {{
    float4 v_position [[position]];
}} VaryingsPos;

typedef struct {{
    float4 colors[{count}];
}} ClearColorsIn;

typedef struct {{
{outputs}}} ClearColorsOut;

fragment ClearColorsOut {name}(VaryingsPos varyings [[stage_in]], constant ClearColorsIn& ccIn [[buffer({colors})]]) {{
    ClearColorsOut ccOut;
{assignments}    return ccOut;
}}
",
            count = ATTACHMENT_COUNT,
            name = CLEAR_FRAGMENT_FUNCTION,
            colors = CLEAR_COLORS_INDEX,
        )
    }

    fn function(&self, source: &str, label: &str, name: &str) -> Result<imp::Function, imp::Error> {
        let library = self.device.new_library_with_source(source, label)?;
        library.function(name).ok_or_else(|| imp::Error::Compile {
            label: label.to_string(),
            message: format!("{name} not found"),
        })
    }

    pub fn new_clear_vertex_function(&self) -> Result<imp::Function, imp::Error> {
        self.function(&Self::clear_vertex_source(), "clear vertex", CLEAR_VERTEX_FUNCTION)
    }

    pub fn new_clear_fragment_function(&self, key: &ClearAttachmentKey) -> Result<imp::Function, imp::Error> {
        self.function(
            &self.clear_fragment_source(key),
            "clear fragment",
            CLEAR_FRAGMENT_FUNCTION,
        )
    }

    pub fn new_clear_pipeline_state(
        &self,
        key: &ClearAttachmentKey,
    ) -> Result<imp::RenderPipelineState, imp::Error> {
        let _perf = logwise::perfwarn_begin!("ResourceFactory::new_clear_pipeline_state");
        let mut descriptor = imp::RenderPipelineDescriptor {
            label: "clear attachments".to_string(),
            vertex_function: Some(self.new_clear_vertex_function()?),
            fragment_function: Some(self.new_clear_fragment_function(key)?),
            sample_count: key.sample_count(),
            ..Default::default()
        };
        for i in key.color_indices() {
            descriptor.color_formats[i] = key.pixel_format(i);
        }
        if key.is_depth_enabled() {
            descriptor.depth_format = key.pixel_format(DEPTH_INDEX);
        }
        if key.is_stencil_enabled() {
            descriptor.stencil_format = key.pixel_format(STENCIL_INDEX);
        }
        self.device.new_render_pipeline_state(&descriptor)
    }

    /// Depth always passes.  Depth is written only with `use_depth`; stencil, with
    /// `use_stencil`, is replaced unconditionally.
    pub fn new_depth_stencil_state(&self, use_depth: bool, use_stencil: bool) -> imp::DepthStencilState {
        let stencil = use_stencil.then_some(imp::StencilDescriptor {
            compare: imp::CompareFunction::Always,
            stencil_failure: imp::StencilOperation::Replace,
            depth_failure: imp::StencilOperation::Replace,
            depth_stencil_pass: imp::StencilOperation::Replace,
            read_mask: 0xFF,
            write_mask: 0xFF,
        });
        self.device.new_depth_stencil_state(imp::DepthStencilDescriptor {
            label: format!("depth {use_depth} stencil {use_stencil}"),
            depth_compare: imp::CompareFunction::Always,
            depth_write_enabled: use_depth,
            front_stencil: stencil,
            back_stencil: stencil,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> ResourceFactory {
        let device = imp::Device::system_default();
        let formats = PixelFormats::new(device.limits());
        ResourceFactory::new(device, formats)
    }

    #[test]
    fn fragment_source_uses_component_types() {
        let f = factory();
        let mut key = ClearAttachmentKey::new(1);
        key.set_color_format(0, imp::PixelFormat::RGBA8Unorm);
        key.set_color_format(3, imp::PixelFormat::R32Uint);
        let source = f.clear_fragment_source(&key);
        assert!(source.contains("float4 color0 [[color(0)]];"));
        assert!(source.contains("uint4 color3 [[color(3)]];"));
        assert!(!source.contains("color1"));
    }

    #[test]
    fn stencil_only_state() {
        let f = factory();
        let state = f.new_depth_stencil_state(false, true);
        let d = state.descriptor();
        assert!(!d.depth_write_enabled);
        assert_eq!(
            d.front_stencil.map(|s| s.depth_stencil_pass),
            Some(imp::StencilOperation::Replace)
        );
    }
}
