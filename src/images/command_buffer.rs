// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The command buffer state machine.

A [CommandBuffer] records into one native command buffer through at most one encoder at
a time.  Which encoder, if any, is the [EncoderType]; each kind carries its own sub-state,
and only the active kind's sub-state exists.

```text
           begin_pass            bind_pipeline(Compute)        blit_*
   None ---------------> Render   None ----------------> Compute   None -------> Blit
     ^                     |        ^                      |         ^            |
     +----- end_pass ------+        +---- compute_end -----+         +- blit_end -+
```

# Deferred render state

Render state is not sent to the encoder when it is set.  Binding a pipeline or uniform set
records it and raises a dirty flag; the next draw flushes, in order:

1. `PIPELINE`: the native pipeline state and the pipeline's raster state
2. `UNIFORMS`: every uniform set recorded since the last draw
3. `DEPTH`: the depth-stencil state for the pass's depth/stencil aspects

then clears the flags.  Two draws with nothing bound in between send no state at all.

Flags raised on behalf of an operation that clobbers encoder state (a mid-pass clear,
a subpass restart) go through `mark_dirty`, which does nothing until a pipeline is bound;
binding the first pipeline raises everything it needs anyway.
*/
use crate::bindings::uniform_set::UniformSet;
use crate::bindings::visible_to::ShaderStage;
use crate::images::device::BoundDevice;
use crate::images::framebuffer::{FrameBuffer, Rect};
use crate::images::pipeline::{ComputePipeline, Pipeline, RenderPipeline};
use crate::images::render_pass::{AttachmentKind, ClearValue, RenderPassDescriptor};
use crate::images::resource_cache::{ClearAttachmentKey, DEPTH_INDEX, ATTACHMENT_COUNT, ResourceError};
use crate::images::resource_factory::{CLEAR_COLORS_INDEX, CLEAR_VERTICES_INDEX};
use crate::images::shader::{PushConstantTarget, Shader};
use crate::imp;
use std::sync::Arc;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u8 {
        const PIPELINE = 1 << 0;
        const UNIFORMS = 1 << 1;
        const DEPTH = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderType {
    None,
    Render,
    Compute,
    Blit,
}

/// One attachment to clear mid-pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachmentClear {
    /// Which aspects to clear.  Depth and stencil clear the current subpass's
    /// depth-stencil attachment.
    pub aspect: AttachmentKind,
    /// Attachment index, for color clears.
    pub color_attachment: usize,
    pub value: ClearValue,
}

#[derive(Debug)]
struct IndexBinding {
    buffer: imp::Buffer,
    index_type: imp::IndexType,
    offset: u64,
}

#[derive(Debug)]
struct RenderState {
    encoder: imp::RenderCommandEncoder,
    native_pass: imp::RenderPassDescriptor,
    pass: Arc<RenderPassDescriptor>,
    frame_buffer: FrameBuffer,
    current_subpass: usize,
    render_area: Rect,
    is_rendering_entire_area: bool,
    pipeline: Option<Arc<RenderPipeline>>,
    index_buffer: Option<IndexBinding>,
    uniform_sets: Vec<Option<Arc<UniformSet>>>,
    /// Set indices recorded since the last flush.
    uniform_set_mask: u64,
    push_constants: Vec<u32>,
    viewports: Vec<imp::Viewport>,
    scissor: Option<imp::ScissorRect>,
    dirty: DirtyFlags,
}

impl RenderState {
    fn mark_dirty(&mut self, flags: DirtyFlags) {
        if self.pipeline.is_some() {
            self.dirty |= flags;
        }
    }

    fn recorded_uniform_sets(&self) -> u64 {
        self.uniform_sets
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .fold(0, |mask, (i, _)| mask | 1 << i)
    }

    fn flush(&mut self, device: &BoundDevice) {
        let Some(pipeline) = self.pipeline.clone() else {
            panic!("draw without a bound render pipeline");
        };
        if self.dirty.contains(DirtyFlags::PIPELINE) {
            self.encoder.set_render_pipeline_state(pipeline.state());
            pipeline.raster_state().apply(&self.encoder);
        }
        if self.dirty.contains(DirtyFlags::UNIFORMS) {
            for (index, set) in self.uniform_sets.iter().enumerate() {
                if self.uniform_set_mask & (1 << index) == 0 {
                    continue;
                }
                if let Some(set) = set {
                    bind_render_uniform_set(&self.encoder, device, pipeline.shader(), set, index as u32);
                }
            }
            self.uniform_set_mask = 0;
        }
        if self.dirty.contains(DirtyFlags::DEPTH) {
            let has_depth = self.pass.depth_index().is_some();
            let has_stencil = self.pass.stencil_index().is_some();
            let state = match pipeline.depth_stencil() {
                Some(s) if has_depth || has_stencil => s.clone(),
                _ => device
                    .resource_cache()
                    .get_depth_stencil_state(has_depth, has_stencil),
            };
            self.encoder.set_depth_stencil_state(&state);
        }
        self.dirty = DirtyFlags::empty();
    }

    fn restore_scissor(&self) {
        if let Some(scissor) = self.scissor {
            self.encoder.set_scissor_rect(scissor);
        } else if !self.is_rendering_entire_area {
            self.encoder.set_scissor_rect(self.render_area.scissor());
        }
    }

    /// Draws the clear pipeline over `rects`, then re-dirties everything it clobbered.
    fn clear_attachments(
        &mut self,
        device: &BoundDevice,
        clears: &[AttachmentClear],
        rects: &[Rect],
    ) -> Result<(), ResourceError> {
        let (width, height) = self.frame_buffer.size();
        let mut key = ClearAttachmentKey::new(self.pass.sample_count());
        let mut clear_colors = [[0.0f32; 4]; ATTACHMENT_COUNT];
        let mut depth_value = 0.0;
        let mut stencil_value = 0;
        let depth_stencil_attachment = self.pass.subpasses()[self.current_subpass]
            .depth_stencil_reference
            .or(self.pass.depth_index())
            .or(self.pass.stencil_index());
        for clear in clears {
            let index = if clear.aspect.contains(AttachmentKind::COLOR) {
                clear.color_attachment
            } else {
                depth_stencil_attachment
                    .unwrap_or_else(|| panic!("depth/stencil clear in a pass without a depth/stencil attachment"))
            };
            let attachment = &self.pass.attachments()[index];
            match clear.value {
                ClearValue::Color(c) if clear.aspect.contains(AttachmentKind::COLOR) => {
                    key.set_color_format(index, attachment.format);
                    clear_colors[index] = c;
                }
                ClearValue::DepthStencil { depth, stencil } => {
                    if clear.aspect.contains(AttachmentKind::DEPTH) {
                        key.set_depth_format(attachment.format);
                        depth_value = depth;
                    }
                    if clear.aspect.contains(AttachmentKind::STENCIL) {
                        key.set_stencil_format(attachment.format);
                        stencil_value = stencil;
                    }
                }
                ClearValue::Color(_) => {
                    panic!("color clear value for a {:?} clear", clear.aspect)
                }
            }
        }
        clear_colors[DEPTH_INDEX] = [depth_value; 4];

        let cache = device.resource_cache();
        let pipeline_state = cache.get_clear_render_pipeline_state(&key)?;
        let depth_stencil = cache.get_depth_stencil_state(key.is_depth_enabled(), key.is_stencil_enabled());

        let colors: Vec<u8> = clear_colors
            .iter()
            .flatten()
            .flat_map(|f| f.to_le_bytes())
            .collect();
        let vertices = clear_vertices(rects, width, height);
        let vertex_count = (vertices.len() / 16) as u32;

        let encoder = &self.encoder;
        encoder.set_render_pipeline_state(&pipeline_state);
        encoder.set_depth_stencil_state(&depth_stencil);
        encoder.set_stencil_reference_values(stencil_value, stencil_value);
        encoder.set_cull_mode(imp::CullMode::None);
        encoder.set_triangle_fill_mode(imp::TriangleFillMode::Fill);
        encoder.set_depth_bias(0.0, 0.0, 0.0);
        encoder.set_viewports(&[viewport(&Rect::new(0, 0, width, height))]);
        encoder.set_scissor_rect(Rect::new(0, 0, width, height).scissor());
        encoder.set_vertex_bytes(&colors, CLEAR_COLORS_INDEX);
        encoder.set_fragment_bytes(&colors, CLEAR_COLORS_INDEX);
        encoder.set_vertex_bytes(&vertices, CLEAR_VERTICES_INDEX);
        encoder.draw_primitives(imp::PrimitiveType::Triangle, 0, vertex_count, 1, 0);

        if !self.viewports.is_empty() {
            self.encoder.set_viewports(&self.viewports);
        }
        self.restore_scissor();
        if let Some(pipeline) = &self.pipeline
            && !self.push_constants.is_empty()
        {
            pipeline
                .shader()
                .encode_push_constant_data(&self.push_constants, PushConstantTarget::Render(&self.encoder));
        }
        //the clear color table overwrote buffer 0 in both stages
        if self.uniform_sets.first().is_some_and(|s| s.is_some()) {
            self.uniform_set_mask |= 1 << CLEAR_COLORS_INDEX;
        }
        if self.uniform_sets.get(CLEAR_VERTICES_INDEX as usize).is_some_and(|s| s.is_some()) {
            self.uniform_set_mask |= 1 << CLEAR_VERTICES_INDEX;
        }
        self.mark_dirty(DirtyFlags::PIPELINE | DirtyFlags::DEPTH | DirtyFlags::UNIFORMS);
        Ok(())
    }
}

/// Two triangles per rect, as `float4(x, y, 0, layer)` in normalized device coordinates.
fn clear_vertices(rects: &[Rect], width: u32, height: u32) -> Vec<u8> {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    let mut out = Vec::with_capacity(rects.len() * 6 * 16);
    for r in rects {
        let left = r.x as f32 / w * 2.0 - 1.0;
        let right = (r.x as f32 + r.width as f32) / w * 2.0 - 1.0;
        let top = r.y as f32 / h * 2.0 - 1.0;
        let bottom = (r.y as f32 + r.height as f32) / h * 2.0 - 1.0;
        for (x, y) in [
            (left, top),
            (left, bottom),
            (right, bottom),
            (right, bottom),
            (right, top),
            (left, top),
        ] {
            for f in [x, y, 0.0, 0.0] {
                out.extend_from_slice(&f.to_le_bytes());
            }
        }
    }
    out
}

fn viewport(rect: &Rect) -> imp::Viewport {
    imp::Viewport {
        origin_x: rect.x as f64,
        origin_y: rect.y as f64,
        width: rect.width as f64,
        height: rect.height as f64,
        znear: 0.0,
        zfar: 1.0,
    }
}

fn bind_render_uniform_set(
    encoder: &imp::RenderCommandEncoder,
    device: &BoundDevice,
    shader: &Shader,
    set: &UniformSet,
    index: u32,
) {
    let bound = set.bound_uniform_set(shader, device.device());
    for (resource, usage) in bound.resources() {
        let (usage, stages) = usage.render_usage();
        if !stages.is_empty() {
            encoder.use_resource(resource, usage, stages);
        }
    }
    let (Some(buffer), Some(layout)) = (bound.buffer(), shader.set(set.index())) else {
        return;
    };
    if let Some(offset) = layout.offset(ShaderStage::Vertex) {
        encoder.set_vertex_buffer(buffer, offset as u64, index);
    }
    if let Some(offset) = layout.offset(ShaderStage::Fragment) {
        encoder.set_fragment_buffer(buffer, offset as u64, index);
    }
}

#[derive(Debug)]
struct ComputeState {
    encoder: imp::ComputeCommandEncoder,
    pipeline: Arc<ComputePipeline>,
    push_constants: Vec<u32>,
}

#[derive(Debug)]
enum EncoderState {
    None,
    Render(Box<RenderState>),
    Compute(ComputeState),
    Blit(imp::BlitCommandEncoder),
}

#[derive(Debug)]
pub struct CommandBuffer {
    device: BoundDevice,
    command_buffer: Option<imp::NativeCommandBuffer>,
    state: EncoderState,
}

impl CommandBuffer {
    pub fn new(device: &BoundDevice) -> Self {
        CommandBuffer {
            device: device.clone(),
            command_buffer: None,
            state: EncoderState::None,
        }
    }

    pub fn device(&self) -> &BoundDevice {
        &self.device
    }

    pub fn encoder_type(&self) -> EncoderType {
        match self.state {
            EncoderState::None => EncoderType::None,
            EncoderState::Render(_) => EncoderType::Render,
            EncoderState::Compute(_) => EncoderType::Compute,
            EncoderState::Blit(_) => EncoderType::Blit,
        }
    }

    /// The native command buffer being recorded.
    ///
    /// # Panics
    /// Between [Self::commit] and the next [Self::begin].
    pub fn native(&self) -> &imp::NativeCommandBuffer {
        match &self.command_buffer {
            Some(cb) => cb,
            None => panic!("command buffer used before begin"),
        }
    }

    /// Starts recording into a fresh native command buffer.
    pub fn begin(&mut self) {
        assert_eq!(
            self.encoder_type(),
            EncoderType::None,
            "begin while an encoder is open"
        );
        if let Some(old) = self.command_buffer.take()
            && old.status() == imp::CommandBufferStatus::NotEnqueued
        {
            logwise::warn_sync!("discarding a command buffer that was never committed");
        }
        self.command_buffer = Some(self.device.queue().command_buffer());
    }

    /// Closes whichever encoder is open.
    pub fn end(&mut self) {
        match std::mem::replace(&mut self.state, EncoderState::None) {
            EncoderState::None => {}
            EncoderState::Render(r) => r.encoder.end_encoding(),
            EncoderState::Compute(c) => c.encoder.end_encoding(),
            EncoderState::Blit(b) => b.end_encoding(),
        }
    }

    /// Submits the recorded work and lets go of the native command buffer.
    ///
    /// The returned handle may be waited on.
    ///
    /// # Panics
    /// If an encoder is open, or nothing was begun.
    pub fn commit(&mut self) -> imp::NativeCommandBuffer {
        let open = self.encoder_type();
        assert_eq!(open, EncoderType::None, "commit with an open {open:?} encoder");
        let Some(command_buffer) = self.command_buffer.take() else {
            panic!("commit before begin");
        };
        command_buffer.commit();
        command_buffer
    }

    pub fn begin_label(&mut self, label: &str) {
        self.native().push_debug_group(label);
    }

    pub fn insert_label(&mut self, label: &str) {
        self.native().insert_debug_signpost(label);
    }

    pub fn end_label(&mut self) {
        self.native().pop_debug_group();
    }

    // -- render

    fn render_parts(&mut self) -> (&mut RenderState, &BoundDevice) {
        let open = self.encoder_type();
        match &mut self.state {
            EncoderState::Render(r) => (&mut **r, &self.device),
            _ => panic!("render command while {open:?} encoder is open"),
        }
    }

    fn render_state(&mut self) -> &mut RenderState {
        self.render_parts().0
    }

    /// Opens a render encoder for `pass` drawing into `frame_buffer`.
    ///
    /// Drawing is clipped to `rect`'s overlap with the framebuffer.  When that is not the
    /// whole framebuffer, attachments are loaded and the clears happen inside the area only.
    ///
    /// # Errors
    /// If the pipeline for an in-area clear cannot be built.  The encoder has been closed by
    /// then and no pass is open.
    ///
    /// # Panics
    /// If an encoder is already open, or `rect` misses the framebuffer.
    pub fn render_begin_pass(
        &mut self,
        pass: &Arc<RenderPassDescriptor>,
        frame_buffer: &FrameBuffer,
        rect: Rect,
        clear_values: &[ClearValue],
    ) -> Result<(), ResourceError> {
        let open = self.encoder_type();
        assert_eq!(open, EncoderType::None, "render pass begun while {open:?} encoder is open");
        let bounds = frame_buffer.bounds();
        let Some(render_area) = rect.intersection(&bounds) else {
            panic!("render area {rect:?} does not intersect framebuffer {bounds:?}");
        };
        let is_rendering_entire_area = render_area == bounds;
        let mut native_pass = frame_buffer.native_render_pass_descriptor(pass, clear_values);
        if !is_rendering_entire_area {
            native_pass = native_pass.with_load_actions_preserved();
        }
        let encoder = self.native().render_command_encoder(&native_pass);
        if !is_rendering_entire_area {
            encoder.set_scissor_rect(render_area.scissor());
        }
        logwise::trace_sync!(
            "begin render pass {w}x{h}",
            w = render_area.width,
            h = render_area.height
        );
        self.state = EncoderState::Render(Box::new(RenderState {
            encoder,
            native_pass,
            pass: pass.clone(),
            frame_buffer: frame_buffer.clone(),
            current_subpass: 0,
            render_area,
            is_rendering_entire_area,
            pipeline: None,
            index_buffer: None,
            uniform_sets: Vec::new(),
            uniform_set_mask: 0,
            push_constants: Vec::new(),
            viewports: Vec::new(),
            scissor: None,
            dirty: DirtyFlags::DEPTH,
        }));

        if !is_rendering_entire_area {
            let clears: Vec<AttachmentClear> = pass
                .attachments()
                .iter()
                .enumerate()
                .filter_map(|(i, a)| {
                    let mut aspect = AttachmentKind::empty();
                    if a.kind.contains(AttachmentKind::COLOR) && a.load_action == imp::LoadAction::Clear {
                        aspect |= AttachmentKind::COLOR;
                    }
                    if a.kind.contains(AttachmentKind::DEPTH) && a.load_action == imp::LoadAction::Clear {
                        aspect |= AttachmentKind::DEPTH;
                    }
                    if a.kind.contains(AttachmentKind::STENCIL)
                        && a.stencil_load_action == imp::LoadAction::Clear
                    {
                        aspect |= AttachmentKind::STENCIL;
                    }
                    (!aspect.is_empty()).then(|| AttachmentClear {
                        aspect,
                        color_attachment: i,
                        value: clear_values.get(i).copied().unwrap_or(
                            if aspect.contains(AttachmentKind::COLOR) {
                                ClearValue::default()
                            } else {
                                ClearValue::DepthStencil { depth: 1.0, stencil: 0 }
                            },
                        ),
                    })
                })
                .collect();
            if !clears.is_empty() {
                let (r, device) = self.render_parts();
                if let Err(e) = r.clear_attachments(device, &clears, &[render_area]) {
                    logwise::warn_sync!(
                        "render pass abandoned: {e}",
                        e = logwise::privacy::LogIt(&e)
                    );
                    self.end();
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// # Panics
    /// Outside a render pass.
    pub fn render_end_pass(&mut self) {
        match std::mem::replace(&mut self.state, EncoderState::None) {
            EncoderState::Render(r) => r.encoder.end_encoding(),
            other => {
                self.state = other;
                panic!("render_end_pass while {:?} encoder is open", self.encoder_type());
            }
        }
    }

    /// Moves to the next subpass, restarting the native encoder over the same targets.
    ///
    /// # Panics
    /// Outside a render pass, or past the last subpass.
    pub fn render_next_subpass(&mut self) {
        let native = self.native().clone();
        let r = self.render_state();
        assert!(
            r.current_subpass + 1 < r.pass.subpasses().len(),
            "no subpass after {}",
            r.current_subpass
        );
        let EncoderState::Render(boxed) = std::mem::replace(&mut self.state, EncoderState::None) else {
            unreachable!()
        };
        let mut r = *boxed;
        r.current_subpass += 1;
        r.encoder.end_encoding();
        r.native_pass = r.native_pass.with_load_actions_preserved();
        r.encoder = native.render_command_encoder(&r.native_pass);
        if !r.viewports.is_empty() {
            r.encoder.set_viewports(&r.viewports);
        }
        r.restore_scissor();
        r.uniform_set_mask = r.recorded_uniform_sets();
        r.push_constants.clear();
        r.dirty |= DirtyFlags::DEPTH;
        r.mark_dirty(DirtyFlags::PIPELINE | DirtyFlags::UNIFORMS);
        self.state = EncoderState::Render(Box::new(r));
    }

    /// Binds a pipeline.
    ///
    /// A render pipeline is recorded and applied at the next draw.  A compute pipeline opens a
    /// compute encoder if none is open, and applies immediately.
    ///
    /// # Panics
    /// A render pipeline outside a render pass; a compute pipeline while a render or blit
    /// encoder is open.
    pub fn bind_pipeline(&mut self, pipeline: &Pipeline) {
        match pipeline {
            Pipeline::Render(p) => {
                let r = self.render_state();
                let (shader_changed, depth_changed) = match &r.pipeline {
                    None => (true, true),
                    Some(old) => (
                        old.shader().id() != p.shader().id(),
                        old.depth_stencil().map(|d| d.id()) != p.depth_stencil().map(|d| d.id()),
                    ),
                };
                r.pipeline = Some(p.clone());
                r.dirty |= DirtyFlags::PIPELINE;
                if depth_changed {
                    r.dirty |= DirtyFlags::DEPTH;
                }
                if shader_changed {
                    r.push_constants.clear();
                    r.uniform_set_mask = r.recorded_uniform_sets();
                    if r.uniform_set_mask != 0 {
                        r.dirty |= DirtyFlags::UNIFORMS;
                    }
                }
            }
            Pipeline::Compute(p) => {
                let open = self.encoder_type();
                match &mut self.state {
                    EncoderState::None => {
                        let encoder = self.native().compute_command_encoder();
                        encoder.set_compute_pipeline_state(p.state());
                        self.state = EncoderState::Compute(ComputeState {
                            encoder,
                            pipeline: p.clone(),
                            push_constants: Vec::new(),
                        });
                    }
                    EncoderState::Compute(c) => {
                        c.encoder.set_compute_pipeline_state(p.state());
                        if c.pipeline.shader().id() != p.shader().id() {
                            c.push_constants.clear();
                        }
                        c.pipeline = p.clone();
                    }
                    _ => panic!("compute pipeline bound while {open:?} encoder is open"),
                }
            }
        }
    }

    /// Records `set` at `index`, bound at the next draw.
    pub fn render_bind_uniform_set(&mut self, set: &Arc<UniformSet>, index: u32) {
        let r = self.render_state();
        let index = index as usize;
        assert!(index < 64, "uniform set index {index} out of range");
        if r.uniform_sets.len() <= index {
            r.uniform_sets.resize(index + 1, None);
        }
        if r.uniform_sets[index].as_ref().is_some_and(|s| Arc::ptr_eq(s, set)) {
            return;
        }
        r.uniform_sets[index] = Some(set.clone());
        r.uniform_set_mask |= 1 << index;
        r.mark_dirty(DirtyFlags::UNIFORMS);
    }

    /// Records the index buffer used by [Self::render_draw_indexed].
    pub fn render_bind_index_buffer(&mut self, buffer: &imp::Buffer, index_type: imp::IndexType, offset: u64) {
        self.render_state().index_buffer = Some(IndexBinding {
            buffer: buffer.clone(),
            index_type,
            offset,
        });
    }

    /// Vertex buffer `i` binds to buffer index `max_per_stage_buffer_count - 1 - i`, leaving
    /// the low indices to uniform sets.
    ///
    /// # Panics
    /// Outside a render pass, or with more buffers than the stage has buffer indices.
    pub fn render_bind_vertex_buffers(&mut self, buffers: &[imp::Buffer], offsets: &[u64]) {
        let max = self.device.device().limits().max_per_stage_buffer_count;
        assert!(
            buffers.len() <= max as usize,
            "{} vertex buffers exceed the {max} buffer indices of a stage",
            buffers.len()
        );
        let r = self.render_state();
        for (i, buffer) in buffers.iter().enumerate() {
            let offset = offsets.get(i).copied().unwrap_or(0);
            r.encoder.set_vertex_buffer(buffer, offset, max - 1 - i as u32);
        }
    }

    pub fn render_set_viewport(&mut self, rects: &[Rect]) {
        let r = self.render_state();
        r.viewports = rects.iter().map(viewport).collect();
        r.encoder.set_viewports(&r.viewports);
    }

    pub fn render_set_scissor(&mut self, rect: Rect) {
        let r = self.render_state();
        let scissor = rect.scissor();
        r.scissor = Some(scissor);
        r.encoder.set_scissor_rect(scissor);
    }

    /// Sends push constants now, unless they equal the last ones sent.
    ///
    /// # Panics
    /// Without a bound render pipeline.
    pub fn render_set_push_constants(&mut self, data: &[u32]) {
        let r = self.render_state();
        let Some(pipeline) = &r.pipeline else {
            panic!("push constants without a bound render pipeline");
        };
        if r.push_constants == data {
            return;
        }
        pipeline
            .shader()
            .encode_push_constant_data(data, PushConstantTarget::Render(&r.encoder));
        r.push_constants = data.to_vec();
    }

    /// Clears parts of attachments mid-pass.
    pub fn render_clear_attachments(
        &mut self,
        clears: &[AttachmentClear],
        rects: &[Rect],
    ) -> Result<(), ResourceError> {
        let native = self.native().clone();
        native.push_debug_group("ClearAttachments");
        let (r, device) = self.render_parts();
        let result = r.clear_attachments(device, clears, rects);
        native.pop_debug_group();
        result
    }

    pub fn render_draw(&mut self, vertex_count: u32, instance_count: u32, base_vertex: u32, first_instance: u32) {
        let (r, device) = self.render_parts();
        r.flush(device);
        let primitive = r.pipeline.as_ref().map(|p| p.primitive()).unwrap_or_default();
        r.encoder
            .draw_primitives(primitive, base_vertex, vertex_count, instance_count, first_instance);
    }

    /// # Panics
    /// Without a bound index buffer.
    pub fn render_draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        let (r, device) = self.render_parts();
        r.flush(device);
        let primitive = r.pipeline.as_ref().map(|p| p.primitive()).unwrap_or_default();
        let Some(index) = &r.index_buffer else {
            panic!("indexed draw without an index buffer");
        };
        r.encoder.draw_indexed_primitives(
            primitive,
            index_count,
            index.index_type,
            &index.buffer,
            index.offset + first_index as u64 * index.index_type.size(),
            instance_count,
            vertex_offset,
            first_instance,
        );
    }

    // -- compute

    fn compute_parts(&mut self) -> (&mut ComputeState, &BoundDevice) {
        let open = self.encoder_type();
        match &mut self.state {
            EncoderState::Compute(c) => (c, &self.device),
            _ => panic!("compute command while {open:?} encoder is open"),
        }
    }

    /// Binds `set` at `index` right away.
    pub fn compute_bind_uniform_set(&mut self, set: &Arc<UniformSet>, index: u32) {
        let (c, device) = self.compute_parts();
        let shader = c.pipeline.shader();
        let bound = set.bound_uniform_set(shader, device.device());
        for (resource, usage) in bound.resources() {
            let usage = usage.usage(ShaderStage::Compute);
            if !usage.is_empty() {
                c.encoder.use_resource(resource, usage);
            }
        }
        if let (Some(buffer), Some(offset)) = (
            bound.buffer(),
            shader.set(set.index()).and_then(|l| l.offset(ShaderStage::Compute)),
        ) {
            c.encoder.set_buffer(buffer, offset as u64, index);
        }
    }

    pub fn compute_set_push_constants(&mut self, data: &[u32]) {
        let (c, _) = self.compute_parts();
        if c.push_constants == data {
            return;
        }
        c.pipeline
            .shader()
            .encode_push_constant_data(data, PushConstantTarget::Compute(&c.encoder));
        c.push_constants = data.to_vec();
    }

    /// Dispatches `x * y * z` threadgroups of the pipeline's local size.
    pub fn compute_dispatch(&mut self, x: u32, y: u32, z: u32) {
        let (c, _) = self.compute_parts();
        c.encoder
            .dispatch_threadgroups(imp::Size::new(x, y, z), c.pipeline.local_size());
    }

    pub fn compute_dispatch_indirect(&mut self, buffer: &imp::Buffer, offset: u64) {
        let (c, _) = self.compute_parts();
        c.encoder
            .dispatch_threadgroups_indirect(buffer, offset, c.pipeline.local_size());
    }

    /// # Panics
    /// Without an open compute encoder.
    pub fn compute_end(&mut self) {
        match std::mem::replace(&mut self.state, EncoderState::None) {
            EncoderState::Compute(c) => c.encoder.end_encoding(),
            other => {
                self.state = other;
                panic!("compute_end while {:?} encoder is open", self.encoder_type());
            }
        }
    }

    // -- blit

    fn blit_encoder(&mut self) -> &imp::BlitCommandEncoder {
        if let EncoderState::None = self.state {
            let encoder = self.native().blit_command_encoder();
            self.state = EncoderState::Blit(encoder);
        }
        let open = self.encoder_type();
        match &self.state {
            EncoderState::Blit(b) => b,
            _ => panic!("blit command while {open:?} encoder is open"),
        }
    }

    pub fn blit_copy_buffer(
        &mut self,
        source: &imp::Buffer,
        source_offset: u64,
        destination: &imp::Buffer,
        destination_offset: u64,
        size: u64,
    ) {
        self.blit_encoder()
            .copy_from_buffer(source, source_offset, destination, destination_offset, size);
    }

    pub fn blit_fill_buffer(&mut self, buffer: &imp::Buffer, range: std::ops::Range<u64>, value: u8) {
        self.blit_encoder().fill_buffer(buffer, range, value);
    }

    pub fn blit_copy_texture(&mut self, source: &imp::Texture, destination: &imp::Texture) {
        self.blit_encoder().copy_from_texture(source, destination);
    }

    /// # Panics
    /// Without an open blit encoder.
    pub fn blit_end(&mut self) {
        match std::mem::replace(&mut self.state, EncoderState::None) {
            EncoderState::Blit(b) => b.end_encoding(),
            other => {
                self.state = other;
                panic!("blit_end while {:?} encoder is open", self.encoder_type());
            }
        }
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        if !matches!(self.state, EncoderState::None) {
            logwise::warn_sync!(
                "command buffer dropped with an open {kind} encoder",
                kind = logwise::privacy::LogIt(&self.encoder_type())
            );
        }
    }
}
