// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Native object handles.
//!
//! Every handle is a cheap clone of an `Arc`; two clones of the same handle compare
//! equal by [ObjectId] and by pointer.
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

/// Identity of a native object, unique per [super::Device].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(super) u64);

impl ObjectId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Native pixel formats.  Discriminants follow the platform's numbering.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    #[default]
    Invalid = 0,
    R8Unorm = 10,
    R8Uint = 13,
    R16Float = 25,
    RG8Unorm = 30,
    R32Uint = 53,
    R32Sint = 54,
    R32Float = 55,
    RGBA8Unorm = 70,
    RGBA8UnormSrgb = 71,
    RGBA8Uint = 73,
    RGBA8Sint = 74,
    BGRA8Unorm = 80,
    BGRA8UnormSrgb = 81,
    RGB10A2Unorm = 90,
    RGBA16Float = 115,
    RGBA32Uint = 123,
    RGBA32Sint = 124,
    RGBA32Float = 125,
    Depth16Unorm = 250,
    Depth32Float = 252,
    Stencil8 = 253,
    Depth24UnormStencil8 = 255,
    Depth32FloatStencil8 = 260,
}

impl PixelFormat {
    pub fn raw(self) -> u16 {
        self as u16
    }

    pub fn has_depth(self) -> bool {
        matches!(
            self,
            PixelFormat::Depth16Unorm
                | PixelFormat::Depth32Float
                | PixelFormat::Depth24UnormStencil8
                | PixelFormat::Depth32FloatStencil8
        )
    }

    pub fn has_stencil(self) -> bool {
        matches!(
            self,
            PixelFormat::Stencil8
                | PixelFormat::Depth24UnormStencil8
                | PixelFormat::Depth32FloatStencil8
        )
    }

    pub fn is_color(self) -> bool {
        self != PixelFormat::Invalid && !self.has_depth() && !self.has_stencil()
    }
}

bitflags::bitflags! {
    /// How a resource is accessed by the stages that use it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResourceUsage: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Render stages, as understood by a render encoder.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderStages: u8 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureUsage: u8 {
        const SHADER_READ = 1 << 0;
        const SHADER_WRITE = 1 << 1;
        const RENDER_TARGET = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageMode {
    #[default]
    Shared,
    Private,
    Memoryless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HazardTrackingMode {
    #[default]
    Tracked,
    Untracked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TriangleFillMode {
    #[default]
    Fill,
    Lines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthClipMode {
    #[default]
    Clip,
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Winding {
    #[default]
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveType {
    Point,
    Line,
    LineStrip,
    #[default]
    Triangle,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    UInt16,
    UInt32,
}

impl IndexType {
    pub fn size(self) -> u64 {
        match self {
            IndexType::UInt16 => 2,
            IndexType::UInt32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadAction {
    #[default]
    DontCare,
    Load,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreAction {
    #[default]
    DontCare,
    Store,
    MultisampleResolve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    #[default]
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOperation {
    #[default]
    Keep,
    Zero,
    Replace,
    IncrementClamp,
    DecrementClamp,
    Invert,
}

/// Argument kinds an argument encoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Pointer,
    Texture,
    Sampler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BindingAccess {
    #[default]
    ReadOnly,
    ReadWrite,
    WriteOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Size {
            width,
            height,
            depth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
    pub znear: f64,
    pub zfar: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

// -- buffers

#[derive(Debug)]
struct BufferInner {
    id: ObjectId,
    label: String,
    contents: Mutex<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct Buffer(Arc<BufferInner>);

impl Buffer {
    pub(super) fn new(id: ObjectId, length: usize, label: &str) -> Self {
        Buffer(Arc::new(BufferInner {
            id,
            label: label.to_string(),
            contents: Mutex::new(vec![0; length]),
        }))
    }
    pub fn id(&self) -> ObjectId {
        self.0.id
    }
    pub fn label(&self) -> &str {
        &self.0.label
    }
    pub fn length(&self) -> usize {
        self.0.contents.lock().unwrap().len()
    }
    /// Address the GPU would use to reach this buffer.
    pub fn gpu_address(&self) -> u64 {
        self.0.id.0 << 32
    }
    /// Copy of the buffer's contents.
    pub fn contents(&self) -> Vec<u8> {
        self.0.contents.lock().unwrap().clone()
    }
    /// Writes `bytes` at `offset`.
    ///
    /// # Panics
    /// If the write runs past the end of the buffer.
    pub fn write(&self, offset: usize, bytes: &[u8]) {
        let mut contents = self.0.contents.lock().unwrap();
        assert!(
            offset + bytes.len() <= contents.len(),
            "write of {} bytes at {} overruns buffer {:?} of length {}",
            bytes.len(),
            offset,
            self.0.id,
            contents.len()
        );
        contents[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
    pub fn ptr_eq(&self, other: &Buffer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// -- textures

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub pixel_format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
    pub usage: TextureUsage,
    pub storage_mode: StorageMode,
    pub hazard_tracking_mode: HazardTrackingMode,
}

impl TextureDescriptor {
    pub fn render_target(pixel_format: PixelFormat, width: u32, height: u32) -> Self {
        TextureDescriptor {
            pixel_format,
            width,
            height,
            sample_count: 1,
            usage: TextureUsage::RENDER_TARGET | TextureUsage::SHADER_READ,
            storage_mode: StorageMode::Private,
            hazard_tracking_mode: HazardTrackingMode::Tracked,
        }
    }
}

#[derive(Debug)]
struct TextureInner {
    id: ObjectId,
    descriptor: TextureDescriptor,
}

#[derive(Debug, Clone)]
pub struct Texture(Arc<TextureInner>);

impl Texture {
    pub(super) fn new(id: ObjectId, descriptor: TextureDescriptor) -> Self {
        Texture(Arc::new(TextureInner { id, descriptor }))
    }
    pub fn id(&self) -> ObjectId {
        self.0.id
    }
    pub fn width(&self) -> u32 {
        self.0.descriptor.width
    }
    pub fn height(&self) -> u32 {
        self.0.descriptor.height
    }
    pub fn pixel_format(&self) -> PixelFormat {
        self.0.descriptor.pixel_format
    }
    pub fn sample_count(&self) -> u32 {
        self.0.descriptor.sample_count
    }
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.0.descriptor
    }
    pub fn gpu_resource_id(&self) -> u64 {
        self.0.id.0 << 32 | 0x7e
    }
    pub fn ptr_eq(&self, other: &Texture) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone)]
pub struct SamplerState(Arc<ObjectId>);

impl SamplerState {
    pub(super) fn new(id: ObjectId) -> Self {
        SamplerState(Arc::new(id))
    }
    pub fn id(&self) -> ObjectId {
        *self.0
    }
    pub fn gpu_resource_id(&self) -> u64 {
        self.0.0 << 32 | 0x5a
    }
}

/// Something a render or compute encoder can declare residency for.
#[derive(Debug, Clone)]
pub enum Resource {
    Buffer(Buffer),
    Texture(Texture),
}

impl Resource {
    pub fn id(&self) -> ObjectId {
        match self {
            Resource::Buffer(b) => b.id(),
            Resource::Texture(t) => t.id(),
        }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
impl Eq for Resource {}
impl std::hash::Hash for Resource {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state)
    }
}

// -- shader objects

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionStage {
    Vertex,
    Fragment,
    Kernel,
}

#[derive(Debug)]
struct FunctionInner {
    id: ObjectId,
    name: String,
    stage: FunctionStage,
}

#[derive(Debug, Clone)]
pub struct Function(Arc<FunctionInner>);

impl Function {
    pub(super) fn new(id: ObjectId, name: String, stage: FunctionStage) -> Self {
        Function(Arc::new(FunctionInner { id, name, stage }))
    }
    pub fn id(&self) -> ObjectId {
        self.0.id
    }
    pub fn name(&self) -> &str {
        &self.0.name
    }
    pub fn stage(&self) -> FunctionStage {
        self.0.stage
    }
}

#[derive(Debug)]
struct LibraryInner {
    id: ObjectId,
    label: String,
    functions: Vec<Function>,
}

#[derive(Debug, Clone)]
pub struct Library(Arc<LibraryInner>);

impl Library {
    pub(super) fn new(id: ObjectId, label: &str, functions: Vec<Function>) -> Self {
        Library(Arc::new(LibraryInner {
            id,
            label: label.to_string(),
            functions,
        }))
    }
    pub fn id(&self) -> ObjectId {
        self.0.id
    }
    pub fn label(&self) -> &str {
        &self.0.label
    }
    pub fn function(&self, name: &str) -> Option<Function> {
        self.0.functions.iter().find(|f| f.name() == name).cloned()
    }
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.0.functions.iter().map(|f| f.name())
    }
}

pub const MAX_COLOR_ATTACHMENTS: usize = 8;

#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor {
    pub label: String,
    pub vertex_function: Option<Function>,
    pub fragment_function: Option<Function>,
    pub color_formats: [PixelFormat; MAX_COLOR_ATTACHMENTS],
    pub depth_format: PixelFormat,
    pub stencil_format: PixelFormat,
    pub sample_count: u32,
}

impl Default for RenderPipelineDescriptor {
    fn default() -> Self {
        RenderPipelineDescriptor {
            label: String::new(),
            vertex_function: None,
            fragment_function: None,
            color_formats: [PixelFormat::Invalid; MAX_COLOR_ATTACHMENTS],
            depth_format: PixelFormat::Invalid,
            stencil_format: PixelFormat::Invalid,
            sample_count: 1,
        }
    }
}

#[derive(Debug)]
struct RenderPipelineStateInner {
    id: ObjectId,
    label: String,
    sample_count: u32,
    color_formats: [PixelFormat; MAX_COLOR_ATTACHMENTS],
}

#[derive(Debug, Clone)]
pub struct RenderPipelineState(Arc<RenderPipelineStateInner>);

impl RenderPipelineState {
    pub(super) fn new(id: ObjectId, descriptor: &RenderPipelineDescriptor) -> Self {
        RenderPipelineState(Arc::new(RenderPipelineStateInner {
            id,
            label: descriptor.label.clone(),
            sample_count: descriptor.sample_count,
            color_formats: descriptor.color_formats,
        }))
    }
    pub fn id(&self) -> ObjectId {
        self.0.id
    }
    pub fn label(&self) -> &str {
        &self.0.label
    }
    pub fn sample_count(&self) -> u32 {
        self.0.sample_count
    }
    pub fn color_formats(&self) -> &[PixelFormat; MAX_COLOR_ATTACHMENTS] {
        &self.0.color_formats
    }
    pub fn ptr_eq(&self, other: &RenderPipelineState) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug)]
struct ComputePipelineStateInner {
    id: ObjectId,
    label: String,
    max_total_threads_per_threadgroup: u32,
}

#[derive(Debug, Clone)]
pub struct ComputePipelineState(Arc<ComputePipelineStateInner>);

impl ComputePipelineState {
    pub(super) fn new(id: ObjectId, label: &str, max_total_threads_per_threadgroup: u32) -> Self {
        ComputePipelineState(Arc::new(ComputePipelineStateInner {
            id,
            label: label.to_string(),
            max_total_threads_per_threadgroup,
        }))
    }
    pub fn id(&self) -> ObjectId {
        self.0.id
    }
    pub fn label(&self) -> &str {
        &self.0.label
    }
    pub fn max_total_threads_per_threadgroup(&self) -> u32 {
        self.0.max_total_threads_per_threadgroup
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StencilDescriptor {
    pub compare: CompareFunction,
    pub stencil_failure: StencilOperation,
    pub depth_failure: StencilOperation,
    pub depth_stencil_pass: StencilOperation,
    pub read_mask: u32,
    pub write_mask: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepthStencilDescriptor {
    pub label: String,
    pub depth_compare: CompareFunction,
    pub depth_write_enabled: bool,
    pub front_stencil: Option<StencilDescriptor>,
    pub back_stencil: Option<StencilDescriptor>,
}

#[derive(Debug)]
struct DepthStencilStateInner {
    id: ObjectId,
    descriptor: DepthStencilDescriptor,
}

#[derive(Debug, Clone)]
pub struct DepthStencilState(Arc<DepthStencilStateInner>);

impl DepthStencilState {
    pub(super) fn new(id: ObjectId, descriptor: DepthStencilDescriptor) -> Self {
        DepthStencilState(Arc::new(DepthStencilStateInner { id, descriptor }))
    }
    pub fn id(&self) -> ObjectId {
        self.0.id
    }
    pub fn descriptor(&self) -> &DepthStencilDescriptor {
        &self.0.descriptor
    }
    pub fn ptr_eq(&self, other: &DepthStencilState) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// -- argument buffers

/// One argument slot an [ArgumentEncoder] lays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgumentDescriptor {
    pub data_type: DataType,
    pub index: u32,
    pub access: BindingAccess,
    pub array_length: u32,
}

/// Bytes one encoded argument occupies.
pub const ARGUMENT_STRIDE: usize = 8;

#[derive(Debug)]
struct ArgumentEncoderInner {
    arguments: Vec<ArgumentDescriptor>,
    encoded_length: usize,
    target: Mutex<Option<(Buffer, usize)>>,
}

/// Writes resource handles into an argument buffer.
#[derive(Debug, Clone)]
pub struct ArgumentEncoder(Arc<ArgumentEncoderInner>);

impl ArgumentEncoder {
    pub(super) fn new(arguments: Vec<ArgumentDescriptor>) -> Self {
        let slots = arguments
            .iter()
            .map(|a| a.index as usize + a.array_length.max(1) as usize)
            .max()
            .unwrap_or(0);
        ArgumentEncoder(Arc::new(ArgumentEncoderInner {
            arguments,
            encoded_length: slots * ARGUMENT_STRIDE,
            target: Mutex::new(None),
        }))
    }
    pub fn encoded_length(&self) -> usize {
        self.0.encoded_length
    }
    pub fn arguments(&self) -> &[ArgumentDescriptor] {
        &self.0.arguments
    }
    pub fn set_argument_buffer(&self, buffer: &Buffer, offset: usize) {
        *self.0.target.lock().unwrap() = Some((buffer.clone(), offset));
    }
    fn encode(&self, index: u32, handle: u64) {
        let target = self.0.target.lock().unwrap();
        let (buffer, offset) = target
            .as_ref()
            .expect("argument encoder used without an argument buffer");
        buffer.write(
            offset + index as usize * ARGUMENT_STRIDE,
            &handle.to_le_bytes(),
        );
    }
    pub fn set_buffer(&self, buffer: &Buffer, offset: u64, index: u32) {
        self.encode(index, buffer.gpu_address() + offset);
    }
    pub fn set_textures(&self, textures: &[Texture], index: u32) {
        for (i, t) in textures.iter().enumerate() {
            self.encode(index + i as u32, t.gpu_resource_id());
        }
    }
    pub fn set_sampler_states(&self, samplers: &[SamplerState], index: u32) {
        for (i, s) in samplers.iter().enumerate() {
            self.encode(index + i as u32, s.gpu_resource_id());
        }
    }
}
