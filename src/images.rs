/*! The encoding component: passes, pipelines, command buffers and surfaces */

pub mod command_buffer;
pub mod device;
pub mod framebuffer;
pub mod local_device;
pub mod pipeline;
pub mod render_pass;
pub mod resource_cache;
pub mod resource_factory;
pub mod shader;
pub mod surface;

pub use command_buffer::CommandBuffer;
pub use device::BoundDevice;
pub use framebuffer::FrameBuffer;
pub use local_device::LocalDevice;
pub use surface::Surface;
