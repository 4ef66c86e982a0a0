/*! encoders_and_drawables is the encoding layer of an explicit GPU driver: it turns abstract
  rendering commands into native encoder calls, and hands out presentable framebuffers.

Here is a quick chart of what lives where:

| Component             | Type                                      | Owns                                                   | Thread            |
|-----------------------|-------------------------------------------|--------------------------------------------------------|-------------------|
| Context               | [images::BoundDevice]                     | native device, queue, pixel formats, resource cache    | any               |
| Command buffer        | [images::CommandBuffer]                   | one native command buffer, at most one open encoder    | encoding thread   |
| Resource cache        | [images::resource_cache::ResourceCache]   | clear pipelines, depth-stencil singletons              | any               |
| Uniform binding cache | [bindings::UniformSet]                    | one encoded argument buffer per consuming shader       | any               |
| Surface               | [images::Surface]                         | a ring of up to three presentable framebuffers         | encoding thread   |
| Local device          | [images::LocalDevice]                     | headless submission with synchronous waits             | encoding thread   |

# Deferred state

Render state is recorded when bound and sent to the encoder at the next draw, guarded by
dirty flags.  Binding something twice, or drawing twice, costs nothing extra.  See
[images::command_buffer].

# Presentation

Surfaces never block.  When every frame is in flight, acquisition returns `None` and the frame
is skipped; when the window has no area, [images::Surface::resize] says to skip.  Frames return
to the ring as the queue's worker thread reports command buffers scheduled or completed.

# Backends

The native layer in [imp] is a headless implementation of an explicit encoder API: command
queues, command buffers, render/compute/blit encoders, compositor layers and argument
encoders.  It is the only backend; nothing here submits work to real GPU hardware.

A device created with [imp::DeviceDescriptor::record_calls] set appends each native call to
its [imp::Journal], which is how the behavior of the layers above is observed and tested.
Recording is off by default and the journal then stays empty.

# Logging

Logging goes through [logwise](https://docs.rs/logwise).  Lifecycle events log at
info, per-call detail at trace.
*/

pub mod bindings;
mod bittricks;
pub mod images;
pub mod imp;
pub mod pixel_formats;
mod sys;
