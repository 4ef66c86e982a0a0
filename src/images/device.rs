// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Cross-platform bound device, encoders edition
//!
//! A [BoundDevice] is the context every encoding type is created from: the native
//! device, its submission queue, the pixel format registry and the resource cache.
//! Nothing here is global; two bound devices share nothing.
use std::fmt::Formatter;
use std::sync::Arc;

use crate::images::resource_cache::ResourceCache;
use crate::images::resource_factory::ResourceFactory;
use crate::imp;
use crate::pixel_formats::PixelFormats;

#[derive(Debug)]
pub struct BindError(imp::Error);
impl std::fmt::Display for BindError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}
impl std::error::Error for BindError {}

#[derive(Debug)]
struct Shared {
    device: imp::Device,
    queue: imp::CommandQueue,
    pixel_formats: PixelFormats,
    resource_cache: ResourceCache,
}

#[derive(Debug)]
pub struct BoundDevice(Arc<Shared>);

impl BoundDevice {
    pub fn bind(descriptor: imp::DeviceDescriptor) -> Result<Self, BindError> {
        Self::bind_to(imp::Device::new(descriptor))
    }

    /// Binds to an existing native device with a fresh submission queue.
    pub fn bind_to(device: imp::Device) -> Result<Self, BindError> {
        let queue = device
            .new_command_queue(device.label())
            .map_err(BindError)?;
        let pixel_formats = PixelFormats::new(device.limits());
        let resource_cache =
            ResourceCache::new(ResourceFactory::new(device.clone(), pixel_formats.clone()));
        logwise::info_sync!(
            "bound device {label}",
            label = logwise::privacy::LogIt(device.label())
        );
        Ok(BoundDevice(Arc::new(Shared {
            device,
            queue,
            pixel_formats,
            resource_cache,
        })))
    }

    pub fn device(&self) -> &imp::Device {
        &self.0.device
    }

    pub fn queue(&self) -> &imp::CommandQueue {
        &self.0.queue
    }

    pub fn pixel_formats(&self) -> &PixelFormats {
        &self.0.pixel_formats
    }

    pub fn resource_cache(&self) -> &ResourceCache {
        &self.0.resource_cache
    }

    pub fn journal(&self) -> &imp::Journal {
        self.0.device.journal()
    }
}

// Boilerplate implementations

impl Clone for BoundDevice {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl PartialEq for BoundDevice {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for BoundDevice {}

impl std::hash::Hash for BoundDevice {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}
