use super::objects::PixelFormat;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to compile library {label}: {message}")]
    Compile { label: String, message: String },
    #[error("sample count {0} is not supported by this device")]
    UnsupportedSampleCount(u32),
    #[error("{format:?} cannot be used as {slot}")]
    InvalidPixelFormat { slot: String, format: PixelFormat },
    #[error("pipeline {0} has no vertex function")]
    MissingFunction(String),
    #[error("threadgroup size {requested} exceeds the device limit {limit}")]
    ThreadgroupTooLarge { requested: u32, limit: u32 },
    #[error("could not start queue thread: {0}")]
    QueueThread(#[from] std::io::Error),
    #[error("window handle {0} has no compositor layer")]
    UnsupportedWindowHandle(String),
}
