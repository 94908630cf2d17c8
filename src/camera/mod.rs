#[cfg(all(feature = "camera", target_os = "linux"))]
mod device;
mod native;
mod sink;
mod source;
mod strategy;

#[cfg(all(feature = "camera", target_os = "linux"))]
pub use device::DeviceCapture;
pub use native::NativeStillCapture;
pub use sink::{FrameSink, JpegFileSink, NullFrameSink};
pub use source::FrameSource;
pub use strategy::CaptureStrategy;
