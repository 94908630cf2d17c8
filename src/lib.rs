pub mod camera;
pub mod config;
pub mod controller;
pub mod detector;
pub mod error;
pub mod frame;
pub mod lane;
pub mod lights;
pub mod signal;
pub mod telemetry;

pub use camera::{
    CaptureStrategy, FrameSink, FrameSource, JpegFileSink, NativeStillCapture, NullFrameSink,
};
#[cfg(all(feature = "camera", target_os = "linux"))]
pub use camera::DeviceCapture;
pub use config::SemaforConfig;
pub use controller::{
    Capabilities, ShutdownReason, TickReport, TrafficController, TrafficControllerBuilder,
};
pub use detector::{
    classify, select_detector, DetectorBackend, HeuristicDetector, PriorityLevel, VehicleCount,
    VehicleDetector,
};
#[cfg(feature = "model_detection")]
pub use detector::YoloDetector;
pub use error::{Result, SemaforError};
pub use frame::{Frame, FrameOrigin};
pub use lane::{Lane, LaneId};
pub use lights::{LightOutput, LightPins, PinDriver, SysfsGpioDriver};
pub use signal::{
    Clock, LightColor, ManualClock, SignalPhase, SignalStateMachine, SignalStatus, SignalTiming,
    SystemClock,
};
pub use telemetry::{ControllerSnapshot, PublishSchedule, TelemetryHub, TelemetryPublisher};
#[cfg(feature = "streaming")]
pub use telemetry::TelemetryServer;
