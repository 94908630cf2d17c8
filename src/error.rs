use thiserror::Error;

#[derive(Error, Debug)]
pub enum SemaforError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Detection error: {0}")]
    Detection(#[from] DetectionError),

    #[error("Light output error: {0}")]
    Light(#[from] LightError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl SemaforError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// A single capture strategy missed. Never fatal: the frame source falls through.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Capture tool '{tool}' is not available")]
    ToolUnavailable { tool: String },

    #[error("Failed to spawn capture process: {details}")]
    Spawn { details: String },

    #[error("Capture timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Capture process exited with status {code:?}")]
    ExitStatus { code: Option<i32> },

    #[error("Failed to decode captured image: {details}")]
    Decode { details: String },

    #[error("Device {index} capture failed: {details}")]
    Device { index: u32, details: String },
}

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Failed to load detection model {path}: {details}")]
    ModelLoad { path: String, details: String },

    #[error("Inference failed: {details}")]
    Inference { details: String },

    #[error("Frame preprocessing failed: {details}")]
    Preprocess { details: String },
}

#[derive(Error, Debug)]
pub enum LightError {
    #[error("Failed to export pin {pin}: {source}")]
    Export {
        pin: u8,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to configure pin {pin} as output: {source}")]
    Direction {
        pin: u8,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to unexport pin {pin}: {source}")]
    Unexport {
        pin: u8,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write pin {pin}: {source}")]
    Write {
        pin: u8,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Publish to topic '{topic}' timed out")]
    Timeout { topic: String },

    #[error("Failed to bind telemetry server to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Telemetry server failed: {details}")]
    Server { details: String },
}

pub type Result<T> = std::result::Result<T, SemaforError>;
