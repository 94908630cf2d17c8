use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SemaforConfig {
    pub lanes: LanesConfig,
    pub camera: CameraConfig,
    pub detector: DetectorConfig,
    pub signal: SignalConfig,
    pub lights: LightsConfig,
    pub telemetry: TelemetryConfig,
    pub frames: FramesConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LanesConfig {
    /// Capture source index for lane 1 (e.g., 0 for /dev/video0)
    #[serde(default = "default_lane1_index")]
    pub lane1_index: u32,

    /// Capture source index for lane 2
    #[serde(default = "default_lane2_index")]
    pub lane2_index: u32,

    /// Stable label for lane 1, used for frame file names
    #[serde(default = "default_lane1_key")]
    pub lane1_key: String,

    /// Stable label for lane 2
    #[serde(default = "default_lane2_key")]
    pub lane2_key: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Capture resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Platform still-capture utility
    #[serde(default = "default_still_command")]
    pub still_command: String,

    /// Exposure window handed to the still-capture utility
    #[serde(default = "default_still_capture_ms")]
    pub still_capture_ms: u64,

    /// Hard limit on a single still-capture invocation
    #[serde(default = "default_still_timeout_ms")]
    pub still_timeout_ms: u64,

    /// Hard limit on a single direct device grab
    #[serde(default = "default_device_timeout_ms")]
    pub device_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DetectorConfig {
    /// ONNX model used by the model backend
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Minimum detection confidence counted as a vehicle
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Grayscale level above which a pixel is foreground (heuristic backend)
    #[serde(default = "default_binary_threshold")]
    pub binary_threshold: u8,

    /// Minimum blob area in pixels (heuristic backend)
    #[serde(default = "default_min_blob_area")]
    pub min_blob_area: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SignalConfig {
    /// Hard ceiling on a green phase
    #[serde(default = "default_green_max_seconds")]
    pub green_max_seconds: u64,

    /// Green time that must pass before opposing demand can end the phase
    #[serde(default = "default_green_min_seconds")]
    pub green_min_seconds: u64,

    /// Fixed yellow clearance
    #[serde(default = "default_yellow_seconds")]
    pub yellow_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct LightPinsConfig {
    pub red: u8,
    pub yellow: u8,
    pub green: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LightsConfig {
    /// Root of the sysfs GPIO interface
    #[serde(default = "default_gpio_root")]
    pub gpio_root: String,

    /// Output lines for lane 1 (BCM numbering, offset by the GPIO chip base)
    #[serde(default = "default_lane1_pins")]
    pub lane1: LightPinsConfig,

    /// Output lines for lane 2 (BCM numbering, offset by the GPIO chip base)
    #[serde(default = "default_lane2_pins")]
    pub lane2: LightPinsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// Group the snapshots are published to
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Minimum time between published snapshots
    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,

    /// Upper bound on a single publish
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,

    /// Per-topic broadcast buffer
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Serve snapshots over HTTP/WebSocket
    #[serde(default = "default_server_enabled")]
    pub server_enabled: bool,

    /// IP address to bind to
    #[serde(default = "default_telemetry_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_telemetry_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FramesConfig {
    /// Write the latest frame per lane for dashboard display
    #[serde(default = "default_frames_enabled")]
    pub enabled: bool,

    /// Directory receiving <lane_key>.jpg
    #[serde(default = "default_frames_path")]
    pub path: String,

    /// Longest a tick waits for a frame write before moving on
    #[serde(default = "default_frames_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    /// Sleep between control loop iterations
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl CameraConfig {
    pub fn still_timeout(&self) -> Duration {
        Duration::from_millis(self.still_timeout_ms)
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_millis(self.device_timeout_ms)
    }
}

impl TelemetryConfig {
    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

impl FramesConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl SystemConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl SemaforConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("semafor.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let lane1_pins = default_lane1_pins();
        let lane2_pins = default_lane2_pins();

        let settings = Config::builder()
            // Start with default values
            .set_default("lanes.lane1_index", default_lane1_index())?
            .set_default("lanes.lane2_index", default_lane2_index())?
            .set_default("lanes.lane1_key", default_lane1_key())?
            .set_default("lanes.lane2_key", default_lane2_key())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.still_command", default_still_command())?
            .set_default("camera.still_capture_ms", default_still_capture_ms())?
            .set_default("camera.still_timeout_ms", default_still_timeout_ms())?
            .set_default("camera.device_timeout_ms", default_device_timeout_ms())?
            .set_default("detector.model_path", default_model_path())?
            .set_default(
                "detector.confidence_threshold",
                default_confidence_threshold() as f64,
            )?
            .set_default("detector.binary_threshold", default_binary_threshold())?
            .set_default("detector.min_blob_area", default_min_blob_area())?
            .set_default("signal.green_max_seconds", default_green_max_seconds())?
            .set_default("signal.green_min_seconds", default_green_min_seconds())?
            .set_default("signal.yellow_seconds", default_yellow_seconds())?
            .set_default("lights.lane1.red", lane1_pins.red)?
            .set_default("lights.lane1.yellow", lane1_pins.yellow)?
            .set_default("lights.lane1.green", lane1_pins.green)?
            .set_default("lights.lane2.red", lane2_pins.red)?
            .set_default("lights.lane2.yellow", lane2_pins.yellow)?
            .set_default("lights.lane2.green", lane2_pins.green)?
            .set_default("lights.gpio_root", default_gpio_root())?
            .set_default("telemetry.topic", default_topic())?
            .set_default("telemetry.publish_interval_ms", default_publish_interval_ms())?
            .set_default("telemetry.publish_timeout_ms", default_publish_timeout_ms())?
            .set_default(
                "telemetry.channel_capacity",
                default_channel_capacity() as i64,
            )?
            .set_default("telemetry.server_enabled", default_server_enabled())?
            .set_default("telemetry.ip", default_telemetry_ip())?
            .set_default("telemetry.port", default_telemetry_port())?
            .set_default("frames.enabled", default_frames_enabled())?
            .set_default("frames.path", default_frames_path())?
            .set_default(
                "frames.write_timeout_ms",
                default_frames_write_timeout_ms(),
            )?
            .set_default("system.tick_interval_ms", default_tick_interval_ms())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables, e.g. SEMAFOR_SIGNAL__GREEN_MAX_SECONDS=20
            .add_source(
                Environment::with_prefix("SEMAFOR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: SemaforConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        for key in [&self.lanes.lane1_key, &self.lanes.lane2_key] {
            if !is_plain_name(key) {
                return Err(ConfigError::Message(format!(
                    "Lane key '{}' must be a non-empty name of letters, digits, '_' or '-'",
                    key
                )));
            }
        }

        if self.lanes.lane1_key == self.lanes.lane2_key {
            return Err(ConfigError::Message(format!(
                "Lane keys must be distinct, both are '{}'",
                self.lanes.lane1_key
            )));
        }

        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if !(self.detector.confidence_threshold > 0.0 && self.detector.confidence_threshold < 1.0)
        {
            return Err(ConfigError::Message(
                "Detector confidence_threshold must be between 0 and 1".to_string(),
            ));
        }

        if self.signal.yellow_seconds == 0 {
            return Err(ConfigError::Message(
                "Signal yellow_seconds must be greater than 0".to_string(),
            ));
        }

        if self.signal.green_min_seconds >= self.signal.green_max_seconds {
            return Err(ConfigError::Message(format!(
                "Signal green_min_seconds ({}) must be less than green_max_seconds ({})",
                self.signal.green_min_seconds, self.signal.green_max_seconds
            )));
        }

        let pins = [
            self.lights.lane1.red,
            self.lights.lane1.yellow,
            self.lights.lane1.green,
            self.lights.lane2.red,
            self.lights.lane2.yellow,
            self.lights.lane2.green,
        ];
        let unique: HashSet<u8> = pins.iter().copied().collect();
        if unique.len() != pins.len() {
            return Err(ConfigError::Message(
                "Light output pins must all be distinct".to_string(),
            ));
        }

        if !is_plain_name(&self.telemetry.topic) {
            return Err(ConfigError::Message(format!(
                "Telemetry topic '{}' must be a non-empty alphanumeric name",
                self.telemetry.topic
            )));
        }

        if self.telemetry.publish_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Telemetry publish_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.telemetry.channel_capacity == 0 {
            return Err(ConfigError::Message(
                "Telemetry channel_capacity must be greater than 0".to_string(),
            ));
        }

        if self.system.tick_interval_ms == 0 {
            return Err(ConfigError::Message(
                "System tick_interval_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for SemaforConfig {
    fn default() -> Self {
        Self {
            lanes: LanesConfig {
                lane1_index: default_lane1_index(),
                lane2_index: default_lane2_index(),
                lane1_key: default_lane1_key(),
                lane2_key: default_lane2_key(),
            },
            camera: CameraConfig {
                resolution: default_camera_resolution(),
                still_command: default_still_command(),
                still_capture_ms: default_still_capture_ms(),
                still_timeout_ms: default_still_timeout_ms(),
                device_timeout_ms: default_device_timeout_ms(),
            },
            detector: DetectorConfig {
                model_path: default_model_path(),
                confidence_threshold: default_confidence_threshold(),
                binary_threshold: default_binary_threshold(),
                min_blob_area: default_min_blob_area(),
            },
            signal: SignalConfig {
                green_max_seconds: default_green_max_seconds(),
                green_min_seconds: default_green_min_seconds(),
                yellow_seconds: default_yellow_seconds(),
            },
            lights: LightsConfig {
                lane1: default_lane1_pins(),
                lane2: default_lane2_pins(),
                gpio_root: default_gpio_root(),
            },
            telemetry: TelemetryConfig {
                topic: default_topic(),
                publish_interval_ms: default_publish_interval_ms(),
                publish_timeout_ms: default_publish_timeout_ms(),
                channel_capacity: default_channel_capacity(),
                server_enabled: default_server_enabled(),
                ip: default_telemetry_ip(),
                port: default_telemetry_port(),
            },
            frames: FramesConfig {
                enabled: default_frames_enabled(),
                path: default_frames_path(),
                write_timeout_ms: default_frames_write_timeout_ms(),
            },
            system: SystemConfig {
                tick_interval_ms: default_tick_interval_ms(),
            },
        }
    }
}

// Default value functions
fn default_lane1_index() -> u32 {
    0
}
fn default_lane2_index() -> u32 {
    0
}
fn default_lane1_key() -> String {
    "lane1".to_string()
}
fn default_lane2_key() -> String {
    "lane2".to_string()
}

fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_still_command() -> String {
    "libcamera-still".to_string()
}
fn default_still_capture_ms() -> u64 {
    100
}
fn default_still_timeout_ms() -> u64 {
    3000
}
fn default_device_timeout_ms() -> u64 {
    2000
}

fn default_model_path() -> String {
    "yolov8n.onnx".to_string()
}
fn default_confidence_threshold() -> f32 {
    0.5
}
fn default_binary_threshold() -> u8 {
    100
}
fn default_min_blob_area() -> f64 {
    500.0
}

fn default_green_max_seconds() -> u64 {
    15
}
fn default_green_min_seconds() -> u64 {
    5
}
fn default_yellow_seconds() -> u64 {
    2
}

fn default_lane1_pins() -> LightPinsConfig {
    LightPinsConfig {
        red: 17,
        yellow: 27,
        green: 22,
    }
}
fn default_lane2_pins() -> LightPinsConfig {
    LightPinsConfig {
        red: 23,
        yellow: 24,
        green: 25,
    }
}
/// Usable as a file name and URL path segment
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn default_gpio_root() -> String {
    "/sys/class/gpio".to_string()
}

fn default_topic() -> String {
    "traffic".to_string()
}
fn default_publish_interval_ms() -> u64 {
    1000
}
fn default_publish_timeout_ms() -> u64 {
    250
}
fn default_channel_capacity() -> usize {
    16
}
fn default_server_enabled() -> bool {
    true
}
fn default_telemetry_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_telemetry_port() -> u16 {
    8000
}

fn default_frames_enabled() -> bool {
    true
}
fn default_frames_path() -> String {
    "./media/frames".to_string()
}
fn default_frames_write_timeout_ms() -> u64 {
    200
}

fn default_tick_interval_ms() -> u64 {
    500
}
