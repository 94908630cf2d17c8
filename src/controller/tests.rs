use super::*;
use crate::camera::{CaptureStrategy, FrameSink};
use crate::config::SemaforConfig;
use crate::detector::{DetectorBackend, VehicleDetector};
use crate::error::{CaptureError, DetectionError, TelemetryError};
use crate::frame::{Frame, FrameOrigin};
use crate::lane::{Lane, LaneId};
use crate::lights::{LightOutput, LightPins};
use crate::signal::{Clock, LightColor, ManualClock, SignalPhase};
use crate::telemetry::{ControllerSnapshot, TelemetryHub, TelemetryPublisher};
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const STEP: Duration = Duration::from_millis(500);

/// Frames whose red channel encodes the lane's vehicle count.
///
/// Like a real camera it serves one capture at a time and reports busy
/// otherwise.
struct DemandStrategy {
    demand: [AtomicU8; 2],
    online: AtomicBool,
    in_use: AtomicBool,
}

impl DemandStrategy {
    fn new(lane1: u8, lane2: u8) -> Arc<Self> {
        Arc::new(Self {
            demand: [AtomicU8::new(lane1), AtomicU8::new(lane2)],
            online: AtomicBool::new(true),
            in_use: AtomicBool::new(false),
        })
    }

    fn set(&self, lane: LaneId, demand: u8) {
        self.demand[lane.position()].store(demand, Ordering::SeqCst);
    }
}

#[async_trait]
impl CaptureStrategy for DemandStrategy {
    fn name(&self) -> &'static str {
        "demand"
    }

    async fn capture(&self, lane: &Lane) -> Result<Frame, CaptureError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(CaptureError::Timeout { millis: 0 });
        }
        if self.in_use.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::Device {
                index: lane.index,
                details: "device busy".to_string(),
            });
        }
        tokio::task::yield_now().await;
        self.in_use.store(false, Ordering::SeqCst);

        let demand = self.demand[lane.id.position()].load(Ordering::SeqCst);
        Ok(Frame::new(
            RgbImage::from_pixel(8, 8, Rgb([demand, 0, 0])),
            FrameOrigin::Device,
        ))
    }
}

struct RedChannelDetector;

impl VehicleDetector for RedChannelDetector {
    fn backend(&self) -> DetectorBackend {
        DetectorBackend::Heuristic
    }

    fn detect(&self, frame: &Frame) -> Result<usize, DetectionError> {
        if frame.is_empty() {
            return Ok(0);
        }
        Ok(frame.image().get_pixel(0, 0)[0] as usize)
    }
}

struct PanickingDetector;

impl VehicleDetector for PanickingDetector {
    fn backend(&self) -> DetectorBackend {
        DetectorBackend::Model
    }

    fn detect(&self, _frame: &Frame) -> Result<usize, DetectionError> {
        panic!("inference runtime crashed");
    }
}

struct StalledPublisher;

#[async_trait]
impl TelemetryPublisher for StalledPublisher {
    async fn publish(
        &self,
        _topic: &str,
        _snapshot: &ControllerSnapshot,
    ) -> Result<usize, TelemetryError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(0)
    }
}

#[derive(Default)]
struct RecordingSink {
    stored: Mutex<Vec<(String, FrameOrigin)>>,
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn store(&self, lane: &Lane, frame: &Frame) {
        self.stored.lock().push((lane.key.clone(), frame.origin()));
    }
}

/// Never finishes a write
struct StuckSink;

#[async_trait]
impl FrameSink for StuckSink {
    async fn store(&self, _lane: &Lane, _frame: &Frame) {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
}

fn pins() -> [LightPins; 2] {
    let lights = SemaforConfig::default().lights;
    [lights.lane1.into(), lights.lane2.into()]
}

fn controller_with(
    strategy: Arc<DemandStrategy>,
    clock: Arc<ManualClock>,
    hub: Arc<TelemetryHub>,
) -> TrafficController {
    let strategies: Vec<Arc<dyn CaptureStrategy>> = vec![strategy];
    TrafficController::builder()
        .strategies(strategies)
        .detector(Arc::new(RedChannelDetector))
        .lights(LightOutput::mock(pins()))
        .publisher(hub, "traffic")
        .clock(clock)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_first_tick_shows_lane1_green() {
    let clock = Arc::new(ManualClock::new());
    let hub = Arc::new(TelemetryHub::new(4));
    let mut controller = controller_with(DemandStrategy::new(2, 0), clock, hub);

    let report = controller.tick().await;

    assert_eq!(report.transition, None);
    assert!(!report.published);
    assert_eq!(report.origins, [FrameOrigin::Device, FrameOrigin::Device]);
    assert_eq!(report.snapshot.light1_status, LightColor::Green);
    assert_eq!(report.snapshot.light2_status, LightColor::Red);
    assert_eq!(report.snapshot.vehicles1.value(), 2);
    assert_eq!((report.snapshot.timer1, report.snapshot.timer2), (15, 0));
    assert_eq!(
        controller.lights().colors(),
        [LightColor::Green, LightColor::Red]
    );
    assert_eq!(controller.tick_count(), 1);
}

#[tokio::test]
async fn test_opposing_demand_ends_green_after_minimum() {
    let clock = Arc::new(ManualClock::new());
    let hub = Arc::new(TelemetryHub::new(4));
    let strategy = DemandStrategy::new(0, 0);
    let mut controller = controller_with(Arc::clone(&strategy), Arc::clone(&clock), hub);
    let started = clock.now();

    let mut transition_at = None;
    for step in 0..40 {
        if step == 6 {
            strategy.set(LaneId::Lane2, 3);
        }
        let report = controller.tick().await;
        if report.transition.is_some() {
            transition_at = Some(clock.now().duration_since(started));
            break;
        }
        clock.advance(STEP);
    }

    assert_eq!(transition_at, Some(Duration::from_millis(5500)));
    assert_eq!(controller.machine().phase(), SignalPhase::Lane1Yellow);
    assert_eq!(
        controller.lights().colors(),
        [LightColor::Yellow, LightColor::Red]
    );
}

#[tokio::test]
async fn test_green_runs_full_budget_without_opposing_demand() {
    let clock = Arc::new(ManualClock::new());
    let hub = Arc::new(TelemetryHub::new(4));
    let strategy = DemandStrategy::new(5, 0);
    let mut controller = controller_with(Arc::clone(&strategy), Arc::clone(&clock), hub);

    // Ticks from 0.0s through 14.5s
    for _ in 0..30 {
        assert!(controller.tick().await.transition.is_none());
        clock.advance(STEP);
    }
    let report = controller.tick().await;
    assert_eq!(
        report.transition.map(|t| t.to),
        Some(SignalPhase::Lane1Yellow)
    );
}

#[tokio::test]
async fn test_publishes_once_per_interval() {
    let clock = Arc::new(ManualClock::new());
    let hub = Arc::new(TelemetryHub::new(16));
    let mut receiver = hub.subscribe("traffic");
    let mut controller = controller_with(DemandStrategy::new(1, 4), Arc::clone(&clock), hub);

    let mut published = 0;
    for _ in 0..5 {
        if controller.tick().await.published {
            published += 1;
        }
        clock.advance(STEP);
    }

    // Ticks at 0.0, 0.5, 1.0, 1.5 and 2.0 seconds
    assert_eq!(published, 2);
    let message: serde_json::Value =
        serde_json::from_str(&receiver.recv().await.unwrap()).unwrap();
    assert_eq!(message["vehicles2"], 4);
    assert_eq!(message["priority2"], "HIGH");
    assert_eq!(message["priority1"], "MED");
}

#[tokio::test]
async fn test_counts_are_capped() {
    let clock = Arc::new(ManualClock::new());
    let hub = Arc::new(TelemetryHub::new(4));
    let mut controller = controller_with(DemandStrategy::new(200, 0), clock, hub);

    let report = controller.tick().await;
    assert_eq!(report.snapshot.vehicles1.value(), 9);
}

#[tokio::test]
async fn test_capture_outage_serves_cached_frames() {
    let clock = Arc::new(ManualClock::new());
    let hub = Arc::new(TelemetryHub::new(4));
    let strategy = DemandStrategy::new(0, 2);
    let mut controller = controller_with(Arc::clone(&strategy), clock, hub);

    controller.tick().await;
    strategy.online.store(false, Ordering::SeqCst);
    let report = controller.tick().await;

    assert_eq!(report.origins, [FrameOrigin::Cached, FrameOrigin::Cached]);
    assert_eq!(report.snapshot.vehicles2.value(), 2);
}

#[tokio::test]
async fn test_no_capture_strategies_yields_blank_frames() {
    let sink = Arc::new(RecordingSink::default());
    let mut controller = TrafficController::builder()
        .detector(Arc::new(RedChannelDetector))
        .lights(LightOutput::mock(pins()))
        .publisher(Arc::new(TelemetryHub::new(4)), "traffic")
        .sink(sink.clone())
        .clock(Arc::new(ManualClock::new()))
        .build()
        .unwrap();

    let report = controller.tick().await;

    assert_eq!(report.origins, [FrameOrigin::Blank, FrameOrigin::Blank]);
    assert_eq!(report.snapshot.vehicles1.value(), 0);
    let mut stored = sink.stored.lock().clone();
    stored.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        stored,
        vec![
            ("lane1".to_string(), FrameOrigin::Blank),
            ("lane2".to_string(), FrameOrigin::Blank),
        ]
    );
}

#[tokio::test]
async fn test_lanes_sharing_default_camera_both_get_live_frames() {
    let clock = Arc::new(ManualClock::new());
    let hub = Arc::new(TelemetryHub::new(4));
    let mut controller = controller_with(DemandStrategy::new(3, 4), Arc::clone(&clock), hub);
    assert_eq!(controller.lanes()[0].index, controller.lanes()[1].index);

    for _ in 0..3 {
        let report = controller.tick().await;
        assert_eq!(report.origins, [FrameOrigin::Device, FrameOrigin::Device]);
        assert_eq!(report.snapshot.vehicles1.value(), 3);
        assert_eq!(report.snapshot.vehicles2.value(), 4);
        clock.advance(STEP);
    }
}

#[tokio::test]
async fn test_stuck_frame_sink_does_not_stall_tick() {
    let strategies: Vec<Arc<dyn CaptureStrategy>> = vec![DemandStrategy::new(2, 1)];
    let mut controller = TrafficController::builder()
        .strategies(strategies)
        .detector(Arc::new(RedChannelDetector))
        .lights(LightOutput::mock(pins()))
        .publisher(Arc::new(TelemetryHub::new(4)), "traffic")
        .sink(Arc::new(StuckSink))
        .sink_timeout(Duration::from_millis(50))
        .clock(Arc::new(ManualClock::new()))
        .build()
        .unwrap();

    let report = tokio::time::timeout(Duration::from_secs(2), controller.tick())
        .await
        .expect("tick should not wait on the frame sink");

    assert_eq!(report.snapshot.vehicles1.value(), 2);
    assert_eq!(report.snapshot.vehicles2.value(), 1);
    assert_eq!(
        controller.lights().colors(),
        [LightColor::Green, LightColor::Red]
    );
}

#[tokio::test]
async fn test_detector_panic_counts_zero() {
    let strategies: Vec<Arc<dyn CaptureStrategy>> = vec![DemandStrategy::new(4, 4)];
    let mut controller = TrafficController::builder()
        .strategies(strategies)
        .detector(Arc::new(PanickingDetector))
        .lights(LightOutput::mock(pins()))
        .publisher(Arc::new(TelemetryHub::new(4)), "traffic")
        .clock(Arc::new(ManualClock::new()))
        .build()
        .unwrap();

    let report = controller.tick().await;
    assert_eq!(report.snapshot.vehicles1.value(), 0);
    assert_eq!(report.snapshot.vehicles2.value(), 0);
}

#[tokio::test]
async fn test_stalled_publisher_does_not_stall_tick() {
    let clock = Arc::new(ManualClock::new());
    let strategies: Vec<Arc<dyn CaptureStrategy>> = vec![DemandStrategy::new(1, 1)];
    let mut controller = TrafficController::builder()
        .strategies(strategies)
        .detector(Arc::new(RedChannelDetector))
        .lights(LightOutput::mock(pins()))
        .publisher(Arc::new(StalledPublisher), "traffic")
        .publish_timeout(Duration::from_millis(50))
        .clock(clock.clone())
        .build()
        .unwrap();

    clock.advance(Duration::from_secs(1));
    let started = Instant::now();
    let report = controller.tick().await;

    assert!(!report.published);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_run_stops_on_cancellation_and_shutdown_turns_lights_off() {
    let hub = Arc::new(TelemetryHub::new(4));
    let strategies: Vec<Arc<dyn CaptureStrategy>> = vec![DemandStrategy::new(0, 0)];
    let mut controller = TrafficController::builder()
        .strategies(strategies)
        .detector(Arc::new(RedChannelDetector))
        .lights(LightOutput::mock(pins()))
        .publisher(hub, "traffic")
        .tick_interval(Duration::from_millis(10))
        .build()
        .unwrap();

    let token = controller.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    tokio::time::timeout(Duration::from_secs(5), controller.run())
        .await
        .unwrap();
    assert!(controller.tick_count() >= 1);

    controller.shutdown();
    controller.shutdown();
    assert!(controller.lights().is_released());
    assert_eq!(controller.lights().colors(), [LightColor::Off, LightColor::Off]);
}

#[tokio::test]
async fn test_run_returns_immediately_when_already_cancelled() {
    let token = tokio_util::sync::CancellationToken::new();
    token.cancel();
    let mut controller = TrafficController::builder()
        .detector(Arc::new(RedChannelDetector))
        .lights(LightOutput::mock(pins()))
        .publisher(Arc::new(TelemetryHub::new(4)), "traffic")
        .cancellation_token(token)
        .build()
        .unwrap();

    controller.run().await;
    assert_eq!(controller.tick_count(), 0);
}

#[test]
fn test_builder_requires_detector() {
    let result = TrafficController::builder()
        .lights(LightOutput::mock(pins()))
        .publisher(Arc::new(TelemetryHub::new(4)), "traffic")
        .build();

    assert!(result.is_err());
}

#[test]
fn test_from_config_on_bare_host() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SemaforConfig::default();
    config.camera.still_command = "semafor-missing-still-tool".to_string();
    config.detector.model_path = dir.path().join("absent.onnx").to_string_lossy().into_owned();
    config.lights.gpio_root = dir.path().join("gpio").to_string_lossy().into_owned();
    config.frames.path = dir.path().join("frames").to_string_lossy().into_owned();

    let controller = TrafficController::from_config(&config, Arc::new(TelemetryHub::new(4))).unwrap();
    let capabilities = controller.capabilities();

    assert!(!capabilities.native_still);
    assert!(!capabilities.model_backend);
    assert!(!capabilities.gpio);
    assert!(controller.lights().is_mock());
    assert!(dir.path().join("frames").is_dir());
    assert_eq!(controller.lanes()[1].key, "lane2");
}

#[test]
fn test_from_config_rejects_invalid_config() {
    let mut config = SemaforConfig::default();
    config.signal.yellow_seconds = 0;

    assert!(TrafficController::from_config(&config, Arc::new(TelemetryHub::new(4))).is_err());
}

#[test]
fn test_capabilities_display() {
    let capabilities = Capabilities {
        native_still: true,
        device_capture: false,
        model_backend: false,
        gpio: true,
    };
    assert_eq!(
        capabilities.to_string(),
        "native_still=yes device_capture=no model_backend=no gpio=yes"
    );
}
