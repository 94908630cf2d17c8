use super::driver::{PinDriver, SysfsGpioDriver};
use crate::config::{LightPinsConfig, LightsConfig};
use crate::lane::LaneId;
use crate::signal::LightColor;
use tracing::{debug, info, warn};

/// Output lines of one three-color head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightPins {
    pub red: u8,
    pub yellow: u8,
    pub green: u8,
}

impl LightPins {
    pub fn all(&self) -> [u8; 3] {
        [self.red, self.yellow, self.green]
    }

    pub fn pin_for(&self, color: LightColor) -> Option<u8> {
        match color {
            LightColor::Red => Some(self.red),
            LightColor::Yellow => Some(self.yellow),
            LightColor::Green => Some(self.green),
            LightColor::Off => None,
        }
    }
}

impl From<LightPinsConfig> for LightPins {
    fn from(config: LightPinsConfig) -> Self {
        Self {
            red: config.red,
            yellow: config.yellow,
            green: config.green,
        }
    }
}

/// Both lanes' signal heads.
///
/// Every change drives all three lines of the lane low before raising the
/// requested one. Driver failures are logged and swallowed. Without a driver
/// the requested colors are only recorded.
pub struct LightOutput {
    driver: Option<Box<dyn PinDriver>>,
    pins: [LightPins; 2],
    colors: [LightColor; 2],
    released: bool,
}

impl LightOutput {
    pub fn new(mut driver: Option<Box<dyn PinDriver>>, pins: [LightPins; 2]) -> Self {
        match driver.as_mut() {
            Some(driver) => {
                for pin in pins.iter().flat_map(|p| p.all()) {
                    if let Err(e) = driver.claim(pin) {
                        warn!("{} driver: {}", driver.name(), e);
                    }
                }
                info!(
                    "Light output using {} driver (lane1 {:?}, lane2 {:?})",
                    driver.name(),
                    pins[0].all(),
                    pins[1].all()
                );
            }
            None => info!("Light output running in mock mode"),
        }

        Self {
            driver,
            pins,
            colors: [LightColor::Off; 2],
            released: false,
        }
    }

    pub fn mock(pins: [LightPins; 2]) -> Self {
        Self::new(None, pins)
    }

    pub fn from_config(config: &LightsConfig) -> Self {
        let driver = SysfsGpioDriver::probe(&config.gpio_root)
            .map(|driver| Box::new(driver) as Box<dyn PinDriver>);
        Self::new(driver, [config.lane1.into(), config.lane2.into()])
    }

    pub fn is_mock(&self) -> bool {
        self.driver.is_none()
    }

    pub fn color(&self, lane: LaneId) -> LightColor {
        self.colors[lane.position()]
    }

    pub fn colors(&self) -> [LightColor; 2] {
        self.colors
    }

    pub fn set(&mut self, lane: LaneId, color: LightColor) {
        if self.released {
            debug!("Ignoring {} -> {} after release", lane, color);
            return;
        }

        self.colors[lane.position()] = color;
        let pins = self.pins[lane.position()];

        let Some(driver) = self.driver.as_mut() else {
            debug!("{} mock: {}", lane, color);
            return;
        };

        for pin in pins.all() {
            if let Err(e) = driver.write(pin, false) {
                warn!("Failed to clear {} light: {}", lane, e);
            }
        }
        if let Some(pin) = pins.pin_for(color) {
            if let Err(e) = driver.write(pin, true) {
                warn!("Failed to set {} light {}: {}", lane, color, e);
            }
        }
    }

    /// Show a (lane 1, lane 2) color pair
    pub fn apply(&mut self, colors: [LightColor; 2]) {
        for lane in LaneId::ALL {
            self.set(lane, colors[lane.position()]);
        }
    }

    /// Turn everything off and give the lines back. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        for lane in LaneId::ALL {
            self.set(lane, LightColor::Off);
        }
        self.released = true;

        if let Some(driver) = self.driver.as_mut() {
            for pin in self.pins.iter().flat_map(|p| p.all()) {
                if let Err(e) = driver.release(pin) {
                    warn!("{} driver: {}", driver.name(), e);
                }
            }
        }
        info!("Light outputs released");
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for LightOutput {
    fn drop(&mut self) {
        self.release();
    }
}
