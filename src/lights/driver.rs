use crate::error::LightError;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Pin-level output control
pub trait PinDriver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Take ownership of the pin and configure it as an output
    fn claim(&mut self, pin: u8) -> Result<(), LightError>;

    fn write(&mut self, pin: u8, high: bool) -> Result<(), LightError>;

    /// Hand the pin back to the system
    fn release(&mut self, pin: u8) -> Result<(), LightError>;
}

/// Label prefix of the SoC GPIO controller on Raspberry Pi kernels
const SOC_CHIP_LABEL: &str = "pinctrl-";

/// Linux sysfs GPIO (`/sys/class/gpio`).
///
/// Pins are BCM line numbers. The kernel's sysfs number is the line plus the
/// base of the SoC chip, which is 0 on older kernels and 512 from 6.6 on.
pub struct SysfsGpioDriver {
    root: PathBuf,
    base: u32,
    exported: BTreeSet<u8>,
}

impl SysfsGpioDriver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_base(root, 0)
    }

    pub fn with_base(root: impl Into<PathBuf>, base: u32) -> Self {
        Self {
            root: root.into(),
            base,
            exported: BTreeSet::new(),
        }
    }

    /// `None` when the interface is missing, which selects mock mode
    pub fn probe(root: impl AsRef<Path>) -> Option<Self> {
        let root = root.as_ref();
        if root.join("export").exists() {
            let base = Self::soc_chip_base(root).unwrap_or(0);
            info!("GPIO interface found at {} (line base {})", root.display(), base);
            Some(Self::with_base(root, base))
        } else {
            info!("No GPIO interface at {}", root.display());
            None
        }
    }

    /// Base of the `pinctrl-*` chip, or of the only chip when none is labelled
    fn soc_chip_base(root: &Path) -> Option<u32> {
        let mut chips = Vec::new();
        for entry in fs::read_dir(root).ok()?.flatten() {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with("gpiochip") {
                continue;
            }
            let dir = entry.path();
            let base = match fs::read_to_string(dir.join("base")) {
                Ok(base) => match base.trim().parse::<u32>() {
                    Ok(base) => base,
                    Err(_) => continue,
                },
                Err(_) => continue,
            };
            let label = fs::read_to_string(dir.join("label")).unwrap_or_default();
            debug!("GPIO chip {} label '{}' base {}", dir.display(), label.trim(), base);
            chips.push((label.trim().starts_with(SOC_CHIP_LABEL), base));
        }

        match chips.iter().find(|(soc, _)| *soc) {
            Some((_, base)) => Some(*base),
            None if chips.len() == 1 => Some(chips[0].1),
            None => None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    /// Kernel sysfs number for a BCM line
    pub fn line(&self, pin: u8) -> u32 {
        self.base + u32::from(pin)
    }

    fn pin_dir(&self, pin: u8) -> PathBuf {
        self.root.join(format!("gpio{}", self.line(pin)))
    }
}

impl PinDriver for SysfsGpioDriver {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn claim(&mut self, pin: u8) -> Result<(), LightError> {
        let pin_dir = self.pin_dir(pin);
        if !pin_dir.exists() {
            fs::write(self.root.join("export"), self.line(pin).to_string())
                .map_err(|source| LightError::Export { pin, source })?;
        }
        fs::write(pin_dir.join("direction"), "out")
            .map_err(|source| LightError::Direction { pin, source })?;

        self.exported.insert(pin);
        debug!("Claimed GPIO {} (line {}) as output", pin, self.line(pin));
        Ok(())
    }

    fn write(&mut self, pin: u8, high: bool) -> Result<(), LightError> {
        let level = if high { "1" } else { "0" };
        fs::write(self.pin_dir(pin).join("value"), level)
            .map_err(|source| LightError::Write { pin, source })
    }

    fn release(&mut self, pin: u8) -> Result<(), LightError> {
        if !self.exported.remove(&pin) {
            return Ok(());
        }
        fs::write(self.root.join("unexport"), self.line(pin).to_string())
            .map_err(|source| LightError::Unexport { pin, source })?;
        debug!("Released GPIO {}", pin);
        Ok(())
    }
}
