mod driver;
mod output;


pub use driver::{PinDriver, SysfsGpioDriver};
pub use output::{LightOutput, LightPins};
