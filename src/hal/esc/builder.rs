use embedded_hal::PwmPin;

use super::PulseEsc;
use crate::MotorsConfig;

#[derive(Default)]
pub struct Builder {
    arm: u16,
    min: u16,
    start: Option<u16>,
    max: Option<u16>,
}

impl Builder {
    /// Start from the pulse range of a motor configuration.
    pub fn from_config(config: &MotorsConfig) -> Self {
        Self::default()
            .arm(config.arm)
            .min(config.min)
            .start(config.start)
            .max(config.max)
    }

    pub fn arm(mut self, arm: u16) -> Self {
        self.arm = arm;
        self
    }

    pub fn min(mut self, min: u16) -> Self {
        self.min = min;
        self
    }

    pub fn start(mut self, start: u16) -> Self {
        self.start = Some(start);
        self
    }

    pub fn max(mut self, max: u16) -> Self {
        self.max = Some(max);
        self
    }

    pub fn build<P>(self, pin: P) -> PulseEsc<P>
    where
        P: PwmPin<Duty = u16>,
    {
        let max = self.max.unwrap_or(pin.get_max_duty()).max(self.min);
        let start = self.start.unwrap_or(self.min).clamp(self.min, max);
        PulseEsc {
            arm: self.arm,
            min: self.min,
            start,
            max,
            pin,
        }
    }
}
