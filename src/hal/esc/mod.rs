mod builder;
pub use builder::Builder;

use crate::{constrain_int, SCALE};
use embedded_hal::PwmPin;

/// A pulse driven ESC on one output channel.
pub struct PulseEsc<P> {
    arm: u16,
    min: u16,
    start: u16,
    max: u16,
    pin: P,
}

impl<P> PulseEsc<P>
where
    P: PwmPin<Duty = u16>,
{
    pub fn new(arm: u16, min: u16, start: u16, max: u16, pin: P) -> Self {
        Self {
            arm,
            min,
            start,
            max,
            pin,
        }
    }

    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Map `value` in `[0, SCALE]` onto the duty range and write it, or write 0 while disarmed.
    pub fn output(&mut self, value: u16, armed: bool) -> u16 {
        let duty = if armed { self.duty(value) } else { 0 };
        self.pin.set_duty(duty);
        duty
    }

    /// Write the stopped duty: the arm value while armed, 0 otherwise.
    pub fn idle(&mut self, armed: bool) -> u16 {
        let duty = if armed { self.arm } else { 0 };
        self.pin.set_duty(duty);
        duty
    }

    /// Duty for a drive value, never outside `[start, max]`.
    pub fn duty(&self, value: u16) -> u16 {
        let span = self.max.saturating_sub(self.min) as f32;
        let duty = value as f32 * span / SCALE as f32 + self.min as f32;
        constrain_int(duty, self.start.min(self.max) as i32, self.max as i32) as u16
    }

    /// Duty currently on the pin.
    pub fn current_duty(&self) -> u16 {
        self.pin.get_duty()
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}
