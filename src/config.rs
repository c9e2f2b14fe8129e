//! Motor configuration, loaded from TOML.
//!
//! ```toml
//! min = 975
//! start = 1050
//! max = 1950
//! arm = 980
//! can_mask = 0b1111_0000
//!
//! [[distribution]]
//! throttle = 100.0
//! pitch = 100.0
//! roll = 100.0
//! yaw = -100.0
//! ```

use crate::{Error, MOTORS_NUM};
use nalgebra::Vector4;
use serde::Deserialize;
use std::path::Path;

/// Frame selector values in this open range are the retired predefined frames.
const PREDEFINED_FRAMES: (f32, f32) = (0.01, 4.01);

/// Percentage weights mapping the four control axes onto one motor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Distribution {
    pub throttle: f32,
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

impl Distribution {
    pub const fn new(throttle: f32, pitch: f32, roll: f32, yaw: f32) -> Self {
        Self {
            throttle,
            pitch,
            roll,
            yaw,
        }
    }

    /// Returns `true` if this motor takes no part in the mix.
    pub fn is_zero(&self) -> bool {
        self.throttle == 0. && self.pitch == 0. && self.roll == 0. && self.yaw == 0.
    }

    /// The row in `[throttle, pitch, roll, yaw]` order, in percent.
    pub fn weights(&self) -> Vector4<f32> {
        Vector4::new(self.throttle, self.pitch, self.roll, self.yaw)
    }
}

/// ESC control loop requested at bind time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscMode {
    #[default]
    OpenLoop,
    ClosedLoopRpm,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MotorsConfig {
    /// Pulse duty mapped to a drive value of 0.
    pub min: u16,
    /// Lowest pulse duty ever written while driving.
    pub start: u16,
    /// Pulse duty mapped to [`SCALE`](crate::SCALE), also the output ceiling.
    pub max: u16,
    /// Pulse duty held while armed but stopped.
    pub arm: u16,
    /// Bit `i` puts motor `i` on the networked bus.
    pub can_mask: u32,
    /// Retired predefined frame selector, must be 0.
    pub frame: f32,
    pub distribution: Vec<Distribution>,
    pub pwm_freq_hz: u32,
    pub esc_mode: EscMode,
    /// Nominal voltage of one battery cell.
    pub cell_volts: f32,
    /// Interval between node state polls while arming.
    pub arm_poll_ms: u32,
}

impl Default for MotorsConfig {
    fn default() -> Self {
        Self {
            min: 975,
            start: 1050,
            max: 1950,
            arm: 980,
            can_mask: 0,
            frame: 0.,
            distribution: Vec::new(),
            pwm_freq_hz: 400,
            esc_mode: EscMode::OpenLoop,
            cell_volts: 3.7,
            arm_poll_ms: 1,
        }
    }
}

impl MotorsConfig {
    /// Read and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parse and validate a configuration from TOML text.
    ///
    /// The row count is checked against [`MOTORS_NUM`]. Cores with a different
    /// number of slots check it again in [`Motors::initialize`](crate::Motors::initialize).
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the pulse range and rates for the default number of motor slots.
    pub fn validate(&self) -> Result<(), Error> {
        self.validate_for(MOTORS_NUM)
    }

    /// Like [`MotorsConfig::validate`], for a core with `motors` slots.
    pub fn validate_for(&self, motors: usize) -> Result<(), Error> {
        if self.min >= self.max {
            return Err(Error::InvalidConfig(format!(
                "min ({}) must be below max ({})",
                self.min, self.max
            )));
        }
        if !(self.min..=self.max).contains(&self.start) {
            return Err(Error::InvalidConfig(format!(
                "start ({}) outside [{}, {}]",
                self.start, self.min, self.max
            )));
        }
        // the arm duty is written raw and may sit below min
        if self.arm > self.max {
            return Err(Error::InvalidConfig(format!(
                "arm ({}) above max ({})",
                self.arm, self.max
            )));
        }
        if self.distribution.len() > motors {
            return Err(Error::InvalidConfig(format!(
                "{} distribution rows for {} motors",
                self.distribution.len(),
                motors
            )));
        }
        if self.pwm_freq_hz == 0 {
            return Err(Error::InvalidConfig("pwm_freq_hz must be non-zero".into()));
        }
        if !(self.cell_volts > 0.) {
            return Err(Error::InvalidConfig(format!(
                "cell_volts ({}) must be positive",
                self.cell_volts
            )));
        }
        Ok(())
    }

    /// Returns `true` if the retired frame selector is set.
    pub fn uses_predefined_frame(&self) -> bool {
        self.frame > PREDEFINED_FRAMES.0 && self.frame < PREDEFINED_FRAMES.1
    }

    /// Distribution row of motor `index`, all-zero if not configured.
    pub fn distribution(&self, index: usize) -> Distribution {
        self.distribution.get(index).copied().unwrap_or_default()
    }

    /// Returns `true` if motor `index` is on the networked bus.
    pub fn is_networked(&self, index: usize) -> bool {
        index < 32 && self.can_mask & (1 << index) != 0
    }
}
