//! # flight-motors
//! The motor output core of a multirotor flight controller.
//!
//! # Components
//! [`Motors`] owns every motor slot. It is built by [`Motors::initialize`] from a
//! [`MotorsConfig`], binds each slot to a pulse ESC or a networked (CAN) ESC and
//! then runs once per control cycle through [`Motors::mix`].
//!
//! [`hal`] contains the hardware seams: [`PulseBank`] and [`PulseEsc`] for pulse
//! outputs, [`CanBus`] for networked ESCs and [`VehicleState`] for the armed flag
//! and battery voltage.
//!
//! [`motor`] contains the mixer, the output dispatch, the CAN group packer and the
//! arming rendezvous.
//!
//! ```ignore
//! let config = MotorsConfig::load("motors.toml")?;
//! let mut motors = Motors14::new(pwm_bank, can_bus, supervisor);
//! motors.initialize(config)?;
//!
//! // Pre-flight
//! motors.arm().await;
//!
//! // Every control cycle
//! motors.mix(throttle, pitch, roll, yaw);
//! ```

pub mod config;
pub use config::{Distribution, EscMode, MotorsConfig};

mod error;
pub use error::Error;

pub mod hal;
pub use hal::{CanBus, PulseBank, PulseEsc, VehicleState};

pub mod motor;
pub use motor::{Applied, BusBinding, Motors, Motors14};

/// Number of motor slots.
pub const MOTORS_NUM: usize = 14;

/// Canonical drive range of every motor value before bus scaling.
pub const SCALE: u16 = 4095;

/// Number of setpoints carried by one networked group frame.
pub const CAN_GROUP_SIZE: usize = 4;

/// Group frames needed to carry every motor slot on the networked bus.
pub const MAX_CAN_GROUPS: usize = (MOTORS_NUM + CAN_GROUP_SIZE - 1) / CAN_GROUP_SIZE;

/// Amount the throttle limiter moves each control cycle.
pub const THROTTLE_LIMITER_STEP: f32 = 5.0;

pub(crate) fn constrain_float(amt: f32, low: f32, high: f32) -> f32 {
    if amt.is_nan() {
        return low;
    }

    num_traits::clamp(amt, low, high)
}

pub(crate) fn constrain_int(amt: f32, low: i32, high: i32) -> i32 {
    // `as` saturates, NaN becomes 0
    num_traits::clamp(amt as i32, low, high)
}
