use super::Motors;
use crate::hal::{CanBus, PulseBank, VehicleState};
use crate::{constrain_float, constrain_int, SCALE, THROTTLE_LIMITER_STEP};
use nalgebra::Vector4;

/// Commands applied by the last mix.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Applied {
    /// Throttle after the limiter.
    pub throttle: f32,
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

/// Leaky integrator taking throttle away while any motor saturates.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThrottleLimiter {
    value: f32,
}

impl ThrottleLimiter {
    pub const MAX: f32 = SCALE as f32 / 4.;

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Move one step up after a saturated cycle, one step down otherwise.
    pub fn update(&mut self, saturated: bool) {
        let step = if saturated {
            THROTTLE_LIMITER_STEP
        } else {
            -THROTTLE_LIMITER_STEP
        };
        self.value = constrain_float(self.value + step, 0., Self::MAX);
    }

    pub fn reset(&mut self) {
        self.value = 0.;
    }
}

/// Output gain compensating battery sag: above 1 below nominal voltage, below 1 above it.
pub fn voltage_factor(nominal: f32, measured: f32) -> f32 {
    // avoid divide by zero
    if !(nominal > 0.) {
        return 1.;
    }

    1. + (nominal - measured) / nominal
}

impl<B, C, V, const N: usize> Motors<B, C, V, N>
where
    B: PulseBank,
    C: CanBus,
    V: VehicleState,
{
    /// Mix the control commands into motor values and output them.
    ///
    /// Runs once per control cycle. Commands are in [`SCALE`] units.
    pub fn mix(&mut self, throttle: f32, pitch: f32, roll: f32, yaw: f32) -> Applied {
        // throttle limiter to prevent control saturation
        let throttle = constrain_float(throttle - self.limiter.value(), 0., SCALE as f32);

        let nominal = self.config.cell_volts * self.vehicle.cell_count() as f32;
        let factor = voltage_factor(nominal, self.vehicle.bus_voltage());

        let commands = Vector4::new(throttle, pitch, roll, yaw);
        let mut saturated = false;

        for slot in self.slots.iter_mut().filter(|slot| slot.active) {
            let value = slot.distribution.weights().dot(&commands) / 100. * factor;

            // check before clamping
            if value >= SCALE as f32 {
                saturated = true;
            }

            slot.value = constrain_int(value, 0, SCALE as i32) as u16;
        }

        self.flush();
        self.limiter.update(saturated);

        self.applied = Applied {
            throttle,
            pitch,
            roll,
            yaw,
        };
        self.applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::tests::{config, motors};
    use crate::Distribution;
    use approx::assert_relative_eq;

    const THROTTLE: Distribution = Distribution::new(100., 0., 0., 0.);

    #[test]
    fn voltage_factor_tracks_sag() {
        assert_relative_eq!(voltage_factor(16., 16.), 1.);
        assert!(voltage_factor(16., 14.) > 1.);
        assert!(voltage_factor(16., 17.) < 1.);
        assert_relative_eq!(voltage_factor(16., 12.), 1.25);
        assert_relative_eq!(voltage_factor(0., 12.), 1.);
    }

    #[test]
    fn limiter_stays_bounded() {
        let mut limiter = ThrottleLimiter::default();
        limiter.update(false);
        assert_eq!(limiter.value(), 0.);

        limiter.update(true);
        assert_relative_eq!(limiter.value(), THROTTLE_LIMITER_STEP);

        for _ in 0..10_000 {
            limiter.update(true);
        }
        assert_relative_eq!(limiter.value(), ThrottleLimiter::MAX);

        limiter.update(false);
        assert_relative_eq!(limiter.value(), ThrottleLimiter::MAX - THROTTLE_LIMITER_STEP);
    }

    #[test]
    fn quad_x_mix() {
        let rows = [
            Distribution::new(100., 100., 100., -100.),
            Distribution::new(100., -100., -100., -100.),
            Distribution::new(100., 100., -100., 100.),
            Distribution::new(100., -100., 100., 100.),
        ];
        let mut motors = motors(4, &[]);
        motors.initialize(config(&rows, 0)).unwrap();

        motors.mix(2000., 100., 0., 0.);
        assert_eq!(motors.value(0), Some(2100));
        assert_eq!(motors.value(1), Some(1900));
        assert_eq!(motors.value(2), Some(2100));
        assert_eq!(motors.value(3), Some(1900));

        motors.mix(2000., 0., 0., 50.);
        assert_eq!(motors.value(0), Some(1950));
        assert_eq!(motors.value(2), Some(2050));
    }

    #[test]
    fn low_voltage_boosts_output() {
        let mut motors = motors(4, &[]);
        motors.initialize(config(&[THROTTLE], 0)).unwrap();
        motors.vehicle_mut().voltage = 12.;

        motors.mix(1000., 0., 0., 0.);
        assert_eq!(motors.value(0), Some(1250));
    }

    #[test]
    fn negative_mix_clamps_to_zero() {
        let mut motors = motors(4, &[]);
        motors
            .initialize(config(&[Distribution::new(100., -100., 0., 0.)], 0))
            .unwrap();

        motors.mix(100., 500., 0., 0.);
        assert_eq!(motors.value(0), Some(0));
        assert_eq!(motors.limiter(), 0.);
    }

    #[test]
    fn saturation_raises_limiter() {
        let mut motors = motors(4, &[]);
        motors.initialize(config(&[THROTTLE, THROTTLE], 0)).unwrap();

        let applied = motors.mix(SCALE as f32 + 100., 0., 0., 0.);
        assert_eq!(applied.throttle, SCALE as f32);
        assert_eq!(motors.value(0), Some(SCALE));
        assert_relative_eq!(motors.limiter(), THROTTLE_LIMITER_STEP);

        let applied = motors.mix(SCALE as f32, 0., 0., 0.);
        assert_relative_eq!(applied.throttle, SCALE as f32 - THROTTLE_LIMITER_STEP);
    }

    #[test]
    fn applied_is_recorded() {
        let mut motors = motors(4, &[]);
        motors.initialize(config(&[THROTTLE], 0)).unwrap();

        let applied = motors.mix(-10., 1., 2., 3.);
        assert_eq!(
            applied,
            Applied {
                throttle: 0.,
                pitch: 1.,
                roll: 2.,
                yaw: 3.
            }
        );
        assert_eq!(motors.applied(), applied);
    }

    #[test]
    fn off_resets_limiter_and_throttle() {
        let mut motors = motors(4, &[]);
        motors.initialize(config(&[THROTTLE], 0)).unwrap();

        motors.mix(SCALE as f32 * 2., 0., 0., 0.);
        assert!(motors.limiter() > 0.);

        motors.off();
        assert_eq!(motors.limiter(), 0.);
        assert_eq!(motors.applied().throttle, 0.);
        assert_eq!(motors.value(0), Some(0));
    }
}
