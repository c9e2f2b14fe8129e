//! A quad-X with two pulse ESCs and two networked ESCs, driven by logging stand-ins.

use embedded_hal::PwmPin;
use embedded_time::duration::Milliseconds;
use flight_motors::hal::{CanNode, EscState, TargetType};
use flight_motors::{
    CanBus, Distribution, EscMode, Motors14, MotorsConfig, PulseBank, VehicleState,
    CAN_GROUP_SIZE,
};
use tracing::info;

struct ExamplePin(usize, u16);

impl PwmPin for ExamplePin {
    type Duty = u16;

    fn disable(&mut self) {}

    fn enable(&mut self) {}

    fn get_duty(&self) -> u16 {
        self.1
    }

    fn get_max_duty(&self) -> u16 {
        2000
    }

    fn set_duty(&mut self, duty: u16) {
        info!(port = self.0, duty, "pwm");
        self.1 = duty;
    }
}

struct ExampleTimers;

impl PulseBank for ExampleTimers {
    type Channel = ExamplePin;

    fn num_ports(&self) -> usize {
        2
    }

    fn init_out(&mut self, port: usize, _hz: u32, _mode: EscMode) -> Option<ExamplePin> {
        Some(ExamplePin(port, 0))
    }
}

struct ExampleCan;

impl CanBus for ExampleCan {
    type Error = ();

    fn find_esc(&mut self, node_id: u8) -> Option<CanNode> {
        Some(CanNode { node_id })
    }

    fn setup_esc(&mut self, _node: CanNode, _mode: EscMode) {}

    fn set_group(&mut self, _node: CanNode, _group: u8, _sub_group: u8) {}

    fn send_setpoint16(&mut self, group: u8, values: &[u16; CAN_GROUP_SIZE]) -> Result<(), ()> {
        info!(group, ?values, "can");
        Ok(())
    }

    fn command_arm(&mut self, _target: TargetType, id: u8) {
        info!(group = id, "can arm");
    }

    fn command_disarm(&mut self, _target: TargetType, id: u8) {
        info!(group = id, "can disarm");
    }

    fn esc_state(&mut self, _node_id: u8) -> EscState {
        EscState::Stopped
    }
}

struct ExampleVehicle;

impl VehicleState for ExampleVehicle {
    fn is_armed(&self) -> bool {
        true
    }

    fn bus_voltage(&self) -> f32 {
        11.4
    }

    fn cell_count(&self) -> u8 {
        3
    }
}

#[tokio::main]
async fn main() -> Result<(), flight_motors::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = MotorsConfig {
        can_mask: 0b1100,
        distribution: vec![
            Distribution::new(100., 100., 100., -100.),
            Distribution::new(100., -100., -100., -100.),
            Distribution::new(100., 100., -100., 100.),
            Distribution::new(100., -100., 100., 100.),
        ],
        ..MotorsConfig::default()
    };

    let mut motors = Motors14::new(ExampleTimers, ExampleCan, ExampleVehicle);
    motors.initialize(config)?;
    motors.arm_timeout(Milliseconds(500)).await?;

    for _ in 0..3 {
        let applied = motors.mix(2000., 150., -80., 20.);
        info!(?applied, limiter = motors.limiter(), "cycle");
    }

    motors.off();
    motors.disarm();
    Ok(())
}
