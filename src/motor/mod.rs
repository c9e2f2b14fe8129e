//! Motor slots, initialization and output dispatch.

mod arming;

mod groups;
pub use groups::{CanGroupPacker, GroupSlot};

mod mixer;
pub use mixer::{voltage_factor, Applied, ThrottleLimiter};

use crate::hal::{Builder, CanBus, CanNode, PulseBank, PulseEsc, VehicleState};
use crate::{Distribution, Error, MotorsConfig, CAN_GROUP_SIZE, MOTORS_NUM, SCALE};
use nalgebra::Vector3;
use tracing::{debug, error, info, warn};

/// Largest pitch, roll or yaw coefficient sum accepted without a warning.
const BALANCE_TOLERANCE: f32 = 0.01;

/// Networked ESCs ignore setpoints below this fraction of [`SCALE`].
const CAN_DEAD_ZONE: f32 = 0.1;

/// Motor core for the default number of motor slots.
pub type Motors14<B, C, V> = Motors<B, C, V, MOTORS_NUM>;

/// A networked ESC and the field of its group frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanSlot {
    pub node: CanNode,
    pub position: GroupSlot,
}

/// The bus a motor slot drives.
pub enum BusBinding<P> {
    None,
    Pulse(PulseEsc<P>),
    Networked(CanSlot),
}

impl<P> BusBinding<P> {
    pub fn is_none(&self) -> bool {
        matches!(self, BusBinding::None)
    }

    pub fn can_slot(&self) -> Option<&CanSlot> {
        match self {
            BusBinding::Networked(slot) => Some(slot),
            _ => None,
        }
    }

    pub fn pulse(&self) -> Option<&PulseEsc<P>> {
        match self {
            BusBinding::Pulse(esc) => Some(esc),
            _ => None,
        }
    }
}

pub struct MotorSlot<P> {
    active: bool,
    bus: BusBinding<P>,
    distribution: Distribution,
    /// Last drive value in `[0, SCALE]`.
    value: u16,
}

impl<P> Default for MotorSlot<P> {
    fn default() -> Self {
        Self {
            active: false,
            bus: BusBinding::None,
            distribution: Distribution::default(),
            value: 0,
        }
    }
}

impl<P> MotorSlot<P> {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn bus(&self) -> &BusBinding<P> {
        &self.bus
    }

    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    pub fn value(&self) -> u16 {
        self.value
    }
}

/// 16-bit networked setpoint for a drive value, floored at the ESC dead zone.
pub fn can_setpoint(value: u16) -> u16 {
    let floor = (SCALE as f32 * CAN_DEAD_ZONE) as u16;
    let shifted = (value.clamp(floor, SCALE) as u32) << 4;
    shifted.min(u16::MAX as u32) as u16
}

/// The motor output core.
///
/// Owns every motor slot, the networked group frames and the throttle limiter.
/// All of it is rebuilt by [`Motors::initialize`].
pub struct Motors<B: PulseBank, C, V, const N: usize = MOTORS_NUM> {
    config: MotorsConfig,
    slots: [MotorSlot<B::Channel>; N],
    groups: CanGroupPacker,
    limiter: ThrottleLimiter,
    applied: Applied,
    bank: B,
    can: C,
    vehicle: V,
}

impl<B, C, V, const N: usize> Motors<B, C, V, N>
where
    B: PulseBank,
    C: CanBus,
    V: VehicleState,
{
    /// Create a motor core with no active motors.
    pub fn new(bank: B, can: C, vehicle: V) -> Self {
        Self {
            config: MotorsConfig::default(),
            slots: core::array::from_fn(|_| MotorSlot::default()),
            groups: CanGroupPacker::default(),
            limiter: ThrottleLimiter::default(),
            applied: Applied::default(),
            bank,
            can,
            vehicle,
        }
    }

    /// Bind every configured motor to its bus and de-energize all outputs.
    ///
    /// Any previous state is discarded first. If the retired predefined frame
    /// selector is set nothing is bound and [`Error::PredefinedFrame`] is returned.
    pub fn initialize(&mut self, config: MotorsConfig) -> Result<(), Error> {
        info!("Motors init");
        self.reset();

        if config.uses_predefined_frame() {
            error!(
                frame = config.frame,
                "Motors: predefined frame types are no longer supported"
            );
            return Err(Error::PredefinedFrame(config.frame));
        }
        if let Err(err) = config.validate_for(N) {
            error!(%err, "Motors: rejected configuration");
            return Err(err);
        }
        self.config = config;

        let mut nodes: [Option<CanNode>; N] = [None; N];
        let mut sums = Vector3::<f32>::zeros();

        for i in 0..N {
            let distribution = self.config.distribution(i);
            if distribution.is_zero() {
                continue;
            }

            if self.config.is_networked(i) {
                nodes[i] = self.bind_can(i);
            } else if i < self.bank.num_ports() {
                self.bind_pulse(i);
            }

            let slot = &mut self.slots[i];
            slot.active = true;
            slot.distribution = distribution;

            sums += Vector3::new(distribution.pitch, distribution.roll, distribution.yaw);
        }

        for (axis, sum) in [("pitch", sums.x), ("roll", sums.y), ("yaw", sums.z)] {
            if sum.abs() > BALANCE_TOLERANCE {
                warn!(axis, sum, "Motors: {} control imbalance", axis);
            }
        }

        self.assign_groups(&nodes);
        self.off();

        Ok(())
    }

    fn bind_can(&mut self, index: usize) -> Option<CanNode> {
        let node_id = (index + 1) as u8;
        match self.can.find_esc(node_id) {
            Some(node) => {
                self.can.setup_esc(node, self.config.esc_mode);
                Some(node)
            }
            None => {
                error!(node_id, "Motors: cannot find CAN id [{}]", node_id);
                None
            }
        }
    }

    fn bind_pulse(&mut self, index: usize) {
        let config = &self.config;
        match self.bank.init_out(index, config.pwm_freq_hz, config.esc_mode) {
            Some(pin) => {
                let esc = Builder::from_config(config).build(pin);
                self.slots[index].bus = BusBinding::Pulse(esc);
            }
            None => warn!(port = index, "Motors: cannot open pulse output"),
        }
    }

    /// Place the resolved networked ESCs into group frames in motor order.
    fn assign_groups(&mut self, nodes: &[Option<CanNode>; N]) {
        for (slot, node) in self.slots.iter_mut().zip(nodes) {
            if let Some(node) = *node {
                let position = self.groups.assign(&mut self.can, node);
                debug!(
                    node_id = node.node_id,
                    group = position.group_id(),
                    field = position.field,
                    "Motors: CAN group assigned"
                );
                slot.bus = BusBinding::Networked(CanSlot { node, position });
            }
        }
    }

    fn reset(&mut self) {
        self.config = MotorsConfig::default();
        self.slots = core::array::from_fn(|_| MotorSlot::default());
        self.groups.clear();
        self.limiter.reset();
        self.applied = Applied::default();
    }

    /// Write every active motor's value to its bus and send the group frames.
    pub fn flush(&mut self) {
        let armed = self.vehicle.is_armed();

        for slot in self.slots.iter_mut().filter(|slot| slot.active) {
            slot.value = slot.value.min(SCALE);

            match &mut slot.bus {
                BusBinding::Pulse(esc) => {
                    esc.output(slot.value, armed);
                }
                BusBinding::Networked(can) => {
                    let setpoint = if armed { can_setpoint(slot.value) } else { 0 };
                    self.groups.set(can.position, setpoint);
                }
                BusBinding::None => {}
            }
        }

        self.groups.transmit_all(&mut self.can);
    }

    /// Stop every motor.
    ///
    /// Pulse ESCs hold the arm duty while armed so they stay alive.
    pub fn off(&mut self) {
        let armed = self.vehicle.is_armed();

        for slot in self.slots.iter_mut().filter(|slot| slot.active) {
            slot.value = 0;

            match &mut slot.bus {
                BusBinding::Pulse(esc) => {
                    esc.idle(armed);
                }
                BusBinding::Networked(can) => self.groups.set(can.position, 0),
                BusBinding::None => {}
            }
        }

        self.groups.transmit_all(&mut self.can);

        self.applied.throttle = 0.;
        self.limiter.reset();
    }

    pub fn slot(&self, index: usize) -> Option<&MotorSlot<B::Channel>> {
        self.slots.get(index)
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.slots.get(index).map_or(false, MotorSlot::is_active)
    }

    pub fn value(&self, index: usize) -> Option<u16> {
        self.slots.get(index).map(MotorSlot::value)
    }

    /// Bus binding of motor `index`.
    pub fn binding(&self, index: usize) -> Option<&BusBinding<B::Channel>> {
        self.slots.get(index).map(MotorSlot::bus)
    }

    pub fn groups(&self) -> &CanGroupPacker {
        &self.groups
    }

    pub fn num_groups(&self) -> usize {
        self.groups.num_groups()
    }

    /// Setpoints last packed into the group frame at `index`, counting from 0.
    pub fn group(&self, index: usize) -> Option<&[u16; CAN_GROUP_SIZE]> {
        self.groups.group(index)
    }

    pub fn limiter(&self) -> f32 {
        self.limiter.value()
    }

    /// Commands applied by the last [`Motors::mix`].
    pub fn applied(&self) -> Applied {
        self.applied
    }

    pub fn config(&self) -> &MotorsConfig {
        &self.config
    }

    pub fn can(&self) -> &C {
        &self.can
    }

    pub fn can_mut(&mut self) -> &mut C {
        &mut self.can
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn vehicle(&self) -> &V {
        &self.vehicle
    }

    pub fn vehicle_mut(&mut self) -> &mut V {
        &mut self.vehicle
    }
}
