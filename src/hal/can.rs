//! Interface to the networked ESC bus driver.

use crate::{EscMode, CAN_GROUP_SIZE};
use core::fmt::Debug;

/// A node found on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanNode {
    pub node_id: u8,
}

/// State reported by a networked ESC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscState {
    Disarmed,
    Stopped,
    NoComm,
    Starting,
    Running,
}

/// Addressing mode of a bus command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Node,
    Group,
}

pub trait CanBus {
    type Error: Debug;

    /// Look up the ESC with the given node id.
    fn find_esc(&mut self, node_id: u8) -> Option<CanNode>;

    /// Put a freshly found ESC into the requested control mode.
    fn setup_esc(&mut self, node: CanNode, mode: EscMode);

    /// Tell `node` which group frame and which field (both 1-based) carry its setpoint.
    fn set_group(&mut self, node: CanNode, group: u8, sub_group: u8);

    /// Send one 16-bit setpoint frame for `group` (1-based).
    fn send_setpoint16(
        &mut self,
        group: u8,
        values: &[u16; CAN_GROUP_SIZE],
    ) -> Result<(), Self::Error>;

    fn command_arm(&mut self, target: TargetType, id: u8);

    fn command_disarm(&mut self, target: TargetType, id: u8);

    /// Last state reported by `node_id`.
    fn esc_state(&mut self, node_id: u8) -> EscState;
}

impl<T: CanBus + ?Sized> CanBus for &mut T {
    type Error = T::Error;

    fn find_esc(&mut self, node_id: u8) -> Option<CanNode> {
        (**self).find_esc(node_id)
    }

    fn setup_esc(&mut self, node: CanNode, mode: EscMode) {
        (**self).setup_esc(node, mode)
    }

    fn set_group(&mut self, node: CanNode, group: u8, sub_group: u8) {
        (**self).set_group(node, group, sub_group)
    }

    fn send_setpoint16(
        &mut self,
        group: u8,
        values: &[u16; CAN_GROUP_SIZE],
    ) -> Result<(), Self::Error> {
        (**self).send_setpoint16(group, values)
    }

    fn command_arm(&mut self, target: TargetType, id: u8) {
        (**self).command_arm(target, id)
    }

    fn command_disarm(&mut self, target: TargetType, id: u8) {
        (**self).command_disarm(target, id)
    }

    fn esc_state(&mut self, node_id: u8) -> EscState {
        (**self).esc_state(node_id)
    }
}
