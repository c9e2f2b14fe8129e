//! Arming of the networked ESCs.
//!
//! Arming waits for every networked ESC to leave [`EscState::Disarmed`], so it
//! must run before the control cycle starts. Both calls take `&mut self`, which
//! keeps them from overlapping a [`Motors::mix`].

use super::{BusBinding, Motors};
use crate::hal::{CanBus, EscState, PulseBank, TargetType, VehicleState};
use crate::Error;
use embedded_time::duration::Milliseconds;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

impl<B, C, V, const N: usize> Motors<B, C, V, N>
where
    B: PulseBank,
    C: CanBus,
    V: VehicleState,
{
    /// Arm every group and wait until each networked ESC reports it has armed.
    ///
    /// There is no timeout: a node that never arms suspends the caller forever.
    /// See [`Motors::arm_timeout`] for a bounded wait.
    pub async fn arm(&mut self) {
        self.command_arm();

        let poll = self.arm_poll_interval();
        for slot in self.slots.iter() {
            let BusBinding::Networked(can) = &slot.bus else {
                continue;
            };
            let node_id = can.node.node_id;
            while self.can.esc_state(node_id) == EscState::Disarmed {
                sleep(poll).await;
            }
            debug!(node_id, "Motors: CAN node armed");
        }
    }

    /// Like [`Motors::arm`], giving up once `timeout` has passed.
    ///
    /// Nodes that already armed are left armed.
    pub async fn arm_timeout(&mut self, timeout: Milliseconds<u32>) -> Result<(), Error> {
        let deadline = Instant::now() + Duration::from_millis(timeout.0.into());
        self.command_arm();

        let poll = self.arm_poll_interval();
        for slot in self.slots.iter() {
            let BusBinding::Networked(can) = &slot.bus else {
                continue;
            };
            let node_id = can.node.node_id;
            while self.can.esc_state(node_id) == EscState::Disarmed {
                if Instant::now() >= deadline {
                    return Err(Error::ArmTimeout { node_id });
                }
                sleep(poll).await;
            }
            debug!(node_id, "Motors: CAN node armed");
        }

        Ok(())
    }

    /// Disarm every group without waiting for the nodes.
    pub fn disarm(&mut self) {
        for group in self.groups.group_ids() {
            self.can.command_disarm(TargetType::Group, group);
        }
    }

    fn command_arm(&mut self) {
        for group in self.groups.group_ids() {
            self.can.command_arm(TargetType::Group, group);
        }
    }

    fn arm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.arm_poll_ms.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::tests::{config, motors};
    use crate::Distribution;

    const THROTTLE: Distribution = Distribution::new(100., 0., 0., 0.);

    #[tokio::test]
    async fn arm_broadcasts_and_waits() {
        let mut motors = motors(8, &[1, 2, 3, 4, 5, 6]);
        motors
            .initialize(config(&[THROTTLE; 6], 0b11_1111))
            .unwrap();
        motors.can_mut().disarmed_polls = vec![(2, 3), (6, 5)];

        motors.arm().await;

        let can = motors.can();
        assert_eq!(can.arms, vec![(TargetType::Group, 1), (TargetType::Group, 2)]);
        // one polling pass per node plus the extra disarmed answers
        assert_eq!(can.polls, 6 + 3 + 5);
        assert!(can.disarmed_polls.iter().all(|(_, left)| *left == 0));
    }

    #[tokio::test]
    async fn arm_skips_pulse_and_unbound_motors() {
        let mut motors = motors(8, &[2]);
        motors
            .initialize(config(&[THROTTLE; 3], 0b110))
            .unwrap();

        motors.arm().await;

        assert_eq!(motors.can().arms, vec![(TargetType::Group, 1)]);
        assert_eq!(motors.can().polls, 1);
    }

    #[tokio::test]
    async fn arm_without_networked_motors_returns() {
        let mut motors = motors(8, &[]);
        motors.initialize(config(&[THROTTLE], 0)).unwrap();

        motors.arm().await;
        assert!(motors.can().arms.is_empty());
    }

    #[tokio::test]
    async fn arm_timeout_reports_stuck_node() {
        let mut motors = motors(8, &[1, 2]);
        motors
            .initialize(config(&[THROTTLE; 2], 0b11))
            .unwrap();
        motors.can_mut().disarmed_polls = vec![(2, usize::MAX)];

        let err = motors.arm_timeout(Milliseconds(20)).await.unwrap_err();
        assert!(matches!(err, Error::ArmTimeout { node_id: 2 }));
    }

    #[tokio::test]
    async fn arm_timeout_succeeds_when_nodes_arm() {
        let mut motors = motors(8, &[1]);
        motors.initialize(config(&[THROTTLE], 0b1)).unwrap();
        motors.can_mut().disarmed_polls = vec![(1, 2)];

        motors.arm_timeout(Milliseconds(1_000)).await.unwrap();
    }

    #[test]
    fn disarm_does_not_wait() {
        let mut motors = motors(8, &[1, 2, 3, 4, 5]);
        motors
            .initialize(config(&[THROTTLE; 5], 0b1_1111))
            .unwrap();

        motors.disarm();
        assert_eq!(
            motors.can().disarms,
            vec![(TargetType::Group, 1), (TargetType::Group, 2)]
        );
        assert_eq!(motors.can().polls, 0);
    }
}
