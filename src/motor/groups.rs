use crate::hal::{CanBus, CanNode};
use crate::CAN_GROUP_SIZE;
use tracing::warn;

/// Position of one setpoint inside the group frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSlot {
    /// 0-based index of the group frame.
    pub group: usize,
    /// 0-based field within the frame.
    pub field: usize,
}

impl GroupSlot {
    /// Group id used on the bus, starting at 1.
    pub fn group_id(&self) -> u8 {
        (self.group + 1) as u8
    }

    /// Field number used on the bus, starting at 1.
    pub fn sub_group(&self) -> u8 {
        (self.field + 1) as u8
    }
}

/// Packs networked setpoints into frames of [`CAN_GROUP_SIZE`] values.
#[derive(Debug, Default)]
pub struct CanGroupPacker {
    groups: Vec<[u16; CAN_GROUP_SIZE]>,
    assigned: usize,
}

impl CanGroupPacker {
    /// Give `node` the next free field, opening a new group every
    /// [`CAN_GROUP_SIZE`] assignments, and tell the node where it is.
    pub fn assign<C: CanBus>(&mut self, can: &mut C, node: CanNode) -> GroupSlot {
        let position = GroupSlot {
            group: self.assigned / CAN_GROUP_SIZE,
            field: self.assigned % CAN_GROUP_SIZE,
        };
        if position.field == 0 {
            self.groups.push([0; CAN_GROUP_SIZE]);
        }
        self.assigned += 1;

        can.set_group(node, position.group_id(), position.sub_group());
        position
    }

    pub fn set(&mut self, slot: GroupSlot, value: u16) {
        if let Some(group) = self.groups.get_mut(slot.group) {
            group[slot.field] = value;
        }
    }

    /// Send every group frame, changed or not.
    pub fn transmit_all<C: CanBus>(&self, can: &mut C) {
        for (index, values) in self.groups.iter().enumerate() {
            let group = (index + 1) as u8;
            if let Err(err) = can.send_setpoint16(group, values) {
                warn!(group, ?err, "Motors: CAN setpoint send failed");
            }
        }
    }

    /// Group ids in use, starting at 1.
    pub fn group_ids(&self) -> impl Iterator<Item = u8> {
        (1..=self.groups.len()).map(|id| id as u8)
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Number of networked ESCs packed so far.
    pub fn assigned(&self) -> usize {
        self.assigned
    }

    pub fn group(&self, index: usize) -> Option<&[u16; CAN_GROUP_SIZE]> {
        self.groups.get(index)
    }

    pub fn clear(&mut self) {
        self.groups.clear();
        self.assigned = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::tests::TestCan;
    use crate::MAX_CAN_GROUPS;

    fn pack(count: u8) -> (CanGroupPacker, TestCan, Vec<GroupSlot>) {
        let mut packer = CanGroupPacker::default();
        let mut can = TestCan::default();
        let slots = (1..=count)
            .map(|node_id| packer.assign(&mut can, CanNode { node_id }))
            .collect();
        (packer, can, slots)
    }

    #[test]
    fn group_count_rounds_up() {
        for (count, groups) in [(0, 0), (1, 1), (4, 1), (5, 2), (8, 2), (9, 3), (14, MAX_CAN_GROUPS)] {
            let (packer, _, _) = pack(count);
            assert_eq!(packer.num_groups(), groups, "{count} nodes");
        }
    }

    #[test]
    fn positions_follow_assignment_order() {
        let (_, can, slots) = pack(6);
        for (k, slot) in slots.iter().enumerate() {
            assert_eq!(slot.group, k / 4);
            assert_eq!(slot.field, k % 4);
            assert_eq!(slot.group_id() as usize, k / 4 + 1);
        }
        assert_eq!(can.groups[4], (5, 2, 1));
        assert_eq!(can.groups[3], (4, 1, 4));
    }

    #[test]
    fn partial_group_is_sent_whole() {
        let (mut packer, mut can, slots) = pack(5);
        packer.set(slots[4], 1234);
        packer.set(slots[0], 10);
        packer.transmit_all(&mut can);

        assert_eq!(
            can.frames,
            vec![(1, [10, 0, 0, 0]), (2, [1234, 0, 0, 0])]
        );
        assert_eq!(packer.group_ids().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn transmits_every_cycle() {
        let (packer, mut can, _) = pack(2);
        packer.transmit_all(&mut can);
        packer.transmit_all(&mut can);
        assert_eq!(can.frames.len(), 2);
    }

    #[test]
    fn clear_starts_over() {
        let (mut packer, mut can, _) = pack(3);
        packer.clear();
        assert_eq!(packer.num_groups(), 0);
        let slot = packer.assign(&mut can, CanNode { node_id: 9 });
        assert_eq!(slot, GroupSlot { group: 0, field: 0 });
        assert_eq!(packer.assigned(), 1);
    }
}
