pub mod can;
pub use can::{CanBus, CanNode, EscState, TargetType};

pub mod esc;
pub use esc::{Builder, PulseEsc};

use crate::EscMode;
use embedded_hal::PwmPin;

/// Vehicle state consumed by the motor core but owned elsewhere.
pub trait VehicleState {
    /// Returns `true` while the supervisor has the vehicle armed.
    fn is_armed(&self) -> bool;

    /// Measured battery bus voltage.
    fn bus_voltage(&self) -> f32;

    /// Number of cells in the battery pack.
    fn cell_count(&self) -> u8;
}

impl<T: VehicleState + ?Sized> VehicleState for &T {
    fn is_armed(&self) -> bool {
        (**self).is_armed()
    }

    fn bus_voltage(&self) -> f32 {
        (**self).bus_voltage()
    }

    fn cell_count(&self) -> u8 {
        (**self).cell_count()
    }
}

/// The pulse output timers of the board.
pub trait PulseBank {
    type Channel: PwmPin<Duty = u16>;

    /// Number of pulse output ports on this board.
    fn num_ports(&self) -> usize;

    /// Configure `port` as a motor output running at `hz`.
    fn init_out(&mut self, port: usize, hz: u32, mode: EscMode) -> Option<Self::Channel>;
}
