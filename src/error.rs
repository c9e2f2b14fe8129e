use thiserror::Error;

/// Errors surfaced by configuration loading, initialization and bounded arming.
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file could not be read.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid TOML for [`MotorsConfig`](crate::MotorsConfig).
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but its values are out of range.
    #[error("config validation: {0}")]
    InvalidConfig(String),

    /// A predefined frame type was selected; these are no longer supported.
    #[error("predefined frame types are no longer supported (frame = {0})")]
    PredefinedFrame(f32),

    /// A networked ESC did not leave the disarmed state in time.
    #[error("CAN node {node_id} did not arm in time")]
    ArmTimeout {
        /// Node id of the first ESC still disarmed.
        node_id: u8,
    },
}
