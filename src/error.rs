//! Error types for USB-CLCD1602 operations.

use thiserror::Error;

/// Primary error type for driver and applet operations.
///
/// The first three variants form the closed taxonomy the supervisor
/// branches on: `NotFound` means "keep waiting", `NotConnected` and
/// `NotRespond` mean "tear down and reopen".
#[derive(Error, Debug)]
pub enum ClcdError {
    /// No matching device at open time, or the VID/PID matched but the
    /// product string did not.
    #[error("No USB-CLCD1602 device found")]
    NotFound,

    /// Operation attempted without a live handle, or the handle became
    /// invalid mid-operation.
    #[error("Device not connected")]
    NotConnected,

    /// The handle was live but the device failed to answer.
    #[error("Device did not respond")]
    NotRespond,

    // Glue errors (audio mixer, host stats)
    #[error("Audio mixer error: {0}")]
    Audio(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl ClcdError {
    /// Returns true if the error means the connection is gone and the
    /// supervisor should close the handle and reopen.
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::NotConnected | Self::NotRespond)
    }

    /// Returns true if the error is recoverable by plugging in or
    /// selecting the right device.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotFound => Some("Ensure the USB-CLCD1602 is connected via USB"),
            Self::NotConnected => Some("Reconnect the device and retry"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using ClcdError.
pub type Result<T> = std::result::Result<T, ClcdError>;
