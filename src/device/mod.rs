//! Device abstraction layer for the USB-CLCD1602.
//!
//! This module provides a trait-based abstraction over the real hidapi
//! transport and a mock implementation, enabling testability without
//! hardware, plus the stateful protocol client built on top of it.

mod hid;
pub mod mock;
pub mod report;

pub use hid::{HidBackend, HidTransport};

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

use crate::error::{ClcdError, Result};

/// Default blocking-read timeout for input reports, in milliseconds.
pub const READ_TIMEOUT_MS: i32 = 30;

/// Settle time the HD44780 controller needs after "Clear Display".
const CLEAR_WAIT: Duration = Duration::from_millis(10);

/// Transport-level failure, pre-classified for the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Handle or parameters invalid at the HID layer. The client drops
    /// the handle and reports `NotConnected`.
    #[error("invalid HID handle: {0}")]
    Invalid(String),
    /// The device stopped answering (unplug mid-transfer, stall,
    /// broken pipe). The client reports `NotRespond` without closing.
    #[error("HID I/O failure: {0}")]
    Io(String),
}

/// Raw fixed-size report read/write over an open HID connection.
///
/// `write` takes the full buffer including the leading report-ID byte;
/// `read` returns the number of bytes placed in `buf`, with `Ok(0)`
/// meaning the timeout elapsed with nothing to read.
pub trait Transport {
    fn write(&mut self, buf: &[u8]) -> std::result::Result<(), TransportError>;
    fn read(&mut self, buf: &mut [u8], timeout_ms: i32) -> std::result::Result<usize, TransportError>;
    fn product_string(&self) -> Option<String>;
    fn serial_string(&self) -> Option<String>;
}

/// Opens transports by vendor/product/serial triple.
pub trait Backend {
    type Handle: Transport;

    /// Open a matching device. Any failure here means "no usable
    /// device"; the client maps it to [`ClcdError::NotFound`].
    fn open(
        &mut self,
        vid: u16,
        pid: u16,
        serial: Option<&str>,
    ) -> std::result::Result<Self::Handle, TransportError>;
}

/// Identity of the currently attached device, cached at open time.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceIdentity {
    /// Product string reported by the device.
    pub product: String,
    /// Serial number string, if the device reports one.
    pub serial: Option<String>,
}

struct Connection<T> {
    handle: T,
    identity: DeviceIdentity,
}

/// Stateful protocol client for the USB-CLCD1602.
///
/// Owns at most one live transport handle. All operations that need a
/// handle fail with [`ClcdError::NotConnected`] when none is present;
/// the supervisor interprets that (and [`ClcdError::NotRespond`]) as
/// "tear down and reopen". The client itself never retries.
pub struct Clcd<B: Backend> {
    backend: B,
    conn: Option<Connection<B::Handle>>,
    prev_button: bool,
    prev_delta: i8,
}

impl<B: Backend> Clcd<B> {
    /// Create a client over the given backend, not yet connected.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            conn: None,
            prev_button: false,
            prev_delta: 0,
        }
    }

    /// Open a device matching the fixed VID/PID, optionally narrowed
    /// to one serial number, and validate its product string.
    ///
    /// On a product-string mismatch the freshly opened handle is
    /// dropped before returning, so no partial-open state survives.
    pub fn open(&mut self, serial: Option<&str>) -> Result<()> {
        self.prev_button = false;
        self.prev_delta = 0;

        let handle = self
            .backend
            .open(report::VENDOR_ID, report::PRODUCT_ID, serial)
            .map_err(|e| {
                trace!(error = ?e, "HID open failed");
                ClcdError::NotFound
            })?;

        let product = handle.product_string().unwrap_or_default();
        if product != report::PRODUCT_NAME {
            debug!(%product, expected = report::PRODUCT_NAME, "Product string mismatch");
            drop(handle);
            return Err(ClcdError::NotFound);
        }

        let identity = DeviceIdentity {
            serial: handle.serial_string(),
            product,
        };
        debug!(serial = ?identity.serial, "Device opened");
        self.conn = Some(Connection { handle, identity });
        Ok(())
    }

    /// Release the transport handle if present. Idempotent.
    pub fn close(&mut self) {
        if self.conn.take().is_some() {
            debug!("Device closed");
        }
    }

    /// Whether a transport handle is currently held.
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Cached product name and serial of the attached device.
    pub fn get_product_serial(&self) -> Result<DeviceIdentity> {
        self.conn
            .as_ref()
            .map(|c| c.identity.clone())
            .ok_or(ClcdError::NotConnected)
    }

    /// Send one HD44780 command byte to the controller.
    pub fn send_command(&mut self, code: u8) -> Result<()> {
        self.send(&report::command(code))
    }

    /// Print text at the current cursor position.
    ///
    /// At most 32 characters are transferred; the rest is silently
    /// dropped. Characters outside the device's single-byte charset
    /// (ASCII + half-width katakana) are sent as their low byte and
    /// render device-dependently.
    pub fn print(&mut self, text: &str) -> Result<()> {
        self.send(&report::text(text))
    }

    /// Move the cursor. Row and column wrap into the 2x16 geometry,
    /// negative values included.
    pub fn set_cursor(&mut self, row: i32, col: i32) -> Result<()> {
        self.send_command(report::ddram_address(row, col))
    }

    /// Switch the backlight on or off.
    pub fn set_backlight(&mut self, enabled: bool) -> Result<()> {
        self.send(&report::backlight(enabled))
    }

    /// Clear the display and home the cursor.
    ///
    /// Blocks for the controller's execution time (≥10 ms) before
    /// returning.
    pub fn clear(&mut self) -> Result<()> {
        self.send_command(report::CMD_CLEAR)?;
        std::thread::sleep(CLEAR_WAIT);
        Ok(())
    }

    /// Poll the push button and rotary encoder.
    ///
    /// Blocks up to [`READ_TIMEOUT_MS`]. A timeout or short read is a
    /// routine "nothing happened" signal: the previous button state is
    /// returned with a delta of 0 and the cached state is left alone.
    /// A full 8-byte report is decoded (byte 1 as signed) and cached.
    pub fn get_inputs(&mut self) -> Result<(bool, i8)> {
        let conn = self.conn.as_mut().ok_or(ClcdError::NotConnected)?;
        let mut buf = [0u8; report::INPUT_REPORT_LEN];
        let outcome = conn.handle.read(&mut buf, READ_TIMEOUT_MS);
        let n = match outcome {
            Ok(n) => n,
            Err(TransportError::Invalid(msg)) => {
                debug!(%msg, "Read on invalid handle");
                self.conn = None;
                return Err(ClcdError::NotConnected);
            }
            Err(TransportError::Io(msg)) => {
                debug!(%msg, "Read failed");
                return Err(ClcdError::NotRespond);
            }
        };

        if n != report::INPUT_REPORT_LEN {
            return Ok((self.prev_button, 0));
        }

        let (button, delta) = report::decode_input(&buf);
        self.prev_button = button;
        self.prev_delta = delta;
        Ok((button, delta))
    }

    /// Last decoded input state, the fallback source for short reads.
    pub fn last_inputs(&self) -> (bool, i8) {
        (self.prev_button, self.prev_delta)
    }

    /// Switch the device into bootloader mode for firmware updates.
    ///
    /// The device drops off the bus before acknowledging this write,
    /// so any transport error from it is swallowed.
    pub fn reset_bootloader(&mut self) -> Result<()> {
        if !self.is_open() {
            return Err(ClcdError::NotConnected);
        }
        let _ = self.send(&report::bootloader());
        Ok(())
    }

    /// Write one 64-byte report, prepending the transport's report-ID
    /// byte and classifying failures per the error taxonomy.
    fn send(&mut self, payload: &[u8; report::REPORT_LEN]) -> Result<()> {
        let conn = self.conn.as_mut().ok_or(ClcdError::NotConnected)?;
        let mut buf = [0u8; report::REPORT_LEN + 1];
        buf[1..].copy_from_slice(payload);
        let outcome = conn.handle.write(&buf);
        match outcome {
            Ok(()) => Ok(()),
            Err(TransportError::Invalid(msg)) => {
                debug!(%msg, "Write on invalid handle");
                self.conn = None;
                Err(ClcdError::NotConnected)
            }
            Err(TransportError::Io(msg)) => {
                debug!(%msg, "Write failed");
                Err(ClcdError::NotRespond)
            }
        }
    }
}
