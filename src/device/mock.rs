//! Mock backend for unit testing without hardware.
//!
//! Records every written report and serves scripted read outcomes, so
//! tests can drive the client and the supervisor through connect,
//! input, and failure scenarios.
//!
//! # Example
//!
//! ```rust,ignore
//! use clcd::device::mock::MockBackend;
//! use clcd::device::Clcd;
//!
//! let backend = MockBackend::device();
//! let state = backend.state();
//! let mut clcd = Clcd::new(backend);
//!
//! clcd.open(None).unwrap();
//! clcd.set_backlight(true).unwrap();
//!
//! assert_eq!(state.payloads()[0][0], 0x03);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::trace;

use super::{report, Backend, Transport, TransportError};

/// Scripted outcome for one read call.
#[derive(Debug, Clone)]
pub enum ReadStep {
    /// A full 8-byte input report.
    Report([u8; report::INPUT_REPORT_LEN]),
    /// Fewer bytes than a full report.
    Short(Vec<u8>),
    /// Timeout with no data.
    Timeout,
    /// Transport failure.
    Error(TransportError),
}

/// Shared observable state between a [`MockBackend`], the transports
/// it hands out, and the test.
#[derive(Debug, Default)]
pub struct MockState {
    writes: Mutex<Vec<Vec<u8>>>,
    reads: Mutex<VecDeque<ReadStep>>,
    fail_write_at: Mutex<Option<(usize, TransportError)>>,
    open_attempts: Mutex<usize>,
    opens: Mutex<usize>,
    closes: Mutex<usize>,
}

impl MockState {
    /// All written buffers, including the leading report-ID byte,
    /// failed attempts included.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    /// Written reports with the report-ID byte stripped.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.writes()
            .into_iter()
            .map(|w| w[1..].to_vec())
            .collect()
    }

    /// Queue a full input report.
    pub fn queue_input(&self, button: bool, delta: i8) {
        let mut buf = [0u8; report::INPUT_REPORT_LEN];
        buf[0] = u8::from(button);
        #[allow(clippy::cast_sign_loss)] // two's-complement wire encoding
        {
            buf[1] = delta as u8;
        }
        self.reads.lock().unwrap().push_back(ReadStep::Report(buf));
    }

    /// Queue a read timeout (no data).
    pub fn queue_timeout(&self) {
        self.reads.lock().unwrap().push_back(ReadStep::Timeout);
    }

    /// Queue a short read of `len` zero bytes.
    pub fn queue_short(&self, len: usize) {
        self.reads
            .lock()
            .unwrap()
            .push_back(ReadStep::Short(vec![0; len]));
    }

    /// Queue a read-side transport failure.
    pub fn queue_read_error(&self, err: TransportError) {
        self.reads.lock().unwrap().push_back(ReadStep::Error(err));
    }

    /// Make the `n`th write overall (1-based) fail with `err`.
    /// Reads past the end of every script default to a timeout and
    /// writes default to success, so long-running loops stay serviced.
    pub fn fail_write_at(&self, n: usize, err: TransportError) {
        *self.fail_write_at.lock().unwrap() = Some((n, err));
    }

    /// Number of `Backend::open` calls, failed ones included.
    pub fn open_attempts(&self) -> usize {
        *self.open_attempts.lock().unwrap()
    }

    /// Number of successfully opened transports.
    pub fn opens(&self) -> usize {
        *self.opens.lock().unwrap()
    }

    /// Number of transports dropped (handle closed).
    pub fn closes(&self) -> usize {
        *self.closes.lock().unwrap()
    }
}

/// Mock device backend.
pub struct MockBackend {
    state: Arc<MockState>,
    product: String,
    serial: Option<String>,
    fail_opens: usize,
}

impl MockBackend {
    /// Backend presenting a well-behaved USB-CLCD1602.
    pub fn device() -> Self {
        Self {
            state: Arc::new(MockState::default()),
            product: report::PRODUCT_NAME.to_string(),
            serial: Some("MOCK-001".to_string()),
            fail_opens: 0,
        }
    }

    /// Present a different product string (validation failure path).
    #[must_use]
    pub fn with_product(mut self, product: &str) -> Self {
        self.product = product.to_string();
        self
    }

    /// Present a specific serial string, or none.
    #[must_use]
    pub fn with_serial(mut self, serial: Option<&str>) -> Self {
        self.serial = serial.map(str::to_string);
        self
    }

    /// Fail the first `n` open attempts (device absent).
    #[must_use]
    pub fn fail_first_opens(mut self, n: usize) -> Self {
        self.fail_opens = n;
        self
    }

    /// Shared observable state for assertions.
    pub fn state(&self) -> Arc<MockState> {
        Arc::clone(&self.state)
    }
}

impl Backend for MockBackend {
    type Handle = MockTransport;

    fn open(
        &mut self,
        _vid: u16,
        _pid: u16,
        serial: Option<&str>,
    ) -> std::result::Result<Self::Handle, TransportError> {
        *self.state.open_attempts.lock().unwrap() += 1;
        if self.fail_opens > 0 {
            self.fail_opens -= 1;
            return Err(TransportError::Io("no device".to_string()));
        }
        if let (Some(want), Some(have)) = (serial, self.serial.as_deref()) {
            if want != have {
                return Err(TransportError::Io("serial mismatch".to_string()));
            }
        }
        *self.state.opens.lock().unwrap() += 1;
        trace!("Mock device opened");
        Ok(MockTransport {
            state: Arc::clone(&self.state),
            product: self.product.clone(),
            serial: self.serial.clone(),
        })
    }
}

/// One open mock transport. Dropping it counts as a close.
pub struct MockTransport {
    state: Arc<MockState>,
    product: String,
    serial: Option<String>,
}

impl Transport for MockTransport {
    fn write(&mut self, buf: &[u8]) -> std::result::Result<(), TransportError> {
        let mut writes = self.state.writes.lock().unwrap();
        writes.push(buf.to_vec());
        let index = writes.len();
        drop(writes);

        let mut fail = self.state.fail_write_at.lock().unwrap();
        let due = fail.as_ref().is_some_and(|(n, _)| *n == index);
        if due {
            let (_, err) = fail.take().unwrap();
            return Err(err);
        }
        Ok(())
    }

    fn read(
        &mut self,
        buf: &mut [u8],
        _timeout_ms: i32,
    ) -> std::result::Result<usize, TransportError> {
        let step = self.state.reads.lock().unwrap().pop_front();
        match step {
            Some(ReadStep::Report(data)) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            Some(ReadStep::Short(data)) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            Some(ReadStep::Timeout) | None => Ok(0),
            Some(ReadStep::Error(err)) => Err(err),
        }
    }

    fn product_string(&self) -> Option<String> {
        Some(self.product.clone())
    }

    fn serial_string(&self) -> Option<String> {
        self.serial.clone()
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        *self.state.closes.lock().unwrap() += 1;
    }
}
