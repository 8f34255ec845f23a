//! Real hidapi-backed transport implementation.

use hidapi::{HidApi, HidDevice, HidError};
use tracing::trace;

use super::{Backend, Transport, TransportError};

/// Backend over a shared [`HidApi`] context.
///
/// hidapi keeps process-global state, so the context is created once
/// and the device list is refreshed before each open attempt (the
/// supervisor reopens in a loop while the device is unplugged).
pub struct HidBackend {
    api: HidApi,
}

impl HidBackend {
    /// Initialize the hidapi context.
    pub fn new() -> std::result::Result<Self, TransportError> {
        let api = HidApi::new().map_err(classify)?;
        Ok(Self { api })
    }
}

impl Backend for HidBackend {
    type Handle = HidTransport;

    fn open(
        &mut self,
        vid: u16,
        pid: u16,
        serial: Option<&str>,
    ) -> std::result::Result<Self::Handle, TransportError> {
        self.api.refresh_devices().map_err(classify)?;
        let device = match serial {
            Some(sn) => self.api.open_serial(vid, pid, sn),
            None => self.api.open(vid, pid),
        }
        .map_err(classify)?;
        trace!("HID device opened: {vid:04x}:{pid:04x}");
        Ok(HidTransport { device })
    }
}

/// One open hidapi device handle.
pub struct HidTransport {
    device: HidDevice,
}

impl Transport for HidTransport {
    fn write(&mut self, buf: &[u8]) -> std::result::Result<(), TransportError> {
        let written = self.device.write(buf).map_err(classify)?;
        if written != buf.len() {
            return Err(TransportError::Io(format!(
                "short write: {written} of {} bytes",
                buf.len()
            )));
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: i32) -> std::result::Result<usize, TransportError> {
        self.device.read_timeout(buf, timeout_ms).map_err(classify)
    }

    fn product_string(&self) -> Option<String> {
        self.device.get_product_string().ok().flatten()
    }

    fn serial_string(&self) -> Option<String> {
        self.device.get_serial_number_string().ok().flatten()
    }
}

/// Split hidapi failures into the two kinds the client cares about:
/// an unusable handle/parameter versus the device not answering.
fn classify(err: HidError) -> TransportError {
    match err {
        HidError::InitializationError | HidError::InvalidZeroSizeData => {
            TransportError::Invalid(err.to_string())
        }
        other => TransportError::Io(other.to_string()),
    }
}
