//! Integration tests for the device client against the mock backend.
//!
//! Covers connection lifecycle and validation, report encoding as seen
//! on the wire, input decoding with the short-read fallback, and the
//! error classification that drives the supervisor.

use std::time::{Duration, Instant};

use clcd::device::mock::MockBackend;
use clcd::device::{report, Clcd, TransportError};
use clcd::error::ClcdError;

#[test]
fn open_caches_product_and_serial() {
    let backend = MockBackend::device();
    let mut clcd = Clcd::new(backend);

    clcd.open(None).unwrap();
    assert!(clcd.is_open());

    let identity = clcd.get_product_serial().unwrap();
    assert_eq!(identity.product, report::PRODUCT_NAME);
    assert_eq!(identity.serial.as_deref(), Some("MOCK-001"));
}

#[test]
fn open_rejects_product_name_mismatch() {
    let backend = MockBackend::device().with_product("SOME-OTHER-HID");
    let state = backend.state();
    let mut clcd = Clcd::new(backend);

    let err = clcd.open(None).unwrap_err();
    assert!(matches!(err, ClcdError::NotFound));
    assert!(!clcd.is_open());
    // The freshly opened handle must be released before returning
    assert_eq!(state.opens(), 1);
    assert_eq!(state.closes(), 1);
}

#[test]
fn open_with_wrong_serial_is_not_found() {
    let backend = MockBackend::device().with_serial(Some("UNIT-A"));
    let mut clcd = Clcd::new(backend);

    let err = clcd.open(Some("UNIT-B")).unwrap_err();
    assert!(matches!(err, ClcdError::NotFound));
    assert!(!clcd.is_open());
}

#[test]
fn close_is_idempotent() {
    let backend = MockBackend::device();
    let state = backend.state();
    let mut clcd = Clcd::new(backend);

    clcd.open(None).unwrap();
    clcd.close();
    clcd.close();
    assert!(!clcd.is_open());
    assert_eq!(state.closes(), 1);
}

#[test]
fn operations_without_handle_fail_without_touching_transport() {
    let backend = MockBackend::device();
    let state = backend.state();
    let mut clcd = Clcd::new(backend);

    assert!(matches!(
        clcd.send_command(0x01),
        Err(ClcdError::NotConnected)
    ));
    assert!(matches!(clcd.print("hi"), Err(ClcdError::NotConnected)));
    assert!(matches!(clcd.get_inputs(), Err(ClcdError::NotConnected)));
    assert!(matches!(
        clcd.get_product_serial(),
        Err(ClcdError::NotConnected)
    ));
    assert!(matches!(
        clcd.reset_bootloader(),
        Err(ClcdError::NotConnected)
    ));
    assert!(state.writes().is_empty());
    assert_eq!(state.open_attempts(), 0);
}

#[test]
fn print_encodes_char_pairs_and_truncates() {
    let backend = MockBackend::device();
    let state = backend.state();
    let mut clcd = Clcd::new(backend);
    clcd.open(None).unwrap();

    clcd.print("Vol  50").unwrap();
    let long: String = "a".repeat(40);
    clcd.print(&long).unwrap();

    let payloads = state.payloads();
    assert_eq!(payloads[0], report::text("Vol  50").to_vec());
    // Over-long text produces the same report as its 32-char prefix
    assert_eq!(payloads[1], report::text(&"a".repeat(32)).to_vec());
}

#[test]
fn set_cursor_wraps_row_and_column() {
    let backend = MockBackend::device();
    let state = backend.state();
    let mut clcd = Clcd::new(backend);
    clcd.open(None).unwrap();

    clcd.set_cursor(0, 0).unwrap();
    clcd.set_cursor(2, 16).unwrap();
    clcd.set_cursor(1, 9).unwrap();
    clcd.set_cursor(-1, -1).unwrap();

    let payloads = state.payloads();
    assert_eq!(payloads[0], report::command(0x80).to_vec());
    // row 2 -> 0, col 16 -> 0
    assert_eq!(payloads[1], report::command(0x80).to_vec());
    assert_eq!(payloads[2], report::command(0xC9).to_vec());
    // rem_euclid: row -1 -> 1, col -1 -> 15
    assert_eq!(payloads[3], report::command(0xCF).to_vec());
}

#[test]
fn backlight_and_bootloader_reports() {
    let backend = MockBackend::device();
    let state = backend.state();
    let mut clcd = Clcd::new(backend);
    clcd.open(None).unwrap();

    clcd.set_backlight(true).unwrap();
    clcd.set_backlight(false).unwrap();
    clcd.reset_bootloader().unwrap();

    let payloads = state.payloads();
    assert_eq!(payloads[0], report::backlight(true).to_vec());
    assert_eq!(payloads[1], report::backlight(false).to_vec());
    assert_eq!(payloads[2], report::bootloader().to_vec());
}

#[test]
fn clear_sends_command_and_waits() {
    let backend = MockBackend::device();
    let state = backend.state();
    let mut clcd = Clcd::new(backend);
    clcd.open(None).unwrap();

    let start = Instant::now();
    clcd.clear().unwrap();
    assert!(start.elapsed() >= Duration::from_millis(10));
    assert_eq!(state.payloads()[0], report::command(0x01).to_vec());
}

#[test]
fn writes_carry_leading_report_id_byte() {
    let backend = MockBackend::device();
    let state = backend.state();
    let mut clcd = Clcd::new(backend);
    clcd.open(None).unwrap();

    clcd.send_command(0x01).unwrap();
    let writes = state.writes();
    assert_eq!(writes[0].len(), report::REPORT_LEN + 1);
    assert_eq!(writes[0][0], 0x00);
}

#[test]
fn get_inputs_decodes_signed_delta_and_caches() {
    let backend = MockBackend::device();
    let state = backend.state();
    let mut clcd = Clcd::new(backend);
    clcd.open(None).unwrap();

    state.queue_input(true, -1);
    assert_eq!(clcd.get_inputs().unwrap(), (true, -1));

    state.queue_input(false, 127);
    assert_eq!(clcd.get_inputs().unwrap(), (false, 127));
}

#[test]
fn get_inputs_falls_back_on_timeout_and_short_read() {
    let backend = MockBackend::device();
    let state = backend.state();
    let mut clcd = Clcd::new(backend);
    clcd.open(None).unwrap();

    state.queue_input(true, 2);
    assert_eq!(clcd.get_inputs().unwrap(), (true, 2));

    // Timeout: previous button, zero delta, no error
    state.queue_timeout();
    assert_eq!(clcd.get_inputs().unwrap(), (true, 0));

    // Short read behaves the same
    state.queue_short(4);
    assert_eq!(clcd.get_inputs().unwrap(), (true, 0));

    // Cached state was not clobbered by the fallbacks
    assert_eq!(clcd.last_inputs(), (true, 2));
    state.queue_timeout();
    assert_eq!(clcd.get_inputs().unwrap(), (true, 0));
}

#[test]
fn invalid_write_closes_handle_and_reports_not_connected() {
    let backend = MockBackend::device();
    let state = backend.state();
    let mut clcd = Clcd::new(backend);
    clcd.open(None).unwrap();

    state.fail_write_at(1, TransportError::Invalid("handle closed".to_string()));
    let err = clcd.send_command(0x01).unwrap_err();
    assert!(matches!(err, ClcdError::NotConnected));
    assert!(!clcd.is_open());
    assert_eq!(state.closes(), 1);
}

#[test]
fn io_write_failure_reports_not_respond_without_closing() {
    let backend = MockBackend::device();
    let state = backend.state();
    let mut clcd = Clcd::new(backend);
    clcd.open(None).unwrap();

    state.fail_write_at(1, TransportError::Io("broken pipe".to_string()));
    let err = clcd.send_command(0x01).unwrap_err();
    assert!(matches!(err, ClcdError::NotRespond));
    // Caller (the supervisor) decides whether to close
    assert!(clcd.is_open());
    assert_eq!(state.closes(), 0);
}

#[test]
fn read_failures_classify_like_writes() {
    let backend = MockBackend::device();
    let state = backend.state();
    let mut clcd = Clcd::new(backend);
    clcd.open(None).unwrap();

    state.queue_read_error(TransportError::Io("stall".to_string()));
    assert!(matches!(clcd.get_inputs(), Err(ClcdError::NotRespond)));
    assert!(clcd.is_open());

    state.queue_read_error(TransportError::Invalid("handle closed".to_string()));
    assert!(matches!(clcd.get_inputs(), Err(ClcdError::NotConnected)));
    assert!(!clcd.is_open());
}

#[test]
fn reset_bootloader_swallows_transport_errors() {
    let backend = MockBackend::device();
    let state = backend.state();
    let mut clcd = Clcd::new(backend);
    clcd.open(None).unwrap();

    state.fail_write_at(1, TransportError::Io("device gone".to_string()));
    clcd.reset_bootloader().unwrap();
    assert_eq!(state.payloads()[0], report::bootloader().to_vec());
}

#[test]
fn open_resets_cached_input_state() {
    let backend = MockBackend::device();
    let state = backend.state();
    let mut clcd = Clcd::new(backend);

    clcd.open(None).unwrap();
    state.queue_input(true, 5);
    assert_eq!(clcd.get_inputs().unwrap(), (true, 5));

    clcd.close();
    clcd.open(None).unwrap();

    // Fresh connection starts from "button released"
    state.queue_timeout();
    assert_eq!(clcd.get_inputs().unwrap(), (false, 0));
}
