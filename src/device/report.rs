//! Stateless HID report encoding/decoding for the USB-CLCD1602.
//!
//! Every outgoing report is a fixed 64-byte buffer tagged in its first
//! byte (or, for character data, in every even byte). The transport
//! layer prepends one report-ID byte that is not counted here. The
//! input report is a fixed 8 bytes: button state, then the encoder
//! delta as a two's-complement signed byte.

/// USB vendor ID of the USB-CLCD1602.
pub const VENDOR_ID: u16 = 0xF055;
/// USB product ID of the USB-CLCD1602.
pub const PRODUCT_ID: u16 = 0x6584;
/// Product string the connected device must report.
pub const PRODUCT_NAME: &str = "USB-CLCD1602";

/// Display rows.
pub const ROWS: i32 = 2;
/// Display columns.
pub const COLS: i32 = 16;
/// Maximum characters carried by one character-data report.
pub const MAX_TEXT: usize = 32;

/// Logical size of every outgoing report.
pub const REPORT_LEN: usize = 64;
/// Size of the input report.
pub const INPUT_REPORT_LEN: usize = 8;

/// Report tag: character data (even slots), char code in odd slots.
pub const TAG_CHAR: u8 = 0x01;
/// Report tag: generic HD44780 command.
pub const TAG_COMMAND: u8 = 0x02;
/// Report tag: backlight control.
pub const TAG_BACKLIGHT: u8 = 0x03;
/// Report tag: switch to bootloader mode.
pub const TAG_BOOTLOADER: u8 = 0xAA;
/// Payload byte accompanying the bootloader tag.
pub const BOOTLOADER_MAGIC: u8 = 0xFF;

/// HD44780 "Clear Display" command code.
pub const CMD_CLEAR: u8 = 0x01;

/// Encode a generic command report: tag, command code, rest zero.
pub fn command(code: u8) -> [u8; REPORT_LEN] {
    let mut buf = [0u8; REPORT_LEN];
    buf[0] = TAG_COMMAND;
    buf[1] = code;
    buf
}

/// Encode a character-data report.
///
/// Text is truncated to the first [`MAX_TEXT`] characters; each
/// character occupies a tag/code slot pair and unused pairs stay zero.
/// Only the low byte of each code point is sent; the device charset is
/// ASCII plus half-width katakana, anything else is device-dependent.
pub fn text(text: &str) -> [u8; REPORT_LEN] {
    let mut buf = [0u8; REPORT_LEN];
    for (i, ch) in text.chars().take(MAX_TEXT).enumerate() {
        buf[i * 2] = TAG_CHAR;
        #[allow(clippy::cast_possible_truncation)] // low byte per device charset
        {
            buf[i * 2 + 1] = u32::from(ch) as u8;
        }
    }
    buf
}

/// Encode a backlight control report.
pub fn backlight(enabled: bool) -> [u8; REPORT_LEN] {
    let mut buf = [0u8; REPORT_LEN];
    buf[0] = TAG_BACKLIGHT;
    buf[1] = u8::from(enabled);
    buf
}

/// Encode the bootloader mode-switch report.
pub fn bootloader() -> [u8; REPORT_LEN] {
    let mut buf = [0u8; REPORT_LEN];
    buf[0] = TAG_BOOTLOADER;
    buf[1] = BOOTLOADER_MAGIC;
    buf
}

/// HD44780 DDRAM address for a row/column position.
///
/// Row and column wrap into the 2x16 geometry; negative inputs wrap
/// too (`rem_euclid`), so the result is always a valid address.
pub fn ddram_address(row: i32, col: i32) -> u8 {
    let row = row.rem_euclid(ROWS);
    let col = col.rem_euclid(COLS);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // bounded above
    {
        (0x80 + 0x40 * row + col) as u8
    }
}

/// Decode an input report into (button pressed, encoder delta).
#[allow(clippy::cast_possible_wrap)] // two's-complement reinterpretation is the format
pub fn decode_input(buf: &[u8; INPUT_REPORT_LEN]) -> (bool, i8) {
    (buf[0] != 0, buf[1] as i8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_report_layout() {
        let buf = command(0x01);
        assert_eq!(buf[0], TAG_COMMAND);
        assert_eq!(buf[1], 0x01);
        assert!(buf[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_text_report_pairs() {
        let buf = text("Hi");
        assert_eq!(&buf[..4], &[TAG_CHAR, b'H', TAG_CHAR, b'i']);
        assert!(buf[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_text_truncated_to_32_chars() {
        let long: String = "x".repeat(40);
        let exact: String = "x".repeat(32);
        assert_eq!(text(&long), text(&exact));
        // All 32 pairs used, nothing beyond
        let buf = text(&long);
        assert_eq!(buf[62], TAG_CHAR);
        assert_eq!(buf[63], b'x');
    }

    #[test]
    fn test_text_empty_is_all_zero() {
        assert_eq!(text(""), [0u8; REPORT_LEN]);
    }

    #[test]
    fn test_ddram_address_basics() {
        assert_eq!(ddram_address(0, 0), 0x80);
        assert_eq!(ddram_address(1, 0), 0xC0);
        assert_eq!(ddram_address(0, 15), 0x8F);
        assert_eq!(ddram_address(1, 9), 0xC9);
    }

    #[test]
    fn test_ddram_address_wraps() {
        assert_eq!(ddram_address(2, 16), ddram_address(0, 0));
        assert_eq!(ddram_address(3, 17), ddram_address(1, 1));
    }

    #[test]
    fn test_ddram_address_negative_inputs_wrap() {
        // rem_euclid: -1 mod 2 = 1, -1 mod 16 = 15
        assert_eq!(ddram_address(-1, -1), ddram_address(1, 15));
        assert_eq!(ddram_address(-2, -16), ddram_address(0, 0));
    }

    #[test]
    fn test_backlight_payload() {
        assert_eq!(backlight(true)[..2], [TAG_BACKLIGHT, 0x01]);
        assert_eq!(backlight(false)[..2], [TAG_BACKLIGHT, 0x00]);
    }

    #[test]
    fn test_bootloader_magic() {
        assert_eq!(bootloader()[..2], [TAG_BOOTLOADER, BOOTLOADER_MAGIC]);
    }

    #[test]
    fn test_decode_input_signed_delta() {
        assert_eq!(decode_input(&[0, 0xFF, 0, 0, 0, 0, 0, 0]), (false, -1));
        assert_eq!(decode_input(&[1, 0x7F, 0, 0, 0, 0, 0, 0]), (true, 127));
        assert_eq!(decode_input(&[0, 0x80, 0, 0, 0, 0, 0, 0]), (false, -128));
        assert_eq!(decode_input(&[2, 0x03, 0, 0, 0, 0, 0, 0]), (true, 3));
    }
}
