//! Host driver and polling loop for the USB-CLCD1602, a USB HID 16x2
//! character LCD with an integrated rotary encoder and push button.
//!
//! # Modules
//!
//! - `device`: transport abstraction, report codec, and the stateful
//!   protocol client
//! - `supervisor`: reconnect/polling state machine
//! - `host`: audio-mixer and CPU-load seams consumed by the redraw
//! - `error`: closed error taxonomy the supervisor branches on
#![forbid(unsafe_code)]

pub mod cli;
pub mod device;
pub mod error;
pub mod host;
pub mod logging;
pub mod supervisor;
