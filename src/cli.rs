//! CLI argument definitions.

use clap::{Parser, Subcommand};

/// USB-CLCD1602 host driver: clock/volume applet plus one-shot
/// display and input commands.
#[derive(Parser, Debug)]
#[command(name = "clcd-volume", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Target device by serial number (when multiple units are attached)
    #[arg(long, short = 's', global = true, env = "CLCD_SERIAL")]
    pub serial: Option<String>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the clock/volume applet (default)
    Run,
    /// Print text at a display position
    Print(PrintArgs),
    /// Move the cursor without printing
    Cursor(CursorArgs),
    /// Clear the display
    Clear,
    /// Switch the backlight on or off
    Backlight(BacklightArgs),
    /// Read the button and encoder once (or continuously)
    Inputs(InputsArgs),
    /// Show the connected device's identity
    Info(InfoArgs),
    /// Switch the device into bootloader mode for firmware updates
    Bootloader,
}

#[derive(clap::Args, Debug)]
pub struct PrintArgs {
    /// Text to display (truncated to 32 characters)
    pub text: String,

    /// Row (wraps modulo 2)
    #[arg(long, short = 'r', default_value_t = 0)]
    pub row: i32,

    /// Column (wraps modulo 16)
    #[arg(long, short = 'c', default_value_t = 0)]
    pub col: i32,
}

#[derive(clap::Args, Debug)]
pub struct CursorArgs {
    /// Row (wraps modulo 2)
    #[arg(allow_negative_numbers = true)]
    pub row: i32,

    /// Column (wraps modulo 16)
    #[arg(allow_negative_numbers = true)]
    pub col: i32,
}

#[derive(clap::Args, Debug)]
pub struct BacklightArgs {
    /// Desired state
    #[arg(value_parser = ["on", "off"])]
    pub state: String,
}

#[derive(clap::Args, Debug)]
pub struct InputsArgs {
    /// Keep polling until interrupted
    #[arg(long, short = 'w')]
    pub watch: bool,

    /// Emit JSON lines instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct InfoArgs {
    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}
