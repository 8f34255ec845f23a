//! clcd-volume - clock/volume applet and CLI for the USB-CLCD1602.
#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info};

use clcd::cli::{BacklightArgs, Cli, Commands, CursorArgs, InfoArgs, InputsArgs, PrintArgs};
use clcd::device::{Clcd, HidBackend};
use clcd::error::{ClcdError, Result};
use clcd::host::{ProcStat, SoftMixer};
use clcd::logging::init_logging;
use clcd::supervisor::{Supervisor, UiEvent};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = run(&cli);

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        if let Some(hint) = e.suggestion() {
            eprintln!("hint: {hint}");
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        None | Some(Commands::Run) => cmd_run(cli),
        Some(Commands::Print(args)) => cmd_print(cli, args),
        Some(Commands::Cursor(args)) => cmd_cursor(cli, args),
        Some(Commands::Clear) => cmd_clear(cli),
        Some(Commands::Backlight(args)) => cmd_backlight(cli, args),
        Some(Commands::Inputs(args)) => cmd_inputs(cli, args),
        Some(Commands::Info(args)) => cmd_info(cli, args),
        Some(Commands::Bootloader) => cmd_bootloader(cli),
    }
}

// === Applet ===

fn cmd_run(cli: &Cli) -> Result<()> {
    let backend = HidBackend::new().map_err(|e| ClcdError::Other(e.to_string()))?;
    let exit = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();

    let supervisor = Supervisor::new(
        Clcd::new(backend),
        SoftMixer::default(),
        ProcStat::new(),
        tx,
        Arc::clone(&exit),
    )
    .with_serial(cli.serial.clone());

    let worker = thread::spawn(move || supervisor.run());

    // Stand-in for a tray icon: surface connection transitions.
    let ui = thread::spawn(move || {
        for event in rx {
            match event {
                UiEvent::Connected { product, serial } => {
                    info!(%product, serial = ?serial, "Connected");
                }
                UiEvent::Disconnected => info!("Disconnected"),
            }
        }
    });

    wait_for_ctrl_c()?;
    info!("Shutting down");
    exit.store(true, Ordering::Relaxed);

    worker
        .join()
        .map_err(|_| ClcdError::Other("device worker panicked".to_string()))?;
    ui.join()
        .map_err(|_| ClcdError::Other("UI thread panicked".to_string()))?;
    Ok(())
}

fn wait_for_ctrl_c() -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(tokio::signal::ctrl_c())?;
    Ok(())
}

// === One-shot commands ===

fn open_client(cli: &Cli) -> Result<Clcd<HidBackend>> {
    let backend = HidBackend::new().map_err(|e| ClcdError::Other(e.to_string()))?;
    let mut clcd = Clcd::new(backend);
    clcd.open(cli.serial.as_deref())?;
    Ok(clcd)
}

fn cmd_print(cli: &Cli, args: &PrintArgs) -> Result<()> {
    let mut clcd = open_client(cli)?;
    clcd.set_cursor(args.row, args.col)?;
    clcd.print(&args.text)?;
    clcd.close();
    Ok(())
}

fn cmd_cursor(cli: &Cli, args: &CursorArgs) -> Result<()> {
    let mut clcd = open_client(cli)?;
    clcd.set_cursor(args.row, args.col)?;
    clcd.close();
    Ok(())
}

fn cmd_clear(cli: &Cli) -> Result<()> {
    let mut clcd = open_client(cli)?;
    clcd.clear()?;
    clcd.close();
    Ok(())
}

fn cmd_backlight(cli: &Cli, args: &BacklightArgs) -> Result<()> {
    let mut clcd = open_client(cli)?;
    clcd.set_backlight(args.state == "on")?;
    clcd.close();
    Ok(())
}

#[derive(Serialize)]
struct InputSample {
    button: bool,
    delta: i8,
}

fn cmd_inputs(cli: &Cli, args: &InputsArgs) -> Result<()> {
    let mut clcd = open_client(cli)?;
    let mut prev_button = false;
    loop {
        let (button, delta) = clcd.get_inputs()?;
        if !args.watch || delta != 0 || button != prev_button {
            let sample = InputSample { button, delta };
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string(&sample).unwrap_or_default()
                );
            } else {
                println!("button={button} delta={delta}");
            }
        }
        if !args.watch {
            break;
        }
        prev_button = button;
    }
    clcd.close();
    Ok(())
}

fn cmd_info(cli: &Cli, args: &InfoArgs) -> Result<()> {
    let mut clcd = open_client(cli)?;
    let identity = clcd.get_product_serial()?;
    if args.json {
        println!(
            "{}",
            serde_json::to_string(&identity).unwrap_or_default()
        );
    } else {
        println!("product: {}", identity.product);
        println!("serial:  {}", identity.serial.as_deref().unwrap_or("-"));
    }
    clcd.close();
    Ok(())
}

fn cmd_bootloader(cli: &Cli) -> Result<()> {
    let mut clcd = open_client(cli)?;
    info!("Switching device to bootloader mode");
    clcd.reset_bootloader()?;
    clcd.close();
    Ok(())
}
