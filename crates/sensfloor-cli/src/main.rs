//! `sensfloor` – run a sensor floor from the command line.
//!
//! 1. Loads `~/.sensfloor/config.toml` (or `--config`), writing the default
//!    configuration on first run.
//! 2. Opens the serial port, or replays a raw capture with `--replay`.
//! 3. Prints a blob report every `--interval` milliseconds, as text or as
//!    newline-delimited JSON (`--json`).
//! 4. Stops the worker cleanly on Ctrl-C.

mod config;
mod replay;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use colored::Colorize;
use sensfloor_hal::SerialLink;
use sensfloor_runtime::{ConnectionState, SensorFloor, init_tracing};
use sensfloor_types::{Endpoint, FloorConfig, FloorError};
use tracing::{error, info, warn};

use crate::replay::ReplayLink;
use crate::report::BlobReport;

const USAGE: &str = "\
usage: sensfloor [options]

  --config PATH     configuration file (default ~/.sensfloor/config.toml)
  --port NAME|N     serial device name, or index into the device list
  --replay FILE     play a raw byte capture instead of opening a port
  --loop            restart the capture when it ends
  --interval MS     report interval in milliseconds (default 500)
  --json            print reports as newline-delimited JSON
  --list            list serial devices and exit
  -h, --help        show this help";

// ─────────────────────────────────────────────────────────────────────────────
// Arguments
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    port: Option<Endpoint>,
    replay: Option<PathBuf>,
    looping: bool,
    interval: Duration,
    json: bool,
    list: bool,
    help: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: None,
            port: None,
            replay: None,
            looping: false,
            interval: Duration::from_millis(500),
            json: false,
            list: false,
            help: false,
        }
    }
}

impl Args {
    fn parse(mut argv: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut args = Args::default();
        while let Some(arg) = argv.next() {
            let mut value = |name: &str| argv.next().ok_or_else(|| format!("{name} needs a value"));
            match arg.as_str() {
                "--config" => args.config = Some(PathBuf::from(value("--config")?)),
                "--port" => args.port = Some(config::parse_endpoint(&value("--port")?)),
                "--replay" => args.replay = Some(PathBuf::from(value("--replay")?)),
                "--loop" => args.looping = true,
                "--interval" => {
                    let raw = value("--interval")?;
                    let ms: u64 = raw
                        .parse()
                        .map_err(|_| format!("--interval expects milliseconds, got {raw:?}"))?;
                    args.interval = Duration::from_millis(ms.max(1));
                }
                "--json" => args.json = true,
                "--list" => args.list = true,
                "-h" | "--help" => args.help = true,
                other => return Err(format!("unknown argument {other:?}")),
            }
        }
        Ok(args)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry point
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}: {e}\n\n{USAGE}", "error".red().bold());
            return ExitCode::from(2);
        }
    };
    if args.help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let guard = init_tracing("sensfloor");
    if guard.is_exporting() {
        info!("exporting spans over OTLP");
    }
    if !args.json {
        print_banner();
    }
    if args.list {
        list_devices();
        return ExitCode::SUCCESS;
    }

    let path = args.config.clone().unwrap_or_else(config::config_path);
    let mut cfg = load_or_init(&path);
    if let Some(port) = args.port.clone() {
        cfg.port = port;
    }

    let mut floor = match SensorFloor::configure(cfg) {
        Ok(floor) => floor,
        Err(e) => {
            error!(error = %e, "invalid floor configuration");
            return ExitCode::from(configure_exit_status(&e));
        }
    };
    let link = match open_link(&args) {
        Ok(link) => link,
        Err(msg) => {
            eprintln!("{}: {msg}", "error".red().bold());
            return ExitCode::FAILURE;
        }
    };

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown_flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; stop with SIGKILL");
    }

    if let Err(e) = floor.start(link) {
        error!(error = %e, "cannot start worker");
        return ExitCode::FAILURE;
    }
    info!(
        tiles = floor.tile_count(),
        endpoint = %floor.config().port,
        "sensor floor running"
    );

    let failed = run_reports(&floor, &args, &shutdown);

    if shutdown.load(Ordering::SeqCst) && !args.json {
        println!();
        println!("{}", "  Ctrl-C received – stopping the floor …".yellow().bold());
    }
    floor.stop();
    if failed {
        eprintln!("{}", "  ✗ Could not connect to the transceiver.".red().bold());
        ExitCode::FAILURE
    } else {
        if !args.json {
            println!("{}", "  ✓ Stopped.".green());
        }
        ExitCode::SUCCESS
    }
}

/// Print reports until Ctrl-C or a terminal connection failure.  Returns
/// `true` on failure.
fn run_reports(floor: &SensorFloor, args: &Args, shutdown: &AtomicBool) -> bool {
    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(args.interval);
        let report = BlobReport::capture(floor);
        if args.json {
            match serde_json::to_string(&report) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "report not serialisable"),
            }
        } else {
            println!("  {}", report.to_text());
        }
        if floor.connection_state() == ConnectionState::Failed {
            return true;
        }
    }
    false
}

/// Layout and config faults exit with 2, like bad arguments.
fn configure_exit_status(e: &FloorError) -> u8 {
    if e.is_configuration() { 2 } else { 1 }
}

fn load_or_init(path: &std::path::Path) -> FloorConfig {
    match config::load(path) {
        Ok(Some(cfg)) => {
            info!(path = %path.display(), "config loaded");
            cfg
        }
        Ok(None) => {
            let mut cfg = FloorConfig::default();
            match config::save_to(&cfg, path) {
                Ok(()) => info!(path = %path.display(), "default config written"),
                Err(e) => error!(error = %e, "default config not saved"),
            }
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            error!(error = %e, "config unreadable, using defaults");
            let mut cfg = FloorConfig::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

fn open_link(args: &Args) -> Result<Box<dyn SerialLink>, String> {
    if let Some(path) = &args.replay {
        return Ok(Box::new(ReplayLink::new(path.clone(), args.looping)));
    }
    serial_link()
}

#[cfg(feature = "serial")]
fn serial_link() -> Result<Box<dyn SerialLink>, String> {
    Ok(Box::new(sensfloor_hal::SerialPortLink::new()))
}

#[cfg(not(feature = "serial"))]
fn serial_link() -> Result<Box<dyn SerialLink>, String> {
    Err("built without serial support; use --replay FILE".to_string())
}

fn list_devices() {
    match serial_link() {
        Ok(link) => {
            let devices = link.list_endpoints();
            if devices.is_empty() {
                println!("  No serial devices found.");
            }
            for (i, name) in devices.iter().enumerate() {
                println!("  {} {}", format!("#{i}").dimmed(), name.bold());
            }
        }
        Err(msg) => println!("  {msg}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ___               ___ _              "#.bold().cyan());
    println!("{}", r#"  / __| ___ _ _  ___| __| |___  ___ _ _ "#.bold().cyan());
    println!("{}", r#"  \__ \/ -_) ' \(_-<| _|| / _ \/ _ \ '_|"#.bold().cyan());
    println!("{}", r#"  |___/\___|_||_/__/|_| |_\___/\___/_|  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "sensfloor".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Capacitive floor sensing: frames in, blobs out");
    println!();
}
