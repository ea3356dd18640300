//! zg-run: run a zg guest module without a window.
//!
//! GL calls go to a recording headless driver; sockets are real WebSocket
//! connections. A summary of the recorded driver activity is printed when
//! the guest exits or the frame budget runs out.
//!
//! # Usage
//!
//! ```bash
//! # Run 120 frames of a guest
//! zg-run app.wasm --frames 120
//!
//! # Run until the guest calls wasm_quit, with a config file
//! zg-run app.wasm --frames 0 --config zg.toml -v
//! ```

use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;
use zg_core::BridgeConfig;
use zg_gl::HeadlessDriver;
use zg_net::WsTransport;
use zg_wasm_engine::{BridgeInstance, BridgeRuntime, RunState};

/// Run a zg guest module headlessly.
#[derive(Parser, Debug)]
#[command(name = "zg-run")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the guest module (.wasm or .wat)
    #[arg(value_name = "MODULE")]
    module: PathBuf,

    /// Number of frames to run; 0 runs until the guest exits
    #[arg(short, long, default_value = "60")]
    frames: u64,

    /// Export called once before the first frame
    #[arg(long, default_value = "app_init")]
    init: String,

    /// Export called once per frame
    #[arg(long, default_value = "app_update")]
    frame: String,

    /// Delay between frames in milliseconds
    #[arg(long, default_value = "16")]
    frame_interval_ms: u64,

    /// Bridge configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Drawing buffer width reported to the guest
    #[arg(long, default_value = "640")]
    width: u32,

    /// Drawing buffer height reported to the guest
    #[arg(long, default_value = "480")]
    height: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    let config = match &args.config {
        Some(path) => match BridgeConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config {}: {}", path.display(), e);
                process::exit(1);
            }
        },
        None => BridgeConfig::default(),
    };

    info!("Loading module: {}", args.module.display());
    let wasm = match std::fs::read(&args.module) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to read {}: {}", args.module.display(), e);
            process::exit(1);
        }
    };

    let runtime = match BridgeRuntime::new(config) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create runtime: {}", e);
            process::exit(1);
        }
    };
    let transport = Box::new(WsTransport::new(&runtime.config().socket));
    let driver = HeadlessDriver::new(args.width, args.height);
    let mut guest = match runtime.load(&wasm, driver, transport) {
        Ok(guest) => guest,
        Err(e) => {
            error!("Failed to instantiate module: {}", e);
            process::exit(1);
        }
    };

    let frames = run(&mut guest, &args);
    summarize(&guest, frames);
    guest.teardown();
}

/// Call the init export, then the frame export until the budget runs out or
/// the guest exits. Returns the number of completed frames.
fn run(guest: &mut BridgeInstance<HeadlessDriver>, args: &Args) -> u64 {
    if guest.has_export(&args.init) {
        match guest.call(&args.init) {
            Ok(RunState::Running) => {}
            Ok(RunState::Exited) => return 0,
            Err(e) => {
                error!("{} failed: {}", args.init, e);
                process::exit(1);
            }
        }
    } else {
        warn!("Module has no {} export, skipping init", args.init);
    }

    let interval = Duration::from_millis(args.frame_interval_ms);
    let mut frames = 0;
    while args.frames == 0 || frames < args.frames {
        if guest.pump_events() == RunState::Exited {
            break;
        }
        match guest.call(&args.frame) {
            Ok(RunState::Running) => frames += 1,
            Ok(RunState::Exited) => break,
            Err(e) => {
                error!("{} failed in frame {}: {}", args.frame, frames, e);
                process::exit(1);
            }
        }
        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }
    frames
}

fn summarize(guest: &BridgeInstance<HeadlessDriver>, frames: u64) {
    let bridge = guest.bridge();
    let driver = bridge.gl.driver();
    let stats = guest.router_stats();

    info!("Frames: {}", frames);
    info!("Driver calls: {}", driver.call_count());
    info!("Draw calls: {}", driver.draw_calls());
    info!("Live GPU objects: {}", driver.live_objects());
    info!("Live socket sessions: {}", bridge.sockets.live());
    info!(
        "Host events: {} delivered, {} dropped",
        stats.delivered, stats.dropped
    );
}
