//! Gaze stream CLI.
//!
//! Streams gaze samples from an eye tracker (or a simulated device) to
//! stdout, enumerates attached devices, and shows the persisted
//! configuration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use gaze_stream_client::{
    Config, GazeEngine, GazeError, GazePoint, SessionConfig, SimulatedEngine, StreamSession,
    VERSION,
};

#[cfg(feature = "tobii")]
use gaze_stream_client::TobiiEngine;

#[derive(Parser)]
#[command(name = "gaze-stream")]
#[command(version = VERSION)]
#[command(about = "Stream gaze samples from an eye tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List attached compatible devices
    Devices {
        /// Probe the simulated device instead of real hardware
        #[arg(long)]
        simulate: bool,
    },

    /// Stream gaze samples to stdout
    Stream {
        /// Device URL (first discovered device when omitted)
        #[arg(long)]
        device: Option<String>,

        /// Stop after this many seconds (Ctrl+C always stops)
        #[arg(long)]
        duration: Option<u64>,

        /// Replay a simulated device instead of real hardware
        #[arg(long)]
        simulate: bool,
    },

    /// Show configuration
    Config,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices { simulate } => cmd_devices(simulate),
        Commands::Stream {
            device,
            duration,
            simulate,
        } => cmd_stream(device, duration, simulate),
        Commands::Config => cmd_config(),
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn cmd_devices(simulate: bool) {
    let mut engine = match build_engine(None, simulate) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match engine.device_urls() {
        Ok(urls) if urls.is_empty() => {
            println!("No stream engine compatible device(s) found.");
        }
        Ok(urls) => {
            for url in urls {
                println!("{url}");
            }
        }
        Err(e) => {
            eprintln!("Error enumerating devices: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_stream(device: Option<String>, duration: Option<u64>, simulate: bool) {
    let config = Config::load().unwrap_or_default();
    let device_url = device.or_else(|| config.device_url.clone());

    let engine = match build_engine(device_url, simulate) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!("gaze-stream v{VERSION}");
    println!("Press Ctrl+C to stop");
    println!();

    let mut session = StreamSession::with_config(
        engine,
        Some(Box::new(|point: GazePoint| {
            if point.valid {
                println!(
                    "{:>12} us  ({:.4}, {:.4})",
                    point.timestamp_us, point.x, point.y
                );
            } else {
                println!("{:>12} us  (no eye detected)", point.timestamp_us);
            }
        })),
        SessionConfig {
            queue_capacity: config.queue_capacity,
        },
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    let stream = match session.stream() {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Error starting stream: {e}");
            std::process::exit(1);
        }
    };

    let started = Instant::now();
    while running.load(Ordering::SeqCst) {
        if let Some(secs) = duration {
            if started.elapsed() >= Duration::from_secs(secs) {
                break;
            }
        }
        thread::sleep(Duration::from_millis(50));
    }

    println!();
    println!("Stopping stream...");
    drop(stream);
    println!("{}", session.stats().summary());
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Pick the engine backend for this invocation.
fn build_engine(
    device_url: Option<String>,
    simulate: bool,
) -> Result<Box<dyn GazeEngine>, GazeError> {
    if simulate {
        return Ok(Box::new(simulated_sweep()));
    }

    #[cfg(feature = "tobii")]
    {
        let engine = TobiiEngine::with_preferred_url(device_url)?;
        Ok(Box::new(engine))
    }

    #[cfg(not(feature = "tobii"))]
    {
        let _ = device_url;
        Err(GazeError::EngineFault(
            "built without the tobii feature; rebuild with --features tobii or pass --simulate"
                .to_string(),
        ))
    }
}

/// Five seconds of a left-to-right sweep with a sine-wave vertical, at 60 Hz.
fn simulated_sweep() -> SimulatedEngine {
    let script = (0..300)
        .map(|i| {
            let t = i as f32 / 299.0;
            let y = 0.5 + 0.4 * (t * std::f32::consts::TAU).sin();
            GazePoint::valid(i as i64 * 16_667, t, y)
        })
        .collect();
    SimulatedEngine::with_script(script).with_cadence(Duration::from_millis(16))
}
