//! Demonstration of the gaze stream session lifecycle.
//!
//! Replays a simulated device so the demo runs without eye-tracking
//! hardware, then shows the scoped-session usage and, on Windows, the
//! active-window coordinate mapping.
//!
//! Run with: cargo run --example stream_demo

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gaze_stream_client::{
    GazePoint, SimulatedEngine, StreamSession, WindowMapper, VERSION,
};

fn main() {
    println!("Gaze Stream Client - Demo");
    println!("=========================");
    println!("Version: {VERSION}");
    println!();

    // A two-second circular sweep at 60 Hz.
    let script: Vec<GazePoint> = (0..120)
        .map(|i| {
            let angle = i as f32 / 120.0 * std::f32::consts::TAU;
            GazePoint::valid(
                i as i64 * 16_667,
                0.5 + 0.3 * angle.cos(),
                0.5 + 0.3 * angle.sin(),
            )
        })
        .collect();

    let engine = SimulatedEngine::with_script(script).with_cadence(Duration::from_millis(16));

    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = delivered.clone();
    let mut session = StreamSession::with_callback(Box::new(engine), move |point| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        if n < 5 || n % 30 == 0 {
            println!(
                "  sample {:>3}: {:>8} us  ({:.3}, {:.3})",
                n, point.timestamp_us, point.x, point.y
            );
        }
    });

    println!("Streaming for 3 seconds...");
    {
        let stream = session.stream().expect("simulated device is always discoverable");
        std::thread::sleep(Duration::from_secs(3));
        drop(stream); // unsubscribes and drains the queue
    }

    println!();
    println!("Latest sample: {:?}", session.latest_gaze_point());
    println!("{}", session.stats().summary());
    println!();

    // Coordinate mapping only works on Windows, from the thread that owns
    // the active window.
    let mut mapper = WindowMapper::new();
    match mapper.init_window() {
        Ok(()) => {
            if let Some(point) = session.latest_gaze_point() {
                match mapper.map_to_window(point.x, point.y) {
                    Ok((x, y)) => println!("Latest gaze in window pixels: ({x}, {y})"),
                    Err(e) => println!("Could not map gaze to window: {e}"),
                }
            }
        }
        Err(e) => println!("Window mapping unavailable here: {e}"),
    }

    println!();
    println!("Demo complete!");
}
