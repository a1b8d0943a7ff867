//! Stream button, stick and orientation changes from the first controller.
//!
//! Usage: cargo run --example stream
//! Press Enter to recalibrate, Ctrl+C to stop.

use joycon_motion::{EstimatorConfig, SessionEvent, StreamConfig};
use std::time::{Duration, Instant};

fn main() {
    env_logger::init();

    let device = match joycon_motion::Device::open_first() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Failed to open controller: {}", e);
            std::process::exit(1);
        }
    };

    let info = device.info().clone();
    println!("Kind:      {:?}", info.kind);
    println!("Transport: {:?}", info.transport);
    println!("Serial:    {}", info.serial.as_deref().unwrap_or("-"));
    println!();

    let stream = match device.start_stream(0, EstimatorConfig::from_env(), StreamConfig::from_env())
    {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to start stream: {}", e);
            std::process::exit(1);
        }
    };

    // Enter on stdin recalibrates.
    let (enter_tx, enter_rx) = crossbeam_channel::unbounded::<()>();
    std::thread::spawn(move || {
        let mut line = String::new();
        loop {
            line.clear();
            match std::io::stdin().read_line(&mut line) {
                // EOF: stdin closed, stop listening.
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if enter_tx.send(()).is_err() {
                        break;
                    }
                }
            }
        }
    });

    println!("Streaming (Enter to calibrate, Ctrl+C to stop)...");

    let start = Instant::now();
    let mut count: u64 = 0;
    let mut last_report = Instant::now();

    loop {
        if enter_rx.try_recv().is_ok() {
            if let Err(e) = stream.calibrate() {
                eprintln!("Calibrate failed: {}", e);
            }
        }

        match stream.recv_timeout(Duration::from_secs(2)) {
            Ok(event) => {
                count += 1;
                match event {
                    SessionEvent::ButtonChanged(b) => println!("buttons: {:?}", b),
                    SessionEvent::AnalogChanged(s) => {
                        let n = s.normalized();
                        println!(
                            "sticks: L=[{:+.2}, {:+.2}] R=[{:+.2}, {:+.2}]",
                            n[0], n[1], n[2], n[3]
                        );
                    }
                    SessionEvent::ImuChanged(_) => {}
                    SessionEvent::OrientationChanged(q) => {
                        // Print every ~30th update to avoid flooding the terminal
                        if count % 30 == 1 {
                            let e = q.to_euler_deg();
                            println!(
                                "euler: roll={:+7.1} pitch={:+7.1} yaw={:+7.1}",
                                e[0], e[1], e[2]
                            );
                        }
                    }
                }

                let now = Instant::now();
                if now.duration_since(last_report) >= Duration::from_secs(5) {
                    let elapsed = start.elapsed().as_secs_f64();
                    println!(
                        "--- {} events in {:.1}s ({:.1}/s) ---",
                        count,
                        elapsed,
                        count as f64 / elapsed
                    );
                    last_report = now;
                }
            }
            Err(joycon_motion::JoyconError::Timeout) => {
                println!("(no data for 2s)");
            }
            Err(e) => {
                eprintln!("Stream error: {}", e);
                break;
            }
        }
    }

    stream.stop();
}
