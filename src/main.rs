//! # UMB Poller
//!
//! Poll measurement channels from a UMB device over RS-485 and report the
//! readings.
//!
//! ```bash
//! umb-poller config/default.toml
//! ```
//!
//! Expected output:
//! ```text
//! INFO umb_poller: UMB Poller v0.1.0 starting...
//! INFO umb_poller::serial: Opened UMB bus at /dev/ttyUSB0 (19200 baud)
//! INFO umb_poller: Polling 3 channels from 0x7001 (class 7, id 1) every 10000 ms
//! INFO umb_poller::poller: device 1 class 7 channel 100: 21.4 (Float)
//! ```

use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use umb_poller::config::{Config, LoggingConfig};
use umb_poller::poller::{PollReport, Poller};
use umb_poller::serial::UmbSerial;
use umb_poller::umb::address::Address;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Time for a device to answer the ASCII switch command before binary polling starts
const BINARY_SWITCH_SETTLE_MS: u64 = 500;

/// Main entry point for UMB Poller
///
/// 1. Load configuration and set up logging
/// 2. Open the serial port and optionally switch the device to binary mode
/// 3. Poll all configured channels on the configured interval, reopening the
///    port after serial failures
/// 4. Stop on Ctrl+C
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path(std::env::args());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging);

    info!("UMB Poller v{} starting...", env!("CARGO_PKG_VERSION"));

    let target = Address::new(config.device.id, config.device.class);
    let serial = UmbSerial::open(&config.serial)?;
    let mut poller = Poller::new(serial, target, config.poll.channels.clone());

    if config.device.switch_to_binary {
        poller.switch_to_binary().await?;
        sleep(Duration::from_millis(BINARY_SWITCH_SETTLE_MS)).await;
    }

    info!(
        "Polling {} channels from {} every {} ms",
        config.poll.channels.len(),
        target,
        config.poll.interval_ms
    );
    info!("Press Ctrl+C to exit");

    let mut poll_interval = interval(Duration::from_millis(config.poll.interval_ms));
    poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut cycles: u64 = 0;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = poll_interval.tick() => {}
            _ = &mut shutdown => break,
        }

        let Some(mut report) = poll_or_shutdown(&mut poller, shutdown.as_mut()).await else {
            break;
        };

        let serial_error = report.serial_error.take();
        report.emit(config.output.format)?;
        cycles += 1;

        if let Some(e) = serial_error {
            warn!("Poll cycle failed: {}", e);
            sleep(Duration::from_millis(config.serial.reconnect_interval_ms)).await;

            match UmbSerial::open(&config.serial) {
                Ok(serial) => {
                    poller = Poller::new(serial, target, config.poll.channels.clone());
                }
                Err(e) => warn!("Reconnect failed: {}", e),
            }
        }
    }

    info!("Received Ctrl+C, shutting down...");
    info!("Completed poll cycles: {}", cycles);

    Ok(())
}

/// Run one poll cycle unless `shutdown` completes first
///
/// A cycle over many timed-out frames can take several seconds.
async fn poll_or_shutdown<S: Future>(
    poller: &mut Poller,
    shutdown: Pin<&mut S>,
) -> Option<PollReport> {
    tokio::select! {
        report = poller.poll() => Some(report),
        _ = shutdown => None,
    }
}

/// Configuration path from the first command line argument
fn config_path(mut args: impl Iterator<Item = String>) -> String {
    args.nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// Log filter from `RUST_LOG`, `info` when unset or invalid
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the `tracing` subscriber, to stderr or to daily log files
///
/// The returned guard flushes the file writer on drop and must live as
/// long as `main`.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = env_filter();

    match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "umb-poller.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}
