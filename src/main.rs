//! WashStation Firmware — Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  RelayBank        MonotonicClock   NvsAdapter   ChannelSink    │
//! │  (ActuatorPort)   (ClockPort)      (Config)     (EventSink)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │           ControlFacade (metering core)                │    │
//! │  │  MeteringSession · SessionSupervisor (meter-tick)      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Console thread (JSON commands) · Main loop (events, telemetry)│
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufRead;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use esp_idf_hal::gpio::{OutputPin, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use log::{info, warn};
use washstation::adapters::channel_sink::ChannelEventSink;
use washstation::adapters::hardware::RelayBank;
use washstation::adapters::log_sink::LogEventSink;
use washstation::adapters::nvs::NvsAdapter;
use washstation::adapters::time::MonotonicClock;
use washstation::app::catalog::StaticCatalog;
use washstation::app::commands::{AppCommand, CommandReply};
use washstation::app::ports::{ConfigPort, EventSink};
use washstation::config::StationConfig;
use washstation::drivers::relay::RelayDriver;
use washstation::drivers::task_pin::{self, Core};
use washstation::{ControlFacade, pins};

/// Main loop period: event drain latency.
const LOOP_PERIOD: Duration = Duration::from_millis(100);

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  WashStation v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let config = match NvsAdapter::new() {
        Ok(nvs) => nvs.load().unwrap_or_else(|e| {
            warn!("NVS config load failed ({}), using defaults", e);
            StationConfig::default()
        }),
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults", e);
            StationConfig::default()
        }
    };

    // ── 3. Relays (released before anything else runs) ────────
    // GPIO numbers must match pins::RELAY_GPIOS.
    let peripherals = Peripherals::take()?;
    let relay1 = PinDriver::output(peripherals.pins.gpio17.downgrade_output())?;
    let relay2 = PinDriver::output(peripherals.pins.gpio18.downgrade_output())?;
    let relays = RelayBank::new([
        RelayDriver::new(relay1, pins::RELAY1_GPIO)
            .map_err(|e| anyhow::anyhow!("relay GPIO{} init: {e:?}", pins::RELAY1_GPIO))?,
        RelayDriver::new(relay2, pins::RELAY2_GPIO)
            .map_err(|e| anyhow::anyhow!("relay GPIO{} init: {e:?}", pins::RELAY2_GPIO))?,
    ]);

    // ── 4. Controller ─────────────────────────────────────────
    let events = ChannelEventSink::new();
    let facade = Arc::new(ControlFacade::new(
        &config,
        relays,
        MonotonicClock::new(),
        StaticCatalog::from_config(&config),
        events,
    ));

    // ── 5. Serial console: one JSON command per line ──────────
    let console = Arc::clone(&facade);
    task_pin::spawn_on_core(Core::Pro, 5, 8, "console\0", move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            let out = match AppCommand::parse(&line) {
                Ok(cmd) => CommandReply::from_result(&console.handle_command(cmd)).to_line(),
                Err(e) => CommandReply::bad_command(&e).to_line(),
            };
            println!("{out}");
        }
        warn!("Console input closed");
    })?;

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    let mut log_sink = LogEventSink::new();
    let telemetry_every = Duration::from_secs(u64::from(config.telemetry_interval_secs));
    let mut last_telemetry = Instant::now();

    loop {
        std::thread::sleep(LOOP_PERIOD);

        events.drain(|event| log_sink.emit(&event));

        if last_telemetry.elapsed() >= telemetry_every {
            facade.emit_telemetry();
            last_telemetry = Instant::now();
        }
    }
}
