//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | status={:?} | service={} | balance={:.0} | remaining={:.0}s | \
                     uptime={}s | fault={}",
                    t.status,
                    t.service.as_deref().unwrap_or("-"),
                    t.balance,
                    t.remaining_secs,
                    t.uptime_secs,
                    t.fault.map_or("none".into(), |f| f.to_string()),
                );
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::RunStarted {
                service,
                channel,
                rate_per_minute,
            } => {
                info!("RUN   | start {} relay={} rate={:.2}/min", service, channel, rate_per_minute);
            }
            AppEvent::RunEnded {
                service,
                billed_secs,
                reason,
            } => {
                info!("RUN   | end {} billed={:.1}s reason={:?}", service, billed_secs, reason);
            }
            AppEvent::BalanceUpdated {
                balance,
                remaining_secs,
            } => {
                info!("BILL  | balance={:.2} remaining={:.0}s", balance, remaining_secs);
            }
            AppEvent::BalanceAdded { amount, balance } => {
                info!("BILL  | +{:.2} -> {:.2}", amount, balance);
            }
            AppEvent::FaultDetected(fault) => {
                warn!("FAULT | {}", fault);
            }
            AppEvent::Started(status) => {
                info!("START | initial_status={:?}", status);
            }
        }
    }
}
