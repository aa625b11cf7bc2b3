//! Queue-backed event sink adapter.
//!
//! The ticker thread and the console thread emit events while holding the
//! station lock; this sink only enqueues them into a static `embassy-sync`
//! channel so slow consumers (UART logging, a display) never run under the
//! lock.  The main loop drains the queue.
//!
//! ```text
//! ┌──────────────┐  AppEvent   ┌──────────────┐
//! │ Ticker/Facade│───────────▶│  Main Loop   │
//! │ (under lock) │  try_send   │  (drain)     │
//! └──────────────┘             └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Depth of the event queue.  One tick produces at most three events.
const EVENT_DEPTH: usize = 16;

/// Outbound event channel: control paths → main loop.
pub static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, AppEvent, EVENT_DEPTH> = Channel::new();

/// Adapter that enqueues every [`AppEvent`] on a bounded channel.
#[derive(Clone, Copy)]
pub struct ChannelEventSink {
    channel: &'static Channel<CriticalSectionRawMutex, AppEvent, EVENT_DEPTH>,
}

impl ChannelEventSink {
    /// Sink feeding the global [`EVENT_CHANNEL`].
    pub fn new() -> Self {
        Self::on(&EVENT_CHANNEL)
    }

    /// Sink feeding a caller-owned channel.
    pub fn on(channel: &'static Channel<CriticalSectionRawMutex, AppEvent, EVENT_DEPTH>) -> Self {
        Self { channel }
    }

    /// Pass every queued event to `f`, oldest first.  Returns the count.
    pub fn drain(&self, mut f: impl FnMut(AppEvent)) -> usize {
        let mut n = 0;
        while let Ok(event) = self.channel.try_receive() {
            f(event);
            n += 1;
        }
        n
    }
}

impl Default for ChannelEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&mut self, event: &AppEvent) {
        if self.channel.try_send(event.clone()).is_err() {
            warn!("Event queue full, dropping {:?}", event);
        }
    }
}
