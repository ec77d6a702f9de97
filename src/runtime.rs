use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::network::ConnectionInfo;
use crate::session::SessionId;
use crate::source::SourceEvent;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum TrackEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    Source(SourceEvent),
    /// Stats refresh for the given session
    StatsTick(SessionId),
    Network(ConnectionInfo),
}

/// Source of app events. Producers (terminal, timers, sample sources) push
/// into the channel behind `sender`; the loop drains it one event at a time.
pub trait TrackEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<TrackEvent, RecvTimeoutError>;
    fn sender(&self) -> Sender<TrackEvent>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<TrackEvent>,
    rx: Receiver<TrackEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let terminal_tx = tx.clone();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) => terminal_tx.send(TrackEvent::Key(key)),
                Ok(CtEvent::Resize(_, _)) => terminal_tx.send(TrackEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { tx, rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TrackEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<TrackEvent> {
        self.tx.clone()
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-only event source for headless runs and tests
pub struct TestEventSource {
    tx: Sender<TrackEvent>,
    rx: Receiver<TrackEvent>,
}

impl TestEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }
}

impl Default for TestEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TrackEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<TrackEvent> {
        self.tx.clone()
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: TrackEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: TrackEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    pub fn sender(&self) -> Sender<TrackEvent> {
        self.event_source.sender()
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> TrackEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => TrackEvent::Tick,
        }
    }
}
