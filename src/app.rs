use std::time::Duration;

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;
use tracing::{info, warn};

use crate::error::TrackerError;
use crate::network::{NetworkMonitor, NetworkPoller};
use crate::render::Viewport;
use crate::runtime::TrackEvent;
use crate::stats::{LiveStats, WorkoutSummary};
use crate::tracker::{SampleUpdate, Tracker};

pub const TOAST_DURATION: Duration = Duration::from_secs(3);

pub const SAVED_MESSAGE: &str = "Data saved offline. Will sync when online.";
pub const STARTED_MESSAGE: &str = "Tracking started!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Error,
}

/// Short-lived message in the corner of the route view.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    shown_at: DateTime<Utc>,
}

impl Toast {
    pub fn info(message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Info,
            shown_at: now,
        }
    }

    pub fn error(message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Error,
            shown_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        (now - self.shown_at)
            .to_std()
            .is_ok_and(|shown_for| shown_for >= TOAST_DURATION)
    }
}

pub struct App {
    pub tracker: Tracker,
    pub network: NetworkMonitor,
    poller: Option<NetworkPoller>,
    pub stats: LiveStats,
    pub last_summary: Option<WorkoutSummary>,
    pub toast: Option<Toast>,
    /// Blocking message, dismissed with Enter or Esc.
    pub notice: Option<String>,
    /// Last transient source problem, cleared by the next good sample.
    pub source_status: Option<String>,
    pub fit_to_route: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            tracker,
            network: NetworkMonitor::new(),
            poller: None,
            stats: LiveStats::default(),
            last_summary: None,
            toast: None,
            notice: None,
            source_status: None,
            fit_to_route: false,
            should_quit: false,
        }
    }

    pub fn with_network_poller(mut self, poller: NetworkPoller) -> Self {
        self.poller = Some(poller);
        self
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_tracking()
    }

    /// The canvas now covers `canvas` cells.
    pub fn resize(&mut self, canvas: Rect) {
        self.tracker
            .resize(Viewport::from_cells(canvas.width, canvas.height));
    }

    /// Apply one event. Returns true when the screen needs a redraw.
    pub fn handle_event(&mut self, event: TrackEvent, now: DateTime<Utc>) -> bool {
        match event {
            TrackEvent::Key(key) => {
                self.on_key(key, now);
                true
            }
            TrackEvent::Resize => true,
            TrackEvent::Tick => self.expire_toast(now),
            TrackEvent::Source(ev) => match self.tracker.on_source_event(ev) {
                SampleUpdate::Recorded(_) => {
                    self.source_status = None;
                    self.stats = self.tracker.live_stats(now);
                    true
                }
                SampleUpdate::Skipped(e) => {
                    self.source_status = Some(e.to_string());
                    true
                }
                SampleUpdate::Ignored => false,
            },
            TrackEvent::StatsTick(id) => {
                if !self.tracker.is_tracking() || self.tracker.session().id != id {
                    return false;
                }
                self.stats = self.tracker.live_stats(now);
                true
            }
            TrackEvent::Network(info) => self.network.update(info),
        }
    }

    fn on_key(&mut self, key: KeyEvent, now: DateTime<Utc>) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit(now);
            return;
        }

        if self.notice.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.notice = None;
            }
            return;
        }

        match key.code {
            KeyCode::Char('s') => self.start(now),
            KeyCode::Char('x') | KeyCode::Char(' ') => self.stop(now),
            KeyCode::Char('f') => self.fit_to_route = !self.fit_to_route,
            KeyCode::Char('n') => self.recheck_network(),
            KeyCode::Char('q') | KeyCode::Esc => self.quit(now),
            _ => {}
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        match self.tracker.start(now) {
            Ok(_) => {
                self.stats = self.tracker.live_stats(now);
                self.last_summary = None;
                self.source_status = None;
                self.toast = Some(Toast::info(STARTED_MESSAGE, now));
            }
            // start control is disabled while tracking
            Err(TrackerError::AlreadyTracking) => {}
            Err(TrackerError::Source(e)) if e.is_transient() => {
                warn!("start failed, retry possible: {e}");
                self.toast = Some(Toast::error(e.to_string(), now));
            }
            Err(TrackerError::Source(e)) => {
                warn!("cannot start tracking: {e}");
                self.notice = Some(format!("Unable to access location.\n{e}"));
            }
        }
    }

    pub fn stop(&mut self, now: DateTime<Utc>) {
        let Some(outcome) = self.tracker.stop(now) else {
            return;
        };
        self.stats = self.tracker.live_stats(now);
        self.toast = Some(match &outcome.saved {
            Ok(_) => Toast::info(SAVED_MESSAGE, now),
            Err(e) => Toast::error(format!("Could not save workout: {e}"), now),
        });
        self.last_summary = Some(outcome.summary);
    }

    pub fn recheck_network(&self) {
        if let Some(poller) = &self.poller {
            poller.notify();
        }
    }

    fn quit(&mut self, now: DateTime<Utc>) {
        if self.tracker.is_tracking() {
            info!("quitting with an active session; saving it first");
            self.stop(now);
        }
        self.should_quit = true;
    }

    fn expire_toast(&mut self, now: DateTime<Utc>) -> bool {
        match &self.toast {
            Some(toast) if toast.is_expired(now) => {
                self.toast = None;
                true
            }
            _ => false,
        }
    }
}
