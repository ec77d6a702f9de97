use std::sync::mpsc::Sender;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{SourceError, StoreError, TrackerError};
use crate::render::Viewport;
use crate::runtime::TrackEvent;
use crate::session::{RecordOutcome, Session, SessionId};
use crate::source::{SampleSource, SourceEvent, SourcePayload, Subscription};
use crate::stats::{live_stats, summarize, LiveStats, WorkoutSummary};
use crate::store::WorkoutStore;
use crate::timer::Interval;

/// Result of feeding one source event to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleUpdate {
    Recorded(RecordOutcome),
    /// Transient source failure; nothing recorded for this tick.
    Skipped(SourceError),
    /// Not tracking, or produced for a session that is no longer current.
    Ignored,
}

#[derive(Debug)]
pub struct StopOutcome {
    pub summary: WorkoutSummary,
    pub saved: Result<usize, StoreError>,
}

/// Owns the session and everything that feeds it: the sample source
/// subscription, the stats refresh timer and the workout log.
pub struct Tracker {
    session: Session,
    source: Box<dyn SampleSource>,
    store: Box<dyn WorkoutStore>,
    events: Sender<TrackEvent>,
    surface: Viewport,
    stats_refresh: Duration,
    subscription: Option<Subscription>,
    stats_timer: Option<Interval>,
    last_id: SessionId,
    transient_errors: u32,
}

impl Tracker {
    pub fn new(
        source: Box<dyn SampleSource>,
        store: Box<dyn WorkoutStore>,
        events: Sender<TrackEvent>,
    ) -> Self {
        Self {
            session: Session::new(),
            source,
            store,
            events,
            surface: Viewport::default(),
            stats_refresh: Duration::from_secs(1),
            subscription: None,
            stats_timer: None,
            last_id: SessionId::default(),
            transient_errors: 0,
        }
    }

    pub fn with_stats_refresh(mut self, period: Duration) -> Self {
        self.stats_refresh = period;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_tracking(&self) -> bool {
        self.session.is_tracking()
    }

    pub fn surface(&self) -> Viewport {
        self.surface
    }

    pub fn store(&self) -> &dyn WorkoutStore {
        self.store.as_ref()
    }

    pub fn transient_errors(&self) -> u32 {
        self.transient_errors
    }

    /// New drawing surface for points projected from now on.
    pub fn resize(&mut self, surface: Viewport) {
        self.surface = surface;
    }

    pub fn live_stats(&self, now: DateTime<Utc>) -> LiveStats {
        live_stats(&self.session, now)
    }

    /// Begin a new session. Fails without touching the previous session's
    /// state when already tracking or when the source cannot be subscribed.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<SessionId, TrackerError> {
        if self.session.is_tracking() {
            return Err(TrackerError::AlreadyTracking);
        }

        let id = self.last_id.next();
        let subscription = self.source.subscribe(id, self.events.clone())?;
        self.last_id = id;

        self.session.reset(id, now);
        self.transient_errors = 0;
        self.subscription = Some(subscription);
        self.stats_timer = Some(Interval::spawn(
            self.stats_refresh,
            self.events.clone(),
            move || TrackEvent::StatsTick(id),
        ));

        info!(session = %id, source = %self.source.kind(), "tracking started");
        Ok(id)
    }

    pub fn on_source_event(&mut self, event: SourceEvent) -> SampleUpdate {
        if !self.session.is_tracking() || event.session != self.session.id {
            debug!(event_session = %event.session, current = %self.session.id, "ignoring source event");
            return SampleUpdate::Ignored;
        }

        match event.payload {
            SourcePayload::Sample(sample) => {
                SampleUpdate::Recorded(self.session.record(sample, &self.surface))
            }
            SourcePayload::Error(e) => {
                self.transient_errors += 1;
                debug!(session = %event.session, "skipping tick: {e}");
                SampleUpdate::Skipped(e)
            }
        }
    }

    /// End the active session, cancel its callbacks and append its summary to
    /// the log. `None` when nothing was being tracked.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<StopOutcome> {
        if !self.session.is_tracking() {
            return None;
        }

        self.session.finish();
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        if let Some(mut timer) = self.stats_timer.take() {
            timer.cancel();
        }

        let summary = summarize(&self.session, now);
        let saved = self.store.append(&summary);
        match &saved {
            Ok(entries) => info!(
                session = %self.session.id,
                distance_m = summary.distance_m,
                duration_ms = summary.duration_ms,
                entries,
                "workout saved"
            ),
            Err(e) => warn!(session = %self.session.id, "could not save workout: {e}"),
        }

        Some(StopOutcome { summary, saved })
    }
}
