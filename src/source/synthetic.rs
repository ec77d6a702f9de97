use std::f64::consts::TAU;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SampleSource, SourceEvent, SourceKind, Subscription};
use crate::error::SourceError;
use crate::geo::Position;
use crate::runtime::TrackEvent;
use crate::session::{Sample, SessionId};
use crate::timer::Interval;

/// A circle that slowly turns and slowly grows and shrinks, in local meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticPath {
    pub radius_m: f64,
    /// Fraction of `radius_m` the radius swings by.
    pub breathing: f64,
    pub lap_secs: f64,
    pub breathing_secs: f64,
}

impl Default for SyntheticPath {
    fn default() -> Self {
        // ~9.4 km/h around a 50 m circle
        Self {
            radius_m: 50.0,
            breathing: 0.2,
            lap_secs: 120.0,
            breathing_secs: 300.0,
        }
    }
}

impl SyntheticPath {
    pub fn position_at(&self, elapsed: Duration) -> Position {
        let t = elapsed.as_secs_f64();
        let angle = TAU * t / self.lap_secs.max(f64::EPSILON);
        let swing = (TAU * t / self.breathing_secs.max(f64::EPSILON)).sin();
        let r = self.radius_m * (1.0 + self.breathing * swing);
        Position::planar(r * angle.cos(), r * angle.sin())
    }
}

/// Generates samples from [`SyntheticPath`] on a fixed interval.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    path: SyntheticPath,
    interval: Duration,
}

impl SyntheticSource {
    pub fn new(path: SyntheticPath, interval: Duration) -> Self {
        Self { path, interval }
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(SyntheticPath::default(), Duration::from_secs(1))
    }
}

impl SampleSource for SyntheticSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Synthetic
    }

    fn subscribe(
        &self,
        session: SessionId,
        tx: Sender<TrackEvent>,
    ) -> Result<Subscription, SourceError> {
        let path = self.path;
        // Wall time is read once; the monotonic clock keeps stamps in order.
        let started_at = Utc::now();
        let started = Instant::now();
        let make = move || {
            let elapsed = started.elapsed();
            let stamp = started_at + TimeDelta::from_std(elapsed).unwrap_or(TimeDelta::zero());
            TrackEvent::Source(SourceEvent::sample(
                session,
                Sample::new(path.position_at(elapsed), stamp),
            ))
        };

        // first position right away, then one per interval
        let _ = tx.send(make());
        let timer = Interval::spawn(self.interval, tx, make);
        debug!(%session, interval = ?self.interval, "synthetic source subscribed");
        Ok(Subscription::with_timer(timer))
    }
}
