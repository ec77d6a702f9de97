use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::geo::{position_distance, project_position, GeoCoord, Position};
use crate::render::Viewport;
use crate::util::mean;

/// How many recent speed readings are kept for the average.
pub const SPEED_HISTORY_LEN: usize = 10;

/// m/s to km/h
pub const MS_TO_KMH: f64 = 3.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> Self {
        SessionId(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One timestamped position reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub position: Position,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    pub fn new(position: Position, timestamp: DateTime<Utc>) -> Self {
        Self {
            position,
            timestamp,
        }
    }
}

/// A route vertex in drawing-surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePoint {
    pub x: f64,
    pub y: f64,
    pub geo: Option<GeoCoord>,
    pub captured_at: DateTime<Utc>,
}

/// Bounded FIFO of the most recent speeds, in km/h.
#[derive(Debug, Clone, Default)]
pub struct SpeedHistory {
    values: VecDeque<f64>,
}

impl SpeedHistory {
    pub fn push(&mut self, kmh: f64) {
        if self.values.len() == SPEED_HISTORY_LEN {
            self.values.pop_front();
        }
        self.values.push_back(kmh);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Mean of the retained values, 0 when nothing was recorded.
    pub fn average(&self) -> f64 {
        mean(&self.to_vec()).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordOutcome {
    /// First sample of the session, now the origin.
    Origin,
    Moved {
        distance_m: f64,
        speed_kmh: Option<f64>,
    },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotTracking,
    /// Geographic and planar positions mixed within one session.
    MixedPositions,
}

/// Mutable state of one start-to-stop tracking run.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub id: SessionId,
    pub started_at: Option<DateTime<Utc>>,
    pub total_distance_m: f64,
    pub current_speed_kmh: f64,
    pub route: Vec<RoutePoint>,
    pub speed_history: SpeedHistory,
    pub last_sample: Option<Sample>,
    pub origin: Option<Position>,
    pub tracking: bool,
    pub skipped_samples: u32,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything from the previous run and begin tracking as `id`.
    pub fn reset(&mut self, id: SessionId, now: DateTime<Utc>) {
        *self = Session {
            id,
            started_at: Some(now),
            tracking: true,
            ..Session::default()
        };
    }

    pub fn finish(&mut self) {
        self.tracking = false;
        self.current_speed_kmh = 0.0;
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Elapsed wall-clock milliseconds since start, 0 before the first start.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> i64 {
        self.started_at
            .map(|start| (now - start).num_milliseconds().max(0))
            .unwrap_or(0)
    }

    /// Fold one sample into the accumulators.
    pub fn record(&mut self, sample: Sample, surface: &Viewport) -> RecordOutcome {
        if !self.tracking {
            return RecordOutcome::Skipped(SkipReason::NotTracking);
        }

        let Some(last) = self.last_sample else {
            self.origin = Some(sample.position);
            self.push_point(&sample, surface);
            self.last_sample = Some(sample);
            return RecordOutcome::Origin;
        };

        let Some(distance_m) = position_distance(&last.position, &sample.position) else {
            self.skipped_samples += 1;
            return RecordOutcome::Skipped(SkipReason::MixedPositions);
        };
        self.total_distance_m += distance_m;

        let elapsed_secs = (sample.timestamp - last.timestamp).num_milliseconds() as f64 / 1000.0;
        let speed_kmh = if elapsed_secs > 0.0 {
            let kmh = distance_m / elapsed_secs * MS_TO_KMH;
            self.speed_history.push(kmh);
            self.current_speed_kmh = kmh;
            Some(kmh)
        } else {
            None
        };

        self.push_point(&sample, surface);
        self.last_sample = Some(sample);

        RecordOutcome::Moved {
            distance_m,
            speed_kmh,
        }
    }

    fn push_point(&mut self, sample: &Sample, surface: &Viewport) {
        let origin = self.origin.unwrap_or(sample.position);
        if let Some((x, y)) = project_position(&sample.position, &origin, surface) {
            self.route.push(RoutePoint {
                x,
                y,
                geo: sample.position.as_geo(),
                captured_at: sample.timestamp,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::distance_between;
    use assert_matches::assert_matches;

    fn at_ms(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn geo_sample(lat: f64, lon: f64, ms: i64) -> Sample {
        Sample::new(Position::geographic(lat, lon), at_ms(ms))
    }

    fn tracking_session() -> Session {
        let mut session = Session::new();
        session.reset(SessionId(1), at_ms(0));
        session
    }

    #[test]
    fn speed_history_is_bounded_fifo() {
        let mut history = SpeedHistory::default();
        for v in 1..=SPEED_HISTORY_LEN {
            history.push(v as f64);
        }
        assert_eq!(history.len(), SPEED_HISTORY_LEN);

        history.push(11.0);
        assert_eq!(history.len(), SPEED_HISTORY_LEN);
        assert_eq!(history.to_vec().first(), Some(&2.0));
        assert_eq!(history.to_vec().last(), Some(&11.0));
    }

    #[test]
    fn empty_speed_history_averages_to_zero() {
        assert_eq!(SpeedHistory::default().average(), 0.0);
    }

    #[test]
    fn three_samples_along_the_equator_meridian() {
        let mut session = tracking_session();
        let surface = Viewport::default();

        assert_eq!(
            session.record(geo_sample(0.0, 0.0, 0), &surface),
            RecordOutcome::Origin
        );
        session.record(geo_sample(0.001, 0.0, 1000), &surface);
        session.record(geo_sample(0.002, 0.0, 2000), &surface);

        let expected = 2.0 * distance_between(0.0, 0.0, 0.001, 0.0);
        assert!((session.total_distance_m - expected).abs() / expected < 0.01);
        assert!((session.total_distance_m - 222.0).abs() / 222.0 < 0.01);
        assert_eq!(session.speed_history.len(), 2);
        assert!(session.speed_history.iter().all(|v| *v > 0.0));
        assert_eq!(session.route.len(), 3);
        assert_eq!(session.route[0].geo, Some(GeoCoord::new(0.0, 0.0)));
    }

    #[test]
    fn speed_is_reported_in_kmh() {
        let mut session = tracking_session();
        let surface = Viewport::default();
        session.record(Sample::new(Position::planar(0.0, 0.0), at_ms(0)), &surface);
        let outcome = session.record(Sample::new(Position::planar(10.0, 0.0), at_ms(2000)), &surface);

        assert_matches!(outcome, RecordOutcome::Moved { distance_m, speed_kmh: Some(kmh) } => {
            assert_eq!(distance_m, 10.0);
            assert!((kmh - 18.0).abs() < 1e-9);
        });
        assert!((session.current_speed_kmh - 18.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_timestamp_keeps_distance_but_skips_speed() {
        let mut session = tracking_session();
        let surface = Viewport::default();
        session.record(geo_sample(0.0, 0.0, 1000), &surface);
        let outcome = session.record(geo_sample(0.001, 0.0, 1000), &surface);

        assert_matches!(outcome, RecordOutcome::Moved { speed_kmh: None, .. });
        assert!(session.total_distance_m > 100.0);
        assert!(session.speed_history.is_empty());
        assert_eq!(session.current_speed_kmh, 0.0);
        assert_eq!(session.route.len(), 2);
    }

    #[test]
    fn samples_are_ignored_when_not_tracking() {
        let mut session = Session::new();
        let outcome = session.record(geo_sample(1.0, 1.0, 0), &Viewport::default());
        assert_eq!(outcome, RecordOutcome::Skipped(SkipReason::NotTracking));
        assert!(session.route.is_empty());
        assert!(session.last_sample.is_none());
    }

    #[test]
    fn mixed_position_kinds_are_skipped() {
        let mut session = tracking_session();
        let surface = Viewport::default();
        session.record(geo_sample(0.0, 0.0, 0), &surface);
        let outcome = session.record(Sample::new(Position::planar(5.0, 5.0), at_ms(1000)), &surface);

        assert_eq!(outcome, RecordOutcome::Skipped(SkipReason::MixedPositions));
        assert_eq!(session.skipped_samples, 1);
        assert_eq!(session.route.len(), 1);
        assert_eq!(session.total_distance_m, 0.0);
    }

    #[test]
    fn reset_clears_leftovers_from_previous_run() {
        let mut session = tracking_session();
        let surface = Viewport::default();
        session.record(geo_sample(0.0, 0.0, 0), &surface);
        session.record(geo_sample(0.01, 0.0, 1000), &surface);
        session.finish();
        assert!(session.total_distance_m > 0.0);

        session.reset(SessionId(2), at_ms(5000));

        assert!(session.is_tracking());
        assert_eq!(session.id, SessionId(2));
        assert_eq!(session.total_distance_m, 0.0);
        assert_eq!(session.current_speed_kmh, 0.0);
        assert!(session.route.is_empty());
        assert!(session.speed_history.is_empty());
        assert!(session.last_sample.is_none());
        assert!(session.origin.is_none());
        assert_eq!(session.started_at, Some(at_ms(5000)));
    }

    #[test]
    fn origin_stays_fixed_to_first_sample() {
        let mut session = tracking_session();
        let surface = Viewport::new(100.0, 100.0);
        session.record(geo_sample(10.0, 10.0, 0), &surface);
        session.record(geo_sample(10.0001, 10.0, 1000), &surface);
        session.record(geo_sample(10.0002, 10.0, 2000), &surface);

        assert_eq!(session.origin, Some(Position::geographic(10.0, 10.0)));
        assert_eq!((session.route[0].x, session.route[0].y), (50.0, 50.0));
        assert!(session.route[2].y < session.route[1].y);
    }

    #[test]
    fn elapsed_is_zero_before_start() {
        let session = Session::new();
        assert_eq!(session.elapsed_ms(at_ms(10_000)), 0);
        let session = tracking_session();
        assert_eq!(session.elapsed_ms(at_ms(10_000)), 10_000);
    }
}
