use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::Session;
use crate::util::format_hms;

/// Calories burned per kilometre. A flat heuristic, not a physiological model.
pub const CALORIES_PER_KM: f64 = 60.0;

/// Running totals formatted for the live stats panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveStats {
    pub distance_text: String,
    pub speed_text: String,
    pub duration_text: String,
}

impl Default for LiveStats {
    fn default() -> Self {
        Self {
            distance_text: "0.00".to_string(),
            speed_text: "0.0".to_string(),
            duration_text: format_hms(0),
        }
    }
}

/// Immutable record of a finished workout, as stored in the workout log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSummary {
    pub timestamp: DateTime<Utc>,
    /// meters
    #[serde(rename = "distance")]
    pub distance_m: f64,
    /// milliseconds
    #[serde(rename = "duration")]
    pub duration_ms: i64,
    #[serde(rename = "avgSpeed")]
    pub avg_speed_kmh: f64,
    #[serde(default)]
    pub calories: u32,
}

impl WorkoutSummary {
    pub fn distance_km(&self) -> f64 {
        self.distance_m / 1000.0
    }
}

pub fn live_stats(session: &Session, now: DateTime<Utc>) -> LiveStats {
    LiveStats {
        distance_text: format!("{:.2}", session.total_distance_m / 1000.0),
        speed_text: format!("{:.1}", session.current_speed_kmh),
        duration_text: format_hms(session.elapsed_ms(now)),
    }
}

pub fn estimate_calories(distance_m: f64) -> u32 {
    (distance_m / 1000.0 * CALORIES_PER_KM).round().max(0.0) as u32
}

/// Snapshot a session that finished at `finished_at`.
pub fn summarize(session: &Session, finished_at: DateTime<Utc>) -> WorkoutSummary {
    WorkoutSummary {
        timestamp: finished_at,
        distance_m: session.total_distance_m,
        duration_ms: session.elapsed_ms(finished_at),
        avg_speed_kmh: session.speed_history.average(),
        calories: estimate_calories(session.total_distance_m),
    }
}

/// Label/value pairs for the end-of-workout panel.
pub fn summary_lines(summary: &WorkoutSummary) -> Vec<(&'static str, String)> {
    vec![
        ("Distance", format!("{:.2} km", summary.distance_km())),
        ("Avg speed", format!("{:.1} km/h", summary.avg_speed_kmh)),
        ("Calories", summary.calories.to_string()),
        ("Duration", format_hms(summary.duration_ms)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Position;
    use crate::render::Viewport;
    use crate::session::{Sample, SessionId};

    fn at_ms(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn walked_session() -> Session {
        let mut session = Session::new();
        session.reset(SessionId(1), at_ms(0));
        let surface = Viewport::default();
        for (i, x) in [0.0, 500.0, 1500.0].iter().enumerate() {
            let t = at_ms(i as i64 * 100_000);
            session.record(Sample::new(Position::planar(*x, 0.0), t), &surface);
        }
        session
    }

    #[test]
    fn live_stats_for_fresh_session() {
        let mut session = Session::new();
        session.reset(SessionId(1), at_ms(0));
        let stats = live_stats(&session, at_ms(3_723_000));
        assert_eq!(stats.distance_text, "0.00");
        assert_eq!(stats.speed_text, "0.0");
        assert_eq!(stats.duration_text, "01:02:03");
    }

    #[test]
    fn live_stats_show_kilometres_and_current_speed() {
        let session = walked_session();
        let stats = live_stats(&session, at_ms(200_000));
        assert_eq!(stats.distance_text, "1.50");
        // 1000 m in 100 s
        assert_eq!(stats.speed_text, "36.0");
        assert_eq!(stats.duration_text, "00:03:20");
    }

    #[test]
    fn summary_averages_speed_history() {
        let session = walked_session();
        let summary = summarize(&session, at_ms(250_000));
        assert_eq!(summary.distance_m, 1500.0);
        assert_eq!(summary.duration_ms, 250_000);
        // 18 km/h then 36 km/h
        assert!((summary.avg_speed_kmh - 27.0).abs() < 1e-9);
        assert_eq!(summary.calories, 90);
        assert_eq!(summary.timestamp, at_ms(250_000));
    }

    #[test]
    fn summary_of_empty_session_is_all_zero() {
        let mut session = Session::new();
        session.reset(SessionId(1), at_ms(1_000));
        let summary = summarize(&session, at_ms(1_000));
        assert_eq!(summary.distance_m, 0.0);
        assert_eq!(summary.avg_speed_kmh, 0.0);
        assert_eq!(summary.duration_ms, 0);
        assert_eq!(summary.calories, 0);
    }

    #[test]
    fn calories_are_linear_in_distance() {
        assert_eq!(estimate_calories(0.0), 0);
        assert_eq!(estimate_calories(1000.0), 60);
        assert_eq!(estimate_calories(5_250.0), 315);
    }

    #[test]
    fn summary_lines_format_units() {
        let summary = summarize(&walked_session(), at_ms(250_000));
        let lines = summary_lines(&summary);
        assert_eq!(lines[0], ("Distance", "1.50 km".to_string()));
        assert_eq!(lines[1], ("Avg speed", "27.0 km/h".to_string()));
        assert_eq!(lines[2], ("Calories", "90".to_string()));
        assert_eq!(lines[3], ("Duration", "00:04:10".to_string()));
    }

    #[test]
    fn summary_serializes_with_log_field_names() {
        let summary = WorkoutSummary {
            timestamp: at_ms(0),
            distance_m: 1234.5,
            duration_ms: 60_000,
            avg_speed_kmh: 7.5,
            calories: 74,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["timestamp"], "1970-01-01T00:00:00Z");
        assert_eq!(json["distance"], 1234.5);
        assert_eq!(json["duration"], 60_000);
        assert_eq!(json["avgSpeed"], 7.5);
        assert_eq!(json["calories"], 74);
    }
}
