use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use nmea::sentences::rmc::RmcStatusOfFix;
use nmea::ParseResult;
use tracing::{debug, info, warn};

use super::{SampleSource, SourceEvent, SourceKind, Subscription};
use crate::error::SourceError;
use crate::geo::Position;
use crate::runtime::TrackEvent;
use crate::session::{Sample, SessionId};

/// Longest pause inserted between two fixes when replaying a recording.
pub const MAX_REPLAY_GAP: Duration = Duration::from_secs(5);

/// Consecutive read errors after which the stream is considered gone.
const MAX_READ_FAILURES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceOptions {
    /// How long to wait for a fix before reporting a timeout.
    pub timeout: Duration,
    /// Drop fixes the receiver itself flags as invalid.
    pub require_fix: bool,
    /// Replay regular files at the cadence recorded in their timestamps.
    pub pace_replay: bool,
    /// Oldest fix accepted from a live stream. Zero accepts any age.
    pub max_age: Duration,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            require_fix: true,
            pace_replay: true,
            max_age: Duration::from_secs(1),
        }
    }
}

/// NMEA 0183 stream from a GNSS receiver, a pipe, or a recorded log.
#[derive(Debug, Clone)]
pub struct DeviceSource {
    path: PathBuf,
    options: DeviceOptions,
}

impl DeviceSource {
    pub fn new<P: AsRef<Path>>(path: P, options: DeviceOptions) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options,
        }
    }
}

/// Sentence type of an NMEA line, e.g. `RMC` for `$GNRMC,...`. Proprietary
/// `$P...` sentences have no talker and report `None`.
fn sentence_type(line: &str) -> Option<&str> {
    let address = line.strip_prefix('$')?.split([',', '*']).next()?;
    if address.starts_with('P') || address.len() != 5 {
        return None;
    }
    address.get(2..)
}

/// Parse one line of NMEA text. Only RMC sentences produce a sample; other
/// sentence types, proprietary chatter and blank lines yield `Ok(None)`.
pub fn parse_sentence(line: &str, require_fix: bool) -> Result<Option<Sample>, SourceError> {
    let line = line.trim();
    if sentence_type(line) != Some("RMC") {
        return Ok(None);
    }

    match nmea::parse_str(line) {
        Ok(ParseResult::RMC(rmc)) => {
            if require_fix && matches!(rmc.status_of_fix, RmcStatusOfFix::Invalid) {
                return Ok(None);
            }
            let (Some(lat), Some(lon), Some(time), Some(date)) =
                (rmc.lat, rmc.lon, rmc.fix_time, rmc.fix_date)
            else {
                return Ok(None);
            };
            let timestamp = NaiveDateTime::new(date, time).and_utc();
            Ok(Some(Sample::new(Position::geographic(lat, lon), timestamp)))
        }
        Ok(_) => Ok(None),
        Err(e) => Err(SourceError::Malformed(format!("{e:?}"))),
    }
}

impl SampleSource for DeviceSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Device
    }

    fn subscribe(
        &self,
        session: SessionId,
        tx: Sender<TrackEvent>,
    ) -> Result<Subscription, SourceError> {
        let file = File::open(&self.path).map_err(|e| SourceError::Unavailable {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let recording = file.metadata().map(|m| m.is_file()).unwrap_or(false);
        // Staleness only applies to live streams.
        let mode = ReadMode {
            replay: self.options.pace_replay && recording,
            require_fix: self.options.require_fix,
            max_age: (!recording && !self.options.max_age.is_zero())
                .then_some(self.options.max_age),
        };

        let cancelled = Arc::new(AtomicBool::new(false));
        let (fix_tx, fix_rx) = mpsc::channel::<Result<Sample, SourceError>>();

        // A blocking read cannot be interrupted: after cancel the reader holds
        // the device open until one more line arrives, then exits without
        // forwarding it.
        let reader_cancelled = cancelled.clone();
        thread::spawn(move || read_fixes(file, mode, reader_cancelled, fix_tx));

        let forward_cancelled = cancelled.clone();
        let timeout = self.options.timeout;
        thread::spawn(move || forward_fixes(fix_rx, session, timeout, forward_cancelled, tx));

        info!(%session, path = %self.path.display(), ?mode, "device source subscribed");
        Ok(Subscription::new(cancelled))
    }
}

/// Relay fixes to the app, turning silence longer than `timeout` into a
/// transient error. Ends when the reader finishes or the handle is cancelled.
fn forward_fixes(
    fixes: Receiver<Result<Sample, SourceError>>,
    session: SessionId,
    timeout: Duration,
    cancelled: Arc<AtomicBool>,
    tx: Sender<TrackEvent>,
) {
    loop {
        let event = match fixes.recv_timeout(timeout) {
            Ok(Ok(sample)) => SourceEvent::sample(session, sample),
            Ok(Err(e)) => SourceEvent::error(session, e),
            Err(RecvTimeoutError::Timeout) => {
                SourceEvent::error(session, SourceError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => return,
        };
        if cancelled.load(Ordering::SeqCst) {
            return;
        }
        if tx.send(TrackEvent::Source(event)).is_err() {
            return;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ReadMode {
    replay: bool,
    require_fix: bool,
    /// Drop fixes older than this when set.
    max_age: Option<Duration>,
}

fn read_fixes(
    file: impl Read,
    mode: ReadMode,
    cancelled: Arc<AtomicBool>,
    out: Sender<Result<Sample, SourceError>>,
) {
    let mut last: Option<DateTime<Utc>> = None;
    let mut failures = 0;

    for line in BufReader::new(file).lines() {
        if cancelled.load(Ordering::SeqCst) {
            return;
        }
        let line = match line {
            Ok(line) => {
                failures = 0;
                line
            }
            Err(e) => {
                warn!("device read failed: {e}");
                failures += 1;
                if failures >= MAX_READ_FAILURES {
                    break;
                }
                let _ = out.send(Err(SourceError::Malformed(e.to_string())));
                continue;
            }
        };

        let sample = match parse_sentence(&line, mode.require_fix) {
            Ok(Some(sample)) => sample,
            Ok(None) => continue,
            Err(e) => {
                if out.send(Err(e)).is_err() {
                    return;
                }
                continue;
            }
        };

        if let Some(max_age) = mode.max_age {
            let age = (Utc::now() - sample.timestamp).to_std().unwrap_or_default();
            if age > max_age {
                debug!(?sample.timestamp, ?age, "dropping stale fix");
                continue;
            }
        }

        if let Some(prev) = last {
            if sample.timestamp < prev {
                debug!(?sample.timestamp, ?prev, "dropping out-of-order fix");
                continue;
            }
            if mode.replay {
                let gap = (sample.timestamp - prev).to_std().unwrap_or_default();
                thread::sleep(gap.min(MAX_REPLAY_GAP));
                if cancelled.load(Ordering::SeqCst) {
                    return;
                }
            }
        }
        last = Some(sample.timestamp);

        if out.send(Ok(sample)).is_err() {
            return;
        }
    }

    let _ = out.send(Err(SourceError::Closed));
}
