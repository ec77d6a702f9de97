//! Position sample producers.
//!
//! The tracker does not care where samples come from, only that each one
//! carries a position and a timestamp and that they arrive in time order.
//! Every subscription is bound to one session id and hands back a
//! [`Subscription`] that stops delivery when cancelled or dropped.

pub mod device;
pub mod synthetic;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::runtime::TrackEvent;
use crate::session::{Sample, SessionId};
use crate::timer::Interval;

pub use device::{DeviceOptions, DeviceSource};
pub use synthetic::{SyntheticPath, SyntheticSource};

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SourceKind {
    Synthetic,
    Device,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    Sample(Sample),
    Error(SourceError),
}

/// A sample or a transient failure, tagged with the session it was produced for.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEvent {
    pub session: SessionId,
    pub payload: SourcePayload,
}

impl SourceEvent {
    pub fn sample(session: SessionId, sample: Sample) -> Self {
        Self {
            session,
            payload: SourcePayload::Sample(sample),
        }
    }

    pub fn error(session: SessionId, error: SourceError) -> Self {
        Self {
            session,
            payload: SourcePayload::Error(error),
        }
    }
}

pub trait SampleSource {
    fn kind(&self) -> SourceKind;

    /// Begin emitting samples for `session` into `tx`.
    fn subscribe(
        &self,
        session: SessionId,
        tx: Sender<TrackEvent>,
    ) -> Result<Subscription, SourceError>;
}

/// Cancellation handle for a running subscription.
#[derive(Debug)]
pub struct Subscription {
    cancelled: Arc<AtomicBool>,
    timer: Option<Interval>,
}

impl Subscription {
    pub fn new(cancelled: Arc<AtomicBool>) -> Self {
        Self {
            cancelled,
            timer: None,
        }
    }

    pub fn with_timer(timer: Interval) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            timer: Some(timer),
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(timer) = self.timer.as_mut() {
            timer.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A source that never emits on its own; samples are pushed by the caller.
/// Used for headless runs and tests.
#[derive(Debug, Default)]
pub struct ManualSource {
    unavailable: bool,
}

impl ManualSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose subscription always fails, like a missing receiver.
    pub fn unavailable() -> Self {
        Self { unavailable: true }
    }
}

impl SampleSource for ManualSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Device
    }

    fn subscribe(
        &self,
        _session: SessionId,
        _tx: Sender<TrackEvent>,
    ) -> Result<Subscription, SourceError> {
        if self.unavailable {
            return Err(SourceError::Unavailable {
                path: "manual".into(),
                reason: "no location capability".into(),
            });
        }
        Ok(Subscription::new(Arc::new(AtomicBool::new(false))))
    }
}
