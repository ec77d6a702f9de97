use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// Repeating timer on its own thread. Each period it sends `make()` into the
/// target channel until cancelled, dropped, or the receiver goes away.
///
/// An event already handed to the channel when `cancel` runs is still
/// delivered; receivers tag events so such leftovers can be recognised.
#[derive(Debug)]
pub struct Interval {
    stop: Option<Sender<()>>,
}

impl Interval {
    pub fn spawn<T, F>(period: Duration, tx: Sender<T>, make: F) -> Self
    where
        T: Send + 'static,
        F: Fn() -> T + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        thread::spawn(move || loop {
            match stop_rx.recv_timeout(period) {
                Err(RecvTimeoutError::Timeout) => {
                    if tx.send(make()).is_err() {
                        break;
                    }
                }
                // explicit stop or handle dropped
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        Self {
            stop: Some(stop_tx),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl Drop for Interval {
    fn drop(&mut self) {
        self.cancel();
    }
}
