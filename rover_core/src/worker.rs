//! Named worker threads that report faults instead of dying silently.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel as xch;

use crate::error::{BuildError, Result, RoverError};

pub struct Worker {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
    done: xch::Receiver<()>,
}

impl Worker {
    /// Spawn `f` on a thread called `name`. An `Err` or a panic is sent on
    /// `faults`; either way the thread signals completion before it ends.
    pub fn spawn<F>(
        name: &'static str,
        faults: xch::Sender<RoverError>,
        f: F,
    ) -> std::result::Result<Self, BuildError>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let (done_tx, done) = xch::bounded(1);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                match panic::catch_unwind(AssertUnwindSafe(f)) {
                    Ok(Ok(())) => tracing::debug!(worker = name, "worker exited"),
                    Ok(Err(report)) => {
                        let err = report
                            .downcast_ref::<RoverError>()
                            .cloned()
                            .unwrap_or_else(|| RoverError::State(format!("{report:#}")));
                        tracing::error!(worker = name, error = %err, "worker failed");
                        let _ = faults.send(err);
                    }
                    Err(_) => {
                        tracing::error!(worker = name, "worker panicked");
                        let _ = faults.send(RoverError::WorkerPanic(name.to_string()));
                    }
                }
                let _ = done_tx.send(());
            })
            .map_err(|_| BuildError::Spawn(name))?;
        Ok(Self {
            name,
            handle: Some(handle),
            done,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_joined(&self) -> bool {
        self.handle.is_none()
    }

    /// Wait for the thread to finish until `deadline`. `false` leaves the
    /// thread detached and running.
    pub fn join_within(&mut self, deadline: Instant) -> bool {
        let Some(handle) = self.handle.take() else {
            return true;
        };
        match self.done.recv_deadline(deadline) {
            Ok(()) | Err(xch::RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    tracing::warn!(worker = self.name, "worker panicked outside its guard");
                }
                tracing::trace!(worker = self.name, "worker joined");
                true
            }
            Err(xch::RecvTimeoutError::Timeout) => {
                tracing::warn!(worker = self.name, "worker did not stop in time");
                self.handle = Some(handle);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(2)
    }

    #[test]
    fn clean_exit_reports_nothing() {
        let (tx, rx) = xch::unbounded();
        let mut w = Worker::spawn("rover-test-ok", tx, || Ok(())).expect("spawn");
        assert!(w.join_within(deadline()));
        assert!(w.is_joined());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn panic_becomes_worker_panic() {
        let (tx, rx) = xch::unbounded();
        let mut w = Worker::spawn("rover-test-panic", tx, || panic!("boom")).expect("spawn");
        assert!(w.join_within(deadline()));
        assert_eq!(
            rx.try_recv().expect("fault"),
            RoverError::WorkerPanic("rover-test-panic".into())
        );
    }

    #[test]
    fn typed_error_is_forwarded() {
        let (tx, rx) = xch::unbounded();
        let mut w = Worker::spawn("rover-test-err", tx, || {
            Err(eyre::Report::new(RoverError::ActuatorFault("nack".into())))
        })
        .expect("spawn");
        assert!(w.join_within(deadline()));
        assert_eq!(
            rx.try_recv().expect("fault"),
            RoverError::ActuatorFault("nack".into())
        );
    }

    #[test]
    fn slow_worker_times_out() {
        let (tx, _rx) = xch::unbounded();
        let (go_tx, go_rx) = xch::bounded::<()>(1);
        let mut w = Worker::spawn("rover-test-slow", tx, move || {
            let _ = go_rx.recv();
            Ok(())
        })
        .expect("spawn");
        assert!(!w.join_within(Instant::now() + Duration::from_millis(20)));
        go_tx.send(()).expect("release");
        assert!(w.join_within(deadline()));
    }
}
