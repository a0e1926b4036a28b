//! Cooperative stop signal for the polling loop.
//!
//! The process boundary (the Ctrl+C handler in `main`) holds one clone of the
//! token and the loop holds another. The loop checks the token before each
//! request and sleeps on it between requests, so a stop cuts the sleep short
//! but never interrupts a read that is already in flight.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Clone, Default)]
pub struct StopToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Calling this more than once has no further effect.
    pub fn request_stop(&self) {
        let (lock, cvar) = &*self.inner;
        let mut stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *stopped = true;
        cvar.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait up to `duration`, returning early if a stop is requested.
    ///
    /// Returns `true` when a stop has been requested. Returns immediately if
    /// the stop was already requested before the call.
    pub fn sleep(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, duration, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn starts_running() {
        let token = StopToken::new();
        assert!(!token.is_stopped());
    }

    #[test]
    fn stop_is_seen_by_clones() {
        let token = StopToken::new();
        let other = token.clone();
        other.request_stop();
        other.request_stop();
        assert!(token.is_stopped());
    }

    #[test]
    fn sleep_runs_full_interval_without_stop() {
        let token = StopToken::new();
        let started = Instant::now();
        assert!(!token.sleep(Duration::from_millis(20)));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn sleep_is_skipped_after_stop() {
        let token = StopToken::new();
        token.request_stop();
        let started = Instant::now();
        assert!(token.sleep(Duration::from_secs(10)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn stop_wakes_a_sleeper() {
        let token = StopToken::new();
        let stopper = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            stopper.request_stop();
        });
        let started = Instant::now();
        assert!(token.sleep(Duration::from_secs(10)));
        assert!(started.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }
}
