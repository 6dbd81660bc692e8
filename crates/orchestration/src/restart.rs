//! Blocking on server restarts
//!
//! Some mutating calls (deleting an app server, for instance) make the
//! server restart itself. The management API answers before the restart has
//! happened, so the next call could hit a server that is going down. The
//! [`RestartCoordinator`] closes that gap by polling a [`RestartProbe`] until
//! the server reports a new restart marker.

use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Default pause between restart polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Source of the server's restart marker
///
/// The marker is any value that changes every time the server restarts
/// (a last-startup timestamp, for example). While the server is down the
/// probe returns an error.
pub trait RestartProbe: Send + Sync {
    fn last_restart(&self) -> Result<String>;
}

/// Runs restart-triggering actions and waits for the restart to finish
///
/// Waits are unbounded unless a deadline is configured.
pub struct RestartCoordinator {
    probe: Arc<dyn RestartProbe>,
    poll_interval: Duration,
    deadline: Option<Duration>,
}

impl RestartCoordinator {
    pub fn new(probe: Arc<dyn RestartProbe>) -> Self {
        Self {
            probe,
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Give up waiting after `deadline` with [`Error::RestartTimeout`]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Current restart marker, as reported by the probe
    pub fn marker(&self) -> Result<String> {
        self.probe.last_restart()
    }

    /// Invoke `action` and, if it reports a restart-worthy change, block
    /// until the server has restarted
    ///
    /// Returns what the action returned.
    pub fn invoke_action_requiring_restart<F>(&self, action: F) -> Result<bool>
    where
        F: FnOnce() -> Result<bool>,
    {
        let before = self.marker()?;
        self.invoke_action_since(&before, action)
    }

    /// Like [`Self::invoke_action_requiring_restart`], with the marker read
    /// by the caller beforehand
    pub fn invoke_action_since<F>(&self, before: &str, action: F) -> Result<bool>
    where
        F: FnOnce() -> Result<bool>,
    {
        let requires_restart = action()?;
        if requires_restart {
            self.wait_for_restart_since(before)?;
        }
        Ok(requires_restart)
    }

    /// Block until the server reports a marker other than `before`
    ///
    /// Used after a failed call that may still have triggered a restart: the
    /// server may not have gone down yet, so answering is not enough.
    pub fn wait_for_restart_since(&self, before: &str) -> Result<()> {
        log::info!("Waiting for server to restart");
        self.wait_until(|marker| marker != before)?;
        log::info!("Server restarted");
        Ok(())
    }

    /// Block until the server answers again, without invoking anything first
    pub fn wait_for_restart(&self) -> Result<()> {
        log::info!("Waiting for server to become available");
        thread::sleep(self.poll_interval);
        self.wait_until(|_| true)
    }

    fn wait_until(&self, done: impl Fn(&str) -> bool) -> Result<()> {
        let started = Instant::now();
        loop {
            match self.probe.last_restart() {
                Ok(marker) if done(&marker) => return Ok(()),
                Ok(_) => log::debug!("Server has not restarted yet"),
                Err(e) => log::debug!("Server not available yet: {e}"),
            }

            if let Some(deadline) = self.deadline
                && started.elapsed() >= deadline
            {
                return Err(Error::RestartTimeout {
                    waited: started.elapsed(),
                });
            }
            thread::sleep(self.poll_interval);
        }
    }
}

impl std::fmt::Debug for RestartCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestartCoordinator")
            .field("poll_interval", &self.poll_interval)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

/// Probe for targets without a restart signal
///
/// Reports a fresh marker on every call, so every wait ends at the first poll.
#[derive(Debug, Default)]
pub struct NoRestart {
    polls: AtomicU64,
}

impl RestartProbe for NoRestart {
    fn last_restart(&self) -> Result<String> {
        Ok(self.polls.fetch_add(1, Ordering::Relaxed).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    /// Plays back a fixed sequence of probe answers, then repeats the last one
    struct ScriptedProbe {
        answers: Mutex<Vec<Result<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn new(answers: Vec<Result<String>>) -> Arc<Self> {
            let mut answers = answers;
            answers.reverse();
            Arc::new(Self {
                answers: Mutex::new(answers),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl RestartProbe for ScriptedProbe {
        fn last_restart(&self) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut answers = self.answers.lock().unwrap();
            if answers.len() > 1 {
                answers.pop().unwrap()
            } else {
                match answers.last().unwrap() {
                    Ok(marker) => Ok(marker.clone()),
                    Err(_) => Err(Error::transport("down", None)),
                }
            }
        }
    }

    fn coordinator(probe: Arc<ScriptedProbe>) -> RestartCoordinator {
        RestartCoordinator::new(probe).with_poll_interval(Duration::ZERO)
    }

    #[test]
    fn test_action_without_restart_does_not_wait() {
        let probe = ScriptedProbe::new(vec![Ok("t1".into())]);
        let result = coordinator(probe.clone())
            .invoke_action_requiring_restart(|| Ok(false))
            .unwrap();
        assert!(!result);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_waits_through_downtime_until_marker_changes() {
        let probe = ScriptedProbe::new(vec![
            Ok("t1".into()),
            Ok("t1".into()),
            Err(Error::transport("connection refused", None)),
            Ok("t2".into()),
        ]);
        let result = coordinator(probe.clone())
            .invoke_action_requiring_restart(|| Ok(true))
            .unwrap();
        assert!(result);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_action_error_propagates_without_waiting() {
        let probe = ScriptedProbe::new(vec![Ok("t1".into())]);
        let err = coordinator(probe.clone())
            .invoke_action_requiring_restart(|| Err(Error::transport("reset", None)))
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wait_for_restart_returns_once_server_answers() {
        let probe = ScriptedProbe::new(vec![
            Err(Error::transport("down", None)),
            Err(Error::transport("down", None)),
            Ok("t9".into()),
        ]);
        coordinator(probe.clone()).wait_for_restart().unwrap();
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_deadline_bounds_the_wait() {
        let probe = ScriptedProbe::new(vec![Err(Error::transport("down", None))]);
        let err = coordinator(probe)
            .with_deadline(Duration::from_millis(20))
            .wait_for_restart()
            .unwrap_err();
        assert!(matches!(err, Error::RestartTimeout { .. }));
    }

    #[test]
    fn test_wait_since_ignores_unchanged_marker() {
        let probe = ScriptedProbe::new(vec![
            Ok("t1".into()),
            Err(Error::transport("down", None)),
            Ok("t1".into()),
            Ok("t2".into()),
        ]);
        coordinator(probe.clone()).wait_for_restart_since("t1").unwrap();
        assert_eq!(probe.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_wait_since_times_out_when_server_never_restarts() {
        let probe = ScriptedProbe::new(vec![Ok("t1".into())]);
        let err = coordinator(probe.clone())
            .with_deadline(Duration::from_millis(20))
            .wait_for_restart_since("t1")
            .unwrap_err();
        assert!(matches!(err, Error::RestartTimeout { .. }));
        assert!(probe.calls.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn test_no_restart_probe() {
        let coordinator =
            RestartCoordinator::new(Arc::new(NoRestart::default())).with_poll_interval(Duration::ZERO);
        assert!(coordinator.deadline().is_none());
        assert!(coordinator.invoke_action_requiring_restart(|| Ok(true)).unwrap());
        coordinator.wait_for_restart().unwrap();
    }
}
