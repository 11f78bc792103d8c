//! The mount-time chain: permission, then one position fix. It runs on its
//! own thread and reports back through a channel the UI polls every frame.

use crate::coordinate::Coordinate;
use crate::services::{LocationService, PermissionService, PermissionStatus, ServiceError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tracing::{debug, error, info};

pub const PERMISSION_DENIED_MESSAGE: &str = "Permission to access location was denied";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{}", PERMISSION_DENIED_MESSAGE)]
    PermissionDenied,
    #[error("location permission request failed: {0}")]
    Permission(#[source] ServiceError),
    #[error("could not determine your current location: {0}")]
    Location(#[source] ServiceError),
    #[error("location lookup stopped unexpectedly")]
    Interrupted,
    #[error("startup cancelled")]
    Cancelled,
}

impl StartupError {
    /// Message for the alert surface. Cancellation is silent.
    pub fn alert_message(&self) -> Option<String> {
        match self {
            StartupError::Cancelled => None,
            other => Some(other.to_string()),
        }
    }
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub type StartupResult = Result<Coordinate, StartupError>;

/// Handle to the running startup chain. Dropping it cancels the chain and any
/// result that arrives afterwards is thrown away.
pub struct StartupTask {
    cancel: CancelToken,
    results: Receiver<StartupResult>,
}

impl StartupTask {
    pub fn spawn<W>(
        mut permission: Box<dyn PermissionService>,
        mut location: Box<dyn LocationService>,
        wake: W,
    ) -> Self
    where
        W: Fn() + Send + 'static,
    {
        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::channel();
        let worker_cancel = cancel.clone();

        thread::spawn(move || {
            let result = run(permission.as_mut(), location.as_mut(), &worker_cancel);
            if worker_cancel.is_cancelled() {
                debug!("screen torn down, discarding startup result");
                return;
            }
            if tx.send(result).is_ok() {
                wake();
            }
        });

        Self {
            cancel,
            results: rx,
        }
    }

    /// Non-blocking check for the chain's result. Yields it at most once.
    pub fn poll(&mut self) -> Option<StartupResult> {
        if self.cancel.is_cancelled() {
            return None;
        }
        match self.results.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                error!("startup task ended without reporting a result");
                Some(Err(StartupError::Interrupted))
            }
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[cfg(test)]
    fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[cfg(test)]
    pub fn wait(&mut self, timeout: std::time::Duration) -> Option<StartupResult> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.results.recv_timeout(timeout).ok()
    }
}

impl Drop for StartupTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run(
    permission: &mut dyn PermissionService,
    location: &mut dyn LocationService,
    cancel: &CancelToken,
) -> StartupResult {
    info!("requesting foreground location permission");
    let status = permission
        .request_foreground(cancel)
        .map_err(|err| match err {
            ServiceError::Cancelled => StartupError::Cancelled,
            other => StartupError::Permission(other),
        })?;
    if status == PermissionStatus::Denied {
        return Err(StartupError::PermissionDenied);
    }
    if cancel.is_cancelled() {
        return Err(StartupError::Cancelled);
    }

    info!("permission granted, requesting current position");
    let fix = location.current_position(cancel).map_err(|err| match err {
        ServiceError::Cancelled => StartupError::Cancelled,
        other => StartupError::Location(other),
    })?;
    info!(%fix, "current position acquired");
    Ok(fix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ConfiguredLocation, FixedPermission};
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    const WAIT: Duration = Duration::from_secs(5);

    struct CountingLocation {
        calls: Arc<AtomicUsize>,
    }

    impl LocationService for CountingLocation {
        fn current_position(&mut self, _: &CancelToken) -> Result<Coordinate, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Coordinate::new(1.0, 2.0))
        }
    }

    fn sf_location(delay: Duration) -> Box<dyn LocationService> {
        Box::new(ConfiguredLocation::new(
            Coordinate::new(37.7749, -122.4194),
            delay,
            true,
        ))
    }

    #[test]
    fn granted_permission_yields_position_fix() {
        let mut task = StartupTask::spawn(
            Box::new(FixedPermission(PermissionStatus::Granted)),
            sf_location(Duration::ZERO),
            || {},
        );
        let fix = task.wait(WAIT).unwrap().unwrap();
        assert_eq!(fix, Coordinate::new(37.7749, -122.4194));
        assert!(task.poll().is_none());
    }

    #[test]
    fn denied_permission_skips_location() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut task = StartupTask::spawn(
            Box::new(FixedPermission(PermissionStatus::Denied)),
            Box::new(CountingLocation {
                calls: calls.clone(),
            }),
            || {},
        );
        let err = task.wait(WAIT).unwrap().unwrap_err();
        assert!(matches!(err, StartupError::PermissionDenied));
        assert_eq!(
            err.alert_message().as_deref(),
            Some("Permission to access location was denied")
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn location_failure_is_reported() {
        let mut task = StartupTask::spawn(
            Box::new(FixedPermission(PermissionStatus::Granted)),
            Box::new(ConfiguredLocation::new(
                Coordinate::new(0.0, 0.0),
                Duration::ZERO,
                false,
            )),
            || {},
        );
        let err = task.wait(WAIT).unwrap().unwrap_err();
        assert!(matches!(err, StartupError::Location(ServiceError::Unavailable)));
    }

    #[test]
    fn wake_fires_when_result_is_ready() {
        let woken = Arc::new(AtomicBool::new(false));
        let flag = woken.clone();
        let mut task = StartupTask::spawn(
            Box::new(FixedPermission(PermissionStatus::Granted)),
            sf_location(Duration::ZERO),
            move || flag.store(true, Ordering::SeqCst),
        );
        assert!(task.wait(WAIT).is_some());
        thread::sleep(Duration::from_millis(20));
        assert!(woken.load(Ordering::SeqCst));
    }

    #[test]
    fn cancelled_task_never_delivers() {
        let mut task = StartupTask::spawn(
            Box::new(FixedPermission(PermissionStatus::Granted)),
            sf_location(Duration::from_millis(200)),
            || {},
        );
        task.cancel();
        thread::sleep(Duration::from_millis(400));
        assert!(task.poll().is_none());
        assert!(task.wait(Duration::from_millis(50)).is_none());
    }

    #[test]
    fn dropping_the_task_cancels_the_worker() {
        let task = StartupTask::spawn(
            Box::new(FixedPermission(PermissionStatus::Granted)),
            sf_location(Duration::from_secs(30)),
            || {},
        );
        let token = task.cancel_token();
        assert!(!token.is_cancelled());
        drop(task);
        assert!(token.is_cancelled());
    }

    struct PanickingPermission;

    impl PermissionService for PanickingPermission {
        fn request_foreground(&mut self, _: &CancelToken) -> Result<PermissionStatus, ServiceError> {
            panic!("permission backend crashed");
        }
    }

    #[test]
    fn worker_dying_without_a_result_is_reported_once() {
        let mut task = StartupTask::spawn(
            Box::new(PanickingPermission),
            sf_location(Duration::ZERO),
            || {},
        );
        let deadline = Instant::now() + WAIT;
        let result = loop {
            if let Some(result) = task.poll() {
                break result;
            }
            assert!(Instant::now() < deadline, "worker never finished");
            thread::sleep(Duration::from_millis(10));
        };
        let err = result.unwrap_err();
        assert!(matches!(err, StartupError::Interrupted));
        assert_eq!(
            err.alert_message().as_deref(),
            Some("location lookup stopped unexpectedly")
        );
    }

    #[test]
    fn cancellation_error_has_no_alert() {
        assert!(StartupError::Cancelled.alert_message().is_none());
        let located = StartupError::Location(ServiceError::Unavailable);
        assert_eq!(
            located.alert_message().as_deref(),
            Some("could not determine your current location: location services are unavailable")
        );
    }
}
