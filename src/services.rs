//! Platform services the map screen consumes: location permission and a
//! one-shot position fix.

use crate::coordinate::Coordinate;
use crate::startup::CancelToken;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("location services are unavailable")]
    Unavailable,
    #[error("the permission prompt was closed without an answer")]
    PromptClosed,
    #[error("request cancelled")]
    Cancelled,
}

pub trait PermissionService: Send {
    /// Asks for foreground location access. May block until the user answers.
    fn request_foreground(&mut self, cancel: &CancelToken)
        -> Result<PermissionStatus, ServiceError>;
}

pub trait LocationService: Send {
    /// Reads the current position once.
    fn current_position(&mut self, cancel: &CancelToken) -> Result<Coordinate, ServiceError>;
}

/// Answers every request with a preconfigured status.
pub struct FixedPermission(pub PermissionStatus);

impl PermissionService for FixedPermission {
    fn request_foreground(
        &mut self,
        _cancel: &CancelToken,
    ) -> Result<PermissionStatus, ServiceError> {
        info!(status = ?self.0, "location permission preconfigured");
        Ok(self.0)
    }
}

/// A pending question shown to the user; answering it unblocks the requester.
pub struct PromptRequest {
    reply: Sender<PermissionStatus>,
}

impl PromptRequest {
    pub fn answer(self, status: PermissionStatus) {
        // requester may already be gone after teardown
        let _ = self.reply.send(status);
    }
}

/// Requester half of the in-app permission prompt. Lives on the startup task.
pub struct PromptPermission {
    requests: Sender<PromptRequest>,
}

/// UI half of the in-app permission prompt.
pub struct PermissionPrompt {
    requests: Receiver<PromptRequest>,
    pending: Option<PromptRequest>,
}

pub fn permission_prompt() -> (PromptPermission, PermissionPrompt) {
    let (tx, rx) = mpsc::channel();
    (
        PromptPermission { requests: tx },
        PermissionPrompt {
            requests: rx,
            pending: None,
        },
    )
}

impl PermissionService for PromptPermission {
    fn request_foreground(
        &mut self,
        cancel: &CancelToken,
    ) -> Result<PermissionStatus, ServiceError> {
        let (reply, answer) = mpsc::channel();
        self.requests
            .send(PromptRequest { reply })
            .map_err(|_| ServiceError::PromptClosed)?;
        debug!("waiting for the user to answer the location prompt");

        loop {
            if cancel.is_cancelled() {
                return Err(ServiceError::Cancelled);
            }
            match answer.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(status) => return Ok(status),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(ServiceError::PromptClosed),
            }
        }
    }
}

impl PermissionPrompt {
    /// Picks up a newly arrived request, if any, and reports whether one is
    /// waiting for an answer.
    pub fn poll(&mut self) -> bool {
        if self.pending.is_none() {
            match self.requests.try_recv() {
                Ok(request) => self.pending = Some(request),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }
        }
        self.pending.is_some()
    }

    pub fn answer(&mut self, status: PermissionStatus) {
        if let Some(request) = self.pending.take() {
            info!(?status, "user answered the location prompt");
            request.answer(status);
        }
    }
}

/// Position source backed by configuration: a fixed fix, an optional
/// acquisition delay, and a switch to simulate an unavailable receiver.
pub struct ConfiguredLocation {
    fix: Coordinate,
    acquire_delay: Duration,
    available: bool,
}

impl ConfiguredLocation {
    pub fn new(fix: Coordinate, acquire_delay: Duration, available: bool) -> Self {
        Self {
            fix,
            acquire_delay,
            available,
        }
    }
}

impl LocationService for ConfiguredLocation {
    fn current_position(&mut self, cancel: &CancelToken) -> Result<Coordinate, ServiceError> {
        let deadline = Instant::now() + self.acquire_delay;
        while Instant::now() < deadline {
            if cancel.is_cancelled() {
                return Err(ServiceError::Cancelled);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            thread::sleep(remaining.min(CANCEL_POLL_INTERVAL));
        }
        if cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }

        if self.available {
            debug!(fix = %self.fix, "position acquired");
            Ok(self.fix)
        } else {
            Err(ServiceError::Unavailable)
        }
    }
}
