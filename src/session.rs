//! UI-facing session state
//!
//! A session holds the current capture, the processing state and the staged
//! result. Every job gets a ticket; publishing with a ticket from before the
//! last `reset` or `begin_job` is ignored, so a slow editorial call can never
//! overwrite a newer session.

use crate::{
    error::StudioError,
    types::{CapturedImage, ProcessingResult, ProcessingState},
};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Identifies one processing job within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobTicket(u64);

impl JobTicket {
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
struct SessionInner {
    epoch: u64,
    state: ProcessingState,
    captured: Option<CapturedImage>,
    result: Option<ProcessingResult>,
}

/// Shared session state, safe to hand to a spawned job behind an `Arc`
#[derive(Debug, Default)]
pub struct StudioSession {
    inner: Mutex<SessionInner>,
}

impl StudioSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store the image the next job will work on
    pub fn set_captured(&self, captured: CapturedImage) {
        self.lock().captured = Some(captured);
    }

    #[must_use]
    pub fn captured(&self) -> Option<CapturedImage> {
        self.lock().captured.clone()
    }

    #[must_use]
    pub fn state(&self) -> ProcessingState {
        self.lock().state.clone()
    }

    #[must_use]
    pub fn result(&self) -> Option<ProcessingResult> {
        self.lock().result.clone()
    }

    /// Start a job: bumps the epoch, clears the previous result and shows `message`
    pub fn begin_job<S: Into<String>>(&self, message: S) -> JobTicket {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.result = None;
        inner.state = ProcessingState::loading(message);
        JobTicket(inner.epoch)
    }

    /// Whether `ticket` still belongs to the current job
    #[must_use]
    pub fn is_current(&self, ticket: JobTicket) -> bool {
        self.lock().epoch == ticket.0
    }

    /// Replace the result and mark success; stale tickets are ignored
    pub fn publish(&self, ticket: JobTicket, result: ProcessingResult) -> bool {
        let mut inner = self.lock();
        if inner.epoch != ticket.0 {
            log::debug!("Ignoring result of stale job {} (current {})", ticket.0, inner.epoch);
            return false;
        }
        inner.result = Some(result);
        inner.state = ProcessingState::Success;
        true
    }

    /// Update the published result in place; stale tickets are ignored
    ///
    /// Does nothing and returns `false` when nothing was published yet.
    pub fn merge<F>(&self, ticket: JobTicket, update: F) -> bool
    where
        F: FnOnce(&mut ProcessingResult),
    {
        let mut inner = self.lock();
        if inner.epoch != ticket.0 {
            log::debug!("Ignoring late parts of stale job {}", ticket.0);
            return false;
        }
        match inner.result.as_mut() {
            Some(result) => {
                update(result);
                true
            }
            None => false,
        }
    }

    /// Show a failure for the current job; stale tickets are ignored
    pub fn fail(&self, ticket: JobTicket, error: &StudioError) -> bool {
        let mut inner = self.lock();
        if inner.epoch != ticket.0 {
            return false;
        }
        inner.state = ProcessingState::from_error(error);
        true
    }

    /// Dismiss an error without touching the capture or result
    pub fn clear_error(&self) {
        let mut inner = self.lock();
        if matches!(inner.state, ProcessingState::Error { .. }) {
            inner.state = ProcessingState::Idle;
        }
    }

    /// Back to a blank session; any running job becomes stale
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.state = ProcessingState::Idle;
        inner.captured = None;
        inner.result = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::RecoveryAction, types::StageOutcome};
    use image::DynamicImage;

    fn treated_result() -> ProcessingResult {
        ProcessingResult {
            treated: StageOutcome::from_image(DynamicImage::new_rgba8(4, 4)),
            ..ProcessingResult::default()
        }
    }

    #[test]
    fn test_publish_then_merge() {
        let session = StudioSession::new();
        let ticket = session.begin_job("Iniciando Tratamento de Luxo...");
        assert!(session.state().is_loading());

        assert!(session.publish(ticket, treated_result()));
        assert_eq!(session.state(), ProcessingState::Success);
        assert!(session.result().unwrap().editorial.is_pending());

        assert!(session.merge(ticket, |r| {
            r.editorial = StageOutcome::from_image(DynamicImage::new_rgba8(2, 2));
        }));
        assert!(session.result().unwrap().editorial.is_ready());
    }

    #[test]
    fn test_stale_ticket_is_ignored_after_reset() {
        let session = StudioSession::new();
        let old = session.begin_job("loading");
        session.reset();

        assert!(!session.publish(old, treated_result()));
        assert!(!session.merge(old, |_| panic!("must not run")));
        assert!(!session.fail(old, &StudioError::generation("late")));
        assert_eq!(session.state(), ProcessingState::Idle);
        assert!(session.result().is_none());
    }

    #[test]
    fn test_new_job_supersedes_old_one() {
        let session = StudioSession::new();
        let first = session.begin_job("first");
        let second = session.begin_job("second");
        assert!(!session.is_current(first));
        assert!(session.is_current(second));
        assert!(session.publish(second, treated_result()));
        assert!(!session.publish(first, ProcessingResult::default()));
        assert!(session.result().unwrap().treated.is_ready());
    }

    #[test]
    fn test_fail_sets_localized_error() {
        let session = StudioSession::new();
        let ticket = session.begin_job("loading");
        assert!(session.fail(ticket, &StudioError::generation("boom")));
        match session.state() {
            ProcessingState::Error { message, recovery } => {
                assert!(message.starts_with("Falha ao processar imagem"));
                assert_eq!(recovery, RecoveryAction::Retry);
            }
            other => panic!("unexpected state {other:?}"),
        }
        session.clear_error();
        assert_eq!(session.state(), ProcessingState::Idle);
    }
}
