//! Severity-driven error dispatcher.

use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{AppError, ErrorCode, Severity};

/// Number of handled error ids remembered for de-duplication.
const DEFAULT_MAX_REMEMBERED: usize = 1024;

/// A user-visible notification derived from an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub error_id: Uuid,
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    fn from_error(error: &AppError) -> Self {
        Self {
            error_id: error.id(),
            code: error.code(),
            severity: error.severity(),
            message: error.message().to_string(),
        }
    }
}

/// Sink for user-visible notifications (toasts, banners, ...).
///
/// Abstracted so the presentation layer can plug in its own surface.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// A notifier that only writes notices to the log.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn notify(&self, notice: &Notice) {
        tracing::info!(
            code = %notice.code,
            severity = %notice.severity,
            "Notify user: {}",
            notice.message
        );
    }
}

/// A notifier that keeps every notice in memory.
///
/// Useful for tests and for callers that drain notices on their own schedule.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices received so far.
    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).clone()
    }

    /// Remove and return all notices received so far.
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *lock(&self.notices))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        lock(&self.notices).push(notice.clone());
    }
}

/// What the handler did with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlingOutcome {
    /// A notice was sent to the notifier by this call.
    pub notified: bool,
    /// The caller may substitute cached or synthetic data.
    pub fallback_allowed: bool,
    /// The error had already been handled; nothing was reported again.
    pub duplicate: bool,
}

/// Single entry point for failures.
///
/// Policy:
/// - `High`: logged at error level, always notified, never a fallback.
/// - `Medium`: logged at warn level, notified, fallback permitted.
/// - `Low`: logged at info level only.
///
/// Handling is idempotent per error instance: a second call with the same
/// error (or a clone of it) reports nothing.
pub struct ErrorHandler {
    notifier: Arc<dyn Notifier>,
    /// Ids of handled errors, oldest first.
    handled: Mutex<IndexSet<Uuid>>,
    max_remembered: usize,
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new(Arc::new(LoggingNotifier))
    }
}

impl ErrorHandler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            handled: Mutex::new(IndexSet::new()),
            max_remembered: DEFAULT_MAX_REMEMBERED,
        }
    }

    /// Handle an error according to its severity.
    pub fn handle(&self, error: &AppError) -> HandlingOutcome {
        let fallback_allowed = error.severity() < Severity::High;

        {
            let mut handled = lock(&self.handled);
            if !handled.insert(error.id()) {
                return HandlingOutcome {
                    notified: false,
                    fallback_allowed,
                    duplicate: true,
                };
            }
            while handled.len() > self.max_remembered {
                handled.shift_remove_index(0);
            }
        }

        match error.severity() {
            Severity::Low => info!(
                code = %error.code(),
                context = ?error.context(),
                "{}",
                error.message()
            ),
            Severity::Medium => warn!(
                code = %error.code(),
                context = ?error.context(),
                "{}",
                error.message()
            ),
            Severity::High => error!(
                code = %error.code(),
                context = ?error.context(),
                "{}",
                error.message()
            ),
        }

        let notified = error.severity() >= Severity::Medium;
        if notified {
            self.notifier.notify(&Notice::from_error(error));
        }

        HandlingOutcome {
            notified,
            fallback_allowed,
            duplicate: false,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> (ErrorHandler, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        (ErrorHandler::new(notifier.clone()), notifier)
    }

    #[test]
    fn test_high_severity_notifies_without_fallback() {
        let (handler, notifier) = handler();
        let outcome = handler.handle(&AppError::auth("session expired"));

        assert!(outcome.notified);
        assert!(!outcome.fallback_allowed);
        assert_eq!(notifier.notices().len(), 1);
        assert_eq!(notifier.notices()[0].code, ErrorCode::AuthError);
    }

    #[test]
    fn test_medium_severity_notifies_with_fallback() {
        let (handler, notifier) = handler();
        let outcome = handler.handle(&AppError::database("connection refused"));

        assert!(outcome.notified);
        assert!(outcome.fallback_allowed);
        assert_eq!(notifier.notices().len(), 1);
    }

    #[test]
    fn test_low_severity_is_log_only() {
        let (handler, notifier) = handler();
        let outcome = handler.handle(&AppError::tts("voice unavailable"));

        assert!(!outcome.notified);
        assert!(notifier.notices().is_empty());
    }

    #[test]
    fn test_handling_is_idempotent() {
        let (handler, notifier) = handler();
        let err = AppError::api("boom");

        let first = handler.handle(&err);
        let second = handler.handle(&err.clone());

        assert!(!first.duplicate);
        assert!(second.duplicate);
        assert!(!second.notified);
        assert_eq!(notifier.notices().len(), 1);
    }

    #[test]
    fn test_distinct_errors_each_reported() {
        let (handler, notifier) = handler();
        handler.handle(&AppError::api("one"));
        handler.handle(&AppError::api("one"));

        assert_eq!(notifier.drain().len(), 2);
        assert!(notifier.notices().is_empty());
    }
}
