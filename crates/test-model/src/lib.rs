//! A local fake reply provider for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use heso_model::{
    ErrorKind, Reply, ReplyProvider, ReplyProviderError, ReplyRequest,
};
use tokio::sync::Semaphore;
use tokio::time::sleep;

pub use preset::*;

/// Error type for [`TestReplyProvider`].
#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Error {
    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl ReplyProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Holds back replies of a gated [`TestReplyProvider`] until released.
#[derive(Clone, Debug)]
pub struct ReplyGate(Arc<Semaphore>);

impl ReplyGate {
    /// Lets `count` more requests settle.
    #[inline]
    pub fn release(&self, count: usize) {
        self.0.add_permits(count);
    }
}

/// A local fake reply provider for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// provider should settle each request. Presets are consumed in order, one
/// per request, no matter what the request contains. If the script runs
/// out, requests fail with [`ErrorKind::Other`].
///
/// Clones share the same script and request log.
///
/// # Note
///
/// This type is not optimized for production use, every request is copied
/// into the log. You should only use it for testing.
#[derive(Clone, Debug, Default)]
pub struct TestReplyProvider {
    script: Arc<Mutex<VecDeque<PresetReply>>>,
    requests: Arc<Mutex<Vec<ReplyRequest>>>,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
}

impl TestReplyProvider {
    /// Appends a preset to the script.
    #[inline]
    pub fn add_preset(&self, preset: PresetReply) {
        lock(&self.script).push_back(preset);
    }

    /// Appends a successful reply to the script.
    #[inline]
    pub fn add_reply<S: Into<String>>(&self, content: S) {
        self.add_preset(PresetReply::text(content));
    }

    /// Appends a failure to the script.
    #[inline]
    pub fn add_failure(&self, kind: PresetFailure) {
        self.add_preset(PresetReply::failure(kind));
    }

    /// Delays every reply by `duration`.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Makes every request wait for a permit from the returned gate
    /// before it settles.
    pub fn gate(&mut self) -> ReplyGate {
        let semaphore =
            Arc::clone(self.gate.get_or_insert_with(|| {
                Arc::new(Semaphore::new(0))
            }));
        ReplyGate(semaphore)
    }

    /// Returns all requests received so far.
    #[inline]
    pub fn requests(&self) -> Vec<ReplyRequest> {
        lock(&self.requests).clone()
    }
}

impl ReplyProvider for TestReplyProvider {
    type Error = crate::Error;

    fn send_request(
        &self,
        req: &ReplyRequest,
    ) -> impl Future<Output = Result<Reply, Self::Error>> + Send + 'static {
        lock(&self.requests).push(req.clone());
        let preset = lock(&self.script).pop_front();
        let delay = self.delay;
        let gate = self.gate.clone();

        async move {
            if let Some(gate) = gate {
                // The semaphore is never closed.
                if let Ok(permit) = gate.acquire_owned().await {
                    permit.forget();
                }
            }
            if let Some(delay) = delay {
                sleep(delay).await;
            }

            match preset {
                Some(PresetReply::Reply(reply)) => Ok(reply),
                Some(PresetReply::Failure(failure)) => Err(Error {
                    message: "preset failure",
                    kind: match failure {
                        PresetFailure::Transport => ErrorKind::Transport,
                        PresetFailure::RateLimitExceeded => {
                            ErrorKind::RateLimitExceeded
                        }
                        PresetFailure::Status => ErrorKind::Status,
                        PresetFailure::Malformed => ErrorKind::Malformed,
                        PresetFailure::Upstream => ErrorKind::Upstream,
                    },
                }),
                None => Err(Error {
                    message: "no enough presets",
                    kind: ErrorKind::Other,
                }),
            }
        }
    }
}

#[inline]
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
