//! The Response Gatekeeper: a pure advisor invoked only in conference
//! mode, deciding whether the AI should respond to the latest turn.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::warn;

use crate::conversation::{Message, Speaker};

/// The advisor's verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub respond: bool,
    pub reason: String,
    pub confidence: f32,
}

impl Verdict {
    fn silent(reason: impl Into<String>) -> Self {
        Self {
            respond: false,
            reason: reason.into(),
            confidence: 0.0,
        }
    }
}

/// The gatekeeper advisor boundary contract. Implementations may
/// themselves use a language service; invocation is asynchronous and
/// cancellable so it never blocks the audio ingress path.
#[async_trait]
pub trait Advisor: Send + Sync {
    async fn advise(
        &self,
        recent_conversation: &[Message],
        last_speaker: Option<Speaker>,
    ) -> Verdict;
}

/// Wraps an [`Advisor`] with the bounded-timeout / silent-on-failure
/// policy the orchestrator relies on.
pub struct Gatekeeper<A: Advisor> {
    advisor: A,
    timeout: Duration,
}

impl<A: Advisor> Gatekeeper<A> {
    pub fn new(advisor: A, timeout: Duration) -> Self {
        Self { advisor, timeout }
    }

    /// Consult the advisor, bounded by `timeout`. On expiry or advisor
    /// failure, defaults to silent with confidence 0.
    pub async fn consult(
        &self,
        recent_conversation: &[Message],
        last_speaker: Option<Speaker>,
    ) -> Verdict {
        match timeout(
            self.timeout,
            self.advisor.advise(recent_conversation, last_speaker),
        )
        .await
        {
            Ok(verdict) => verdict,
            Err(_) => {
                warn!("gatekeeper advisor timed out; defaulting to silent");
                Verdict::silent("advisor timed out")
            }
        }
    }
}
