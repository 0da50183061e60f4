// context.rs: Request-scoped invocation context.
//
// Each Execute call gets its own ToolContext. It identifies the request and
// the actor, and carries the caller's cancellation token and deadline so
// tools can abandon in-flight I/O instead of finishing and discarding it.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Why a guarded future did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The caller cancelled the request.
    Cancelled,
    /// The request deadline passed.
    DeadlineExceeded,
}

#[derive(Debug, Clone)]
pub struct ToolContext {
    pub request_id: Uuid,
    /// Who is asking: an agent session id or an operator name.
    pub actor: String,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ToolContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            actor: actor.into(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Use the caller's cancellation token instead of a private one.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Set a deadline `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail fast if the request is already dead.
    ///
    /// Tools call this before their first external effect.
    pub fn ensure_active(&self) -> Result<(), Interrupt> {
        if self.is_cancelled() {
            Err(Interrupt::Cancelled)
        } else if self.deadline_passed() {
            Err(Interrupt::DeadlineExceeded)
        } else {
            Ok(())
        }
    }

    /// Drive `fut` until it completes, the request is cancelled, or the
    /// deadline passes, whichever comes first. The future is dropped on
    /// interruption, which aborts its I/O.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Interrupt>
    where
        F: Future,
    {
        self.ensure_active()?;
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(Interrupt::Cancelled),
                _ = tokio::time::sleep_until(deadline) => Err(Interrupt::DeadlineExceeded),
                out = fut => Ok(out),
            },
            None => tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(Interrupt::Cancelled),
                out = fut => Ok(out),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_completes_when_active() {
        let ctx = ToolContext::new("tester");
        let out = ctx.run(async { 41 + 1 }).await;
        assert_eq!(out, Ok(42));
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let ctx = ToolContext::new("tester");
        ctx.cancellation_token().cancel();
        let out = ctx.run(std::future::pending::<()>()).await;
        assert_eq!(out, Err(Interrupt::Cancelled));
    }

    #[tokio::test]
    async fn run_stops_at_deadline() {
        let ctx = ToolContext::new("tester").with_timeout(Duration::from_millis(10));
        let out = ctx.run(std::future::pending::<()>()).await;
        assert_eq!(out, Err(Interrupt::DeadlineExceeded));
    }

    #[tokio::test]
    async fn shared_token_cancels_child_context() {
        let token = CancellationToken::new();
        let ctx = ToolContext::new("tester").with_cancellation(token.child_token());
        assert!(ctx.ensure_active().is_ok());
        token.cancel();
        assert_eq!(ctx.ensure_active(), Err(Interrupt::Cancelled));
    }
}
