//! Ambient execution context carried by every externally-facing operation.
//!
//! A [`RequestContext`] bundles the caller's identity (possibly absent), a
//! cancellation signal and an optional deadline. The core never invents a
//! principal: "no principal" is a valid, auditable state.

use std::future::Future;
use std::time::Duration;

use roster_types::PrincipalId;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why an operation stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    /// The caller asked the operation to stop.
    #[error("operation cancelled by caller")]
    Cancelled,

    /// The operation's own deadline passed.
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

/// Caller identity, cancellation signal and deadline for one operation.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    principal: Option<PrincipalId>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context with no principal, no deadline and a fresh cancellation signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context acting as the reserved system principal.
    pub fn system() -> Self {
        Self::new().with_principal(PrincipalId::SYSTEM)
    }

    /// Attach a principal.
    #[must_use]
    pub const fn with_principal(mut self, principal: PrincipalId) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Attach a deadline `timeout` from now. An earlier existing deadline wins.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now()
            .checked_add(timeout)
            .unwrap_or_else(Instant::now);
        self.deadline = Some(self.deadline.map_or(candidate, |d| d.min(candidate)));
        self
    }

    /// Replace the cancellation signal, e.g. with one owned by a server or pool.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Derive a context that is cancelled when this one is, but can also be
    /// cancelled on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            principal: self.principal,
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    /// The caller's principal, if any.
    pub const fn principal(&self) -> Option<PrincipalId> {
        self.principal
    }

    /// The deadline, if any.
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The cancellation signal.
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Signal cancellation to everything holding this context or a child.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fail fast if the context is already cancelled or past its deadline.
    ///
    /// # Errors
    ///
    /// Returns the [`Interrupted`] reason.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.cancel.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        if self.deadline.is_some_and(|d| d <= Instant::now()) {
            return Err(Interrupted::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolve once the context is cancelled or its deadline passes.
    pub async fn interrupted(&self) -> Interrupted {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = self.cancel.cancelled() => Interrupted::Cancelled,
                () = tokio::time::sleep_until(deadline) => Interrupted::DeadlineExceeded,
            },
            None => {
                self.cancel.cancelled().await;
                Interrupted::Cancelled
            }
        }
    }

    /// Drive `fut` to completion unless the context is interrupted first.
    /// On interruption `fut` is dropped.
    ///
    /// # Errors
    ///
    /// Returns the [`Interrupted`] reason if the context fired first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        self.check()?;
        tokio::select! {
            biased;
            reason = self.interrupted() => Err(reason),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelling_parent_interrupts_child() {
        let parent = RequestContext::new().with_principal(PrincipalId(7));
        let child = parent.child();
        parent.cancel();
        assert_eq!(child.check(), Err(Interrupted::Cancelled));
        assert_eq!(child.principal(), Some(PrincipalId(7)));
    }

    #[tokio::test]
    async fn cancelling_child_leaves_parent_running() {
        let parent = RequestContext::new();
        let child = parent.child();
        child.cancel();
        assert!(parent.check().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_distinguished_from_cancellation() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));
        let outcome = ctx.run(tokio::time::sleep(Duration::from_secs(5))).await;
        assert_eq!(outcome, Err(Interrupted::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_deadline_wins() {
        let ctx = RequestContext::new()
            .with_timeout(Duration::from_millis(10))
            .with_timeout(Duration::from_secs(60));
        let deadline = ctx.deadline().unwrap_or_else(Instant::now);
        assert!(deadline <= Instant::now() + Duration::from_millis(10));
    }

    #[test]
    fn system_context_carries_system_principal() {
        assert_eq!(RequestContext::system().principal(), Some(PrincipalId::SYSTEM));
        assert_eq!(RequestContext::new().principal(), None);
    }
}
