//! Request-scoped cancellation.
//!
//! Every provider operation receives a [`Context`]. The [`CancelHandle`] that created it is held
//! by whoever owns the request (the HTTP handler future, or a CLI command); cancelling or
//! dropping the handle cancels every clone of the context.

use crate::provider::ProviderError;
use std::future::Future;
use tokio::sync::watch;

/// A cloneable cancellation signal.
#[derive(Clone, Debug)]
pub struct Context {
    signal: Option<watch::Receiver<bool>>,
}

/// Owner of a [`Context`]'s cancellation signal. Dropping the handle cancels the context.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl Context {
    /// Create a cancellable context and the handle that controls it.
    #[must_use]
    pub fn new() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { signal: Some(rx) }, CancelHandle { tx })
    }

    /// A context that is never cancelled.
    #[must_use]
    pub fn background() -> Self {
        Self { signal: None }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match &self.signal {
            None => false,
            Some(rx) => *rx.borrow() || rx.has_changed().is_err(),
        }
    }

    /// Resolves once the context is cancelled. Never resolves for [`Context::background`].
    pub async fn cancelled(&self) {
        let Some(rx) = &self.signal else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            // The sender is gone: the owner of the request went away.
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Race `operation` against cancellation, returning [`ProviderError::Cancelled`] if the
    /// context is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error, or [`ProviderError::Cancelled`].
    pub async fn run<T, F>(&self, operation: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        if self.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        tokio::select! {
            biased;
            () = self.cancelled() => Err(ProviderError::Cancelled),
            res = operation => res,
        }
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_interrupts_pending_operation() {
        let (ctx, handle) = Context::new();
        let task = tokio::spawn({
            let ctx = ctx.clone();
            async move {
                ctx.run(async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok::<_, ProviderError>(())
                })
                .await
            }
        });
        handle.cancel();
        let res = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("operation should stop promptly")
            .unwrap();
        assert!(matches!(res, Err(ProviderError::Cancelled)));
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn dropping_handle_cancels() {
        let (ctx, handle) = Context::new();
        assert!(!ctx.is_cancelled());
        drop(handle);
        assert!(ctx.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), ctx.cancelled())
            .await
            .expect("cancelled() should resolve");
    }

    #[tokio::test]
    async fn background_runs_to_completion() {
        let ctx = Context::background();
        let res = ctx.run(async { Ok::<_, ProviderError>(7) }).await;
        assert_eq!(res.unwrap(), 7);
        assert!(!ctx.is_cancelled());
    }
}
