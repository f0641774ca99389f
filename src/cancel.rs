//! Cancellation for long-running loops.
//!
//! A [`CancelSource`] is held by whoever may stop the work; the loop holds a
//! [`CancelToken`]. Tokens are cheap to clone and can be checked synchronously
//! from blocking code or awaited from async code.
//!
//! ```rust
//! use rpi_components::cancel::CancelSource;
//!
//! let source = CancelSource::new();
//! let token = source.token();
//! assert!(!token.is_cancelled());
//! source.cancel();
//! assert!(token.is_cancelled());
//! ```

use tokio::sync::watch;

/// Owning side of a cancellation signal
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// New token observing this source
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: Some(self.tx.subscribe()),
        }
    }

    /// Signal every token. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observing side of a cancellation signal
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Resolve once the source is cancelled.
    ///
    /// A dropped source without cancellation never resolves.
    pub async fn cancelled(&mut self) {
        let Some(rx) = self.rx.as_mut() else {
            return std::future::pending().await;
        };
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_never_token() {
        assert!(!CancelToken::never().is_cancelled());
    }

    #[test]
    fn test_cancel_reaches_clones() {
        let source = CancelSource::new();
        let a = source.token();
        let b = a.clone();
        source.cancel();
        source.cancel();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert!(source.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves() {
        let source = CancelSource::new();
        let mut token = source.token();
        let waiter = tokio::spawn(async move { token.cancelled().await });
        tokio::time::sleep(Duration::from_millis(5)).await;
        source.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_source_does_not_resolve() {
        let source = CancelSource::new();
        let mut token = source.token();
        drop(source);
        let result = tokio::time::timeout(Duration::from_millis(20), token.cancelled()).await;
        assert!(result.is_err());
    }
}
