//! Scan configuration.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Result, ScanError};

/// Default number of transaction bodies fetched concurrently.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default signature page size.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Default cap on signatures enumerated for one address.
pub const DEFAULT_MAX_SIGNATURES: usize = 1000;

/// Configuration for scan behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Transaction bodies fetched concurrently per group.
    pub batch_size: usize,
    /// Signatures requested per page.
    pub page_size: usize,
    /// Upper bound on signatures enumerated per address.
    pub max_signatures: usize,
    /// Retry policy for single-account fetches.
    pub retry: RetryPolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            max_signatures: DEFAULT_MAX_SIGNATURES,
            retry: RetryPolicy::default(),
        }
    }
}

impl ScanConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_signatures(mut self, max_signatures: usize) -> Self {
        self.max_signatures = max_signatures;
        self
    }
}

/// Fixed attempt count, fixed delay. No growth, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// Run `op` until it succeeds or attempts run out.
    ///
    /// Only ledger errors are retried; the last one is returned. Both the
    /// call in flight and the wait between attempts observe `cancel`.
    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ScanError::Cancelled),
                outcome = op() => outcome,
            };
            match outcome {
                Err(ScanError::Ledger(e)) if attempt < attempts => {
                    tracing::warn!(attempt, attempts, error = %e, "ledger call failed, retrying");
                    attempt += 1;
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(ScanError::Cancelled),
                        _ = tokio::time::sleep(self.delay) => {}
                    }
                }
                other => return other,
            }
        }
    }
}
