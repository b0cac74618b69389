//! Pacing between provider requests

use super::{Quote, QuoteError, QuoteProvider};
use async_trait::async_trait;
use std::time::Duration;

/// Waits after every external call so the provider's rate limit is respected
#[async_trait]
pub trait RequestPacer: Send + Sync {
    async fn pause(&self);
}

/// Fixed sleep after each request
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl RequestPacer for FixedDelay {
    async fn pause(&self) {
        if self.delay.is_zero() {
            return;
        }
        log::debug!("Waiting {:?} before next request", self.delay);
        tokio::time::sleep(self.delay).await;
    }
}

/// No waiting at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl RequestPacer for NoDelay {
    async fn pause(&self) {}
}

/// Provider wrapper that pauses after every call, successful or not
pub struct Paced<'a, P: ?Sized, R: ?Sized> {
    inner: &'a P,
    pacer: &'a R,
}

impl<'a, P: ?Sized, R: ?Sized> Paced<'a, P, R> {
    pub fn new(inner: &'a P, pacer: &'a R) -> Self {
        Self { inner, pacer }
    }
}

#[async_trait]
impl<'a, P, R> QuoteProvider for Paced<'a, P, R>
where
    P: QuoteProvider + ?Sized,
    R: RequestPacer + ?Sized,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let result = self.inner.fetch_quote(symbol).await;
        self.pacer.pause().await;
        result
    }
}
