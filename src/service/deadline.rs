use std::future::Future;
use tokio::time::{Duration, Instant};

use crate::error::ServiceError;

/// Point in time by which an operation must finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Self(Instant::now() + duration)
    }

    /// The earlier of this deadline and `limit` from now
    pub fn bounded(self, limit: Duration) -> Self {
        Self(self.0.min(Instant::now() + limit))
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    /// Run `fut` to completion or fail with `Timeout` once the deadline passes.
    /// Dropping the returned future cancels `fut`.
    pub async fn run<F, T, E>(self, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<ServiceError>,
    {
        match tokio::time::timeout_at(self.0, fut).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(ServiceError::Timeout),
        }
    }
}
