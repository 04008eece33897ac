//! Timeout wrapper for external calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{RagError, Result};

/// Run `future`, failing with [`RagError::Timeout`] if it takes longer than `limit`.
pub(crate) async fn within<T, F>(operation: &str, limit: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout_ms = limit.as_millis() as u64, "external call timed out");
            Err(RagError::Timeout { operation: operation.to_string(), timeout: limit })
        }
    }
}
