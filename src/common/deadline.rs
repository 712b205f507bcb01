use std::future::Future;

use tokio::time::{Duration, timeout};
use tokio_util::sync::CancellationToken;

use crate::error::{CalDavError, Result};

/// Run `op` under a single deadline.
///
/// `op` receives the token to thread through every transport call it makes. The
/// timer is armed here and dropped with the `timeout` future whichever way it
/// resolves; on expiry the token is cancelled so in-flight exchanges stop too.
pub async fn with_deadline<T, F, Fut>(limit: Duration, op: F) -> Result<T>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let cancel = CancellationToken::new();
    match timeout(limit, op(cancel.clone())).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CalDavError::from_anyhow(err)),
        Err(_) => {
            cancel.cancel();
            Err(CalDavError::Timeout)
        }
    }
}
