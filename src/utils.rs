//! Small async helpers shared across the session layer.

use std::future::Future;
use std::time::Duration;

use crate::error::WalletError;

/// Race a future against a deadline.
///
/// On expiry the future is dropped, not forcibly aborted at the provider
/// level; callers treat the result as failed and move on. Used by the silent
/// resume flow so a slow or stuck provider can never hang startup.
pub async fn race_timeout<F>(
	future: F,
	duration: Duration,
	operation: &str,
) -> Result<F::Output, WalletError>
where
	F: Future,
{
	tokio::time::timeout(duration, future)
		.await
		.map_err(|_| WalletError::timeout(operation))
}
