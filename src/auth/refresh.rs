//! Background token refresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use super::IdentityProvider;

/// Start the refresh task.
///
/// Every `every`, refreshes the provider's session when it expires within
/// `margin`. A rejected refresh ends the session (the provider emits
/// `SignedOut`); transport failures are retried on the next tick.
pub fn start_refresh_task(
    provider: Arc<dyn IdentityProvider>,
    every: Duration,
    margin: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting token refresh (interval: {} seconds, margin: {} seconds)",
            every.as_secs(),
            margin.as_secs()
        );

        let mut ticker = interval(every);

        loop {
            ticker.tick().await;

            match provider.refresh_session(margin).await {
                Ok(Some(_)) => debug!("Session checked"),
                Ok(None) => debug!("No session to refresh"),
                Err(e) => warn!("Token refresh failed: {}", e),
            }
        }
    })
}
