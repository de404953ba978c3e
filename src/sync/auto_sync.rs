//! Auto-sync for CLI commands.
//!
//! Runs a reconciliation pass before read commands when `remote.auto_sync`
//! is enabled, so the cached views start out fresh.

use tracing::{debug, warn};

use super::{CancelToken, SyncEngine, SyncError};
use crate::config::Config;

/// Performs a sync pass if auto-sync is enabled.
///
/// Errors are logged and ignored: the CLI keeps working from the local
/// cache when the remote is unreachable. Returns whether a pass completed.
pub async fn try_auto_sync(config: &Config, engine: &SyncEngine) -> bool {
    if !config.remote.auto_sync {
        return false;
    }

    match engine.run(&CancelToken::new()).await {
        Ok(report) => {
            debug!(routines = report.routines, "Auto-sync complete");
            true
        }
        Err(SyncError::NotAuthenticated) => {
            // No account configured yet
            false
        }
        Err(e) => {
            warn!("Auto-sync: {}", e);
            false
        }
    }
}
