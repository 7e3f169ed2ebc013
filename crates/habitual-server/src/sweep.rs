use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, warn};

use habitual_api::AppStateInner;
use habitual_db::{Database, StoreResult};

/// Background task that derives missed check-in penalties for every user.
///
/// Derivation is idempotent, so overlapping with the dashboard trigger or a
/// restart mid-pass is harmless.
pub async fn run_sweep_loop(state: Arc<AppStateInner>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let today = chrono::Utc::now().date_naive();
        let state = state.clone();
        let result = tokio::task::spawn_blocking(move || sweep(&state.db, today)).await;

        match result {
            Ok(Ok((users, created))) => {
                if created > 0 {
                    info!("Sweep: {} penalties derived across {} users", created, users);
                }
            }
            Ok(Err(e)) => warn!("Sweep error: {}", e),
            Err(e) => warn!("Sweep task failed: {}", e),
        }
    }
}

/// One pass over all profiles. A failure for one user is logged and the pass
/// moves on. Returns `(users, penalties created)`.
pub fn sweep(db: &Database, as_of: NaiveDate) -> StoreResult<(usize, usize)> {
    let users = db.list_profile_ids()?;
    let mut created = 0;

    for user_id in &users {
        match db.derive_missed_penalties(*user_id, as_of) {
            Ok(report) => created += report.created,
            Err(e) => warn!("Sweep: derivation failed for {}: {}", user_id, e),
        }
    }

    Ok((users.len(), created))
}
