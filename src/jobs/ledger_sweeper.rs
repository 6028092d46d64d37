// ==================== LEDGER SWEEPER ====================
// Periodically drops idempotency outcomes past their TTL and revoked token
// ids whose tokens have expired anyway.

use std::sync::Arc;
use tokio::time::{interval, Duration};

use crate::state::AppState;

const SWEEP_INTERVAL_SECS: u64 = 60;

/// Returns `(idempotency entries, revoked tokens)` removed
pub fn sweep(state: &AppState) -> (usize, usize) {
    let now = chrono::Utc::now().timestamp().max(0) as usize;
    (state.mutations.purge_expired(), state.revoked.purge_expired(now))
}

pub fn start_ledger_sweeper(state: Arc<AppState>) {
    log::info!("🧹 Starting ledger sweeper (every {}s)", SWEEP_INTERVAL_SECS);

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(SWEEP_INTERVAL_SECS));

        loop {
            ticker.tick().await;
            let (outcomes, tokens) = sweep(&state);
            if outcomes + tokens > 0 {
                log::debug!(
                    "🧹 Swept {} idempotency entries and {} revoked tokens",
                    outcomes, tokens
                );
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::MemoryStore;
    use crate::services::OutboxMailer;

    #[test]
    fn test_sweep_drops_only_expired_token_ids() {
        let state = AppState::new(
            AppConfig::for_tests(),
            Arc::new(MemoryStore::new()),
            Arc::new(OutboxMailer::new()),
        );
        state.revoked.revoke("old", 1);
        state.revoked.revoke("live", usize::MAX);

        let (_, tokens) = sweep(&state);
        assert_eq!(tokens, 1);
        assert!(state.revoked.is_revoked("live"));
    }
}
