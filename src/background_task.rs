use tokio::time::{interval, Duration};

use crate::cache::InMemoryCounterStore;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically drops expired windows from the in-process counter store.
pub async fn start_sweep_task(store: InMemoryCounterStore) {
    let mut interval = interval(SWEEP_INTERVAL);

    loop {
        interval.tick().await;

        let removed = store.sweep();
        if removed > 0 {
            tracing::debug!("Swept {} expired rate limit windows ({} live)", removed, store.len());
        }
    }
}
