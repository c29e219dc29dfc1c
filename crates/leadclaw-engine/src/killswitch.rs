//! Kill-switch monitor — polls the operator control cell.
//!
//! RUN lets a phase proceed, PAUSE holds at the current phase boundary
//! until the cell changes, STOP winds the engine down. Reads fail open
//! to RUN (handled in the store adapter); only an explicit PAUSE or STOP
//! ever halts anything.

use std::sync::Arc;
use std::time::Duration;

use leadclaw_core::types::ControlSignal;
use leadclaw_store::StoreAdapter;
use tracing::info;

pub struct KillSwitchMonitor {
    adapter: Arc<StoreAdapter>,
    poll_interval: Duration,
}

impl KillSwitchMonitor {
    pub fn new(adapter: Arc<StoreAdapter>, poll_interval: Duration) -> Self {
        Self {
            adapter,
            poll_interval,
        }
    }

    /// One-shot read of the control cell.
    pub async fn current(&self) -> ControlSignal {
        self.adapter.control_signal().await
    }

    /// Block while the cell says PAUSE, then return the signal that ended
    /// the wait (`Run` or `Stop`). Called at every phase boundary.
    pub async fn gate(&self) -> ControlSignal {
        let mut paused = false;
        loop {
            match self.current().await {
                ControlSignal::Pause => {
                    if !paused {
                        info!(
                            "⏸️ Control cell says PAUSE, holding (poll every {:?})",
                            self.poll_interval
                        );
                        paused = true;
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
                signal => {
                    if paused {
                        info!("▶️ Pause lifted, control cell says {signal}");
                    }
                    return signal;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadclaw_core::config::StoreConfig;
    use leadclaw_store::MemoryStore;

    fn monitor(store: Arc<MemoryStore>) -> KillSwitchMonitor {
        let adapter = Arc::new(StoreAdapter::new(store, &StoreConfig::default()));
        KillSwitchMonitor::new(adapter, Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_run_and_stop_pass_through() {
        let store = Arc::new(MemoryStore::new());
        let m = monitor(store.clone());
        assert_eq!(m.gate().await, ControlSignal::Run);
        store.set_control("STOP").await;
        assert_eq!(m.gate().await, ControlSignal::Stop);
    }

    #[tokio::test]
    async fn test_unreadable_cell_fails_open() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_control(true).await;
        let m = monitor(store);
        assert_eq!(m.gate().await, ControlSignal::Run);
    }

    #[tokio::test]
    async fn test_gate_holds_through_pause() {
        let store = Arc::new(MemoryStore::new());
        store.set_control("PAUSE").await;
        let m = monitor(store.clone());

        let unblock = tokio::spawn({
            let store = store.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                store.set_control("STOP").await;
            }
        });

        let signal = m.gate().await;
        assert_eq!(signal, ControlSignal::Stop);
        unblock.await.unwrap();
    }
}
