use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::state::{insert_alert, remove_alert, AlertStatus, AppState};

type Pending = Arc<Mutex<HashMap<String, (u64, JoinHandle<()>)>>>;

/// Timed alert removal, one task per alert message.
///
/// Re-raising a message that is still shown aborts its pending removal and
/// starts a fresh one, so at most one removal is ever queued per message.
/// Lock order is always `pending` then state.
pub struct AlertScheduler {
    delay: Duration,
    pending: Pending,
    generation: AtomicU64,
}

impl AlertScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Show `message` now and drop it after the delay. Fails without
    /// touching state when called outside a tokio runtime.
    pub fn raise(
        &self,
        state: &Arc<Mutex<AppState>>,
        message: &str,
        status: AlertStatus,
    ) -> anyhow::Result<()> {
        let runtime = Handle::try_current()
            .map_err(|e| anyhow::anyhow!("alerts need a tokio runtime: {}", e))?;

        let mut pending = self
            .pending
            .lock()
            .map_err(|_| anyhow::anyhow!("alert timers lock poisoned"))?;
        if let Some((_, previous)) = pending.remove(message) {
            previous.abort();
        }

        {
            let mut state = state
                .lock()
                .map_err(|_| anyhow::anyhow!("client state lock poisoned"))?;
            insert_alert(&mut state, message, status);
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let task = runtime.spawn(expire(
            Arc::clone(&self.pending),
            Arc::clone(state),
            message.to_string(),
            generation,
            self.delay,
        ));
        pending.insert(message.to_string(), (generation, task));
        tracing::debug!(message, ?status, "alert raised");
        Ok(())
    }

    /// Number of alerts still waiting to expire.
    pub fn pending(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl Drop for AlertScheduler {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            for (_, (_, task)) in pending.drain() {
                task.abort();
            }
        }
    }
}

async fn expire(
    pending: Pending,
    state: Arc<Mutex<AppState>>,
    message: String,
    generation: u64,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;

    let Ok(mut pending) = pending.lock() else {
        return;
    };
    // A newer raise of the same message owns the slot now.
    if pending.get(&message).map(|(g, _)| *g) != Some(generation) {
        return;
    }
    pending.remove(&message);
    if let Ok(mut state) = state.lock() {
        remove_alert(&mut state, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown(state: &Arc<Mutex<AppState>>, message: &str) -> bool {
        state.lock().unwrap().alerts.contains_key(message)
    }

    #[tokio::test]
    async fn alerts_expire_without_further_action() {
        let state = Arc::new(Mutex::new(AppState::default()));
        let scheduler = AlertScheduler::new(Duration::from_millis(50));

        scheduler.raise(&state, "Saved", AlertStatus::Success).unwrap();
        assert!(shown(&state, "Saved"));
        assert_eq!(scheduler.pending(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!shown(&state, "Saved"));
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn raising_again_restarts_the_timer() {
        let state = Arc::new(Mutex::new(AppState::default()));
        let scheduler = AlertScheduler::new(Duration::from_millis(200));

        scheduler.raise(&state, "Oops", AlertStatus::Error).unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        scheduler.raise(&state, "Oops", AlertStatus::Error).unwrap();
        assert_eq!(scheduler.pending(), 1);

        // Past the first deadline, before the second.
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(shown(&state, "Oops"));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(!shown(&state, "Oops"));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn raising_outside_a_runtime_is_an_error() {
        let state = Arc::new(Mutex::new(AppState::default()));
        let scheduler = AlertScheduler::new(Duration::from_millis(50));

        assert!(scheduler.raise(&state, "Saved", AlertStatus::Success).is_err());
        assert!(!shown(&state, "Saved"));
        assert_eq!(scheduler.pending(), 0);

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();
        scheduler.raise(&state, "Saved", AlertStatus::Success).unwrap();
        assert!(shown(&state, "Saved"));
        assert_eq!(scheduler.pending(), 1);
    }

    #[tokio::test]
    async fn distinct_messages_expire_independently() {
        let state = Arc::new(Mutex::new(AppState::default()));
        let scheduler = AlertScheduler::new(Duration::from_millis(50));

        scheduler.raise(&state, "one", AlertStatus::Success).unwrap();
        scheduler.raise(&state, "two", AlertStatus::Error).unwrap();
        assert_eq!(scheduler.pending(), 2);
        assert_eq!(state.lock().unwrap().alerts.get("two"), Some(&AlertStatus::Error));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(state.lock().unwrap().alerts.is_empty());
    }
}
