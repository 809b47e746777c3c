//! Client-side application state.
//!
//! `AppState` is plain data changed only through `state::apply`. `ClientStore`
//! owns one instance, writes a snapshot after every mutation and runs the
//! alert timers.

#[cfg(not(target_arch = "wasm32"))]
pub mod alerts;
pub mod state;

#[cfg(not(target_arch = "wasm32"))]
pub use native::ClientStore;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::alerts::AlertScheduler;
    use super::state::{self, AlertStatus, AppState, Mutation};
    use crate::config::ALERT_EXPIRY;
    use crate::core::store::KvStore;

    pub struct ClientStore<S: KvStore> {
        store: S,
        state: Arc<Mutex<AppState>>,
        alerts: AlertScheduler,
    }

    impl<S: KvStore> ClientStore<S> {
        /// Restore from the snapshot in `store`, if any.
        pub fn load(store: S) -> anyhow::Result<Self> {
            Self::load_with_alert_delay(store, ALERT_EXPIRY)
        }

        pub fn load_with_alert_delay(store: S, delay: Duration) -> anyhow::Result<Self> {
            let state = state::load(&store)?;
            Ok(Self {
                store,
                state: Arc::new(Mutex::new(state)),
                alerts: AlertScheduler::new(delay),
            })
        }

        pub fn commit(&self, mutation: Mutation) -> anyhow::Result<()> {
            let mut guard = self
                .state
                .lock()
                .map_err(|_| anyhow::anyhow!("client state lock poisoned"))?;
            let current = std::mem::take(&mut *guard);
            *guard = state::apply(current, mutation);
            state::save(&self.store, &guard)
        }

        pub fn alert(&self, message: &str, status: AlertStatus) -> anyhow::Result<()> {
            self.alerts.raise(&self.state, message, status)
        }

        pub fn snapshot(&self) -> anyhow::Result<AppState> {
            self.state
                .lock()
                .map(|state| state.clone())
                .map_err(|_| anyhow::anyhow!("client state lock poisoned"))
        }

        /// Drop the persisted snapshot, as closing the browser does.
        pub fn close(self) -> anyhow::Result<()> {
            state::clear(&self.store)
        }
    }

}
