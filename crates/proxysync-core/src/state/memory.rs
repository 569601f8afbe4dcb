// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// State that doesn't persist across process restarts. Useful for tests and
// for throwaway runs where re-applying every record on the next invocation
// is acceptable.
//
// A restart loses the snapshot, so the first run afterwards sees an empty
// previous set and an absent public IP: every routable hostname is
// re-applied as a fresh create. Harmless, just not free in API calls.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{PersistedState, StateStore};

/// In-memory state store implementation
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<PersistedState>>,
    persist_count: Arc<AtomicUsize>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a snapshot
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
            persist_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of times `persist` has been called
    ///
    /// Lets tests assert that a no-op run wrote nothing.
    pub fn persist_count(&self) -> usize {
        self.persist_count.load(Ordering::SeqCst)
    }

    /// Snapshot of the current contents
    pub async fn snapshot(&self) -> PersistedState {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<PersistedState, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn persist(&self, state: &PersistedState) -> Result<(), Error> {
        self.persist_count.fetch_add(1, Ordering::SeqCst);
        *self.inner.write().await = state.clone();
        Ok(())
    }
}
