//! Change notification.
//!
//! Every write to the trip store publishes a `Change` naming the table and the trip it touched.
//! Anything that shows derived data (balances, transfers, budget usage) subscribes and recomputes
//! from a fresh snapshot when a relevant change arrives. The settlement engine itself never sees
//! any of this.

use crate::error::Res;
use crate::model::TripId;
use crate::settle::Settlement;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, trace, warn};

/// How many undelivered changes a slow subscriber may fall behind before it starts missing them.
const FEED_CAPACITY: usize = 256;

/// The tables of the trip store.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Trips,
    TripMembers,
    Profiles,
    Pledges,
    ItineraryItems,
    Expenses,
    Budgets,
}

serde_plain::derive_display_from_serialize!(Table);
serde_plain::derive_fromstr_from_deserialize!(Table);

/// A notification that rows in `table` changed. `trip_id` is `None` when the change is not scoped
/// to a single trip, e.g. a profile update.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Change {
    pub table: Table,
    pub trip_id: Option<TripId>,
}

impl Change {
    pub fn new(table: Table, trip_id: &TripId) -> Self {
        Self {
            table,
            trip_id: Some(trip_id.clone()),
        }
    }

    pub fn global(table: Table) -> Self {
        Self {
            table,
            trip_id: None,
        }
    }

    /// Whether a settlement computed before this change may now be stale.
    pub fn affects_settlement(&self) -> bool {
        matches!(
            self.table,
            Table::Expenses | Table::Pledges | Table::TripMembers | Table::Profiles
        )
    }

    /// Whether this change could touch data of `trip_id`.
    pub fn concerns(&self, trip_id: &TripId) -> bool {
        match &self.trip_id {
            Some(id) => id == trip_id,
            None => true,
        }
    }
}

/// A publish/subscribe channel of `Change` notifications.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<Change>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    /// Publishes `change` to every current subscriber. Having no subscribers is fine.
    pub fn publish(&self, change: Change) {
        trace!("Publishing change to {} for {:?}", change.table, change.trip_id);
        let _ = self.sender.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.sender.subscribe()
    }
}

/// Remembers the last settlement computed for each trip until a relevant change arrives.
///
/// Pending changes are applied under the cache lock before every lookup, so a change published
/// before a lookup always evicts the entry it makes stale.
#[derive(Debug, Clone)]
pub struct SettlementCache {
    state: Arc<Mutex<CacheState>>,
}

#[derive(Debug)]
struct CacheState {
    entries: HashMap<TripId, Settlement>,
    changes: broadcast::Receiver<Change>,
}

impl CacheState {
    fn catch_up(&mut self) {
        loop {
            match self.changes.try_recv() {
                Ok(change) => self.invalidate(&change),
                Err(TryRecvError::Lagged(missed)) => {
                    warn!("Missed {missed} changes, dropping all cached settlements");
                    self.entries.clear();
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    fn invalidate(&mut self, change: &Change) {
        if !change.affects_settlement() {
            return;
        }
        match &change.trip_id {
            Some(trip_id) => {
                if self.entries.remove(trip_id).is_some() {
                    debug!("Settlement for trip {trip_id} invalidated by {}", change.table);
                }
            }
            None => self.entries.clear(),
        }
    }
}

impl SettlementCache {
    /// Creates an empty cache that listens to `feed` from now on.
    pub fn new(feed: &ChangeFeed) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                changes: feed.subscribe(),
            })),
        }
    }

    pub async fn get(&self, trip_id: &TripId) -> Option<Settlement> {
        let mut state = self.state.lock().await;
        state.catch_up();
        state.entries.get(trip_id).cloned()
    }

    /// Returns the cached settlement for `trip_id`, or runs `compute` and caches its result.
    ///
    /// The lock is held while `compute` runs. Changes published meanwhile stay queued and evict
    /// the new entry on the next access.
    pub async fn get_or_compute<F, Fut>(&self, trip_id: &TripId, compute: F) -> Res<Settlement>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Res<Settlement>>,
    {
        let mut state = self.state.lock().await;
        state.catch_up();
        if let Some(settlement) = state.entries.get(trip_id) {
            trace!("Using cached settlement for trip {trip_id}");
            return Ok(settlement.clone());
        }
        let settlement = compute().await?;
        state.entries.insert(trip_id.clone(), settlement.clone());
        Ok(settlement)
    }
}
