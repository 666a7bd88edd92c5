//! In-memory session store
//!
//! One session per sender, each behind its own async mutex so that at most
//! one transition runs per sender while different senders proceed
//! independently. The outer map lock is only held long enough to find or
//! create a sender's slot. Nothing here survives a restart.

use crate::report::WasteAttributes;
use crate::state_machine::ConvState;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Conversation progress of one sender
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub sender_id: String,
    pub state: ConvState,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn description(&self) -> Option<&WasteAttributes> {
        self.state.description()
    }

    pub fn image_ref(&self) -> Option<&str> {
        self.state.image_ref()
    }

    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        chrono::Duration::from_std(ttl).is_ok_and(|ttl| now - self.updated_at > ttl)
    }
}

type Slot = Arc<AsyncMutex<Option<Session>>>;

/// Exclusive access to one sender's session for the duration of a transition
pub struct SessionGuard {
    sender_id: String,
    slot: OwnedMutexGuard<Option<Session>>,
}

impl SessionGuard {
    pub fn session(&self) -> Option<&Session> {
        self.slot.as_ref()
    }

    /// Store `state` as the sender's current position
    pub fn commit(&mut self, state: ConvState) {
        *self.slot = Some(Session {
            sender_id: self.sender_id.clone(),
            state,
            updated_at: Utc::now(),
        });
    }

    /// Forget the sender; their next message starts a new conversation
    pub fn clear(&mut self) {
        *self.slot = None;
    }
}

/// Session store shared by all webhook requests
#[derive(Default)]
pub struct SessionStore {
    slots: Mutex<HashMap<String, Slot>>,
    /// Idle sessions older than this are discarded. `None` keeps them forever.
    ttl: Option<Duration>,
}

impl SessionStore {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn slot(&self, sender_id: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(sender_id.to_string()).or_default().clone()
    }

    /// Wait for exclusive access to a sender's session
    pub async fn lock(&self, sender_id: &str) -> SessionGuard {
        let mut slot = self.slot(sender_id).lock_owned().await;
        if let Some(ttl) = self.ttl {
            if slot.as_ref().is_some_and(|s| s.is_expired(ttl, Utc::now())) {
                tracing::info!(sender = %sender_id, "Session expired");
                *slot = None;
            }
        }
        SessionGuard {
            sender_id: sender_id.to_string(),
            slot,
        }
    }

    /// Drop a sender's slot once it is empty and nobody else holds or awaits it.
    /// Call after the sender's guard has been dropped.
    pub fn release(&self, sender_id: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = slots.get(sender_id).is_some_and(|slot| {
            Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|session| session.is_none())
        });
        if idle {
            slots.remove(sender_id);
        }
    }

    #[cfg(test)]
    pub fn slot_count(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Snapshot of a sender's session
    #[cfg(test)]
    pub async fn get(&self, sender_id: &str) -> Option<Session> {
        self.lock(sender_id).await.session().cloned()
    }

    /// Number of live sessions (slots currently locked are counted as live)
    pub fn active_count(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .values()
            .filter(|slot| slot.try_lock().map_or(true, |s| s.is_some()))
            .count()
    }

    /// Drop empty and expired slots nobody is using. Returns how many went.
    pub fn prune(&self) -> usize {
        let now = Utc::now();
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let before = slots.len();
        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let Ok(session) = slot.try_lock() else {
                return true;
            };
            match (session.as_ref(), self.ttl) {
                (None, _) => false,
                (Some(s), Some(ttl)) => !s.is_expired(ttl, now),
                (Some(_), None) => true,
            }
        });
        before - slots.len()
    }
}

/// Periodically prune the store. Only useful when a TTL is configured.
pub fn spawn_expiry_sweeper(
    store: Arc<SessionStore>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = store.prune();
            if removed > 0 {
                tracing::info!(removed, remaining = store.active_count(), "Pruned idle sessions");
            }
        }
    })
}
