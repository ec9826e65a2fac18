//! Cancellable timers owned by a session actor
//!
//! Session logic never sleeps. It queues `TimerRequest`s; the actor turns
//! them into spawned sleeps that post back to the actor's inbox when they
//! elapse. Dropping the `TimerSet` aborts everything still pending.

use ahash::AHashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::types::PlayerId;
use crate::state::TurnStep;

/// What a timer is for. Keys carry the turn they belong to so a late firing
/// from a previous turn is recognisably stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    AutoReady { turn: u32, step: TurnStep },
    ExpansionRing { turn: u32 },
    BattleTick { turn: u32 },
    NewTurnCooldown { turn: u32 },
    DisconnectGrace(PlayerId),
}

/// A change to the set of pending timers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerRequest {
    /// Start (or restart) the timer for `key`
    Start { key: TimerKey, delay: Duration },
    Cancel(TimerKey),
}

/// Notification that a timer elapsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired {
    pub key: TimerKey,
    generation: u64,
}

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Pending timers of one session
pub struct TimerSet {
    pending: AHashMap<TimerKey, Pending>,
    fired_tx: mpsc::UnboundedSender<Fired>,
    next_generation: u64,
}

impl TimerSet {
    pub fn new(fired_tx: mpsc::UnboundedSender<Fired>) -> Self {
        Self {
            pending: AHashMap::new(),
            fired_tx,
            next_generation: 0,
        }
    }

    pub fn apply(&mut self, request: TimerRequest) {
        match request {
            TimerRequest::Start { key, delay } => self.start(key, delay),
            TimerRequest::Cancel(key) => self.cancel(&key),
        }
    }

    pub fn start(&mut self, key: TimerKey, delay: Duration) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let tx = self.fired_tx.clone();
        let fired = Fired {
            key: key.clone(),
            generation,
        };
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(fired);
        });
        if let Some(previous) = self.pending.insert(key, Pending { generation, handle }) {
            previous.handle.abort();
        }
    }

    pub fn cancel(&mut self, key: &TimerKey) {
        if let Some(pending) = self.pending.remove(key) {
            pending.handle.abort();
        }
    }

    /// Accept a firing. Returns false if the timer was cancelled or restarted
    /// after this firing was queued.
    pub fn take_fired(&mut self, fired: &Fired) -> bool {
        match self.pending.get(&fired.key) {
            Some(pending) if pending.generation == fired.generation => {
                self.pending.remove(&fired.key);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, key: &TimerKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn cancel_all(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.handle.abort();
        }
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
