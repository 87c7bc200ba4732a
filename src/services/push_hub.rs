//! Process-local push hub: per-subject fan-out with independent bounded
//! queues.
//!
//! Grounded on the teacher's `services/event_bus.rs` (tagged `UnifiedEvent`
//! enum broadcast to all subscribers). That hub uses a single
//! `tokio::sync::broadcast::channel`, which gives every subscriber the same
//! lag-drop behavior coupled together. Subject-scoped, independently backed
//! off subscribers need per-subscriber backpressure, so each subscription
//! here gets its own bounded `mpsc` channel instead.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, RwLock};

const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// A subscription's filter. `All` matches every published event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Subject {
    All,
    Chat(String),
    Worker(String),
    Swarm(String),
}

/// Push-channel event shapes, per the kernel's external interface. Every
/// variant carries the primary ids it mutates; clients reconcile by
/// re-reading the canonical entity rather than trusting the event payload
/// as a full snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    WorkerSpawned { handle: String },
    WorkerDismissed { handle: String },
    WorkerRestarted { handle: String },
    WorkerExit { handle: String, code: Option<i32> },
    WorkerOutput { handle: String, line: String },
    SwarmCreated { swarm_id: String },
    SwarmKilled { swarm_id: String },
    SpawnQueued { item_id: String },
    SpawnApproved { item_id: String },
    SpawnSpawned { item_id: String, handle: String },
    SpawnRejected { item_id: String, reason: String },
    PheromoneDeposit { swarm_id: String, resource: String },
    BeliefUpdated { swarm_id: String, subject: String },
    CreditsTransfer { from_handle: String, to_handle: String, amount: f64 },
    ConsensusProposal { proposal_id: String },
    ConsensusVote { proposal_id: String, voter_handle: String },
    ConsensusResult { proposal_id: String, passed: bool },
    BiddingBid { task_id: String, bidder_handle: String },
    BiddingAccepted { task_id: String, bidder_handle: String },
    BiddingAuctionComplete { task_id: String, winner_handle: Option<String> },
    CompoundIterationStart { run_id: String, iteration: u32 },
    CompoundIterationComplete { run_id: String, iteration: u32 },
    CompoundSucceeded { run_id: String },
    CompoundFailed { run_id: String, reason: String },
    /// Synthetic, injected by the subscriber's own read path. Not published
    /// by any caller; signals that events were dropped since the last read.
    Lagged,
}

impl Event {
    /// The subject every event is at minimum delivered to, derived from its
    /// payload. Callers may additionally target `Chat`/`Worker`/`Swarm`
    /// subjects explicitly via [`PushHub::publish`]; this is only used to
    /// decide whether an `All` subscriber should see it, which is always.
    fn matches(&self, published_to: &Subject, subject: &Subject) -> bool {
        matches!(subject, Subject::All) || subject == published_to
    }
}

struct Subscription {
    id: u64,
    subjects: HashSet<Subject>,
    tx: mpsc::Sender<Event>,
    rx: Arc<Mutex<mpsc::Receiver<Event>>>,
    lagging: Arc<AtomicBool>,
}

/// Subject-keyed multicast hub. Cheaply cloneable; clones share the same
/// subscriber table.
#[derive(Clone)]
pub struct PushHub {
    subscriptions: Arc<RwLock<Vec<Subscription>>>,
    next_id: Arc<AtomicU64>,
    queue_capacity: usize,
}

impl Default for PushHub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl PushHub {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscriptions: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            queue_capacity,
        }
    }

    /// Register a new subscriber matching any of `subjects`.
    pub async fn subscribe(&self, subjects: impl IntoIterator<Item = Subject>) -> Subscriber {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let lagging = Arc::new(AtomicBool::new(false));
        let rx = Arc::new(Mutex::new(rx));

        self.subscriptions.write().await.push(Subscription {
            id,
            subjects: subjects.into_iter().collect(),
            tx,
            rx: rx.clone(),
            lagging: lagging.clone(),
        });

        Subscriber { hub: self.clone(), id, rx, lagging }
    }

    pub async fn unsubscribe(&self, id: u64) {
        self.subscriptions.write().await.retain(|s| s.id != id);
    }

    /// Non-blocking publish to every subscription matching `subject`. On a
    /// full queue, one stale item is discarded to make room rather than
    /// blocking the publisher or dropping the new event; the subscription
    /// is flagged lagging either way.
    pub async fn publish(&self, subject: Subject, event: Event) {
        let subscriptions = self.subscriptions.read().await;
        for sub in subscriptions.iter() {
            if !sub.subjects.iter().any(|s| event.matches(&subject, s)) {
                continue;
            }
            self.deliver(sub, event.clone()).await;
        }
    }

    async fn deliver(&self, sub: &Subscription, event: Event) {
        match sub.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                sub.lagging.store(true, Ordering::SeqCst);
                if let Ok(mut rx) = sub.rx.try_lock() {
                    rx.try_recv().ok();
                    let _ = sub.tx.try_send(event);
                }
                // If the receiver is locked by a concurrent read, the event
                // is dropped; the lagging flag still surfaces the loss.
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

/// A live subscription's read half. Dropping it does not unsubscribe; call
/// [`PushHub::unsubscribe`] explicitly (or let publishes fail silently
/// against a closed channel, which the hub tolerates).
pub struct Subscriber {
    hub: PushHub,
    id: u64,
    rx: Arc<Mutex<mpsc::Receiver<Event>>>,
    lagging: Arc<AtomicBool>,
}

impl Subscriber {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Read the next event. If events were dropped since the last read,
    /// returns a synthetic [`Event::Lagged`] first and clears the flag;
    /// the dropped events themselves are not recoverable.
    pub async fn recv(&self) -> Option<Event> {
        if self.lagging.swap(false, Ordering::SeqCst) {
            return Some(Event::Lagged);
        }
        self.rx.lock().await.recv().await
    }

    pub async fn unsubscribe(self) {
        self.hub.unsubscribe(self.id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn all_subscriber_receives_worker_subject_event() {
        let hub = PushHub::default();
        let sub = hub.subscribe([Subject::All]).await;
        hub.publish(
            Subject::Worker("alpha".into()),
            Event::WorkerSpawned { handle: "alpha".into() },
        )
        .await;
        let event = sub.recv().await.unwrap();
        assert!(matches!(event, Event::WorkerSpawned { handle } if handle == "alpha"));
    }

    #[tokio::test]
    async fn subscriber_only_sees_matching_subject() {
        let hub = PushHub::default();
        let sub = hub.subscribe([Subject::Worker("alpha".into())]).await;
        hub.publish(
            Subject::Worker("beta".into()),
            Event::WorkerSpawned { handle: "beta".into() },
        )
        .await;
        hub.publish(
            Subject::Worker("alpha".into()),
            Event::WorkerDismissed { handle: "alpha".into() },
        )
        .await;
        let event = sub.recv().await.unwrap();
        assert!(matches!(event, Event::WorkerDismissed { handle } if handle == "alpha"));
    }

    #[tokio::test]
    async fn overflow_sets_lagging_and_next_read_is_synthetic() {
        let hub = PushHub::new(2);
        let sub = hub.subscribe([Subject::All]).await;
        for _ in 0..5 {
            hub.publish(Subject::All, Event::SwarmCreated { swarm_id: "s1".into() }).await;
        }
        let first = sub.recv().await.unwrap();
        assert!(matches!(first, Event::Lagged));
    }

    #[tokio::test]
    async fn unsubscribe_stops_further_delivery() {
        let hub = PushHub::default();
        let sub = hub.subscribe([Subject::All]).await;
        let id = sub.id();
        sub.unsubscribe().await;
        hub.publish(Subject::All, Event::SwarmKilled { swarm_id: "s1".into() }).await;
        assert!(hub.subscriptions.read().await.iter().all(|s| s.id != id));
    }
}
