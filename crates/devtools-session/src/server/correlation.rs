//! Correlation tables
//!
//! Two keyed tables hold what is in flight on a session: pending acks (request
//! id → waiter) and pending events (identity key → waiter). Each table also
//! keeps a delivered store, so a payload that arrives before anyone waits for
//! it is retained until claimed.
//!
//! A payload handed to a registered waiter is consumed and not retained.
//! Everything else is stored; a newer payload for the same key replaces the
//! older one.

use crate::error::{Error, Result};
use crate::server::codec::{Ack, Notification};
use crate::server::identity::IdentityKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tokio::sync::oneshot;

/// What happened to a resolved payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Handed to the registered waiter
    Delivered,
    /// Nobody was waiting; kept in the delivered store
    Stored,
}

struct TableState<K, V> {
    next_token: u64,
    waiters: HashMap<K, (u64, oneshot::Sender<V>)>,
    delivered: HashMap<K, V>,
}

/// One keyed table with its delivered store
pub struct Table<K, V> {
    label: &'static str,
    state: Mutex<TableState<K, V>>,
}

/// Result of [`Table::claim`]
pub enum Claim<'a, K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    /// The payload had already arrived
    Ready(V),
    /// Nothing yet; a waiter is now registered
    Waiting(Waiter<'a, K, V>),
}

impl<K, V> Table<K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            state: Mutex::new(TableState {
                next_token: 0,
                waiters: HashMap::new(),
                delivered: HashMap::new(),
            }),
        }
    }

    /// Registers a waiter for `key` without looking at the delivered store.
    ///
    /// Fails with [`Error::DuplicateWaiter`] if a live waiter already exists.
    pub fn register_waiter(&self, key: K) -> Result<Waiter<'_, K, V>> {
        let mut state = self.state.lock();
        self.register_locked(&mut state, key)
    }

    /// Takes the delivered payload for `key` if there is one, otherwise
    /// registers a waiter. Both happen under one lock, so a payload cannot
    /// arrive between the check and the registration.
    pub fn claim(&self, key: K) -> Result<Claim<'_, K, V>> {
        let mut state = self.state.lock();
        if let Some(payload) = state.delivered.remove(&key) {
            return Ok(Claim::Ready(payload));
        }
        self.register_locked(&mut state, key).map(Claim::Waiting)
    }

    fn register_locked(&self, state: &mut TableState<K, V>, key: K) -> Result<Waiter<'_, K, V>> {
        if let Some((_, existing)) = state.waiters.get(&key) {
            if !existing.is_closed() {
                return Err(Error::DuplicateWaiter(format!("{} {:?}", self.label, key)));
            }
        }

        state.next_token += 1;
        let token = state.next_token;
        let (tx, rx) = oneshot::channel();
        state.waiters.insert(key.clone(), (token, tx));

        Ok(Waiter {
            table: self,
            key,
            token,
            rx,
        })
    }

    /// Hands `payload` to the waiter for `key`, or stores it if nobody is
    /// waiting (or the waiter has gone away).
    pub fn resolve(&self, key: K, payload: V) -> Resolution {
        let mut state = self.state.lock();
        let payload = match state.waiters.remove(&key) {
            Some((_, tx)) => match tx.send(payload) {
                Ok(()) => return Resolution::Delivered,
                Err(payload) => payload,
            },
            None => payload,
        };
        state.delivered.insert(key, payload);
        Resolution::Stored
    }

    /// Removes and returns a delivered payload without blocking
    pub fn take_delivered(&self, key: &K) -> Option<V> {
        self.state.lock().delivered.remove(key)
    }

    /// Drops every registered waiter; their `wait` calls return `None`
    pub fn release_waiters(&self) -> usize {
        let mut state = self.state.lock();
        let released = state.waiters.len();
        state.waiters.clear();
        released
    }

    pub fn waiting(&self) -> usize {
        self.state.lock().waiters.len()
    }

    pub fn delivered(&self) -> usize {
        self.state.lock().delivered.len()
    }

    fn deregister(&self, key: &K, token: u64) {
        let mut state = self.state.lock();
        if matches!(state.waiters.get(key), Some((t, _)) if *t == token) {
            state.waiters.remove(key);
        }
    }
}

/// A registered one-shot wait on a table key.
///
/// Dropping it (after completion, on timeout, or because the surrounding
/// future was cancelled) removes the registration.
pub struct Waiter<'a, K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    table: &'a Table<K, V>,
    key: K,
    token: u64,
    rx: oneshot::Receiver<V>,
}

impl<K, V> Waiter<'_, K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Waits for the payload. `None` means the waiter was released because
    /// the dispatch loop stopped.
    pub async fn wait(&mut self) -> Option<V> {
        (&mut self.rx).await.ok()
    }

    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K, V> Drop for Waiter<'_, K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    fn drop(&mut self) {
        self.table.deregister(&self.key, self.token);
    }
}

/// The ack and event tables of one session
pub struct CorrelationTables {
    acks: Table<u64, Ack>,
    events: Table<IdentityKey, Notification>,
}

impl Default for CorrelationTables {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationTables {
    pub fn new() -> Self {
        Self {
            acks: Table::new("ack"),
            events: Table::new("event"),
        }
    }

    pub fn register_ack_waiter(&self, id: u64) -> Result<Waiter<'_, u64, Ack>> {
        self.acks.register_waiter(id)
    }

    pub fn resolve_ack(&self, id: u64, ack: Ack) -> Resolution {
        self.acks.resolve(id, ack)
    }

    pub fn take_delivered_ack(&self, id: u64) -> Option<Ack> {
        self.acks.take_delivered(&id)
    }

    pub fn register_event_waiter(
        &self,
        key: IdentityKey,
    ) -> Result<Waiter<'_, IdentityKey, Notification>> {
        self.events.register_waiter(key)
    }

    /// Delivered event for `key`, or a fresh waiter for it
    pub fn claim_event(&self, key: IdentityKey) -> Result<Claim<'_, IdentityKey, Notification>> {
        self.events.claim(key)
    }

    pub fn resolve_event(&self, key: IdentityKey, notification: Notification) -> Resolution {
        self.events.resolve(key, notification)
    }

    pub fn take_delivered_event(&self, key: &IdentityKey) -> Option<Notification> {
        self.events.take_delivered(key)
    }

    /// Releases all waiters in both tables
    pub fn release_all(&self) -> usize {
        self.acks.release_waiters() + self.events.release_waiters()
    }

    pub fn acks(&self) -> &Table<u64, Ack> {
        &self.acks
    }

    pub fn events(&self) -> &Table<IdentityKey, Notification> {
        &self.events
    }
}
