//! Payloads being built, and payloads already handed out, by id.

use crate::{
    events::{Events, PayloadEvents},
    metrics::PayloadCacheMetrics,
    payload::is_better_payload,
    BuiltPayload, PayloadBuilderAttributes,
};
use ember_primitives::B256;
use ember_rpc_types::engine::PayloadId;
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use std::{num::NonZeroUsize, sync::Arc, time::Duration};
use tokio::{sync::broadcast, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Default number of payloads kept in the cache.
pub const DEFAULT_PAYLOAD_CACHE_SIZE: usize = 10;

/// Capacity of the payload events channel.
const EVENTS_CHANNEL_CAPACITY: usize = 128;

/// Lifecycle of a payload job.
///
/// `Started` and `Improving` are active; every other state is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadJobState {
    /// The first payload exists, the improving job has not been spawned yet.
    Started,
    /// The job is building better payloads.
    Improving,
    /// The payload was handed out through `engine_getPayload`.
    Consumed,
    /// A forkchoice update moved the head away from the payload's parent.
    Superseded,
    /// The job reached its deadline.
    TimedOut,
}

impl PayloadJobState {
    /// Returns true if the job may still publish better payloads.
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Started | Self::Improving)
    }
}

/// A cached payload together with the state of the job building it.
///
/// The best payload is only ever replaced under the entry's own write lock, so readers observe
/// either the previous or the new payload.
#[derive(Debug)]
pub struct PayloadCacheEntry {
    attributes: PayloadBuilderAttributes,
    created_at: Instant,
    cancel: CancellationToken,
    inner: RwLock<EntryState>,
}

#[derive(Debug)]
struct EntryState {
    best: Arc<BuiltPayload>,
    last_improved_at: Instant,
    improvements: u64,
    state: PayloadJobState,
}

impl PayloadCacheEntry {
    /// Creates a new entry in [`PayloadJobState::Started`] with the first payload as the best.
    pub fn new(attributes: PayloadBuilderAttributes, first: BuiltPayload) -> Self {
        let now = Instant::now();
        Self {
            attributes,
            created_at: now,
            cancel: CancellationToken::new(),
            inner: RwLock::new(EntryState {
                best: Arc::new(first),
                last_improved_at: now,
                improvements: 0,
                state: PayloadJobState::Started,
            }),
        }
    }

    /// The payload id.
    pub const fn id(&self) -> PayloadId {
        self.attributes.id
    }

    /// The attributes the payload is built from.
    pub const fn attributes(&self) -> &PayloadBuilderAttributes {
        &self.attributes
    }

    /// The parent the payload is built on.
    pub const fn parent(&self) -> B256 {
        self.attributes.parent
    }

    /// When the entry was created.
    pub const fn created_at(&self) -> Instant {
        self.created_at
    }

    /// The best payload so far.
    pub fn best_payload(&self) -> Arc<BuiltPayload> {
        Arc::clone(&self.inner.read().best)
    }

    /// When the best payload was last replaced, or the creation time if it never was.
    pub fn last_improved_at(&self) -> Instant {
        self.inner.read().last_improved_at
    }

    /// How often the best payload was replaced.
    pub fn improvements(&self) -> u64 {
        self.inner.read().improvements
    }

    /// The current job state.
    pub fn state(&self) -> PayloadJobState {
        self.inner.read().state
    }

    /// Returns true if the job may still publish better payloads.
    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Returns the token that is cancelled once the job building this payload must stop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Moves a `Started` entry to `Improving`.
    pub fn mark_improving(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.state == PayloadJobState::Started {
            inner.state = PayloadJobState::Improving;
            return true
        }
        false
    }

    /// Replaces the best payload if the job is still active and the candidate pays strictly more
    /// fees.
    ///
    /// Returns the new best payload if it was replaced.
    pub fn replace_if_better(&self, candidate: BuiltPayload) -> Option<Arc<BuiltPayload>> {
        let mut inner = self.inner.write();
        if !inner.state.is_active() || !is_better_payload(Some(&inner.best), candidate.fees()) {
            return None
        }
        let best = Arc::new(candidate);
        inner.best = Arc::clone(&best);
        inner.last_improved_at = Instant::now();
        inner.improvements += 1;
        Some(best)
    }

    /// Moves an active entry into the given final state and cancels its job.
    ///
    /// Returns false if the entry already was in a final state, which is then kept.
    pub fn finish(&self, state: PayloadJobState) -> bool {
        debug_assert!(!state.is_active(), "not a final state: {state:?}");
        {
            let mut inner = self.inner.write();
            if !inner.state.is_active() {
                return false
            }
            inner.state = state;
        }
        self.cancel.cancel();
        true
    }

    /// Cancels the job without changing the state, used when the entry leaves the cache.
    fn cancel_job(&self) {
        self.cancel.cancel();
    }
}

/// A bounded cache of payload entries.
///
/// Bounded by capacity, evicting the least recently used entry, and by age through
/// [`PayloadCache::evict_older_than`]. An evicted entry's job is cancelled. The map lock is only
/// held for lookups and inserts; replacing a best payload takes only the entry's lock.
#[derive(Debug, Clone)]
pub struct PayloadCache {
    inner: Arc<CacheInner>,
}

#[derive(Debug)]
struct CacheInner {
    entries: Mutex<LruCache<PayloadId, Arc<PayloadCacheEntry>>>,
    events: broadcast::Sender<Events>,
    metrics: PayloadCacheMetrics,
}

impl PayloadCache {
    /// Creates a cache holding at most `capacity` entries.
    pub fn new(capacity: NonZeroUsize) -> Self {
        let (events, _) = broadcast::channel(EVENTS_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(LruCache::new(capacity)),
                events,
                metrics: PayloadCacheMetrics::default(),
            }),
        }
    }

    /// Inserts the entry, evicting the least recently used one if the cache is full.
    pub fn insert(&self, entry: Arc<PayloadCacheEntry>) {
        let id = entry.id();
        let (evicted, len) = {
            let mut entries = self.inner.entries.lock();
            let evicted = entries.push(id, entry);
            (evicted, entries.len())
        };
        self.inner.metrics.entries.set(len as f64);

        if let Some((evicted_id, evicted)) = evicted {
            evicted.cancel_job();
            if evicted_id != id {
                self.inner.metrics.capacity_evictions.increment(1);
                debug!(target: "payload_builder", id = %evicted_id, "evicted payload to make room");
            }
        }
    }

    /// Returns the entry for the given id.
    pub fn get(&self, id: PayloadId) -> Option<Arc<PayloadCacheEntry>> {
        self.inner.entries.lock().get(&id).cloned()
    }

    /// Returns true if the cache holds an entry for the given id.
    pub fn contains(&self, id: PayloadId) -> bool {
        self.inner.entries.lock().contains(&id)
    }

    /// Returns the best payload for the given id.
    pub fn best_payload(&self, id: PayloadId) -> Option<Arc<BuiltPayload>> {
        self.get(id).map(|entry| entry.best_payload())
    }

    /// Returns the attributes the given payload is built from.
    pub fn payload_attributes(&self, id: PayloadId) -> Option<PayloadBuilderAttributes> {
        self.get(id).map(|entry| entry.attributes().clone())
    }

    /// Replaces the best payload of the given id if the candidate is strictly better and the job
    /// is still active, and notifies subscribers.
    ///
    /// Returns true if the candidate became the best payload.
    pub fn replace_if_better(&self, id: PayloadId, candidate: BuiltPayload) -> bool {
        let Some(entry) = self.inner.entries.lock().peek(&id).cloned() else { return false };
        let Some(best) = entry.replace_if_better(candidate) else { return false };

        self.inner.metrics.improvements.increment(1);
        trace!(target: "payload_builder", %id, fees = %best.fees(), "improved payload");
        self.emit(Events::Improved(best));
        true
    }

    /// Returns the best payload for the given id and stops the job building it.
    ///
    /// The entry stays readable, so repeated calls return the same payload until it is evicted.
    pub fn resolve(&self, id: PayloadId) -> Option<Arc<BuiltPayload>> {
        let entry = self.get(id)?;
        let consumed = entry.finish(PayloadJobState::Consumed);
        let best = entry.best_payload();
        if consumed {
            debug!(target: "payload_builder", %id, improvements = entry.improvements(), "resolved payload");
            self.emit(Events::Resolved(Arc::clone(&best)));
        }
        Some(best)
    }

    /// Removes all entries older than `ttl`, whatever their state, and cancels their jobs.
    ///
    /// Returns the number of removed entries.
    pub fn evict_older_than(&self, ttl: Duration) -> usize {
        let (expired, len) = {
            let mut entries = self.inner.entries.lock();
            let expired = entries
                .iter()
                .filter(|(_, entry)| entry.created_at().elapsed() >= ttl)
                .map(|(id, _)| *id)
                .collect::<Vec<_>>();
            let expired =
                expired.into_iter().filter_map(|id| entries.pop(&id)).collect::<Vec<_>>();
            (expired, entries.len())
        };

        for entry in &expired {
            entry.cancel_job();
            trace!(target: "payload_builder", id = %entry.id(), state = ?entry.state(), "expired payload");
        }
        self.inner.metrics.entries.set(len as f64);
        self.inner.metrics.expired_entries.increment(expired.len() as u64);
        expired.len()
    }

    /// Moves every active entry whose parent is not `head` to [`PayloadJobState::Superseded`].
    ///
    /// Returns the number of superseded entries.
    pub fn supersede(&self, head: B256) -> usize {
        let entries = self
            .inner
            .entries
            .lock()
            .iter()
            .map(|(_, entry)| Arc::clone(entry))
            .collect::<Vec<_>>();

        entries
            .into_iter()
            .filter(|entry| entry.parent() != head)
            .filter(|entry| entry.finish(PayloadJobState::Superseded))
            .inspect(|entry| {
                debug!(target: "payload_builder", id = %entry.id(), parent = %entry.parent(), %head, "superseded payload job");
            })
            .count()
    }

    /// Returns a new receiver for payload events.
    pub fn subscribe(&self) -> PayloadEvents {
        PayloadEvents { receiver: self.inner.events.subscribe() }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sends the event to all subscribers.
    pub(crate) fn emit(&self, event: Events) {
        // no subscribers is fine
        let _ = self.inner.events.send(event);
    }
}

impl Default for PayloadCache {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_PAYLOAD_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_primitives::{Block, Header, U256};

    fn attributes(parent: u8, timestamp: u64) -> PayloadBuilderAttributes {
        let mut id = [0u8; 8];
        id[0] = parent;
        id[1..].copy_from_slice(&timestamp.to_be_bytes()[1..]);
        PayloadBuilderAttributes {
            id: PayloadId::new(id),
            parent: B256::repeat_byte(parent),
            timestamp,
            suggested_fee_recipient: Default::default(),
            prev_randao: Default::default(),
            withdrawals: vec![],
            parent_beacon_block_root: None,
        }
    }

    fn payload(attributes: &PayloadBuilderAttributes, fees: u64) -> BuiltPayload {
        let block = Block {
            header: Header { parent_hash: attributes.parent, gas_used: fees, ..Default::default() },
            ..Default::default()
        };
        BuiltPayload::new(attributes.id, block.seal_slow(), U256::from(fees))
    }

    fn entry(attributes: PayloadBuilderAttributes, fees: u64) -> Arc<PayloadCacheEntry> {
        let first = payload(&attributes, fees);
        Arc::new(PayloadCacheEntry::new(attributes, first))
    }

    #[test]
    fn replacement_is_monotonic() {
        let cache = PayloadCache::default();
        let attrs = attributes(1, 1);
        let id = attrs.id;
        cache.insert(entry(attrs.clone(), 10));

        assert!(!cache.replace_if_better(id, payload(&attrs, 10)));
        assert!(!cache.replace_if_better(id, payload(&attrs, 5)));
        assert!(cache.replace_if_better(id, payload(&attrs, 11)));
        assert_eq!(cache.best_payload(id).unwrap().fees(), U256::from(11));
        assert_eq!(cache.get(id).unwrap().improvements(), 1);

        let unknown = attributes(2, 1);
        assert!(!cache.replace_if_better(unknown.id, payload(&unknown, 100)));
    }

    #[test]
    fn resolve_stops_job_and_stays_readable() {
        let cache = PayloadCache::default();
        let attrs = attributes(1, 1);
        let id = attrs.id;
        let entry = entry(attrs.clone(), 10);
        let token = entry.cancellation_token();
        cache.insert(entry);

        let first = cache.resolve(id).unwrap();
        assert!(token.is_cancelled());
        assert_eq!(cache.get(id).unwrap().state(), PayloadJobState::Consumed);

        // improvements after consumption are discarded
        assert!(!cache.replace_if_better(id, payload(&attrs, 100)));
        assert_eq!(cache.resolve(id).unwrap(), first);
    }

    #[test]
    fn supersede_spares_jobs_on_head() {
        let cache = PayloadCache::default();
        let on_head = attributes(1, 1);
        let stale = attributes(2, 1);
        cache.insert(entry(on_head.clone(), 0));
        cache.insert(entry(stale.clone(), 0));

        assert_eq!(cache.supersede(B256::repeat_byte(1)), 1);
        assert!(cache.get(on_head.id).unwrap().is_active());
        assert_eq!(cache.get(stale.id).unwrap().state(), PayloadJobState::Superseded);
        assert!(cache.get(stale.id).unwrap().cancellation_token().is_cancelled());

        // already final
        assert_eq!(cache.supersede(B256::repeat_byte(3)), 1);
        assert_eq!(cache.get(stale.id).unwrap().state(), PayloadJobState::Superseded);
    }

    #[test]
    fn capacity_eviction_cancels_job() {
        let cache = PayloadCache::new(NonZeroUsize::new(2).unwrap());
        let first = entry(attributes(1, 1), 0);
        let token = first.cancellation_token();
        cache.insert(first);
        cache.insert(entry(attributes(1, 2), 0));
        cache.insert(entry(attributes(1, 3), 0));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(attributes(1, 1).id));
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_by_age_regardless_of_state() {
        let cache = PayloadCache::default();
        let old = attributes(1, 1);
        cache.insert(entry(old.clone(), 0));
        cache.resolve(old.id);

        tokio::time::advance(Duration::from_secs(30)).await;
        let young = attributes(1, 2);
        let young_entry = entry(young.clone(), 0);
        let token = young_entry.cancellation_token();
        cache.insert(young_entry);

        assert_eq!(cache.evict_older_than(Duration::from_secs(20)), 1);
        assert!(!cache.contains(old.id));
        assert!(cache.contains(young.id));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.evict_older_than(Duration::from_secs(20)), 1);
        assert!(cache.is_empty());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn emits_improvement_events() {
        let cache = PayloadCache::default();
        let events = cache.subscribe();
        let attrs = attributes(1, 1);
        cache.insert(entry(attrs.clone(), 1));
        cache.replace_if_better(attrs.id, payload(&attrs, 2));

        match events.recv().await {
            Some(Ok(Events::Improved(payload))) => assert_eq!(payload.fees(), U256::from(2)),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
