//! Concurrent chunk scheduler.
//!
//! Requests are deduplicated per coordinate: while a chunk is in flight every
//! further request attaches to the same slot, and once published the chunk is
//! served from the [`ChunkCache`] until evicted. Workers pull coordinates from
//! a crossbeam channel and run the [`ChunkSource`] outside the state lock.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use worldgen_core::{ChunkPos, GenerationError};

use crate::chunk::ChunkData;
use crate::decoration::{FeatureMarker, MarkerKey};
use crate::markers::MarkerArena;
use crate::stage::Deadline;
use crate::storage::{ChunkCache, EntryFlags};

/// Outcome delivered to every requester of a coordinate.
pub type ChunkResult = Result<Arc<ChunkData>, GenerationError>;

/// Completion callback registered through [`Scheduler::request_with`].
pub type ChunkCallback = Box<dyn FnOnce(ChunkResult) + Send + 'static>;

/// Produces chunks for the scheduler.
pub trait ChunkSource: Send + Sync + 'static {
    /// Run the full pipeline for `pos`, giving up once `deadline` passes.
    fn generate(&self, pos: ChunkPos, deadline: &Deadline) -> Result<ChunkData, GenerationError>;

    /// Copy of `chunk` with `markers` carved in.
    fn redecorate(&self, chunk: &ChunkData, markers: &[FeatureMarker]) -> ChunkData;

    /// How many chunks away a feature planned in one chunk may reach.
    fn feature_reach(&self) -> u32 {
        1
    }
}

/// Scheduler sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub workers: usize,
    pub cache_capacity: usize,
    pub budget: Duration,
}

#[derive(Debug, Default)]
pub(crate) struct SchedulerStats {
    pipeline_runs: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    attached: AtomicU64,
    withdrawals: AtomicU64,
    evictions: AtomicU64,
    timeouts: AtomicU64,
    failures: AtomicU64,
    markers_resolved: AtomicU64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl SchedulerStats {
    fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            pipeline_runs: load(&self.pipeline_runs),
            cache_hits: load(&self.cache_hits),
            cache_misses: load(&self.cache_misses),
            attached: load(&self.attached),
            withdrawals: load(&self.withdrawals),
            evictions: load(&self.evictions),
            timeouts: load(&self.timeouts),
            failures: load(&self.failures),
            markers_resolved: load(&self.markers_resolved),
        }
    }
}

/// Point-in-time scheduler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Pipelines started, one per generated chunk.
    pub pipeline_runs: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Requests that joined an in-flight generation.
    pub attached: u64,
    /// Requesters that gave up before the result arrived.
    pub withdrawals: u64,
    pub evictions: u64,
    pub timeouts: u64,
    pub failures: u64,
    /// Cross-border features carved once all their chunks were resident.
    pub markers_resolved: u64,
}

#[derive(Default)]
struct SlotState {
    result: Option<ChunkResult>,
    callbacks: Vec<ChunkCallback>,
}

/// Rendezvous for everyone waiting on one coordinate.
#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl Slot {
    fn resolved(result: ChunkResult) -> Self {
        Self {
            state: Mutex::new(SlotState {
                result: Some(result),
                callbacks: Vec::new(),
            }),
            ready: Condvar::new(),
        }
    }

    fn complete(&self, result: ChunkResult) {
        let callbacks = {
            let mut state = self.state.lock();
            state.result = Some(result.clone());
            std::mem::take(&mut state.callbacks)
        };
        self.ready.notify_all();
        for callback in callbacks {
            callback(result.clone());
        }
    }
}

/// Handle to a requested chunk.
///
/// Dropping it before taking the result withdraws the request; generation
/// still completes for the other requesters and the cache.
#[must_use = "dropping a PendingChunk withdraws the request"]
pub struct PendingChunk {
    pos: ChunkPos,
    slot: Arc<Slot>,
    stats: Option<Arc<SchedulerStats>>,
    consumed: bool,
}

impl PendingChunk {
    fn new(pos: ChunkPos, slot: Arc<Slot>, stats: Option<Arc<SchedulerStats>>) -> Self {
        Self {
            pos,
            slot,
            stats,
            consumed: false,
        }
    }

    /// A request that failed before reaching the scheduler.
    pub(crate) fn failed(pos: ChunkPos, err: GenerationError) -> Self {
        Self::new(pos, Arc::new(Slot::resolved(Err(err))), None)
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn is_ready(&self) -> bool {
        self.slot.state.lock().result.is_some()
    }

    /// Block until the chunk is published or its generation fails.
    pub fn wait(mut self) -> ChunkResult {
        let mut state = self.slot.state.lock();
        loop {
            if let Some(result) = state.result.clone() {
                drop(state);
                self.consumed = true;
                return result;
            }
            self.slot.ready.wait(&mut state);
        }
    }

    /// Block for at most `timeout`. `None` means the chunk is still pending.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<ChunkResult> {
        let until = Instant::now() + timeout;
        let mut state = self.slot.state.lock();
        loop {
            if let Some(result) = state.result.clone() {
                drop(state);
                self.consumed = true;
                return Some(result);
            }
            if self.slot.ready.wait_until(&mut state, until).timed_out() {
                return None;
            }
        }
    }

    /// The result if it is already available.
    pub fn try_get(&mut self) -> Option<ChunkResult> {
        let result = self.slot.state.lock().result.clone();
        if result.is_some() {
            self.consumed = true;
        }
        result
    }

    /// Deliver the result to `callback` instead of waiting for it.
    ///
    /// Runs `callback` on the current thread when the result is already
    /// known, otherwise on the worker that publishes it.
    pub fn on_ready(mut self, callback: ChunkCallback) {
        self.consumed = true;
        let result = {
            let mut state = self.slot.state.lock();
            match state.result.clone() {
                Some(result) => result,
                None => {
                    state.callbacks.push(callback);
                    return;
                }
            }
        };
        callback(result);
    }
}

impl Drop for PendingChunk {
    fn drop(&mut self) {
        if self.consumed {
            return;
        }
        if let Some(stats) = &self.stats {
            bump(&stats.withdrawals, 1);
        }
    }
}

struct SchedulerState {
    cache: ChunkCache,
    in_flight: HashMap<ChunkPos, Arc<Slot>>,
    arena: MarkerArena,
}

struct Shared<S> {
    source: S,
    state: Mutex<SchedulerState>,
    stats: Arc<SchedulerStats>,
    budget: Duration,
}

/// Worker pool generating chunks on demand.
pub struct Scheduler<S: ChunkSource> {
    shared: Arc<Shared<S>>,
    jobs: Option<Sender<ChunkPos>>,
    workers: Vec<JoinHandle<()>>,
}

impl<S: ChunkSource> Scheduler<S> {
    pub fn new(source: S, config: SchedulerConfig) -> Result<Self, GenerationError> {
        if config.workers == 0 {
            return Err(GenerationError::invalid("scheduler needs at least one worker"));
        }
        let shared = Arc::new(Shared {
            source,
            state: Mutex::new(SchedulerState {
                cache: ChunkCache::new(config.cache_capacity)?,
                in_flight: HashMap::new(),
                arena: MarkerArena::new(),
            }),
            stats: Arc::new(SchedulerStats::default()),
            budget: config.budget,
        });

        let (sender, receiver) = crossbeam_channel::unbounded::<ChunkPos>();
        let mut workers = Vec::with_capacity(config.workers);
        for index in 0..config.workers {
            let shared = Arc::clone(&shared);
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("worldgen-worker-{index}"))
                .spawn(move || run_worker(shared, receiver))
                .map_err(|err| {
                    GenerationError::pipeline(format!("failed to spawn worker {index}: {err}"))
                })?;
            workers.push(handle);
        }

        Ok(Self {
            shared,
            jobs: Some(sender),
            workers,
        })
    }

    pub fn source(&self) -> &S {
        &self.shared.source
    }

    /// Request a chunk. Served from cache, attached to an in-flight
    /// generation, or queued for a worker.
    pub fn request(&self, pos: ChunkPos) -> PendingChunk {
        let stats = Arc::clone(&self.shared.stats);
        let slot = {
            let mut state = self.shared.state.lock();
            if let Some(chunk) = state.cache.get(pos) {
                bump(&stats.cache_hits, 1);
                let slot = Arc::new(Slot::resolved(Ok(chunk)));
                return PendingChunk::new(pos, slot, Some(stats));
            }
            if let Some(slot) = state.in_flight.get(&pos) {
                bump(&stats.attached, 1);
                return PendingChunk::new(pos, Arc::clone(slot), Some(stats));
            }
            bump(&stats.cache_misses, 1);
            let slot = Arc::new(Slot::default());
            state.in_flight.insert(pos, Arc::clone(&slot));
            slot
        };

        let queued = self
            .jobs
            .as_ref()
            .map_or(false, |jobs| jobs.send(pos).is_ok());
        if !queued {
            self.shared.state.lock().in_flight.remove(&pos);
            slot.complete(Err(GenerationError::Shutdown));
        }
        PendingChunk::new(pos, slot, Some(stats))
    }

    /// Request a chunk and receive the result through `callback`.
    pub fn request_with(&self, pos: ChunkPos, callback: ChunkCallback) {
        self.request(pos).on_ready(callback);
    }

    /// Resident chunk, without touching recency or counters.
    pub fn cached(&self, pos: ChunkPos) -> Option<Arc<ChunkData>> {
        self.shared.state.lock().cache.peek(pos).cloned()
    }

    /// Resident coordinates, sorted.
    pub fn resident(&self) -> Vec<ChunkPos> {
        self.shared.state.lock().cache.positions()
    }

    pub fn is_in_flight(&self, pos: ChunkPos) -> bool {
        self.shared.state.lock().in_flight.contains_key(&pos)
    }

    /// Keep a resident chunk from being evicted. Returns false if not resident.
    pub fn pin(&self, pos: ChunkPos) -> bool {
        self.shared.state.lock().cache.set_flag(pos, EntryFlags::PINNED)
    }

    pub fn unpin(&self, pos: ChunkPos) {
        self.clear_flag(pos, EntryFlags::PINNED);
    }

    /// Mark a resident chunk as holding unsaved edits. Returns false if not resident.
    pub fn mark_dirty(&self, pos: ChunkPos) -> bool {
        self.shared.state.lock().cache.set_flag(pos, EntryFlags::DIRTY)
    }

    pub fn clear_dirty(&self, pos: ChunkPos) {
        self.clear_flag(pos, EntryFlags::DIRTY);
    }

    pub fn flags(&self, pos: ChunkPos) -> Option<EntryFlags> {
        self.shared.state.lock().cache.flags(pos)
    }

    /// Cross-border features still waiting for a chunk.
    pub fn pending_markers(&self) -> usize {
        self.shared.state.lock().arena.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    fn clear_flag(&self, pos: ChunkPos, flag: EntryFlags) {
        let mut state = self.shared.state.lock();
        let evicted = state.cache.clear_flag(pos, flag);
        if !evicted.is_empty() {
            bump(&self.shared.stats.evictions, evicted.len() as u64);
            let dropped = forget_evicted(&mut state.arena, &evicted);
            debug!(count = evicted.len(), dropped, "evicted chunks after clearing {flag:?}");
        }
    }
}

impl<S: ChunkSource> Drop for Scheduler<S> {
    fn drop(&mut self) {
        // Closing the channel lets workers drain the queue and exit.
        self.jobs.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("worldgen worker exited by panic");
            }
        }
    }
}

/// Markers planned by an evicted chunk come back when it regenerates.
fn forget_evicted(arena: &mut MarkerArena, evicted: &[ChunkPos]) -> usize {
    evicted.iter().map(|pos| arena.forget_origin(*pos)).sum()
}

/// Chunks within Chebyshev distance `reach` of `pos`, excluding `pos`.
fn ring(pos: ChunkPos, reach: i32) -> impl Iterator<Item = ChunkPos> {
    (-reach..=reach).flat_map(move |dz| {
        (-reach..=reach)
            .filter(move |&dx| dx != 0 || dz != 0)
            .map(move |dx| ChunkPos::new(pos.x + dx, pos.z + dz))
    })
}

fn run_worker<S: ChunkSource>(shared: Arc<Shared<S>>, jobs: Receiver<ChunkPos>) {
    for pos in jobs.iter() {
        let deadline = Deadline::new(pos, shared.budget);
        bump(&shared.stats.pipeline_runs, 1);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| shared.source.generate(pos, &deadline)))
            .unwrap_or_else(|_| {
                Err(GenerationError::pipeline(format!(
                    "generation of chunk {pos} panicked"
                )))
            });
        shared.publish(pos, outcome);
    }
}

impl<S: ChunkSource> Shared<S> {
    fn publish(&self, pos: ChunkPos, outcome: Result<ChunkData, GenerationError>) {
        let (slot, result) = {
            let mut state = self.state.lock();
            let slot = state.in_flight.remove(&pos);
            let result = match outcome {
                Ok(chunk) => {
                    let evicted = state.cache.insert(Arc::new(chunk));
                    if !evicted.is_empty() {
                        bump(&self.stats.evictions, evicted.len() as u64);
                        let dropped = forget_evicted(&mut state.arena, &evicted);
                        debug!(chunk = %pos, count = evicted.len(), dropped, "evicted chunks");
                    }
                    self.resolve_markers(&mut state, pos);
                    state.cache.peek(pos).cloned().ok_or_else(|| {
                        GenerationError::pipeline(format!("chunk {pos} vanished before publish"))
                    })
                }
                Err(err) => {
                    if matches!(err, GenerationError::Timeout { .. }) {
                        bump(&self.stats.timeouts, 1);
                    } else {
                        bump(&self.stats.failures, 1);
                    }
                    warn!(chunk = %pos, %err, "chunk generation failed");
                    Err(err)
                }
            };
            (slot, result)
        };
        if let Some(slot) = slot {
            slot.complete(result);
        }
    }

    /// Carve every cross-border feature touching `pos` whose chunks are now
    /// all resident; park the rest until their missing chunks arrive.
    fn resolve_markers(&self, state: &mut SchedulerState, pos: ChunkPos) {
        let mut candidates: BTreeMap<MarkerKey, FeatureMarker> = BTreeMap::new();
        let mut collect = |marker: &FeatureMarker| {
            candidates
                .entry(marker.key)
                .or_insert_with(|| marker.clone());
        };
        if let Some(chunk) = state.cache.peek(pos) {
            chunk.boundary_features().iter().for_each(&mut collect);
        }
        state.arena.take(pos).iter().for_each(&mut collect);
        let reach = self.source.feature_reach() as i32;
        for neighbor in ring(pos, reach) {
            if let Some(chunk) = state.cache.peek(neighbor) {
                chunk
                    .boundary_features()
                    .iter()
                    .filter(|marker| marker.touches(pos))
                    .for_each(&mut collect);
            }
        }

        let mut batches: BTreeMap<ChunkPos, Vec<FeatureMarker>> = BTreeMap::new();
        let mut resolved: BTreeSet<MarkerKey> = BTreeSet::new();
        for marker in candidates.into_values() {
            let missing: Vec<ChunkPos> = marker
                .touched
                .iter()
                .copied()
                .filter(|touched| !state.cache.contains(*touched))
                .collect();
            if !missing.is_empty() {
                trace!(chunk = %pos, ?missing, "deferring cross-border feature");
                state.arena.defer(&marker, &missing);
                continue;
            }
            state.arena.forget(&marker);
            for &target in &marker.touched {
                let needs = state
                    .cache
                    .peek(target)
                    .map_or(false, |chunk| !chunk.has_applied(&marker.key));
                if needs {
                    resolved.insert(marker.key);
                    batches.entry(target).or_default().push(marker.clone());
                }
            }
        }

        for (target, markers) in batches {
            let updated = match state.cache.peek(target) {
                Some(chunk) => self.source.redecorate(chunk, &markers),
                None => continue,
            };
            state.cache.replace(Arc::new(updated));
        }
        if !resolved.is_empty() {
            bump(&self.stats.markers_resolved, resolved.len() as u64);
            debug!(chunk = %pos, count = resolved.len(), "resolved cross-border features");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeId;
    use crate::chunk::ChunkDims;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    struct FlatSource {
        runs: AtomicUsize,
        delay: Duration,
    }

    impl FlatSource {
        fn new(delay: Duration) -> Self {
            Self {
                runs: AtomicUsize::new(0),
                delay,
            }
        }
    }

    impl ChunkSource for FlatSource {
        fn generate(&self, pos: ChunkPos, deadline: &Deadline) -> Result<ChunkData, GenerationError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            deadline.check()?;
            if pos.x == 99 {
                panic!("boom");
            }
            let dims = ChunkDims::new(4, 8);
            Ok(ChunkData {
                pos,
                dims,
                blocks: vec![1; dims.volume()],
                biomes: vec![BiomeId(0); dims.columns()],
                heights: vec![7; dims.columns()],
                boundary_features: Vec::new(),
                applied: BTreeSet::new(),
                generated: blake3::Hash::from([0; 32]),
            })
        }

        fn redecorate(&self, chunk: &ChunkData, _markers: &[FeatureMarker]) -> ChunkData {
            chunk.clone()
        }
    }

    fn scheduler(delay: Duration, budget: Duration, capacity: usize) -> Scheduler<FlatSource> {
        Scheduler::new(
            FlatSource::new(delay),
            SchedulerConfig {
                workers: 2,
                cache_capacity: capacity,
                budget,
            },
        )
        .unwrap()
    }

    #[test]
    fn zero_workers_is_rejected() {
        let result = Scheduler::new(
            FlatSource::new(Duration::ZERO),
            SchedulerConfig {
                workers: 0,
                cache_capacity: 4,
                budget: Duration::from_secs(1),
            },
        );
        assert!(matches!(result, Err(GenerationError::InputValidation { .. })));
    }

    #[test]
    fn second_request_hits_cache() {
        let scheduler = scheduler(Duration::ZERO, Duration::from_secs(5), 8);
        let pos = ChunkPos::new(1, 2);
        let first = scheduler.request(pos).wait().unwrap();
        let second = scheduler.request(pos).wait().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let stats = scheduler.stats();
        assert_eq!(stats.pipeline_runs, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cache_hits, 1);
    }

    #[test]
    fn concurrent_requests_share_one_run() {
        let scheduler = scheduler(Duration::from_millis(50), Duration::from_secs(5), 8);
        let pos = ChunkPos::new(0, 0);
        let handles: Vec<PendingChunk> = (0..6).map(|_| scheduler.request(pos)).collect();
        let results: Vec<Arc<ChunkData>> = handles.into_iter().map(|p| p.wait().unwrap()).collect();
        for chunk in &results[1..] {
            assert!(Arc::ptr_eq(&results[0], chunk));
        }
        assert_eq!(scheduler.source().runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.stats().attached, 5);
    }

    #[test]
    fn dropped_request_counts_as_withdrawal() {
        let scheduler = scheduler(Duration::from_millis(20), Duration::from_secs(5), 8);
        let pos = ChunkPos::new(3, 3);
        drop(scheduler.request(pos));
        let chunk = scheduler.request(pos).wait().unwrap();
        assert_eq!(chunk.pos(), pos);
        assert_eq!(scheduler.stats().withdrawals, 1);
        assert_eq!(scheduler.source().runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn timeouts_are_reported_and_not_cached() {
        let scheduler = scheduler(Duration::from_millis(10), Duration::from_millis(1), 8);
        let pos = ChunkPos::new(5, 5);
        let err = scheduler.request(pos).wait().unwrap_err();
        assert!(err.is_retryable());
        assert!(scheduler.cached(pos).is_none());
        assert!(!scheduler.is_in_flight(pos));
        assert_eq!(scheduler.stats().timeouts, 1);
    }

    #[test]
    fn panicking_source_fails_request_only() {
        let scheduler = scheduler(Duration::ZERO, Duration::from_secs(5), 8);
        let err = scheduler.request(ChunkPos::new(99, 0)).wait().unwrap_err();
        assert!(matches!(err, GenerationError::Pipeline { .. }));
        assert!(scheduler.request(ChunkPos::new(1, 0)).wait().is_ok());
        assert_eq!(scheduler.stats().failures, 1);
    }

    #[test]
    fn callbacks_receive_the_result() {
        let scheduler = scheduler(Duration::from_millis(5), Duration::from_secs(5), 8);
        let (tx, rx) = mpsc::channel();
        for _ in 0..2 {
            let tx = tx.clone();
            scheduler.request_with(
                ChunkPos::new(-1, 4),
                Box::new(move |result: ChunkResult| {
                    let _ = tx.send(result.map(|chunk| chunk.pos()));
                }),
            );
        }
        for _ in 0..2 {
            let pos = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
            assert_eq!(pos, ChunkPos::new(-1, 4));
        }
        assert_eq!(scheduler.stats().withdrawals, 0);
    }

    #[test]
    fn pinned_chunk_outlives_capacity() {
        let scheduler = scheduler(Duration::ZERO, Duration::from_secs(5), 1);
        let a = ChunkPos::new(0, 0);
        let b = ChunkPos::new(1, 0);
        scheduler.request(a).wait().unwrap();
        assert!(scheduler.pin(a));
        scheduler.request(b).wait().unwrap();
        assert_eq!(scheduler.resident(), vec![a, b]);
        scheduler.unpin(a);
        assert_eq!(scheduler.resident(), vec![b]);
        assert_eq!(scheduler.stats().evictions, 1);
    }

    #[test]
    fn wait_timeout_returns_none_while_pending() {
        let scheduler = scheduler(Duration::from_millis(100), Duration::from_secs(5), 8);
        let mut pending = scheduler.request(ChunkPos::new(7, 7));
        assert!(pending.try_get().is_none());
        assert!(pending.wait_timeout(Duration::from_millis(1)).is_none());
        let result = pending.wait_timeout(Duration::from_secs(5));
        assert!(matches!(result, Some(Ok(_))));
    }

    #[test]
    fn failed_handle_is_ready() {
        let mut pending = PendingChunk::failed(ChunkPos::new(0, 0), GenerationError::Shutdown);
        assert!(pending.is_ready());
        assert_eq!(pending.try_get(), Some(Err(GenerationError::Shutdown)));
    }

    #[test]
    fn ring_covers_the_reach_square() {
        let centre = ChunkPos::new(-3, 5);
        let near: Vec<ChunkPos> = ring(centre, 1).collect();
        assert_eq!(near.len(), 8);
        assert!(!near.contains(&centre));
        let far: Vec<ChunkPos> = ring(centre, 2).collect();
        assert_eq!(far.len(), 24);
        assert!(far.contains(&ChunkPos::new(-5, 7)));
        assert!(far.iter().all(|p| (p.x - centre.x).abs() <= 2 && (p.z - centre.z).abs() <= 2));
    }
}
