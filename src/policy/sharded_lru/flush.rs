//! Flush triggers: what happens after an insertion crosses the threshold.
//!
//! ## State Machine
//!
//! ```text
//!   Synchronous:   insert ──► len > capacity + slack ? ──► evict inline
//!
//!   Background:
//!                  CAS(false → true) ok
//!        ┌──────┐ ─────────────────────► ┌──────────────┐
//!        │ Idle │                        │ FlushRunning │──► worker runs one pass
//!        └──────┘ ◄───────────────────── └──────────────┘
//!            ▲     guard drop (always,         │
//!            │     also on panic)              │ CAS fails
//!            │                                 ▼
//!            └──────────────────────── trigger coalesced (no-op)
//! ```
//!
//! The background variant owns one long-lived worker thread parked on a
//! condition variable. A trigger that wins the compare-and-set wakes it; a
//! trigger that loses is dropped, and a later insertion re-triggers if the
//! cache is still over the threshold. The worker holds only a `Weak`
//! reference to the cache core and is stopped and joined when the owning
//! [`ShardedLru`](super::ShardedLru) is dropped.

use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace, warn};

use super::Core;
#[cfg(feature = "metrics")]
use crate::metrics::traits::ShardedLruMetricsRecorder;

/// How eviction is scheduled once the cache exceeds `capacity + min_flush_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Evict on the inserting thread before `put` returns.
    #[default]
    Synchronous,
    /// Hand eviction to a single background worker; concurrent requests
    /// are coalesced.
    Background,
}

impl fmt::Display for FlushMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushMode::Synchronous => f.write_str("synchronous"),
            FlushMode::Background => f.write_str("background"),
        }
    }
}

/// Result of offering a flush request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trigger {
    /// Size was within the threshold.
    NotNeeded,
    /// A pass ran inline and removed this many entries.
    Evicted(usize),
    /// The background worker was woken.
    Scheduled,
    /// A background pass was already running.
    Coalesced,
}

pub(crate) enum FlushTrigger {
    Synchronous,
    Background(BackgroundFlusher),
}

impl FlushTrigger {
    /// Builds the trigger for `mode`. Falls back to synchronous flushing
    /// if the worker thread cannot be spawned.
    pub(crate) fn new<K, V>(mode: FlushMode, core: &Arc<Core<K, V>>) -> Self
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        match mode {
            FlushMode::Synchronous => FlushTrigger::Synchronous,
            FlushMode::Background => match BackgroundFlusher::spawn(Arc::downgrade(core)) {
                Ok(flusher) => FlushTrigger::Background(flusher),
                Err(err) => {
                    warn!(
                        error = %err,
                        requested = %mode,
                        "failed to spawn flush worker; flushing synchronously"
                    );
                    FlushTrigger::Synchronous
                },
            },
        }
    }

    pub(crate) fn mode(&self) -> FlushMode {
        match self {
            FlushTrigger::Synchronous => FlushMode::Synchronous,
            FlushTrigger::Background(_) => FlushMode::Background,
        }
    }

    /// Called after every insertion of a new key.
    pub(crate) fn after_insert<K, V>(&self, core: &Core<K, V>) -> Trigger
    where
        K: Eq + Hash,
    {
        if !core.over_threshold() {
            return Trigger::NotNeeded;
        }
        #[cfg(feature = "metrics")]
        core.metrics.record_flush_trigger();

        match self {
            FlushTrigger::Synchronous => Trigger::Evicted(core.evict_excess(core.min_flush_size)),
            FlushTrigger::Background(flusher) => {
                if flusher.request() {
                    Trigger::Scheduled
                } else {
                    #[cfg(feature = "metrics")]
                    core.metrics.record_flush_coalesced();
                    trace!("flush already running; trigger coalesced");
                    Trigger::Coalesced
                }
            },
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        match self {
            FlushTrigger::Synchronous => false,
            FlushTrigger::Background(flusher) => flusher.is_running(),
        }
    }
}

#[derive(Debug, Default)]
struct WorkerState {
    pending: bool,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct FlushSignal {
    running: AtomicBool,
    state: Mutex<WorkerState>,
    wake: Condvar,
}

/// Resets the single-flight flag when dropped, including during unwinding.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to the long-lived flush worker.
pub(crate) struct BackgroundFlusher {
    signal: Arc<FlushSignal>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundFlusher {
    fn spawn<K, V>(core: Weak<Core<K, V>>) -> std::io::Result<Self>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let signal = Arc::new(FlushSignal::default());
        let worker_signal = Arc::clone(&signal);
        let worker = thread::Builder::new()
            .name("shardlru-flush".into())
            .spawn(move || run_worker(core, worker_signal))?;
        Ok(Self {
            signal,
            worker: Some(worker),
        })
    }

    /// Attempts `Idle → FlushRunning`; on success wakes the worker.
    fn request(&self) -> bool {
        if self
            .signal
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let mut state = self.signal.state.lock();
        state.pending = true;
        self.signal.wake.notify_one();
        true
    }

    fn is_running(&self) -> bool {
        self.signal.running.load(Ordering::Acquire)
    }
}

impl Drop for BackgroundFlusher {
    fn drop(&mut self) {
        {
            let mut state = self.signal.state.lock();
            state.shutdown = true;
            self.signal.wake.notify_one();
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("flush worker terminated abnormally");
            }
        }
    }
}

fn run_worker<K, V>(core: Weak<Core<K, V>>, signal: Arc<FlushSignal>)
where
    K: Eq + Hash + Clone,
{
    debug!("flush worker started");
    loop {
        {
            let mut state = signal.state.lock();
            while !state.pending && !state.shutdown {
                signal.wake.wait(&mut state);
            }
            if state.shutdown {
                break;
            }
            state.pending = false;
        }

        let _release = RunningGuard(&signal.running);
        let Some(core) = core.upgrade() else {
            break;
        };
        let slack = core.min_flush_size;
        match panic::catch_unwind(AssertUnwindSafe(|| core.evict_excess(slack))) {
            Ok(removed) => trace!(removed, "background flush finished"),
            Err(_) => error!("background flush panicked; index resynchronized, flag released"),
        }
    }
    debug!("flush worker stopped");
}
