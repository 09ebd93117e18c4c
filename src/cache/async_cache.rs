//! Single-flight async fills on top of a synchronous store.
//!
//! `get_or_compute` returns a live cached value if there is one. Otherwise it
//! joins the computation already running for that key, or starts one. Each
//! computation runs as its own tokio task and is shared between callers
//! through [`futures::future::Shared`], so every caller for a key observes
//! the same outcome and the computation finishes even if all callers go away.
//!
//! The store and the pending table sit behind one lock. The lookup/register
//! step and the write-back/unregister step each happen under that lock, so a
//! caller can never see the key missing from both. A computation whose task
//! is dropped without finishing (its runtime shut down) unregisters itself,
//! and callers waiting on it retry.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::entry::{CacheStats, KeyPattern};
use crate::cache::manager::CacheManager;
use crate::cache::store::CacheStore;

/// How a computation ended, as seen by its callers.
#[derive(Clone)]
enum Settled<V, E> {
    Done(Result<V, E>),
    Panicked,
    /// The task was dropped before finishing.
    Cancelled,
}

type Flight<V, E> = Shared<BoxFuture<'static, Settled<V, E>>>;

struct Pending<V, E> {
    id: u64,
    flight: Flight<V, E>,
}

struct Inner<S, V, E> {
    store: S,
    pending: HashMap<String, Pending<V, E>>,
    next_id: u64,
}

impl<S, V, E> Inner<S, V, E> {
    /// Drop the registration for `key` if it is still computation `id`.
    fn forget(&mut self, key: &str, id: u64) -> bool {
        if self.pending.get(key).is_some_and(|p| p.id == id) {
            self.pending.remove(key);
            true
        } else {
            false
        }
    }
}

/// A cache store with per-key request coalescing.
///
/// Must be used from within a tokio runtime.
pub struct AsyncCache<V, E, S = CacheManager<V>> {
    inner: Arc<Mutex<Inner<S, V, E>>>,
}

impl<V, E, S> Clone for AsyncCache<V, E, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, E, S> AsyncCache<V, E, S>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    S: CacheStore<V> + Send + 'static,
{
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                store,
                pending: HashMap::new(),
                next_id: 0,
            })),
        }
    }

    /// Return the cached value for `key`, computing it at most once across
    /// concurrent callers.
    ///
    /// `compute` is invoked only when the key is neither cached nor already
    /// being computed; it is called while the cache is locked, so it must not
    /// call back into this cache itself (the future it returns may).
    /// Errors are returned exactly as `compute` produced them and are never
    /// cached. If the computation panics, the panic is re-raised here.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let mut compute = Some(compute);
        loop {
            let (id, flight) = {
                let mut inner = self.inner.lock();
                if let Some(value) = inner.store.get(key) {
                    return Ok(value);
                }

                let joined = inner.pending.get(key).map(|p| (p.id, p.flight.clone()));
                match (joined, compute.take()) {
                    (Some(joined), unused) => {
                        compute = unused;
                        debug!(key, id = joined.0, "Joining in-flight computation");
                        joined
                    }
                    (None, Some(compute)) => self.start(&mut inner, key, compute()),
                    (None, None) => panic!("computation for cache key {key:?} was cancelled"),
                }
            };

            match flight.await {
                Settled::Done(outcome) => return outcome,
                Settled::Panicked => panic!("computation for cache key {key:?} panicked"),
                Settled::Cancelled => {
                    self.inner.lock().forget(key, id);
                    debug!(key, id, "Computation was cancelled, retrying");
                }
            }
        }
    }

    fn start<Fut>(&self, inner: &mut Inner<S, V, E>, key: &str, fut: Fut) -> (u64, Flight<V, E>)
    where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let id = inner.next_id;
        inner.next_id += 1;

        let registration = Registration {
            state: Arc::clone(&self.inner),
            key: key.to_string(),
            id,
            armed: true,
        };
        let persists = inner.store.persists();
        let task = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(fut).catch_unwind().await.ok();
            if persists {
                let written = outcome.clone();
                let settled = tokio::task::spawn_blocking(move || {
                    registration.settle(written.as_ref());
                })
                .await;
                if let Err(e) = settled {
                    warn!(error = %e, "Write-back task failed");
                }
            } else {
                registration.settle(outcome.as_ref());
            }
            outcome
        });

        let flight = async move {
            match task.await {
                Ok(Some(outcome)) => Settled::Done(outcome),
                Ok(None) => Settled::Panicked,
                Err(e) if e.is_cancelled() => Settled::Cancelled,
                Err(_) => Settled::Panicked,
            }
        }
        .boxed()
        .shared();
        inner.pending.insert(
            key.to_string(),
            Pending {
                id,
                flight: flight.clone(),
            },
        );
        debug!(key, id, "Started computation");
        (id, flight)
    }

    /// Remove matching keys from the store and forget matching in-flight
    /// computations. Callers already waiting still get their result, but a
    /// forgotten computation no longer writes into the store.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let mut inner = self.inner.lock();
        let removed = inner.store.invalidate(pattern);

        let matcher = KeyPattern::parse(pattern);
        let before = inner.pending.len();
        inner.pending.retain(|key, _| !matcher.matches(key));
        let forgotten = before - inner.pending.len();

        if forgotten > 0 {
            debug!(pattern, forgotten, "Forgot in-flight computations");
        }
        removed
    }

    /// Number of computations currently registered.
    pub fn in_flight(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Run `f` against the wrapped store under the cache lock.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.inner.lock().store)
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().store.stats()
    }

    pub fn prune(&self) -> usize {
        self.inner.lock().store.prune()
    }

    /// Clear the store and forget every in-flight computation.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.store.clear();
        inner.pending.clear();
    }
}

/// A computation's claim on its pending-table slot.
///
/// Released by [`Registration::settle`], or on drop if the owning task is
/// torn down before it gets there.
struct Registration<S, V, E> {
    state: Arc<Mutex<Inner<S, V, E>>>,
    key: String,
    id: u64,
    armed: bool,
}

impl<S, V, E> Registration<S, V, E>
where
    S: CacheStore<V>,
    V: Clone,
{
    /// Unregister a finished computation and write its value back.
    ///
    /// Does nothing if the registration was dropped by `invalidate` or `clear`
    /// (or replaced by a newer computation) in the meantime.
    fn settle(mut self, outcome: Option<&Result<V, E>>) {
        self.armed = false;
        let (key, id) = (self.key.as_str(), self.id);

        let mut inner = self.state.lock();
        if !inner.forget(key, id) {
            debug!(key, id, "Computation settled after being forgotten");
            return;
        }

        match outcome {
            Some(Ok(value)) => {
                inner.store.set(key, value.clone(), None);
                debug!(key, id, "Computation settled, value cached");
            }
            Some(Err(_)) => debug!(key, id, "Computation failed, nothing cached"),
            None => warn!(key, id, "Computation panicked"),
        }
    }
}

impl<S, V, E> Drop for Registration<S, V, E> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.state.lock().forget(&self.key, self.id) {
            warn!(key = %self.key, id = self.id, "Computation dropped before settling");
        }
    }
}
