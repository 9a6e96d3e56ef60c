//! Request coalescing: at most one in-flight fetch per key.
//!
//! The first caller for a key (the leader) registers a shared slot and spawns
//! the work; later callers join the slot and receive a clone of the same
//! value. The registration is dropped by a guard as soon as the work settles,
//! before any waiter is woken, so a failed or cancelled fetch never blocks
//! future requests for that key.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

/// Error returned when the shared work ended without producing a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoalesceError {
    /// The leader task was dropped or panicked before completing.
    #[error("in-flight request for {0:?} ended without a result")]
    Abandoned(String),
}

type Slot<V> = watch::Receiver<Option<V>>;
type InFlightMap<V> = Arc<Mutex<HashMap<String, Slot<V>>>>;

/// Deduplicates concurrent work per string key.
#[derive(Debug)]
pub struct RequestCoalescer<V> {
    inflight: InFlightMap<V>,
}

impl<V> Default for RequestCoalescer<V> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// Removes the in-flight registration when dropped.
struct Registration<V> {
    inflight: InFlightMap<V>,
    key: String,
}

impl<V> Drop for Registration<V> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        inflight.remove(&self.key);
    }
}

impl<V> RequestCoalescer<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty coalescer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `factory` for `key`, or join the run already in flight.
    ///
    /// `factory` is invoked only when no run for `key` is pending; its future
    /// is spawned on the current tokio runtime so it completes even if every
    /// caller stops waiting.
    ///
    /// # Errors
    /// Returns [`CoalesceError::Abandoned`] when the shared work panicked or
    /// was torn down before producing a value.
    pub async fn run<F, Fut>(&self, key: &str, factory: F) -> Result<V, CoalesceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let mut slot = self.join_or_start(key, factory);
        let value = slot
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|settled| (*settled).clone());
        value.ok_or_else(|| CoalesceError::Abandoned(key.to_owned()))
    }

    fn join_or_start<F, Fut>(&self, key: &str, factory: F) -> Slot<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let (tx, rx) = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = inflight.get(key) {
                debug!(%key, "Joining in-flight request");
                return slot.clone();
            }
            let (tx, rx) = watch::channel(None);
            inflight.insert(key.to_owned(), rx.clone());
            (tx, rx)
        };

        let registration = Registration {
            inflight: Arc::clone(&self.inflight),
            key: key.to_owned(),
        };
        let work = factory();
        tokio::spawn(async move {
            let value = work.await;
            drop(registration);
            tx.send_replace(Some(value));
        });
        rx
    }

    /// Number of keys with work currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    fn counting_factory(
        calls: &Arc<AtomicUsize>,
        delay: Duration,
    ) -> impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = usize> + Send>> {
        let calls = Arc::clone(calls);
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(async move {
                sleep(delay).await;
                n
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_run() {
        let coalescer = RequestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            coalescer.run("alice", counting_factory(&calls, Duration::from_millis(100))),
            coalescer.run("alice", counting_factory(&calls, Duration::from_millis(100))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, Ok(1));
        assert_eq!(b, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn registration_is_removed_before_callers_resume() {
        let coalescer = RequestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = coalescer
            .run("alice", counting_factory(&calls, Duration::from_millis(10)))
            .await;
        assert_eq!(first, Ok(1));
        assert_eq!(coalescer.in_flight(), 0);

        let second = coalescer
            .run("alice", counting_factory(&calls, Duration::from_millis(10)))
            .await;
        assert_eq!(second, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_keys_run_independently() {
        let coalescer = RequestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            coalescer.run("alice", counting_factory(&calls, Duration::from_millis(50))),
            coalescer.run("bob", counting_factory(&calls, Duration::from_millis(50))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_ne!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_work_releases_the_key() {
        let coalescer: RequestCoalescer<usize> = RequestCoalescer::new();

        async fn explode() -> usize {
            sleep(Duration::from_millis(5)).await;
            panic!("upstream exploded");
        }

        let failed = coalescer.run("alice", explode).await;
        assert_eq!(failed, Err(CoalesceError::Abandoned("alice".into())));
        assert_eq!(coalescer.in_flight(), 0);

        let recovered = coalescer.run("alice", || async { 7 }).await;
        assert_eq!(recovered, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn caller_dropping_does_not_strand_the_run() {
        let coalescer = RequestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            coalescer.run("alice", counting_factory(&calls, Duration::from_millis(100))),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(coalescer.in_flight(), 1);

        let joined = coalescer
            .run("alice", counting_factory(&calls, Duration::from_millis(100)))
            .await;
        assert_eq!(joined, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.in_flight(), 0);
    }
}
