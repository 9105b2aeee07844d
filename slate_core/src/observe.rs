//! Read-side change detection: polling streams over the blackboard's
//! pull-based `get()` primitive.
//!
//! The core protocol has no notification channel, so this layer samples
//! one key at a fixed period and exposes the result as a lazy, infinite,
//! cancelable iterator. It is implemented purely on the public `Reader`
//! API; a future notification-capable core would not change it.

use crate::blackboard::Reader;
use crate::config::ObserverConfig;
use crate::error::SlateResult;
use bytemuck::{NoUninit, Pod};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default sampling period for observers.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shareable handle that stops an observer from any thread.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Polling stream over one key of a blackboard store.
///
/// Yields `Ok(value)` per tick (or per observed change when distinct
/// filtering is on). The first failure to acquire the entry is yielded
/// once, then the stream terminates; there are no internal retries —
/// callers needing resilience re-subscribe. Cancellation stops polling
/// immediately and ends the stream without further values.
pub struct ChangeObserver<K, V> {
    reader: Reader<K>,
    key: K,
    interval: Duration,
    cancel: Arc<AtomicBool>,
    distinct: Option<Box<dyn FnMut(&V, &V) -> bool + Send>>,
    last: Option<V>,
    started: bool,
    done: bool,
}

impl<K: Copy + NoUninit + 'static, V: Pod + 'static> ChangeObserver<K, V> {
    /// Observe `key` through `reader` at the default period.
    pub fn new(reader: Reader<K>, key: K) -> Self {
        Self {
            reader,
            key,
            interval: DEFAULT_POLL_INTERVAL,
            cancel: Arc::new(AtomicBool::new(false)),
            distinct: None,
            last: None,
            started: false,
            done: false,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Suppress consecutive emissions that compare equal under `eq`.
    pub fn distinct_by<F>(mut self, eq: F) -> Self
    where
        F: FnMut(&V, &V) -> bool + Send + 'static,
    {
        self.distinct = Some(Box::new(eq));
        self
    }

    /// Suppress consecutive emissions of equal values.
    pub fn distinct(self) -> Self
    where
        V: PartialEq,
    {
        self.distinct_by(|a, b| a == b)
    }

    /// Apply observer settings loaded from a config file.
    pub fn apply_config(self, config: &ObserverConfig) -> Self
    where
        V: PartialEq,
    {
        let observer = self.with_interval(config.poll_interval());
        if config.distinct {
            observer.distinct()
        } else {
            observer
        }
    }

    /// Handle that stops this observer from any thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: self.cancel.clone(),
        }
    }
}

/// Sleep for `interval`, waking early if the flag is raised.
fn sleep_cancellable(interval: Duration, cancel: &AtomicBool) {
    let deadline = Instant::now() + interval;
    loop {
        if cancel.load(Ordering::Acquire) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep((deadline - now).min(Duration::from_millis(1)));
    }
}

impl<K: Copy + NoUninit + 'static, V: Pod + 'static> Iterator for ChangeObserver<K, V> {
    type Item = SlateResult<V>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done || self.cancel.load(Ordering::Acquire) {
                self.done = true;
                return None;
            }

            // The first sample is immediate; later ones are paced.
            if self.started {
                sleep_cancellable(self.interval, &self.cancel);
                if self.cancel.load(Ordering::Acquire) {
                    self.done = true;
                    return None;
                }
            } else {
                self.started = true;
            }

            // Handles are cheap to reacquire, so every tick re-resolves
            // the entry instead of pinning one handle forever.
            let value = match self.reader.entry::<V>(self.key) {
                Ok(handle) => handle.get(),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            if let Some(eq) = &mut self.distinct {
                if let Some(last) = &self.last {
                    if eq(last, &value) {
                        continue;
                    }
                }
                self.last = Some(value);
            }

            return Some(Ok(value));
        }
    }
}
