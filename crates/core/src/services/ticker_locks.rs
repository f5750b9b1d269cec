use log::warn;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// One mutex per ticker, shared by the backfill runs of a process.
///
/// Runs for the same ticker take turns; runs on different tickers do not
/// contend. Entries exist only while some run holds or waits for them.
#[derive(Debug, Default)]
pub struct TickerLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TickerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock of `ticker`.
    pub fn with_lock<T>(&self, ticker: &str, f: impl FnOnce() -> T) -> T {
        let handle = self.handle(ticker);
        let result = {
            let _guard = Self::lock(&handle);
            f()
        };
        self.release(ticker, handle);
        result
    }

    /// The lock handle for `ticker`, created on first use.
    pub fn handle(&self, ticker: &str) -> Arc<Mutex<()>> {
        self.registry()
            .entry(ticker.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Block until `handle` is acquired.
    ///
    /// The mutex guards no data, so a poisoned lock is recovered.
    pub fn lock(handle: &Mutex<()>) -> MutexGuard<'_, ()> {
        handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Give back `handle`, dropping the ticker's entry when no other run
    /// holds a handle to it.
    pub fn release(&self, ticker: &str, handle: Arc<Mutex<()>>) {
        drop(handle);
        let mut locks = self.registry();
        // Handles are only cloned under the registry lock, so a count of one
        // cannot grow while it is held.
        if locks
            .get(ticker)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(ticker);
        }
    }

    /// Number of tickers currently locked or waited on.
    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(|poisoned| {
            warn!("Ticker lock registry was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
