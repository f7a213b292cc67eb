//! Test doubles: protocol engine lock and helpers for building stores.

use std::boxed::Box;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::engine::{EngineError, EngineLock};
use crate::store::RegisterStore;
use crate::time::StdClock;

/// Spin-lock engine that records how many callers hold it at once.
#[derive(Debug, Default)]
pub(crate) struct MockEngine {
    locked: AtomicBool,
    holders: AtomicUsize,
    max_holders: AtomicUsize,
    lock_calls: AtomicUsize,
    fail_lock: AtomicBool,
    fail_unlock: AtomicBool,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    pub(crate) fn max_holders(&self) -> usize {
        self.max_holders.load(Ordering::Acquire)
    }

    pub(crate) fn lock_calls(&self) -> usize {
        self.lock_calls.load(Ordering::Acquire)
    }

    /// Makes the next `lock` call fail without taking the lock.
    pub(crate) fn fail_next_lock(&self) {
        self.fail_lock.store(true, Ordering::Release);
    }

    /// Makes the next `unlock` call report failure (the lock is still released).
    pub(crate) fn fail_next_unlock(&self) {
        self.fail_unlock.store(true, Ordering::Release);
    }
}

impl EngineLock for MockEngine {
    fn lock(&self) -> Result<(), EngineError> {
        self.lock_calls.fetch_add(1, Ordering::AcqRel);
        if self.fail_lock.swap(false, Ordering::AcqRel) {
            return Err(EngineError::LockFailed);
        }
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
        let holders = self.holders.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_holders.fetch_max(holders, Ordering::AcqRel);
        Ok(())
    }

    fn unlock(&self) -> Result<(), EngineError> {
        self.holders.fetch_sub(1, Ordering::AcqRel);
        self.locked.store(false, Ordering::Release);
        if self.fail_unlock.swap(false, Ordering::AcqRel) {
            return Err(EngineError::UnlockFailed);
        }
        Ok(())
    }
}

pub(crate) type MockStore = RegisterStore<MockEngine, StdClock>;

/// Uninitialized store with a 'static lifetime.
pub(crate) fn leak_store() -> &'static MockStore {
    Box::leak(Box::new(RegisterStore::new(StdClock::new())))
}

pub(crate) fn leak_engine() -> &'static MockEngine {
    Box::leak(Box::new(MockEngine::new()))
}

/// Store that already went through `init`, plus its engine.
pub(crate) fn leak_ready_store() -> (&'static MockStore, &'static MockEngine) {
    let store = leak_store();
    let engine = leak_engine();
    store.init(Some(engine)).unwrap();
    (store, engine)
}
