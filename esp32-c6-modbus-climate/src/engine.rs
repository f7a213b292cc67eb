//! Engine lock for the Modbus slave.
//!
//! The slave serves register requests straight out of the register store's
//! memory, so it shares this one lock with the store.

use core::sync::atomic::{AtomicBool, Ordering};

use modbus_params::{EngineError, EngineLock};

/// Spins before `lock` gives up
const LOCK_SPIN_LIMIT: u32 = 100_000;

pub struct SlaveEngine {
    locked: AtomicBool,
}

impl SlaveEngine {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }
}

impl EngineLock for SlaveEngine {
    fn lock(&self) -> Result<(), EngineError> {
        for _ in 0..LOCK_SPIN_LIMIT {
            if self
                .locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(EngineError::LockFailed)
    }

    fn unlock(&self) -> Result<(), EngineError> {
        if self.locked.swap(false, Ordering::Release) {
            Ok(())
        } else {
            Err(EngineError::UnlockFailed)
        }
    }
}
