//! Per-slot guards with bounded acquisition.
//!
//! A guard starts out absent. `init` arms every guard exactly once; from
//! then on a guard is either free or held by one task. An absent guard makes
//! its slot unusable, which is how accesses before `init` are rejected.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::error::{ParamsError, Result};
use crate::time::TimeSource;

const ABSENT: u8 = 0;
const FREE: u8 = 1;
const HELD: u8 = 2;

/// Synchronization handle for a single slot.
#[derive(Debug)]
pub struct SlotGuard {
    state: AtomicU8,
}

impl SlotGuard {
    /// Creates an absent (not yet armed) guard.
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(ABSENT),
        }
    }

    /// Arms the guard. Returns `false` if it was already armed.
    pub(crate) fn create(&self) -> bool {
        self.state
            .compare_exchange(ABSENT, FREE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Puts a free guard back into the absent state.
    ///
    /// Only used to unwind a failed `init` before any task can see the store.
    pub(crate) fn retire(&self) {
        let _ = self
            .state
            .compare_exchange(FREE, ABSENT, Ordering::AcqRel, Ordering::Acquire);
    }

    pub fn is_present(&self) -> bool {
        self.state.load(Ordering::Acquire) != ABSENT
    }

    /// Acquires the guard, spinning for at most `timeout_us`.
    ///
    /// The returned lease releases the guard when dropped, so every exit
    /// path of the caller gives the slot back.
    pub fn acquire<T: TimeSource + ?Sized>(
        &self,
        timeout_us: u64,
        clock: &T,
    ) -> Result<SlotLease<'_>> {
        let start = clock.now_us();
        loop {
            match self
                .state
                .compare_exchange_weak(FREE, HELD, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => return Ok(SlotLease { guard: self }),
                Err(ABSENT) => return Err(ParamsError::NotInitialized),
                Err(_) => {}
            }
            if clock.elapsed_since(start) >= timeout_us {
                return Err(ParamsError::LockTimeout);
            }
            core::hint::spin_loop();
        }
    }
}

impl Default for SlotGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Held slot guard. Released on drop.
#[derive(Debug)]
pub struct SlotLease<'a> {
    guard: &'a SlotGuard,
}

impl Drop for SlotLease<'_> {
    fn drop(&mut self) {
        self.guard.state.store(FREE, Ordering::Release);
    }
}
