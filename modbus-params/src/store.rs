//! Modbus parameter register store.
//!
//! The store owns the slot table, one guard per slot and the engine handle.
//! Every access follows the same path:
//!
//! 1. validate the slot index
//! 2. check the store is ready (guards armed, engine known)
//! 3. take the slot guard, waiting at most the guard timeout
//! 4. take the engine lock, touch the one slot, release the engine lock
//! 5. release the slot guard
//!
//! Steps 3 and 4 are scoped, so an engine lock failure still hands the slot
//! guard back.

use core::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

use crate::descriptor::{self, RegisterAreaDescriptor};
use crate::engine::{with_engine_locked, AreaRegistry, EngineLock};
use crate::error::{ParamsError, Result};
use crate::guard::SlotGuard;
use crate::slots::{Bank, SlotTable, HOLDING_REGISTER_UINT_COUNT, INPUT_REGISTER_FLOAT_COUNT};
use crate::time::TimeSource;

/// Default bound on the slot guard wait
pub const MUTEX_TIMEOUT_MS: u32 = 100;

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;

/// Parameter register store shared by the producer and the protocol engine.
///
/// Meant to live in a `static`: [`RegisterStore::init`] takes `&'static self`
/// so the slot addresses handed out in descriptors never move.
pub struct RegisterStore<E, T> {
    table: SlotTable,
    input_guards: [SlotGuard; INPUT_REGISTER_FLOAT_COUNT],
    holding_guards: [SlotGuard; HOLDING_REGISTER_UINT_COUNT],
    engine: AtomicPtr<E>,
    state: AtomicU8,
    clock: T,
    guard_timeout_ms: u32,
}

impl<E, T> RegisterStore<E, T> {
    /// Creates an uninitialized store.
    pub const fn new(clock: T) -> Self {
        Self {
            table: SlotTable::new(),
            input_guards: [const { SlotGuard::new() }; INPUT_REGISTER_FLOAT_COUNT],
            holding_guards: [const { SlotGuard::new() }; HOLDING_REGISTER_UINT_COUNT],
            engine: AtomicPtr::new(core::ptr::null_mut()),
            state: AtomicU8::new(UNINITIALIZED),
            clock,
            guard_timeout_ms: MUTEX_TIMEOUT_MS,
        }
    }

    /// Overrides the bound on the slot guard wait.
    pub const fn with_guard_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.guard_timeout_ms = timeout_ms;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    fn guards(&self, bank: Bank) -> &[SlotGuard] {
        match bank {
            Bank::Input => &self.input_guards,
            Bank::Holding => &self.holding_guards,
        }
    }

    fn all_guards(&self) -> impl Iterator<Item = &SlotGuard> {
        self.input_guards.iter().chain(self.holding_guards.iter())
    }

    /// Descriptor of one slot, for the engine's address table.
    pub fn area_descriptor(
        &self,
        bank: Bank,
        index: impl Into<usize>,
    ) -> Result<RegisterAreaDescriptor> {
        let index = bank.check_index(index.into())?;
        // Guards are armed only by a successful init.
        if !self.guards(bank)[index].is_present() {
            return Err(ParamsError::NotInitialized);
        }

        Ok(RegisterAreaDescriptor {
            layout: descriptor::areas(bank)[index],
            address: self.table.address(bank, index),
        })
    }
}

impl<E: EngineLock + 'static, T: TimeSource> RegisterStore<E, T> {
    /// Brings the store from uninitialized to ready, exactly once.
    ///
    /// Sample slots start as NaN ("not sampled yet"), configuration slots as
    /// zero. Either every guard is armed and the store is ready, or the store
    /// stays uninitialized. Failure here must stop start-up.
    ///
    /// A call that overlaps another init still in progress gets
    /// [`ParamsError::NotInitialized`]; once the store is ready every further
    /// call gets [`ParamsError::AlreadyInitialized`].
    pub fn init(&'static self, engine: Option<&'static E>) -> Result<()> {
        let Some(engine) = engine else {
            log_error!("register store init without engine handle");
            return Err(ParamsError::NullArgument);
        };

        self.state
            .compare_exchange(UNINITIALIZED, INITIALIZING, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|state| match state {
                // Another init is still running and may yet roll back.
                INITIALIZING => ParamsError::NotInitialized,
                _ => ParamsError::AlreadyInitialized,
            })?;

        self.table.reset();
        self.engine
            .store(engine as *const E as *mut E, Ordering::Release);

        if !self.all_guards().all(|guard| guard.create()) {
            log_error!("slot guard creation failed");
            self.all_guards().for_each(SlotGuard::retire);
            self.engine.store(core::ptr::null_mut(), Ordering::Release);
            self.state.store(UNINITIALIZED, Ordering::Release);
            return Err(ParamsError::NotInitialized);
        }

        self.state.store(READY, Ordering::Release);
        log_info!(
            "register store ready ({} input, {} holding slots)",
            INPUT_REGISTER_FLOAT_COUNT,
            HOLDING_REGISTER_UINT_COUNT
        );
        Ok(())
    }

    fn engine(&self) -> Result<&'static E> {
        if !self.is_ready() {
            return Err(ParamsError::NotInitialized);
        }
        let engine = self.engine.load(Ordering::Acquire);
        // SAFETY: the pointer is either null or was taken from the
        // `&'static E` passed to `init`.
        unsafe { engine.as_ref() }.ok_or(ParamsError::NotInitialized)
    }

    fn access<R>(&self, bank: Bank, index: usize, f: impl FnOnce(&SlotTable, usize) -> R) -> Result<R> {
        let index = bank.check_index(index)?;
        let engine = self.engine()?;

        let _lease = self.guards(bank)[index]
            .acquire(u64::from(self.guard_timeout_ms) * 1_000, &self.clock)
            .inspect_err(|err| {
                if err.is_transient() {
                    log_warn!("slot guard timeout ({})", index);
                }
            })?;

        with_engine_locked(engine, || f(&self.table, index)).map_err(|err| {
            log_error!("slot access aborted: {}", err);
            ParamsError::EngineLockFailure
        })
    }

    pub fn set_input_register_float(&self, index: impl Into<usize>, value: f32) -> Result<()> {
        self.access(Bank::Input, index.into(), |table, i| table.store_float(i, value))
    }

    pub fn get_input_register_float(&self, index: impl Into<usize>) -> Result<f32> {
        self.access(Bank::Input, index.into(), |table, i| table.load_float(i))
    }

    pub fn set_holding_register_uint(&self, index: impl Into<usize>, value: u16) -> Result<()> {
        self.access(Bank::Holding, index.into(), |table, i| table.store_uint(i, value))
    }

    pub fn get_holding_register_uint(&self, index: impl Into<usize>) -> Result<u16> {
        self.access(Bank::Holding, index.into(), |table, i| table.load_uint(i))
    }

    /// Hands every slot's descriptor to the engine, input bank first.
    pub fn publish_areas<R: AreaRegistry + ?Sized>(&self, registry: &mut R) -> Result<()> {
        for bank in Bank::ALL {
            for index in 0..bank.slot_count() {
                let descriptor = self.area_descriptor(bank, index)?;
                registry.register_area(descriptor).map_err(|err| {
                    log_error!("publishing area {} failed: {}", index, err);
                    ParamsError::AreaRejected
                })?;
                log_debug!(
                    "published area at offset {} ({} bytes)",
                    descriptor.start_offset(),
                    descriptor.size()
                );
            }
        }
        Ok(())
    }
}
