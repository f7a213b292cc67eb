//! Protocol engine boundary.
//!
//! The Modbus slave owns one coarse lock over its whole register space.
//! The store takes that lock around every slot access so the engine never
//! copies half of a value that is being rewritten. [`EngineSection`] scopes
//! the lock: it is released on every exit path, and an unlock error is
//! reported when the section is closed explicitly.
//!
//! At start-up the engine receives one [`RegisterAreaDescriptor`] per slot
//! through [`AreaRegistry`]. [`AddressTable`] is a ready-made registry for
//! engines that serve register requests straight out of the store's memory.

use core::fmt;

use crate::descriptor::{RegisterAreaDescriptor, REGISTER_WIDTH_BYTES};
use crate::slots::{AccessMode, Bank};

/// Errors reported by the protocol engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineError {
    /// Engine lock could not be taken
    LockFailed,
    /// Engine lock could not be released
    UnlockFailed,
    /// Engine refused a register area
    AreaRejected,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::LockFailed => write!(f, "engine lock failed"),
            EngineError::UnlockFailed => write!(f, "engine unlock failed"),
            EngineError::AreaRejected => write!(f, "register area rejected"),
        }
    }
}

/// Lock primitives exposed by the protocol engine handle
pub trait EngineLock: Sync {
    fn lock(&self) -> Result<(), EngineError>;
    fn unlock(&self) -> Result<(), EngineError>;
}

impl<T: EngineLock + ?Sized> EngineLock for &T {
    fn lock(&self) -> Result<(), EngineError> {
        (**self).lock()
    }

    fn unlock(&self) -> Result<(), EngineError> {
        (**self).unlock()
    }
}

/// Register area ingestion, called once per slot at start-up
pub trait AreaRegistry {
    fn register_area(&mut self, descriptor: RegisterAreaDescriptor) -> Result<(), EngineError>;
}

/// Held engine lock.
///
/// Close it with [`EngineSection::exit`] to learn whether the unlock worked.
/// A section dropped without `exit` (early return, `?`) still unlocks.
pub struct EngineSection<'a, E: EngineLock + ?Sized> {
    engine: &'a E,
    held: bool,
}

impl<'a, E: EngineLock + ?Sized> EngineSection<'a, E> {
    pub fn enter(engine: &'a E) -> Result<Self, EngineError> {
        engine.lock()?;
        Ok(Self { engine, held: true })
    }

    pub fn exit(mut self) -> Result<(), EngineError> {
        self.held = false;
        self.engine.unlock()
    }
}

impl<E: EngineLock + ?Sized> Drop for EngineSection<'_, E> {
    fn drop(&mut self) {
        if self.held {
            if let Err(err) = self.engine.unlock() {
                log_error!("engine unlock failed on early exit: {}", err);
            }
        }
    }
}

/// Runs `f` with the engine lock held.
pub fn with_engine_locked<E, R, F>(engine: &E, f: F) -> Result<R, EngineError>
where
    E: EngineLock + ?Sized,
    F: FnOnce() -> R,
{
    let section = EngineSection::enter(engine)?;
    let result = f();
    section.exit()?;
    Ok(result)
}

/// Errors from serving register requests through an [`AddressTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterError {
    /// No published area covers the requested register
    IllegalAddress,
    /// Remote write to a read-only area
    ReadOnly,
    /// Area layout is not the one its bank assigns to that slot
    UnknownLayout,
    /// Area overlaps one that is already published
    Overlap,
    /// No room left in the table
    TableFull,
    /// Engine lock failure while copying
    Engine(EngineError),
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::IllegalAddress => write!(f, "illegal register address"),
            RegisterError::ReadOnly => write!(f, "register is read-only"),
            RegisterError::UnknownLayout => write!(f, "area layout does not match its slot"),
            RegisterError::Overlap => write!(f, "area overlaps a published area"),
            RegisterError::TableFull => write!(f, "address table full"),
            RegisterError::Engine(err) => write!(f, "{}", err),
        }
    }
}

impl From<EngineError> for RegisterError {
    fn from(err: EngineError) -> Self {
        RegisterError::Engine(err)
    }
}

/// Engine-side address table built from published descriptors.
///
/// Register reads and writes are resolved against the table first and then
/// copied to or from slot storage with the engine lock held, one whole
/// request per lock. Writes to read-only areas are refused here, by access
/// mode; the store itself accepts writes to any bank.
///
/// Registers are copied as native-endian `u16` words. Byte order on the
/// wire is the transport's business.
#[derive(Debug, Default)]
pub struct AddressTable<const N: usize> {
    areas: heapless::Vec<RegisterAreaDescriptor, N>,
}

impl<const N: usize> AddressTable<N> {
    pub const fn new() -> Self {
        Self {
            areas: heapless::Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn areas(&self) -> &[RegisterAreaDescriptor] {
        &self.areas
    }

    /// Adds one area to the table.
    ///
    /// The descriptor's layout must be exactly the compile-time layout of its
    /// slot, so an area can never reach past its own slot's storage or claim
    /// write access to a read-only bank.
    pub fn insert(&mut self, descriptor: RegisterAreaDescriptor) -> Result<(), RegisterError> {
        let layout = descriptor.layout();
        if !layout.is_canonical() {
            return Err(RegisterError::UnknownLayout);
        }

        let overlaps = self.areas.iter().any(|area| {
            area.bank() == layout.bank()
                && area.start_offset() < layout.end_offset()
                && layout.start_offset() < area.layout().end_offset()
        });
        if overlaps {
            return Err(RegisterError::Overlap);
        }

        self.areas
            .push(descriptor)
            .map_err(|_| RegisterError::TableFull)
    }

    /// Area of `bank` covering `register`
    pub fn find(&self, bank: Bank, register: u16) -> Option<&RegisterAreaDescriptor> {
        self.areas
            .iter()
            .find(|area| area.bank() == bank && area.contains_register(register))
    }

    fn word_ptr(&self, bank: Bank, register: u16) -> Result<(*mut u16, AccessMode), RegisterError> {
        let area = self
            .find(bank, register)
            .ok_or(RegisterError::IllegalAddress)?;
        let word = usize::from(register - area.start_register());
        let address = area.address() + word * REGISTER_WIDTH_BYTES;
        Ok((address as *mut u16, area.access()))
    }

    /// Copies `out.len()` registers starting at `start` out of the store.
    pub fn read_registers<E: EngineLock + ?Sized>(
        &self,
        engine: &E,
        bank: Bank,
        start: u16,
        out: &mut [u16],
    ) -> Result<(), RegisterError> {
        // Resolve every register before taking the lock.
        for offset in 0..out.len() {
            self.word_ptr(bank, register_at(start, offset)?)?;
        }

        with_engine_locked(engine, || {
            for (offset, slot) in out.iter_mut().enumerate() {
                if let Ok(register) = register_at(start, offset) {
                    if let Ok((ptr, _)) = self.word_ptr(bank, register) {
                        // SAFETY: descriptors are only built by the register
                        // store and point into its 'static slot table, and
                        // `insert` only admits the canonical layout of each
                        // slot. The word is 2-byte aligned and lies inside
                        // the area.
                        // The store touches slot storage only while holding
                        // this same engine lock.
                        *slot = unsafe { core::ptr::read_volatile(ptr) };
                    }
                }
            }
        })?;
        Ok(())
    }

    /// Copies `values` into the store starting at register `start`.
    ///
    /// Nothing is written unless every target register is writable.
    pub fn write_registers<E: EngineLock + ?Sized>(
        &self,
        engine: &E,
        bank: Bank,
        start: u16,
        values: &[u16],
    ) -> Result<(), RegisterError> {
        for offset in 0..values.len() {
            let (_, access) = self.word_ptr(bank, register_at(start, offset)?)?;
            if access == AccessMode::ReadOnly {
                return Err(RegisterError::ReadOnly);
            }
        }

        with_engine_locked(engine, || {
            for (offset, value) in values.iter().enumerate() {
                if let Ok(register) = register_at(start, offset) {
                    if let Ok((ptr, _)) = self.word_ptr(bank, register) {
                        // SAFETY: as in `read_registers`; the area was checked
                        // to be read-write above.
                        unsafe { core::ptr::write_volatile(ptr, *value) };
                    }
                }
            }
        })?;
        Ok(())
    }
}

impl<const N: usize> AreaRegistry for AddressTable<N> {
    fn register_area(&mut self, descriptor: RegisterAreaDescriptor) -> Result<(), EngineError> {
        self.insert(descriptor).map_err(|err| {
            log_warn!("register area rejected: {}", err);
            EngineError::AreaRejected
        })
    }
}

fn register_at(start: u16, offset: usize) -> Result<u16, RegisterError> {
    u16::try_from(offset)
        .ok()
        .and_then(|offset| start.checked_add(offset))
        .ok_or(RegisterError::IllegalAddress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{leak_ready_store, MockEngine};
    use crate::slots::{HoldingRegUint, InputRegFloat};

    #[test]
    fn section_unlocks_on_exit_and_on_drop() {
        let engine = MockEngine::new();

        let section = EngineSection::enter(&engine).unwrap();
        assert!(engine.is_locked());
        section.exit().unwrap();
        assert!(!engine.is_locked());

        {
            let _section = EngineSection::enter(&engine).unwrap();
            assert!(engine.is_locked());
        }
        assert!(!engine.is_locked());
    }

    #[test]
    fn with_engine_locked_reports_unlock_failure() {
        let engine = MockEngine::new();
        engine.fail_next_unlock();
        assert_eq!(
            with_engine_locked(&engine, || 7),
            Err(EngineError::UnlockFailed)
        );
    }

    #[test]
    fn table_rejects_overlapping_areas() {
        let (store, _engine) = leak_ready_store();
        let mut table = AddressTable::<4>::new();
        let temp = store
            .area_descriptor(Bank::Input, InputRegFloat::AmbientTempDegC)
            .unwrap();
        table.insert(temp).unwrap();
        assert_eq!(table.insert(temp), Err(RegisterError::Overlap));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn table_refuses_widened_or_writable_input_area() {
        let (store, engine) = leak_ready_store();
        store
            .set_input_register_float(InputRegFloat::AmbientHumiPct, 41.0)
            .unwrap();

        let temp = store
            .area_descriptor(Bank::Input, InputRegFloat::AmbientTempDegC)
            .unwrap();
        let mut forged = temp;
        forged.layout.access = AccessMode::ReadWrite;
        forged.layout.size = 8;

        let mut table = AddressTable::<4>::new();
        assert_eq!(table.insert(forged), Err(RegisterError::UnknownLayout));
        assert_eq!(
            table.register_area(forged),
            Err(EngineError::AreaRejected)
        );
        assert!(table.is_empty());

        store.publish_areas(&mut table).unwrap();
        assert_eq!(
            table.write_registers(engine, Bank::Input, 0, &[0, 0x4120, 0, 0x4248]),
            Err(RegisterError::ReadOnly)
        );
        assert_eq!(
            store
                .get_input_register_float(InputRegFloat::AmbientHumiPct)
                .unwrap(),
            41.0
        );
    }

    #[test]
    fn table_reports_full() {
        let (store, _engine) = leak_ready_store();
        let mut table = AddressTable::<1>::new();
        table
            .register_area(store.area_descriptor(Bank::Input, 0usize).unwrap())
            .unwrap();
        assert_eq!(
            table.register_area(store.area_descriptor(Bank::Input, 1usize).unwrap()),
            Err(EngineError::AreaRejected)
        );
    }

    #[test]
    fn remote_read_sees_store_values() {
        let (store, engine) = leak_ready_store();
        let mut table = AddressTable::<4>::new();
        store.publish_areas(&mut table).unwrap();

        store
            .set_input_register_float(InputRegFloat::AmbientPressureHpa, 1013.25)
            .unwrap();

        let mut words = [0u16; 2];
        table
            .read_registers(engine, Bank::Input, 4, &mut words)
            .unwrap();
        let mut bytes = [0u8; 4];
        bytes[..2].copy_from_slice(&words[0].to_ne_bytes());
        bytes[2..].copy_from_slice(&words[1].to_ne_bytes());
        assert_eq!(f32::from_ne_bytes(bytes), 1013.25);
    }

    #[test]
    fn remote_read_past_bank_is_illegal() {
        let (store, engine) = leak_ready_store();
        let mut table = AddressTable::<4>::new();
        store.publish_areas(&mut table).unwrap();

        let mut words = [0u16; 2];
        assert_eq!(
            table.read_registers(engine, Bank::Input, 5, &mut words),
            Err(RegisterError::IllegalAddress)
        );
        assert_eq!(
            table.read_registers(engine, Bank::Holding, 1, &mut words[..1]),
            Err(RegisterError::IllegalAddress)
        );
    }

    #[test]
    fn remote_write_to_input_bank_is_refused() {
        let (store, engine) = leak_ready_store();
        let mut table = AddressTable::<4>::new();
        store.publish_areas(&mut table).unwrap();

        assert_eq!(
            table.write_registers(engine, Bank::Input, 0, &[1, 2]),
            Err(RegisterError::ReadOnly)
        );
        assert!(store
            .get_input_register_float(InputRegFloat::AmbientTempDegC)
            .unwrap()
            .is_nan());
    }

    #[test]
    fn remote_write_to_holding_bank_reaches_store() {
        let (store, engine) = leak_ready_store();
        let mut table = AddressTable::<4>::new();
        store.publish_areas(&mut table).unwrap();

        table
            .write_registers(engine, Bank::Holding, 0, &[2_500])
            .unwrap();
        assert_eq!(
            store
                .get_holding_register_uint(HoldingRegUint::AmbientSensePeriodMs)
                .unwrap(),
            2_500
        );
        assert!(!engine.is_locked());
    }
}
