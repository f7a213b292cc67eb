//! Slot enumerations, register banks and the backing slot table.
//!
//! Each bank is a dense array of slots. The array index is the slot's
//! enumeration value and never changes once the firmware is built.

use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

/// Number of read-only `f32` slots in the input register bank
pub const INPUT_REGISTER_FLOAT_COUNT: usize = 3;

/// Number of read-write `u16` slots in the holding register bank
pub const HOLDING_REGISTER_UINT_COUNT: usize = 1;

/// Value of a sample slot that the producer has not written yet
pub const NOT_SAMPLED: f32 = f32::NAN;

/// Read-only sample slots (input registers)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum InputRegFloat {
    /// Input registers 0-1
    AmbientTempDegC = 0,
    /// Input registers 2-3
    AmbientHumiPct = 1,
    /// Input registers 4-5
    AmbientPressureHpa = 2,
}

impl InputRegFloat {
    /// All slots in register order
    pub const ALL: [InputRegFloat; INPUT_REGISTER_FLOAT_COUNT] = [
        InputRegFloat::AmbientTempDegC,
        InputRegFloat::AmbientHumiPct,
        InputRegFloat::AmbientPressureHpa,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl From<InputRegFloat> for usize {
    fn from(slot: InputRegFloat) -> usize {
        slot.index()
    }
}

/// Read-write configuration slots (holding registers)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HoldingRegUint {
    /// Holding register 0, sampling period in milliseconds
    AmbientSensePeriodMs = 0,
}

impl HoldingRegUint {
    /// All slots in register order
    pub const ALL: [HoldingRegUint; HOLDING_REGISTER_UINT_COUNT] =
        [HoldingRegUint::AmbientSensePeriodMs];

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl From<HoldingRegUint> for usize {
    fn from(slot: HoldingRegUint) -> usize {
        slot.index()
    }
}

/// Access allowed to the remote master
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// Register bank kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bank {
    /// Input registers, `f32` samples
    Input,
    /// Holding registers, `u16` configuration
    Holding,
}

impl Bank {
    pub const ALL: [Bank; 2] = [Bank::Input, Bank::Holding];

    /// Number of slots in this bank
    pub const fn slot_count(self) -> usize {
        match self {
            Bank::Input => INPUT_REGISTER_FLOAT_COUNT,
            Bank::Holding => HOLDING_REGISTER_UINT_COUNT,
        }
    }

    /// Byte size of one slot's storage
    pub const fn slot_size(self) -> usize {
        match self {
            Bank::Input => core::mem::size_of::<f32>(),
            Bank::Holding => core::mem::size_of::<u16>(),
        }
    }

    /// Total byte length of the bank's address space
    pub const fn byte_len(self) -> usize {
        self.slot_count() * self.slot_size()
    }

    pub const fn access(self) -> AccessMode {
        match self {
            Bank::Input => AccessMode::ReadOnly,
            Bank::Holding => AccessMode::ReadWrite,
        }
    }

    pub(crate) fn check_index(self, index: usize) -> crate::Result<usize> {
        if index < self.slot_count() {
            Ok(index)
        } else {
            Err(crate::ParamsError::InvalidIndex)
        }
    }
}

/// Backing storage for both banks.
///
/// Values are kept as atomics of the slot's width so the in-memory layout is
/// exactly the register image the engine reads: `f32` bits in the input bank,
/// plain `u16` in the holding bank, both packed without padding.
#[repr(C)]
pub(crate) struct SlotTable {
    floats: [AtomicU32; INPUT_REGISTER_FLOAT_COUNT],
    uints: [AtomicU16; HOLDING_REGISTER_UINT_COUNT],
}

impl SlotTable {
    pub(crate) const fn new() -> Self {
        Self {
            floats: [const { AtomicU32::new(0) }; INPUT_REGISTER_FLOAT_COUNT],
            uints: [const { AtomicU16::new(0) }; HOLDING_REGISTER_UINT_COUNT],
        }
    }

    /// Puts every slot into its power-on state.
    pub(crate) fn reset(&self) {
        for slot in &self.floats {
            slot.store(NOT_SAMPLED.to_bits(), Ordering::Relaxed);
        }
        for slot in &self.uints {
            slot.store(0, Ordering::Relaxed);
        }
    }

    pub(crate) fn load_float(&self, index: usize) -> f32 {
        f32::from_bits(self.floats[index].load(Ordering::Relaxed))
    }

    pub(crate) fn store_float(&self, index: usize, value: f32) {
        self.floats[index].store(value.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn load_uint(&self, index: usize) -> u16 {
        self.uints[index].load(Ordering::Relaxed)
    }

    pub(crate) fn store_uint(&self, index: usize, value: u16) {
        self.uints[index].store(value, Ordering::Relaxed);
    }

    /// Address of a slot's storage. Index must already be validated.
    pub(crate) fn address(&self, bank: Bank, index: usize) -> usize {
        match bank {
            Bank::Input => self.floats[index].as_ptr() as usize,
            Bank::Holding => self.uints[index].as_ptr() as usize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_values_are_dense() {
        for (i, slot) in InputRegFloat::ALL.iter().enumerate() {
            assert_eq!(usize::from(*slot), i);
        }
        for (i, slot) in HoldingRegUint::ALL.iter().enumerate() {
            assert_eq!(usize::from(*slot), i);
        }
    }

    #[test]
    fn bank_geometry() {
        assert_eq!(Bank::Input.slot_count(), 3);
        assert_eq!(Bank::Input.slot_size(), 4);
        assert_eq!(Bank::Input.byte_len(), 12);
        assert_eq!(Bank::Holding.slot_count(), 1);
        assert_eq!(Bank::Holding.slot_size(), 2);
        assert_eq!(Bank::Holding.byte_len(), 2);
        assert_eq!(Bank::Input.access(), AccessMode::ReadOnly);
        assert_eq!(Bank::Holding.access(), AccessMode::ReadWrite);
    }

    #[test]
    fn check_index_bounds() {
        assert_eq!(Bank::Input.check_index(2), Ok(2));
        assert_eq!(
            Bank::Input.check_index(3),
            Err(crate::ParamsError::InvalidIndex)
        );
        assert_eq!(Bank::Holding.check_index(0), Ok(0));
        assert_eq!(
            Bank::Holding.check_index(1),
            Err(crate::ParamsError::InvalidIndex)
        );
    }

    #[test]
    fn table_starts_zeroed_and_resets_to_sentinel() {
        let table = SlotTable::new();
        assert_eq!(table.load_float(0), 0.0);

        table.store_uint(0, 42);
        table.reset();
        for i in 0..INPUT_REGISTER_FLOAT_COUNT {
            assert!(table.load_float(i).is_nan());
        }
        assert_eq!(table.load_uint(0), 0);
    }

    #[test]
    fn slot_storage_is_packed() {
        let table = SlotTable::new();
        let base = table.address(Bank::Input, 0);
        assert_eq!(table.address(Bank::Input, 1), base + 4);
        assert_eq!(table.address(Bank::Input, 2), base + 8);
    }
}
