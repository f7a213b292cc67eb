//! Register area layout and descriptors.
//!
//! The layout of both banks is computed at compile time from the slot
//! enumerations: slot `i` of a bank starts where slot `i - 1` ends, every
//! slot in a bank has the same register-aligned size, and the bank's areas
//! cover its storage without gaps. A descriptor is that layout plus the
//! address of the slot's storage inside the (static) register store.

use crate::slots::{AccessMode, Bank, HOLDING_REGISTER_UINT_COUNT, INPUT_REGISTER_FLOAT_COUNT};

/// Width of one protocol register
pub const REGISTER_WIDTH_BYTES: usize = 2;

const _: () = assert!(Bank::Input.slot_size() % REGISTER_WIDTH_BYTES == 0);
const _: () = assert!(Bank::Holding.slot_size() % REGISTER_WIDTH_BYTES == 0);

/// Position of one slot within its bank's address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AreaLayout {
    pub(crate) bank: Bank,
    pub(crate) index: usize,
    /// Byte offset from the start of the bank
    pub(crate) start_offset: usize,
    /// Byte size of the slot's storage
    pub(crate) size: usize,
    pub(crate) access: AccessMode,
}

impl AreaLayout {
    pub const fn bank(&self) -> Bank {
        self.bank
    }

    pub const fn index(&self) -> usize {
        self.index
    }

    pub const fn start_offset(&self) -> usize {
        self.start_offset
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    pub const fn access(&self) -> AccessMode {
        self.access
    }

    pub const fn end_offset(&self) -> usize {
        self.start_offset + self.size
    }

    /// True if this is exactly the layout the bank assigns to its slot
    pub fn is_canonical(&self) -> bool {
        areas(self.bank).get(self.index) == Some(self)
    }
}

/// Lays out `N` equally sized slots of `bank` back to back.
pub const fn build_layout<const N: usize>(bank: Bank) -> [AreaLayout; N] {
    let size = bank.slot_size();
    let mut areas = [AreaLayout {
        bank,
        index: 0,
        start_offset: 0,
        size,
        access: bank.access(),
    }; N];

    let mut offset = 0;
    let mut i = 0;
    while i < N {
        areas[i].index = i;
        areas[i].start_offset = offset;
        offset += size;
        i += 1;
    }
    areas
}

pub const INPUT_AREAS: [AreaLayout; INPUT_REGISTER_FLOAT_COUNT] = build_layout(Bank::Input);
pub const HOLDING_AREAS: [AreaLayout; HOLDING_REGISTER_UINT_COUNT] = build_layout(Bank::Holding);

/// All areas of a bank, in slot order
pub const fn areas(bank: Bank) -> &'static [AreaLayout] {
    match bank {
        Bank::Input => &INPUT_AREAS,
        Bank::Holding => &HOLDING_AREAS,
    }
}

/// Metadata the protocol engine needs to map one slot into its address space.
///
/// `address` points into the register store's slot table. The store can only
/// be initialized through a `&'static` reference, so the address stays valid
/// and fixed for the life of the process. The engine may read (and, for
/// read-write areas, write) `size` bytes there while it holds its own lock.
///
/// Only the register store builds descriptors; the fields are not writable
/// from outside the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterAreaDescriptor {
    pub(crate) layout: AreaLayout,
    pub(crate) address: usize,
}

impl RegisterAreaDescriptor {
    pub const fn layout(&self) -> AreaLayout {
        self.layout
    }

    pub const fn bank(&self) -> Bank {
        self.layout.bank
    }

    pub const fn start_offset(&self) -> usize {
        self.layout.start_offset
    }

    pub const fn size(&self) -> usize {
        self.layout.size
    }

    pub const fn access(&self) -> AccessMode {
        self.layout.access
    }

    /// First register address covered by this area
    pub const fn start_register(&self) -> u16 {
        (self.layout.start_offset / REGISTER_WIDTH_BYTES) as u16
    }

    /// Number of registers covered by this area
    pub const fn register_count(&self) -> u16 {
        (self.layout.size / REGISTER_WIDTH_BYTES) as u16
    }

    pub const fn contains_register(&self, register: u16) -> bool {
        register >= self.start_register()
            && register < self.start_register() + self.register_count()
    }

    /// Address of the slot's storage
    pub const fn address(&self) -> usize {
        self.address
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.address as *const u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_contiguous(bank: Bank) {
        let areas = areas(bank);
        assert_eq!(areas.len(), bank.slot_count());
        assert_eq!(areas[0].start_offset, 0);
        for pair in areas.windows(2) {
            assert_eq!(pair[1].start_offset, pair[0].end_offset());
            assert_eq!(pair[1].size, pair[0].size);
        }
        for (i, area) in areas.iter().enumerate() {
            assert_eq!(area.index, i);
            assert_eq!(area.bank, bank);
            assert_eq!(area.size % REGISTER_WIDTH_BYTES, 0);
            assert_eq!(area.start_offset % REGISTER_WIDTH_BYTES, 0);
        }
        assert_eq!(areas[areas.len() - 1].end_offset(), bank.byte_len());
    }

    #[test]
    fn input_areas_are_contiguous() {
        assert_contiguous(Bank::Input);
        assert!(INPUT_AREAS.iter().all(|a| a.access == AccessMode::ReadOnly));
    }

    #[test]
    fn holding_areas_are_contiguous() {
        assert_contiguous(Bank::Holding);
        assert!(HOLDING_AREAS.iter().all(|a| a.access == AccessMode::ReadWrite));
    }

    #[test]
    fn input_layout_matches_register_map() {
        let offsets: [usize; 3] = [
            INPUT_AREAS[0].start_offset,
            INPUT_AREAS[1].start_offset,
            INPUT_AREAS[2].start_offset,
        ];
        assert_eq!(offsets, [0, 4, 8]);
        assert_eq!(HOLDING_AREAS[0].start_offset, 0);
        assert_eq!(HOLDING_AREAS[0].size, 2);
    }

    #[test]
    fn descriptor_register_math() {
        let desc = RegisterAreaDescriptor {
            layout: INPUT_AREAS[2],
            address: 0,
        };
        assert_eq!(desc.start_register(), 4);
        assert_eq!(desc.register_count(), 2);
        assert!(desc.contains_register(4));
        assert!(desc.contains_register(5));
        assert!(!desc.contains_register(3));
        assert!(!desc.contains_register(6));
    }

    #[test]
    fn only_built_layouts_are_canonical() {
        assert!(INPUT_AREAS.iter().all(AreaLayout::is_canonical));
        assert!(HOLDING_AREAS.iter().all(AreaLayout::is_canonical));

        let mut widened = INPUT_AREAS[0];
        widened.size = 8;
        assert!(!widened.is_canonical());

        let mut writable = INPUT_AREAS[1];
        writable.access = AccessMode::ReadWrite;
        assert!(!writable.is_canonical());

        let mut past_end = HOLDING_AREAS[0];
        past_end.index = 1;
        assert!(!past_end.is_canonical());
    }
}
