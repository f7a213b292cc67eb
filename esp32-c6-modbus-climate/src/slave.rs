//! Register side of the Modbus slave.
//!
//! The published areas end up in an [`AddressTable`] owned here, and every
//! request is served from it under the engine lock. RTU framing (UART, CRC,
//! function codes) sits in front of [`ModbusSlave::read`] and is not part of
//! this image; the main loop scans the input bank through the same path
//! after each sample.

use modbus_params::{
    AddressTable, AreaRegistry, Bank, EngineError, RegisterAreaDescriptor, RegisterError,
    HOLDING_REGISTER_UINT_COUNT, INPUT_REGISTER_FLOAT_COUNT,
};

use crate::engine::SlaveEngine;

pub const AREA_COUNT: usize = INPUT_REGISTER_FLOAT_COUNT + HOLDING_REGISTER_UINT_COUNT;

/// Registers in the input bank
pub const INPUT_REGISTER_COUNT: usize = Bank::Input.byte_len() / 2;

pub struct ModbusSlave {
    engine: &'static SlaveEngine,
    table: AddressTable<AREA_COUNT>,
}

impl ModbusSlave {
    pub const fn new(engine: &'static SlaveEngine) -> Self {
        Self {
            engine,
            table: AddressTable::new(),
        }
    }

    pub fn area_count(&self) -> usize {
        self.table.len()
    }

    pub fn read(&self, bank: Bank, start: u16, out: &mut [u16]) -> Result<(), RegisterError> {
        self.table.read_registers(self.engine, bank, start, out)
    }

    /// Whole input bank as a master would read it
    pub fn scan_inputs(&self) -> Result<[u16; INPUT_REGISTER_COUNT], RegisterError> {
        let mut words = [0u16; INPUT_REGISTER_COUNT];
        self.read(Bank::Input, 0, &mut words)?;
        Ok(words)
    }
}

impl AreaRegistry for ModbusSlave {
    fn register_area(&mut self, descriptor: RegisterAreaDescriptor) -> Result<(), EngineError> {
        self.table.register_area(descriptor)
    }
}
