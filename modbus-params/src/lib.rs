//! modbus-params - Modbus parameter register store for the ambient sense node
//!
//! The sampling task and the Modbus slave both work on the same small set of
//! typed values. This crate owns those values and hands them to the protocol
//! engine as flat, register-aligned areas:
//!
//! - Input registers: read-only `f32` samples (temperature, humidity, pressure)
//! - Holding registers: read-write `u16` configuration (sense period)
//!
//! # Modules
//!
//! - [`slots`]: slot enumerations, banks and the backing slot table
//! - [`guard`]: per-slot guards with bounded acquisition
//! - [`descriptor`]: register area layout and descriptors
//! - [`engine`]: protocol engine boundary (lock bridge, area registry, address table)
//! - [`store`]: the register store itself
//! - [`ambient`]: producer-side helpers for the ambient sensor
//! - [`time`]: time source abstraction used for bounded waits

#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

#[macro_use]
mod logging;

pub mod ambient;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod guard;
pub mod slots;
pub mod store;
pub mod time;

#[cfg(test)]
mod mock;

pub use ambient::{AmbientSense, Measurement, MeasurementError, SampleError, Sensor};
pub use descriptor::{AreaLayout, RegisterAreaDescriptor, REGISTER_WIDTH_BYTES};
pub use engine::{AddressTable, AreaRegistry, EngineError, EngineLock, RegisterError};
pub use error::{ParamsError, Result};
pub use slots::{
    AccessMode, Bank, HoldingRegUint, InputRegFloat, HOLDING_REGISTER_UINT_COUNT,
    INPUT_REGISTER_FLOAT_COUNT,
};
pub use store::{RegisterStore, MUTEX_TIMEOUT_MS};
pub use time::TimeSource;

#[cfg(any(test, feature = "std"))]
pub use time::StdClock;
