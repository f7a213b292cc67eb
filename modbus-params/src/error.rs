//! Register store error types

use core::fmt;

/// Result type for register store operations
pub type Result<T> = core::result::Result<T, ParamsError>;

/// Errors returned by the register store
///
/// `NullArgument` and `InvalidIndex` are caller bugs and are never worth a
/// retry. `LockTimeout` is transient: the producer and the engine try again on
/// their next cycle. `EngineLockFailure` points at the protocol engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ParamsError {
    /// Required engine handle was not supplied
    NullArgument = 0x1,
    /// Slot index outside the bank's enumeration
    InvalidIndex = 0x2,
    /// Store not initialized, or the slot has no guard
    NotInitialized = 0x3,
    /// Slot guard not acquired within the bounded wait
    LockTimeout = 0x4,
    /// Protocol engine lock or unlock failed
    EngineLockFailure = 0x5,
    /// `init` was already called once
    AlreadyInitialized = 0x6,
    /// Protocol engine refused a register area
    AreaRejected = 0x7,
}

impl fmt::Display for ParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamsError::NullArgument => write!(f, "missing engine handle"),
            ParamsError::InvalidIndex => write!(f, "slot index out of range"),
            ParamsError::NotInitialized => write!(f, "register store not initialized"),
            ParamsError::LockTimeout => write!(f, "slot guard wait timed out"),
            ParamsError::EngineLockFailure => write!(f, "protocol engine lock failed"),
            ParamsError::AlreadyInitialized => write!(f, "register store already initialized"),
            ParamsError::AreaRejected => write!(f, "register area rejected by engine"),
        }
    }
}

impl ParamsError {
    /// Whether the caller should simply try again on its next cycle
    pub fn is_transient(&self) -> bool {
        matches!(self, ParamsError::LockTimeout)
    }
}
