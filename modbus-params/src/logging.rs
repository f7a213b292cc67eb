//! Logging macros
//!
//! - `defmt` feature: forwards to the `defmt` logger of the firmware image
//! - Host tests and `std` builds: standard output, errors to standard error
//! - Anything else: arguments are type-checked and discarded

macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::info!($($arg)*);

        #[cfg(all(not(feature = "defmt"), any(test, feature = "std")))]
        ::std::println!("[INFO] {}", format_args!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test), not(feature = "std")))]
        let _ = format_args!($($arg)*);
    }};
}

macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::warn!($($arg)*);

        #[cfg(all(not(feature = "defmt"), any(test, feature = "std")))]
        ::std::println!("[WARN] {}", format_args!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test), not(feature = "std")))]
        let _ = format_args!($($arg)*);
    }};
}

macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::error!($($arg)*);

        #[cfg(all(not(feature = "defmt"), any(test, feature = "std")))]
        ::std::eprintln!("[ERROR] {}", format_args!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test), not(feature = "std")))]
        let _ = format_args!($($arg)*);
    }};
}

macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($($arg)*);

        #[cfg(all(not(feature = "defmt"), any(test, feature = "std")))]
        ::std::println!("[DEBUG] {}", format_args!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test), not(feature = "std")))]
        let _ = format_args!($($arg)*);
    }};
}

#[cfg(test)]
mod tests {
    use crate::error::ParamsError;

    #[test]
    fn every_level_accepts_format_arguments() {
        let err = ParamsError::EngineLockFailure;
        log_info!("register store ready ({} input, {} holding slots)", 3, 1);
        log_warn!("slot guard timeout ({})", 2);
        log_error!("slot access aborted: {}", err);
        log_debug!("published area at offset {} ({} bytes)", 8, 4);
    }
}
