//! Time source abstraction used for bounded waits.
//!
//! The store never sleeps; it only needs to know how long it has been
//! spinning on a slot guard. Firmware supplies a clock backed by the SoC
//! system timer, host builds use [`StdClock`].

/// Monotonic time source.
pub trait TimeSource: Send + Sync {
    /// Returns current time in microseconds since an arbitrary fixed origin.
    fn now_us(&self) -> u64;

    /// Returns current time in milliseconds since the same origin.
    fn now_ms(&self) -> u64 {
        self.now_us() / 1_000
    }

    /// Returns elapsed time in microseconds since a reference point.
    ///
    /// Uses saturating subtraction to handle potential overflow.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

/// Host clock backed by `std::time::Instant`.
#[cfg(any(test, feature = "std"))]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(any(test, feature = "std"))]
impl StdClock {
    /// Creates a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(any(test, feature = "std"))]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "std"))]
impl TimeSource for StdClock {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}
