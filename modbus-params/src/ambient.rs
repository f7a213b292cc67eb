//! Producer side: ambient sensor sampling into the register store.
//!
//! One sampling cycle reads the sensor, writes the three input registers and
//! then reads the sense period holding register to find out when to sample
//! again. A remote master changing that register therefore changes the
//! producer's cadence.

use core::fmt;

use crate::engine::EngineLock;
use crate::error::ParamsError;
use crate::slots::{HoldingRegUint, InputRegFloat};
use crate::store::RegisterStore;
use crate::time::TimeSource;

/// Errors reported by the ambient sensor driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MeasurementError {
    CompensationFailed = 0x1,
    BusError = 0x2,
    InvalidData = 0x3,
    NoCalibrationData = 0x4,
    UnsupportedChip = 0x5,
}

impl fmt::Display for MeasurementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementError::CompensationFailed => write!(f, "compensation failed"),
            MeasurementError::BusError => write!(f, "sensor bus error"),
            MeasurementError::InvalidData => write!(f, "invalid sensor data"),
            MeasurementError::NoCalibrationData => write!(f, "no calibration data"),
            MeasurementError::UnsupportedChip => write!(f, "unsupported sensor chip"),
        }
    }
}

/// One ambient sample, in register units
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(C)]
pub struct Measurement {
    /// Degrees Celsius
    pub temperature: f32,
    /// Relative humidity, percent
    pub humidity: f32,
    /// Hectopascal
    pub pressure: f32,
}

/// Ambient sensor driver
pub trait Sensor {
    fn measure(&mut self) -> Result<Measurement, MeasurementError>;
}

/// Failure of one sampling cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleError {
    Sensor(MeasurementError),
    Store(ParamsError),
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::Sensor(err) => write!(f, "sensor: {}", err),
            SampleError::Store(err) => write!(f, "store: {}", err),
        }
    }
}

impl From<MeasurementError> for SampleError {
    fn from(err: MeasurementError) -> Self {
        SampleError::Sensor(err)
    }
}

impl From<ParamsError> for SampleError {
    fn from(err: ParamsError) -> Self {
        SampleError::Store(err)
    }
}

/// Writes all three samples. Every slot is attempted; the first error wins.
pub fn publish_measurement<E: EngineLock + 'static, T: TimeSource>(
    store: &RegisterStore<E, T>,
    measurement: &Measurement,
) -> Result<(), ParamsError> {
    let results = [
        store.set_input_register_float(InputRegFloat::AmbientTempDegC, measurement.temperature),
        store.set_input_register_float(InputRegFloat::AmbientHumiPct, measurement.humidity),
        store.set_input_register_float(InputRegFloat::AmbientPressureHpa, measurement.pressure),
    ];
    results.into_iter().collect()
}

/// Current sampling period, or `default_ms` if unset (zero) or unreadable.
pub fn sense_period_ms<E: EngineLock + 'static, T: TimeSource>(
    store: &RegisterStore<E, T>,
    default_ms: u16,
) -> u16 {
    match store.get_holding_register_uint(HoldingRegUint::AmbientSensePeriodMs) {
        Ok(0) => default_ms,
        Ok(period) => period,
        Err(err) => {
            log_warn!("sense period unavailable, using default: {}", err);
            default_ms
        }
    }
}

/// Periodic producer for the ambient input registers.
pub struct AmbientSense<S> {
    sensor: S,
    default_period_ms: u16,
}

impl<S: Sensor> AmbientSense<S> {
    pub fn new(sensor: S, default_period_ms: u16) -> Self {
        Self {
            sensor,
            default_period_ms,
        }
    }

    /// Seeds the sense period holding register at start-up.
    pub fn seed_period<E: EngineLock + 'static, T: TimeSource>(
        &self,
        store: &RegisterStore<E, T>,
    ) -> Result<(), ParamsError> {
        store.set_holding_register_uint(
            HoldingRegUint::AmbientSensePeriodMs,
            self.default_period_ms,
        )
    }

    /// Samples once and publishes the result.
    pub fn sample<E: EngineLock + 'static, T: TimeSource>(
        &mut self,
        store: &RegisterStore<E, T>,
    ) -> Result<Measurement, SampleError> {
        let measurement = self.sensor.measure()?;
        publish_measurement(store, &measurement)?;
        Ok(measurement)
    }

    /// Runs one cycle and returns how long to wait before the next one.
    ///
    /// Failures are logged and otherwise ignored; the previous samples stay
    /// in place and the next cycle tries again.
    pub fn run_cycle<E: EngineLock + 'static, T: TimeSource>(
        &mut self,
        store: &RegisterStore<E, T>,
    ) -> u16 {
        if let Err(err) = self.sample(store) {
            log_warn!("ambient sample skipped: {}", err);
        }
        sense_period_ms(store, self.default_period_ms)
    }
}
