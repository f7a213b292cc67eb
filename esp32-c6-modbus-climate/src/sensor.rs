use bme280::i2c::BME280;
use esp_hal::{delay::Delay, i2c::master::I2c, Blocking};
use modbus_params::{Measurement, MeasurementError, Sensor};

type Bus = I2c<'static, Blocking>;

fn convert_error(value: &bme280::Error<esp_hal::i2c::master::Error>) -> MeasurementError {
    match value {
        bme280::Error::CompensationFailed => MeasurementError::CompensationFailed,
        bme280::Error::Bus(_) => MeasurementError::BusError,
        bme280::Error::InvalidData => MeasurementError::InvalidData,
        bme280::Error::NoCalibrationData => MeasurementError::NoCalibrationData,
        bme280::Error::UnsupportedChip => MeasurementError::UnsupportedChip,
        #[allow(unreachable_patterns)]
        _ => MeasurementError::BusError,
    }
}

/// BME280 on the primary I2C address
pub struct Bme280Sensor {
    bme280: BME280<Bus>,
    delay: Delay,
    initialization_error: Option<MeasurementError>,
}

impl Bme280Sensor {
    pub fn new(i2c: Bus, mut delay: Delay) -> Self {
        let mut bme280 = BME280::new_primary(i2c);
        let initialization_error = bme280.init(&mut delay).err().map(|e| convert_error(&e));
        Self {
            bme280,
            delay,
            initialization_error,
        }
    }

    pub fn initialization_error(&self) -> Option<MeasurementError> {
        self.initialization_error
    }
}

impl Sensor for Bme280Sensor {
    fn measure(&mut self) -> Result<Measurement, MeasurementError> {
        if let Some(err) = self.initialization_error {
            return Err(err);
        }
        let m = self
            .bme280
            .measure(&mut self.delay)
            .map_err(|e| convert_error(&e))?;
        Ok(Measurement {
            temperature: m.temperature,
            humidity: m.humidity,
            // Pa -> hPa
            pressure: m.pressure / 100.0,
        })
    }
}
