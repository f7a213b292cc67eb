#![no_std]
#![no_main]

mod engine;
mod sensor;
mod slave;

use defmt::{debug, error, info, warn};
use esp_hal::{
    delay::Delay,
    i2c::master::{Config as I2cConfig, I2c},
    main,
};
use modbus_params::{ambient::AmbientSense, RegisterStore, TimeSource};
use {defmt_rtt as _, esp_backtrace as _};

use engine::SlaveEngine;
use sensor::Bme280Sensor;
use slave::ModbusSlave;

include!(concat!(env!("OUT_DIR"), "/node_config.rs"));

/// SoC system timer
#[derive(Clone, Copy)]
struct SystemClock;

impl TimeSource for SystemClock {
    fn now_us(&self) -> u64 {
        esp_hal::time::now().duration_since_epoch().to_micros()
    }
}

static ENGINE: SlaveEngine = SlaveEngine::new();
static STORE: RegisterStore<SlaveEngine, SystemClock> =
    RegisterStore::new(SystemClock).with_guard_timeout_ms(GUARD_TIMEOUT_MS);

fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

#[main]
fn main() -> ! {
    let peripherals = esp_hal::init(esp_hal::Config::default());
    let delay = Delay::new();

    info!("-- ESP32-C6 Ambient Sense Modbus Server --");

    // Nothing may touch the registers if the store is not ready.
    if let Err(err) = STORE.init(Some(&ENGINE)) {
        error!("register store init failed: {}", err);
        halt();
    }

    let mut slave = ModbusSlave::new(&ENGINE);
    if let Err(err) = STORE.publish_areas(&mut slave) {
        error!("register area setup failed: {}", err);
        halt();
    }
    info!("{} register areas published", slave.area_count());

    let i2c = match I2c::new(peripherals.I2C0, I2cConfig::default()) {
        Ok(i2c) => i2c.with_sda(peripherals.GPIO6).with_scl(peripherals.GPIO7),
        Err(_) => {
            error!("I2C configuration rejected");
            halt();
        }
    };

    info!("Initializing sensor");
    let sensor = Bme280Sensor::new(i2c, delay);
    if let Some(err) = sensor.initialization_error() {
        warn!("sensor init failed: {}", err);
    }

    let mut sense = AmbientSense::new(sensor, DEFAULT_SENSE_PERIOD_MS);
    if let Err(err) = sense.seed_period(&STORE) {
        warn!("could not seed sense period: {}", err);
    }

    loop {
        let period_ms = sense.run_cycle(&STORE);
        match slave.scan_inputs() {
            Ok(words) => debug!("input registers: {}", words),
            Err(err) => warn!("input register scan failed: {}", err),
        }
        delay.delay_millis(u32::from(period_ms));
    }
}
