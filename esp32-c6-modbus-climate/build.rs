use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Reads a numeric setting from the environment, falling back to `default`.
fn numeric_setting(name: &str, default: u16) -> u16 {
    println!("cargo:rerun-if-env-changed={}", name);
    match env::var(name) {
        Ok(raw) => match raw.parse::<u16>() {
            Ok(value) if value > 0 => {
                println!("cargo:warning=Using {} from environment: {}", name, value);
                value
            }
            _ => panic!("{} must be an integer in 1..=65535, got '{}'", name, raw),
        },
        Err(_) => default,
    }
}

fn main() {
    // Default sampling period, written into the sense period holding
    // register at start-up. The remote master may change it afterwards.
    let sense_period_ms = numeric_setting("AMBIENT_SENSE_PERIOD_MS", 1_000);

    // Bound on the register store's per-slot guard wait.
    let guard_timeout_ms = numeric_setting("MODBUS_PARAMS_GUARD_TIMEOUT_MS", 100);

    let generated = format!(
        "/// Default ambient sampling period\n\
         pub const DEFAULT_SENSE_PERIOD_MS: u16 = {};\n\
         /// Register store slot guard timeout\n\
         pub const GUARD_TIMEOUT_MS: u32 = {};\n",
        sense_period_ms, guard_timeout_ms
    );

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let config_path = PathBuf::from(out_dir).join("node_config.rs");
    let mut file = fs::File::create(&config_path).expect("Failed to create node_config.rs");
    file.write_all(generated.as_bytes())
        .expect("Failed to write node_config.rs");
}
