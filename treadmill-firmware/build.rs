//! Build script for treadmill-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Parses and validates board.toml, then embeds it as postcard bytes

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use treadmill_core::config::NUM_GPIO;
use treadmill_core::{BoardConfig, ConfigError};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    setup_linker(&out_dir);
    embed_config(&out_dir);
}

/// Set up linker search paths for memory.x
fn setup_linker(out_dir: &Path) {
    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate board.toml and write it to OUT_DIR for `include_bytes!`
fn embed_config(out_dir: &Path) {
    println!("cargo:rerun-if-changed=board.toml");

    let config_path = Path::new("board.toml");

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read board.toml", &[e.to_string()]),
    };

    let config: BoardConfig = match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            let lines: Vec<String> = e.to_string().lines().map(str::to_owned).collect();
            fail("Invalid board.toml", &lines)
        }
    };

    if let Err(e) = config.validate() {
        fail("Invalid board configuration", &[describe(e)]);
    }

    let bytes = match postcard::to_stdvec(&config) {
        Ok(bytes) => bytes,
        Err(e) => fail("Failed to encode board configuration", &[e.to_string()]),
    };

    fs::write(out_dir.join("board_config.bin"), bytes).unwrap();
}

fn describe(err: ConfigError) -> String {
    match err {
        ConfigError::InvalidPin(pin) => {
            format!("GPIO{} does not exist (0-{})", pin, NUM_GPIO - 1)
        }
        ConfigError::PinConflict(pin) => format!("GPIO{} is assigned more than once", pin),
        ConfigError::InvalidResolution(bits) => {
            format!("adc_bits = {} (must be 8, 10 or 12)", bits)
        }
        ConfigError::InvalidSafetyBand => {
            "safety_band needs 0 <= min < max <= ADC full scale".to_owned()
        }
        ConfigError::InvalidEventRate(hz) => format!("max_event_hz = {} (must be 1-1000)", hz),
        ConfigError::InvalidCheckInterval => "torque_check_interval_us must be > 0".to_owned(),
        ConfigError::Corrupted => "configuration could not be decoded".to_owned(),
    }
}

fn fail(title: &str, details: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        details
            .iter()
            .map(|d| format!("║  • {:<62} ║", d))
            .collect::<Vec<_>>()
            .join("\n")
    );
}
