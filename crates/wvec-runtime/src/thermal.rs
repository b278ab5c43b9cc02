//! Thermal governor
//!
//! Reads a sysfs-style sensor file holding one integer in millidegrees
//! Celsius. A failed read is always an error, never a reading of zero, so a
//! caller has to pick its own fallback.

use std::fs;
use std::io;
use std::path::Path;
use wvec_core::{Error, Result};

/// First thermal zone on Linux
pub const DEFAULT_SENSOR_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Sensor reading in millidegrees Celsius.
pub fn read<P: AsRef<Path>>(path: P) -> Result<i32> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;

    let token = text.split_whitespace().next().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, format!("{}: empty sensor", path.display()))
    })?;
    let millis = token.parse::<i32>().map_err(|e| {
        Error::FileIo(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}: bad reading {:?}: {}", path.display(), token, e),
        ))
    })?;
    log::trace!("{}: {} m°C", path.display(), millis);
    Ok(millis)
}

/// `true` iff the reading is at or above `threshold_celsius`.
pub fn check<P: AsRef<Path>>(path: P, threshold_celsius: i32) -> Result<bool> {
    let millis = read(path)?;
    Ok(i64::from(millis) >= i64::from(threshold_celsius) * 1000)
}

/// Reading in whole degrees Celsius (truncating division).
pub fn get_celsius<P: AsRef<Path>>(path: P) -> Result<i32> {
    Ok(read(path)? / 1000)
}
