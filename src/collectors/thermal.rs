//! Thermal sensor collector.
//!
//! Temperatures come from:
//! - /sys/class/thermal/thermal_zone*/temp
//! - /sys/class/hwmon/hwmon*/temp*_input

use std::collections::HashMap;
use std::fs;
use std::path::Path;

const THERMAL_BASE: &str = "/sys/class/thermal";
const HWMON_BASE: &str = "/sys/class/hwmon";

/// Reads a sysfs temperature file (millidegrees) as degrees Celsius.
fn read_millidegrees(path: &Path) -> Option<f64> {
    let content = fs::read_to_string(path).ok()?;
    let millidegrees = content.trim().parse::<i64>().ok()?;
    Some(millidegrees as f64 / 1000.0)
}

/// Reads temperature from all thermal zones below `base`.
pub fn read_thermal_zones(base: &Path) -> Result<HashMap<String, f64>, String> {
    let mut temperatures = HashMap::new();
    if !base.exists() {
        return Ok(temperatures);
    }

    let entries =
        fs::read_dir(base).map_err(|e| format!("Failed to read thermal directory: {}", e))?;

    for entry in entries.flatten() {
        let zone_name = entry.file_name().to_string_lossy().to_string();
        if !zone_name.starts_with("thermal_zone") {
            continue;
        }
        if let Some(celsius) = read_millidegrees(&entry.path().join("temp")) {
            temperatures.insert(zone_name, celsius);
        }
    }

    Ok(temperatures)
}

/// Reads temperature from hardware monitoring devices below `base`.
///
/// Sensors are named `<device name>_<file name>`, e.g. `coretemp_temp1_input`.
pub fn read_hwmon_temps(base: &Path) -> Result<HashMap<String, f64>, String> {
    let mut temperatures = HashMap::new();
    if !base.exists() {
        return Ok(temperatures);
    }

    let entries =
        fs::read_dir(base).map_err(|e| format!("Failed to read hwmon directory: {}", e))?;

    for entry in entries.flatten() {
        let path = entry.path();
        let hwmon_name = entry.file_name().to_string_lossy().to_string();
        if !hwmon_name.starts_with("hwmon") {
            continue;
        }

        let device_name = fs::read_to_string(path.join("name"))
            .map(|name| name.trim().to_string())
            .unwrap_or_else(|_| hwmon_name.clone());

        let Ok(sensor_entries) = fs::read_dir(&path) else {
            continue;
        };

        for sensor in sensor_entries.flatten() {
            let file_name = sensor.file_name().to_string_lossy().to_string();
            if !file_name.starts_with("temp") || !file_name.ends_with("_input") {
                continue;
            }
            if let Some(celsius) = read_millidegrees(&sensor.path()) {
                temperatures.insert(format!("{}_{}", device_name, file_name), celsius);
            }
        }
    }

    Ok(temperatures)
}

/// Collects all temperature readings from both thermal zones and hwmon.
pub fn collect_temperatures() -> Result<HashMap<String, f64>, String> {
    let mut all_temps = read_thermal_zones(Path::new(THERMAL_BASE))?;
    all_temps.extend(read_hwmon_temps(Path::new(HWMON_BASE))?);
    Ok(all_temps)
}
