//! Serial device discovery
//!
//! The configured device is used when it exists. Otherwise the fallback list
//! is probed in order and the first existing path is adopted. When nothing
//! exists, the boot configuration is inspected so the operator learns whether
//! the hardware is missing or the UART was simply never enabled.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::SensorConfig;
use crate::error::DiscoveryError;

/// Pick the device path to open
pub fn discover(config: &SensorConfig) -> Result<PathBuf, DiscoveryError> {
    let candidates = std::iter::once(&config.port).chain(config.fallback_ports.iter());

    let mut probed = Vec::new();
    for path in candidates {
        if device_present(path) {
            if path != &config.port {
                tracing::warn!(
                    "Configured port {} not found, using fallback {}",
                    config.port.display(),
                    path.display()
                );
            }
            return Ok(path.clone());
        }
        probed.push(path.clone());
    }

    // Boot config hints only make sense on Linux boards
    let boot_configs: &[PathBuf] = if cfg!(target_os = "linux") {
        &config.boot_configs
    } else {
        &[]
    };
    Err(diagnose(probed, boot_configs))
}

/// Classify a failed discovery
///
/// A readable boot config without an active `enable_uart=1` means the UART is
/// disabled at the OS level; anything else is reported as missing hardware.
pub fn diagnose(probed: Vec<PathBuf>, boot_configs: &[PathBuf]) -> DiscoveryError {
    for boot_config in boot_configs {
        let Ok(contents) = fs::read_to_string(boot_config) else {
            continue;
        };
        if !uart_enabled(&contents) {
            return DiscoveryError::UartDisabled {
                boot_config: boot_config.clone(),
            };
        }
        tracing::debug!("UART enabled in {}", boot_config.display());
    }

    DiscoveryError::NoSerialHardware { probed }
}

/// True if an uncommented `enable_uart=1` line is present
fn uart_enabled(contents: &str) -> bool {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .any(|line| {
            let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
            compact == "enable_uart=1"
        })
}

/// Whether `path` names a device that currently exists
#[inline]
pub fn device_present(path: &Path) -> bool {
    path.exists()
}
