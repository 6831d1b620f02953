//! Read/write scan configuration files (JSON).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::domain::ScanConfig;
use crate::error::ScanError;

/// Read and validate a scan configuration.
pub fn read_config(path: &Path) -> Result<ScanConfig, ScanError> {
    let file = File::open(path)
        .map_err(|e| ScanError::io(format!("Failed to open config '{}'", path.display()), e))?;
    let config: ScanConfig = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ScanError::format(format!("Invalid config JSON '{}'", path.display()), e))?;
    config.validate()?;
    Ok(config)
}

pub fn write_config(path: &Path, config: &ScanConfig) -> Result<(), ScanError> {
    let file = File::create(path)
        .map_err(|e| ScanError::io(format!("Failed to create config '{}'", path.display()), e))?;
    serde_json::to_writer_pretty(file, config)
        .map_err(|e| ScanError::format("Failed to write config JSON", e))
}
