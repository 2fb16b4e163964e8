//! Network file loading and saving.
//!
//! Loaders validate before returning; savers validate before writing.

use std::path::Path;

use crate::error::{NetworkError, NetworkResult};
use crate::model::WaterNetwork;
use crate::validate::validate_network;

pub fn from_yaml_str(content: &str) -> NetworkResult<WaterNetwork> {
    let network: WaterNetwork = serde_yaml::from_str(content)?;
    validate_network(&network)?;
    Ok(network)
}

pub fn from_json_str(content: &str) -> NetworkResult<WaterNetwork> {
    let network: WaterNetwork = serde_json::from_str(content)?;
    validate_network(&network)?;
    Ok(network)
}

pub fn load_yaml(path: &Path) -> NetworkResult<WaterNetwork> {
    let content = std::fs::read_to_string(path)?;
    from_yaml_str(&content)
}

pub fn save_yaml(path: &Path, network: &WaterNetwork) -> NetworkResult<()> {
    validate_network(network)?;
    let content = serde_yaml::to_string(network)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> NetworkResult<WaterNetwork> {
    let content = std::fs::read_to_string(path)?;
    from_json_str(&content)
}

pub fn save_json(path: &Path, network: &WaterNetwork) -> NetworkResult<()> {
    validate_network(network)?;
    let content = serde_json::to_string_pretty(network)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a network, choosing the format from the file extension.
pub fn load(path: &Path) -> NetworkResult<WaterNetwork> {
    match extension(path).as_deref() {
        Some("yaml" | "yml") => load_yaml(path),
        Some("json") => load_json(path),
        _ => Err(NetworkError::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}

/// Save a network, choosing the format from the file extension.
pub fn save(path: &Path, network: &WaterNetwork) -> NetworkResult<()> {
    match extension(path).as_deref() {
        Some("yaml" | "yml") => save_yaml(path, network),
        Some("json") => save_json(path, network),
        _ => Err(NetworkError::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
