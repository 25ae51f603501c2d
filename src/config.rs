//! Runtime configuration for the demo binaries.
//!
//! A JSON file holds the input/output paths plus a full [`RestoreParams`]
//! record; every field of `params` is optional and falls back to its
//! default.
use crate::params::RestoreParams;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Restored image destination.
    pub image_out: Option<PathBuf>,
    /// Detected mask destination (detect demo).
    pub mask_out: Option<PathBuf>,
    /// JSON report destination.
    pub json_out: Option<PathBuf>,
}

#[derive(Clone, Deserialize)]
pub struct RuntimeConfig {
    pub input_path: PathBuf,
    /// Optional externally supplied mask, bypassing detection.
    #[serde(default)]
    pub mask_path: Option<PathBuf>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub params: RestoreParams,
}

pub fn load_config(path: &Path) -> Result<RuntimeConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: RuntimeConfig = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    Ok(config)
}

/// Single-argument CLI: the config file path.
pub fn parse_cli(program: &str) -> Result<RuntimeConfig, String> {
    let mut args = env::args().skip(1);
    let path = args
        .next()
        .ok_or_else(|| format!("usage: {program} <config.json>"))?;
    if let Some(extra) = args.next() {
        return Err(format!("unexpected argument: {extra}"));
    }
    load_config(Path::new(&path))
}
