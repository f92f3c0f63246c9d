use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Context, Result};

/// Serialize `value` as JSON and write it under `dir`, creating the
/// directory if needed. Nothing touches the disk until the whole
/// snapshot serialized successfully.
pub fn write_json(dir: &Path, name: &str, value: &impl Serialize) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {:?}", dir))?;
    let path = dir.join(name);

    let data = serde_json::to_vec(value).with_context(|| format!("Failed to serialize {}", name))?;
    fs::write(&path, data).with_context(|| format!("Failed to write output file {:?}", path))?;
    Ok(path)
}
