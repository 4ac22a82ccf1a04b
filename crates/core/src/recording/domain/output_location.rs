use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::shared::constants::OUTPUT_EXTENSION;

/// The user's documents directory, or the temp dir when there is none.
pub fn default_output_dir() -> PathBuf {
    dirs::document_dir().unwrap_or_else(std::env::temp_dir)
}

/// Picks `<dir>/<epoch seconds>.mov`, creating `dir` and removing any file
/// already at that path.
pub fn allocate_output_path(dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    let path = dir.join(format!("{seconds:.6}.{OUTPUT_EXTENSION}"));
    if path.exists() {
        fs::remove_file(&path)?;
    }
    Ok(path)
}
