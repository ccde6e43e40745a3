use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::Rng;

/// Generates an input filename that cannot collide across concurrent
/// requests: millisecond timestamp plus a random suffix, keeping the
/// original extension.
pub fn unique_upload_name(original: &str) -> String {
    let ext = Path::new(original)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("xlsx");
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("upload-{}-{}.{}", Utc::now().timestamp_millis(), suffix, ext)
}

/// Display name for the converted artifact, derived from the (already
/// sanitized) original upload name.
pub fn converted_name(original: &str) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("spreadsheet");
    format!("{stem}_converted.csv")
}

/// Best-effort delete. Deleting a file that is already gone is not an
/// error; anything else is logged and swallowed.
pub fn remove_quiet(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => log::info!("removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("failed to remove {}: {e}", path.display()),
    }
}

/// Scoped ownership of a transient file: the file is removed when the
/// guard drops, whichever way the handler exits.
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        remove_quiet(&self.path);
    }
}
