use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use actix_web::rt;

use crate::config::Config;
use crate::storage::remove_quiet;

/// Periodic sweep that reclaims transient files orphaned by crashes,
/// abandoned download links, or failed transfers. Owned by `main`:
/// spawned at startup, handle aborted at shutdown.
pub struct Janitor {
    dirs: Vec<PathBuf>,
    max_age: Duration,
    interval: Duration,
}

impl Janitor {
    /// The sweep interval doubles as the staleness threshold: anything
    /// older than one interval was orphaned by a previous cycle.
    pub fn from_config(cfg: &Config) -> Self {
        let period = Duration::from_secs(cfg.janitor_interval_secs);
        Self {
            dirs: vec![
                PathBuf::from(&cfg.uploads_dir),
                PathBuf::from(&cfg.downloads_dir),
            ],
            max_age: period,
            interval: period,
        }
    }

    pub fn spawn(self) -> rt::task::JoinHandle<()> {
        rt::spawn(async move {
            let mut tick = rt::time::interval(self.interval);
            // the first tick completes immediately; skip it so startup
            // never races files written by in-flight requests
            tick.tick().await;
            loop {
                tick.tick().await;
                for dir in &self.dirs {
                    let removed = sweep_dir(dir, self.max_age);
                    if removed > 0 {
                        log::info!(
                            "janitor removed {removed} stale file(s) from {}",
                            dir.display()
                        );
                    }
                }
            }
        })
    }
}

/// Deletes every plain file in `dir` older than `max_age`. A single
/// unreadable or undeletable entry is logged and skipped; the sweep
/// never fails the host process.
pub fn sweep_dir(dir: &Path, max_age: Duration) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("janitor cannot read {}: {e}", dir.display());
            return 0;
        }
    };
    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let meta = match entry.metadata() {
            Ok(meta) if meta.is_file() => meta,
            _ => continue,
        };
        let mtime = match meta.modified() {
            Ok(mtime) => mtime,
            Err(_) => continue,
        };
        if let Ok(age) = now.duration_since(mtime) {
            if age > max_age {
                remove_quiet(&path);
                removed += 1;
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sweep_removes_stale_files() {
        let dir = tempdir().unwrap();
        let stale = dir.path().join("old_converted.csv");
        std::fs::write(&stale, b"a,b\n").unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(sweep_dir(dir.path(), Duration::ZERO), 1);
        assert!(!stale.exists());
    }

    #[test]
    fn sweep_keeps_fresh_files() {
        let dir = tempdir().unwrap();
        let fresh = dir.path().join("fresh_converted.csv");
        std::fs::write(&fresh, b"a,b\n").unwrap();

        assert_eq!(sweep_dir(dir.path(), Duration::from_secs(3600)), 0);
        assert!(fresh.exists());
    }

    #[test]
    fn sweep_ignores_subdirectories() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(sweep_dir(dir.path(), Duration::ZERO), 0);
        assert!(dir.path().join("nested").exists());
    }

    #[test]
    fn sweep_of_missing_dir_is_harmless() {
        assert_eq!(
            sweep_dir(Path::new("/nonexistent/janitor-target"), Duration::ZERO),
            0
        );
    }
}
