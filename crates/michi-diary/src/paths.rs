use std::path::{Path, PathBuf};

/// File name of the processed log inside the reflections directory.
pub const PROCESSED_LOG_FILE: &str = "processed.log";

/// Processed log location for a reflections directory.
pub fn processed_log_in(reflections_dir: &Path) -> PathBuf {
    reflections_dir.join(PROCESSED_LOG_FILE)
}

/// All well-known paths under the store root.
#[derive(Debug, Clone)]
pub struct MemPaths {
    pub root: PathBuf,
    pub config_json: PathBuf,
    pub diary_dir: PathBuf,
    pub reflections_dir: PathBuf,
    pub processed_log: PathBuf,
    pub lock_file: PathBuf,
}

impl MemPaths {
    /// Derive all paths from a store root. Pure computation, no I/O.
    pub fn discover(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let reflections_dir = root.join("reflections");
        Self {
            config_json: root.join("config.json"),
            diary_dir: root.join("diary"),
            processed_log: processed_log_in(&reflections_dir),
            lock_file: root.join("LOCK"),
            reflections_dir,
            root,
        }
    }

    /// Paths under [`michi_store::store_root`].
    pub fn default_root() -> Self {
        Self::discover(michi_store::store_root())
    }

    /// Create the diary and reflections directories. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        for dir in [&self.diary_dir, &self.reflections_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.diary_dir.is_dir()
    }
}
