use anyhow::Result;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only log of diary documents that have already been mined.
///
/// One location per line. Reads treat the file as a set, so duplicate lines
/// are harmless; there is no removal.
#[derive(Debug, Clone)]
pub struct ProcessedLog {
    path: PathBuf,
}

impl ProcessedLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every recorded location. Returns an empty set if the log doesn't exist.
    pub fn read_set(&self) -> Result<HashSet<String>> {
        if !self.path.exists() {
            return Ok(HashSet::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Append each location as its own line, creating the log if absent.
    /// Does not check for existing lines.
    pub fn append<I, S>(&self, locations: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut buf = String::new();
        let mut n = 0;
        for loc in locations {
            buf.push_str(loc.as_ref());
            buf.push('\n');
            n += 1;
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(buf.as_bytes())?;
        Ok(n)
    }
}
