use anyhow::Result;
use globset::Glob;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::entry::{render_entry, EntryRecord};

/// Writes one diary document per call into a fixed directory.
///
/// Session numbers are `count of {date}_session_* files + 1`. The count and the
/// rename are not synchronized, so two writers racing on the same day can pick
/// the same number; callers must serialize writes to a directory.
#[derive(Debug, Clone)]
pub struct EntryWriter {
    diary_dir: PathBuf,
}

impl EntryWriter {
    /// Create the writer, creating `diary_dir` (and parents) if absent.
    pub fn new(diary_dir: impl Into<PathBuf>) -> Result<Self> {
        let diary_dir = diary_dir.into();
        fs::create_dir_all(&diary_dir)
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", diary_dir.display()))?;
        Ok(Self { diary_dir })
    }

    pub fn diary_dir(&self) -> &Path {
        &self.diary_dir
    }

    /// Write `record` as today's next session.
    pub fn create_entry(&self, record: &EntryRecord) -> Result<PathBuf> {
        self.create_entry_on(record, today())
    }

    /// Write `record` as the next session of `date`.
    ///
    /// The document goes to a dot-prefixed temp file in the same directory and
    /// is renamed into place, so readers never see a partial file. The temp
    /// file is gone when this returns, on success or error. An existing
    /// document under the computed name is never replaced; that is an error.
    pub fn create_entry_on(&self, record: &EntryRecord, date: Date) -> Result<PathBuf> {
        let date = format_date(date)?;
        let session = self.next_session_number(&date)?;
        let content = render_entry(record, &date, session);

        let path = self.diary_dir.join(entry_file_name(&date, session));
        michi_store::write_new_atomic_with(&path, |file| file.write_all(content.as_bytes()))
            .map_err(|e| anyhow::anyhow!("writing {} failed: {e}", path.display()))?;

        tracing::info!(path = %path.display(), session, "diary entry written");
        Ok(path)
    }

    /// Next session number for `date` (`YYYY-MM-DD`).
    pub fn next_session_number(&self, date: &str) -> Result<u32> {
        let matcher = Glob::new(&format!("{date}_session_*"))?.compile_matcher();
        let mut count: u32 = 0;
        for entry in fs::read_dir(&self.diary_dir)? {
            let entry = entry?;
            if matcher.is_match(entry.file_name()) {
                count += 1;
            }
        }
        tracing::debug!(date, existing = count, "counted sessions");
        Ok(count + 1)
    }
}

/// `{YYYY-MM-DD}_session_{NNN}.md`
pub fn entry_file_name(date: &str, session: u32) -> String {
    format!("{date}_session_{session:03}.md")
}

/// Today's local date, or the UTC date when the local offset is unknown.
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// `YYYY-MM-DD`
pub fn format_date(date: Date) -> Result<String> {
    Ok(date.format(format_description!("[year]-[month]-[day]"))?)
}
