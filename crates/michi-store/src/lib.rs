use fs2::FileExt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Return the per-user store root.
///
/// `MICHI_MEM_HOME` wins when set; otherwise `~/.michi-mem/`, falling back to a
/// relative `.michi-mem` when no home directory can be resolved.
pub fn store_root() -> PathBuf {
    match std::env::var_os("MICHI_MEM_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => match dirs::home_dir() {
            Some(home) => home.join(".michi-mem"),
            None => PathBuf::from(".michi-mem"),
        },
    }
}

/// Atomic write: the caller fills a sibling temp file, which is then renamed
/// over `path`.
///
/// The temp file lives next to `path` as `.<name>.<random>.tmp` and is removed
/// on every exit path: if `fill`, the sync, or the rename fails, the handle is
/// dropped and `tempfile` unlinks it. The parent directory must already exist.
pub fn write_atomic_with<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    write_via_temp(path, fill, Persist::Replace)
}

/// Like [`write_atomic_with`], but never replaces an existing `path`.
///
/// An occupied destination fails with the rename error (`AlreadyExists` for a
/// file) and leaves both the existing entry and the directory untouched.
pub fn write_new_atomic_with<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    write_via_temp(path, fill, Persist::NoClobber)
}

#[derive(Clone, Copy)]
enum Persist {
    Replace,
    NoClobber,
}

fn write_via_temp<F>(path: &Path, fill: F, mode: Persist) -> io::Result<()>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = format!(".{name}.");

    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(parent)?;
    fill(tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;
    match mode {
        Persist::Replace => tmp.persist(path).map_err(|e| e.error)?,
        Persist::NoClobber => tmp.persist_noclobber(path).map_err(|e| e.error)?,
    };
    tracing::debug!(path = %path.display(), "atomic write committed");
    Ok(())
}

/// File-based exclusive lock guard. Released on drop.
pub struct LockGuard {
    _file: fs::File,
}

/// Try to acquire the lock without blocking.
/// Returns an error if another process already holds it.
pub fn try_lock_file(path: &Path) -> anyhow::Result<LockGuard> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|e| anyhow::anyhow!("cannot open lock file {}: {e}", path.display()))?;
    file.try_lock_exclusive().map_err(|_| {
        anyhow::anyhow!("store is locked by another process ({})", path.display())
    })?;
    Ok(LockGuard { _file: file })
}
