use anyhow::Context;
use michi_config::MemConfig;
use michi_diary::{EntryRecord, EntryWriter, MemPaths};
use std::path::{Path, PathBuf};

pub struct WriteParams<'a> {
    pub paths: &'a MemPaths,
    pub config: &'a MemConfig,
    pub input: Option<&'a Path>,
    pub project: Option<String>,
    pub branch: Option<String>,
    pub summary: Option<String>,
    pub work_done: Vec<String>,
    pub decisions: Vec<String>,
    pub preferences: Vec<String>,
    pub turns: Option<u32>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Written(PathBuf),
    Disabled,
    TooShort { turns: u32, min_turns: u32 },
}

/// `michi write`
pub fn execute(params: WriteParams<'_>) -> anyhow::Result<()> {
    match run(params)? {
        Outcome::Written(path) => println!("{}", path.display()),
        Outcome::Disabled => println!("Diary disabled (plugins.mem.enabled = false); nothing written."),
        Outcome::TooShort { turns, min_turns } => {
            println!("Session too short ({turns} < min_turns {min_turns}); nothing written.")
        }
    }
    Ok(())
}

pub fn run(params: WriteParams<'_>) -> anyhow::Result<Outcome> {
    if !params.config.mem_enabled() {
        tracing::info!("mem plugin disabled, skipping entry");
        return Ok(Outcome::Disabled);
    }
    if let Some(turns) = params.turns {
        if turns < params.config.min_turns {
            return Ok(Outcome::TooShort {
                turns,
                min_turns: params.config.min_turns,
            });
        }
    }

    let record = build_record(&params)?;
    if record.has_no_sections() {
        tracing::warn!("entry has no sections; writing header only");
    }
    let _lock = michi_store::try_lock_file(&params.paths.lock_file)?;
    let writer = EntryWriter::new(&params.paths.diary_dir)?;
    let path = writer.create_entry(&record)?;
    Ok(Outcome::Written(path))
}

/// Start from the `--input` JSON (if any); flags replace the matching fields.
fn build_record(params: &WriteParams<'_>) -> anyhow::Result<EntryRecord> {
    let mut record = match params.input {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<EntryRecord>(&content)
                .with_context(|| format!("parsing entry record {}", path.display()))?
        }
        None => EntryRecord::default(),
    };

    if params.project.is_some() {
        record.project = params.project.clone();
    }
    if params.branch.is_some() {
        record.branch = params.branch.clone();
    }
    if params.summary.is_some() {
        record.summary = params.summary.clone();
    }
    if !params.work_done.is_empty() {
        record.work_done = params.work_done.clone();
    }
    if !params.decisions.is_empty() {
        record.decisions = params.decisions.clone();
    }
    if !params.preferences.is_empty() {
        record.preferences = params.preferences.clone();
    }
    Ok(record)
}
