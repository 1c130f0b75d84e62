use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::paths::{processed_log_in, MemPaths};
use crate::processed::ProcessedLog;

/// Headings whose bullets count as pattern statements, in extraction order.
pub const MINED_HEADINGS: [&str; 2] = ["Preferences Observed", "Decisions Made"];

pub const STRONG_THRESHOLD: usize = 3;
pub const MODERATE_THRESHOLD: usize = 2;

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^## (.+?)\s*$").unwrap());
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^- (.+)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCount {
    pub pattern: String,
    pub count: usize,
}

/// Patterns bucketed by how often they occurred in one batch.
///
/// `strong` is sorted by count descending (ties alphabetical), `moderate` and
/// `emerging` alphabetically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub strong: Vec<PatternCount>,
    pub moderate: Vec<PatternCount>,
    pub emerging: Vec<PatternCount>,
}

impl Analysis {
    /// Pool statements by exact string and bucket the counts.
    pub fn from_statements<I>(statements: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for s in statements {
            *counts.entry(s).or_default() += 1;
        }
        Self::from_counts(counts)
    }

    pub fn from_counts(counts: BTreeMap<String, usize>) -> Self {
        let mut out = Self::default();
        // BTreeMap iteration is alphabetical, which fixes the tie order.
        for (pattern, count) in counts {
            let pc = PatternCount { pattern, count };
            match count {
                c if c >= STRONG_THRESHOLD => out.strong.push(pc),
                MODERATE_THRESHOLD => out.moderate.push(pc),
                1 => out.emerging.push(pc),
                _ => {}
            }
        }
        out.strong.sort_by(|a, b| b.count.cmp(&a.count));
        out
    }

    pub fn is_empty(&self) -> bool {
        self.strong.is_empty() && self.moderate.is_empty() && self.emerging.is_empty()
    }

    /// Number of distinct patterns across all tiers.
    pub fn total(&self) -> usize {
        self.strong.len() + self.moderate.len() + self.emerging.len()
    }
}

/// Extract pattern statements from one document's text.
///
/// Bullets under `## Preferences Observed` come first, then `## Decisions Made`.
pub fn extract_patterns(text: &str) -> Vec<String> {
    MINED_HEADINGS
        .iter()
        .flat_map(|heading| extract_section(text, heading))
        .collect()
}

/// Bullets of the first `## <heading>` line.
///
/// Blank lines directly under the heading are skipped; after that only a
/// contiguous run of `- ` lines is taken. Anything else ends the section.
fn extract_section(text: &str, heading: &str) -> Vec<String> {
    let mut lines = text.lines();
    let found = lines.by_ref().any(|line| {
        HEADING
            .captures(line)
            .is_some_and(|caps| &caps[1] == heading)
    });
    if !found {
        return Vec::new();
    }

    let mut items = Vec::new();
    let mut in_run = false;
    for line in lines {
        if !in_run && line.trim().is_empty() {
            continue;
        }
        in_run = true;
        let Some(caps) = BULLET.captures(line) else {
            break;
        };
        let item = caps[1].trim();
        if !item.is_empty() {
            items.push(item.to_string());
        }
    }
    items
}

/// Incremental miner over a diary directory.
///
/// Discovery and marking share the processed log under `reflections_dir`.
/// Like the writer, this assumes one process at a time per store.
#[derive(Debug, Clone)]
pub struct PatternMiner {
    diary_dir: PathBuf,
    log: ProcessedLog,
}

impl PatternMiner {
    pub fn new(diary_dir: impl Into<PathBuf>, reflections_dir: impl AsRef<Path>) -> Self {
        Self {
            diary_dir: diary_dir.into(),
            log: ProcessedLog::new(processed_log_in(reflections_dir.as_ref())),
        }
    }

    /// Miner over a store layout, using its diary dir and processed log.
    pub fn from_paths(paths: &MemPaths) -> Self {
        Self {
            diary_dir: paths.diary_dir.clone(),
            log: ProcessedLog::new(&paths.processed_log),
        }
    }

    pub fn processed_log(&self) -> &ProcessedLog {
        &self.log
    }

    /// `*.md` documents in the diary directory not yet in the processed log,
    /// sorted by their location string.
    ///
    /// The lossy UTF-8 location is only the log key; the returned paths are
    /// the ones read from the directory, so non-UTF-8 names stay readable.
    pub fn unprocessed_entries(&self) -> Result<Vec<PathBuf>> {
        let processed = self.log.read_set()?;

        let dir = match std::fs::read_dir(&self.diary_dir) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut pending: Vec<(String, PathBuf)> = Vec::new();
        for entry in dir {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") || !path.is_file() {
                continue;
            }
            let loc = path.to_string_lossy().into_owned();
            if !processed.contains(&loc) {
                pending.push((loc, path));
            }
        }
        pending.sort_by(|a, b| a.0.cmp(&b.0));

        tracing::debug!(
            pending = pending.len(),
            processed = processed.len(),
            "discovered diary entries"
        );
        Ok(pending.into_iter().map(|(_, path)| path).collect())
    }

    /// Extract and classify patterns from `entries`. Only I/O errors fail.
    pub fn analyze<P: AsRef<Path>>(&self, entries: &[P]) -> Result<Analysis> {
        let mut statements = Vec::new();
        for entry in entries {
            let path = entry.as_ref();
            let text = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
            let found = extract_patterns(&text);
            tracing::debug!(path = %path.display(), patterns = found.len(), "parsed entry");
            statements.extend(found);
        }

        let analysis = Analysis::from_statements(statements);
        tracing::info!(
            entries = entries.len(),
            strong = analysis.strong.len(),
            moderate = analysis.moderate.len(),
            emerging = analysis.emerging.len(),
            "analysis complete"
        );
        Ok(analysis)
    }

    /// Record `entries` as consumed. Appends without deduplicating.
    pub fn mark_processed<P: AsRef<Path>>(&self, entries: &[P]) -> Result<()> {
        let n = self.log.append(
            entries
                .iter()
                .map(|p| p.as_ref().to_string_lossy().into_owned()),
        )?;
        tracing::info!(marked = n, log = %self.log.path().display(), "entries marked processed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const DIARY_1: &str = "\
Project: /work/app
Branch: main
Date: 2026-10-01
Session: 001

## Preferences Observed

- Prefer pytest over unittest
- Use Black for formatting
- Write tests first (TDD)

## Decisions Made

- Use PostgreSQL for database
- Use JWT for authentication
";

    const DIARY_2: &str = "\
Project: /work/app
Branch: main
Date: 2026-10-02
Session: 001

## Decisions Made
- Use PostgreSQL for database
## Preferences Observed
- Prefer pytest over unittest
- Use Black for formatting
";

    const DIARY_3: &str = "\
Project: /work/app
Branch: feature
Date: 2026-10-03
Session: 001

## Preferences Observed

- Prefer pytest over unittest
- Write tests first (TDD)

Some trailing notes.
";

    struct Env {
        _tmp: tempfile::TempDir,
        diary_dir: PathBuf,
        reflections_dir: PathBuf,
        miner: PatternMiner,
    }

    fn env() -> Env {
        let tmp = tempfile::tempdir().unwrap();
        let diary_dir = tmp.path().join("diaries");
        let reflections_dir = tmp.path().join("reflections");
        fs::create_dir_all(&diary_dir).unwrap();
        fs::create_dir_all(&reflections_dir).unwrap();
        for (name, body) in [
            ("diary-1.md", DIARY_1),
            ("diary-2.md", DIARY_2),
            ("diary-3.md", DIARY_3),
        ] {
            fs::write(diary_dir.join(name), body).unwrap();
        }
        let miner = PatternMiner::new(&diary_dir, &reflections_dir);
        Env {
            _tmp: tmp,
            diary_dir,
            reflections_dir,
            miner,
        }
    }

    fn names(list: &[PatternCount]) -> Vec<&str> {
        list.iter().map(|p| p.pattern.as_str()).collect()
    }

    #[test]
    fn finds_unprocessed_entries_sorted() {
        let env = env();
        fs::write(env.diary_dir.join("notes.txt"), "ignored").unwrap();
        fs::create_dir(env.diary_dir.join("dir.md")).unwrap();

        let entries = env.miner.unprocessed_entries().unwrap();
        let expected: Vec<PathBuf> = ["diary-1.md", "diary-2.md", "diary-3.md"]
            .iter()
            .map(|n| env.diary_dir.join(n))
            .collect();
        assert_eq!(entries, expected);
    }

    #[test]
    fn excludes_processed_entries() {
        let env = env();
        let log = env.reflections_dir.join("processed.log");
        fs::write(&log, format!("{}\n", env.diary_dir.join("diary-1.md").display())).unwrap();

        let entries = env.miner.unprocessed_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.ends_with("diary-1.md")));
    }

    #[test]
    fn missing_diary_dir_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let miner = PatternMiner::new(tmp.path().join("none"), tmp.path().join("refl"));
        assert!(miner.unprocessed_entries().unwrap().is_empty());
    }

    #[test]
    fn classifies_into_tiers() {
        let env = env();
        let entries = env.miner.unprocessed_entries().unwrap();
        let result = env.miner.analyze(&entries).unwrap();

        assert_eq!(
            result.strong,
            vec![PatternCount {
                pattern: "Prefer pytest over unittest".into(),
                count: 3
            }]
        );
        assert_eq!(
            names(&result.moderate),
            vec![
                "Use Black for formatting",
                "Use PostgreSQL for database",
                "Write tests first (TDD)",
            ]
        );
        assert!(result.moderate.iter().all(|p| p.count == 2));
        assert_eq!(names(&result.emerging), vec!["Use JWT for authentication"]);
        assert_eq!(result.total(), 5);
    }

    #[test]
    fn threshold_buckets_from_counts() {
        let statements = ["A", "B", "C", "A", "D", "C", "B", "A"]
            .into_iter()
            .map(String::from);
        let result = Analysis::from_statements(statements);
        assert_eq!(
            result.strong,
            vec![PatternCount {
                pattern: "A".into(),
                count: 3
            }]
        );
        assert_eq!(names(&result.moderate), vec!["B", "C"]);
        assert_eq!(names(&result.emerging), vec!["D"]);
    }

    #[test]
    fn strong_orders_by_count_descending() {
        let mut counts = BTreeMap::new();
        counts.insert("few".to_string(), 3);
        counts.insert("many".to_string(), 7);
        counts.insert("some".to_string(), 4);
        let result = Analysis::from_counts(counts);
        assert_eq!(names(&result.strong), vec!["many", "some", "few"]);
    }

    #[test]
    fn empty_batch_is_empty_analysis() {
        let env = env();
        let result = env.miner.analyze::<PathBuf>(&[]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn section_does_not_absorb_next_heading() {
        let text = "## Decisions Made\n- Keep\n## Work Done\n- Not a decision\n";
        assert_eq!(extract_patterns(text), vec!["Keep"]);
    }

    #[test]
    fn heading_without_bullets_contributes_nothing() {
        let text = "## Decisions Made\n## Preferences Observed\n\nplain prose\n- late bullet\n";
        assert!(extract_patterns(text).is_empty());
    }

    #[test]
    fn blank_line_ends_a_run() {
        let text = "## Decisions Made\n\n- first\n- second\n\n- orphan\n";
        assert_eq!(extract_patterns(text), vec!["first", "second"]);
    }

    #[test]
    fn heading_with_trailing_whitespace_still_matches() {
        let text = "## Decisions Made  \n- x\n## Preferences Observed\t\n- y\n";
        assert_eq!(extract_patterns(text), vec!["y", "x"]);
    }

    #[test]
    fn heading_must_start_the_line() {
        let text = "text ## Decisions Made\n- nope\n### Decisions Made\n- nope\n";
        assert!(extract_patterns(text).is_empty());
    }

    #[test]
    fn matching_is_exact_and_trims_bullet_text() {
        let text = "## Decisions Made\n- Use tabs  \n- use tabs\n-  Use tabs\n";
        let result = Analysis::from_statements(extract_patterns(text));
        assert_eq!(names(&result.moderate), vec!["Use tabs"]);
        assert_eq!(names(&result.emerging), vec!["use tabs"]);
    }

    #[test]
    fn malformed_documents_yield_nothing() {
        assert!(extract_patterns("").is_empty());
        assert!(extract_patterns("no headers at all\n- stray\n").is_empty());
        assert!(extract_patterns("## Decisions Made").is_empty());
    }

    #[test]
    fn writer_output_is_mined_for_decisions() {
        let text = crate::entry::render_entry(
            &crate::EntryRecord {
                decisions: vec!["Use JWT for authentication".into()],
                preferences: vec!["Learned, not observed".into()],
                ..Default::default()
            },
            "2026-10-17",
            1,
        );
        assert_eq!(extract_patterns(&text), vec!["Use JWT for authentication"]);
    }

    #[test]
    fn unreadable_entry_is_an_error() {
        let env = env();
        let missing = env.diary_dir.join("gone.md");
        assert!(env.miner.analyze(&[missing]).is_err());
    }

    #[test]
    fn marks_entries_as_processed() {
        let env = env();
        let entries = env.miner.unprocessed_entries().unwrap();
        env.miner.mark_processed(&entries).unwrap();

        let log = fs::read_to_string(env.reflections_dir.join("processed.log")).unwrap();
        for name in ["diary-1.md", "diary-2.md", "diary-3.md"] {
            assert!(log.contains(&env.diary_dir.join(name).display().to_string()));
        }
        assert!(env.miner.unprocessed_entries().unwrap().is_empty());
    }

    #[test]
    fn repeated_overlapping_marks_stay_excluded() {
        let env = env();
        let entries = env.miner.unprocessed_entries().unwrap();
        env.miner.mark_processed(&entries[..2]).unwrap();
        env.miner.mark_processed(&entries[1..]).unwrap();
        env.miner.mark_processed(&entries).unwrap();

        assert!(env.miner.unprocessed_entries().unwrap().is_empty());
        let log = fs::read_to_string(env.miner.processed_log().path()).unwrap();
        assert_eq!(log.lines().count(), 7);
    }

    #[test]
    fn new_entries_surface_after_marking() {
        let env = env();
        let first = env.miner.unprocessed_entries().unwrap();
        env.miner.mark_processed(&first).unwrap();

        fs::write(env.diary_dir.join("diary-4.md"), DIARY_3).unwrap();
        let next = env.miner.unprocessed_entries().unwrap();
        assert_eq!(next, vec![env.diary_dir.join("diary-4.md")]);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_file_names_are_mined_and_marked() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempfile::tempdir().unwrap();
        let diary = tmp.path().join("diary");
        fs::create_dir_all(&diary).unwrap();
        let odd = diary.join(OsStr::from_bytes(b"caf\xe9.md"));
        fs::write(&odd, "## Decisions Made\n- Odd name\n").unwrap();
        fs::write(diary.join("ok.md"), "## Decisions Made\n- Odd name\n").unwrap();
        let miner = PatternMiner::new(&diary, tmp.path().join("reflections"));

        let entries = miner.unprocessed_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&odd));

        let result = miner.analyze(&entries).unwrap();
        assert_eq!(
            result.moderate,
            vec![PatternCount {
                pattern: "Odd name".into(),
                count: 2
            }]
        );

        miner.mark_processed(&entries).unwrap();
        assert!(miner.unprocessed_entries().unwrap().is_empty());
    }

    #[test]
    fn from_paths_shares_the_store_log() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = MemPaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        fs::write(paths.diary_dir.join("a.md"), DIARY_1).unwrap();

        let miner = PatternMiner::from_paths(&paths);
        assert_eq!(miner.processed_log().path(), paths.processed_log.as_path());
        let entries = miner.unprocessed_entries().unwrap();
        miner.mark_processed(&entries).unwrap();
        assert!(paths.processed_log.exists());
        assert!(PatternMiner::new(&paths.diary_dir, &paths.reflections_dir)
            .unprocessed_entries()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn mark_creates_reflections_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let diary = tmp.path().join("diary");
        fs::create_dir_all(&diary).unwrap();
        fs::write(diary.join("a.md"), DIARY_1).unwrap();
        let miner = PatternMiner::new(&diary, tmp.path().join("reflections"));

        let entries = miner.unprocessed_entries().unwrap();
        miner.mark_processed(&entries).unwrap();
        assert!(tmp.path().join("reflections").join("processed.log").exists());
    }
}
