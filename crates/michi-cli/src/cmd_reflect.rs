use michi_config::MemConfig;
use michi_diary::{Analysis, MemPaths, PatternCount, PatternMiner};

/// `michi reflect`
pub fn execute(paths: &MemPaths, config: &MemConfig, json: bool, mark: bool) -> anyhow::Result<()> {
    if !config.mem_enabled() {
        println!("Diary disabled (plugins.mem.enabled = false); nothing to reflect on.");
        return Ok(());
    }

    // Held from discovery through marking so the batch we mark is the batch we read.
    let _lock = if mark {
        Some(michi_store::try_lock_file(&paths.lock_file)?)
    } else {
        None
    };

    let miner = PatternMiner::from_paths(paths);
    let entries = miner.unprocessed_entries()?;
    let analysis = miner.analyze(&entries)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print!("{}", render_analysis(&analysis, entries.len()));
    }

    if mark && !entries.is_empty() {
        miner.mark_processed(&entries)?;
        if !json {
            println!("Marked {} entries as processed.", entries.len());
        }
    }
    Ok(())
}

pub fn render_analysis(analysis: &Analysis, entry_count: usize) -> String {
    if entry_count == 0 {
        return "No unprocessed entries.\n".to_string();
    }
    let mut out = format!(
        "Analyzed {entry_count} entries, {} distinct patterns.\n",
        analysis.total()
    );
    if analysis.is_empty() {
        out.push_str("No patterns found.\n");
        return out;
    }
    push_tier(&mut out, "Strong (3+ occurrences)", &analysis.strong);
    push_tier(&mut out, "Moderate (2 occurrences)", &analysis.moderate);
    push_tier(&mut out, "Emerging (1 occurrence)", &analysis.emerging);
    out
}

fn push_tier(out: &mut String, title: &str, items: &[PatternCount]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n{title}:\n"));
    for item in items {
        out.push_str(&format!("  - {} ({})\n", item.pattern, item.count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pc(pattern: &str, count: usize) -> PatternCount {
        PatternCount {
            pattern: pattern.to_string(),
            count,
        }
    }

    #[test]
    fn render_lists_non_empty_tiers() {
        let analysis = Analysis {
            strong: vec![pc("Prefer pytest", 4)],
            moderate: vec![],
            emerging: vec![pc("Use JWT", 1)],
        };
        let text = render_analysis(&analysis, 5);
        assert!(text.starts_with("Analyzed 5 entries, 2 distinct patterns.\n"));
        assert!(text.contains("Strong (3+ occurrences):\n  - Prefer pytest (4)\n"));
        assert!(!text.contains("Moderate"));
        assert!(text.contains("Emerging (1 occurrence):\n  - Use JWT (1)\n"));
    }

    #[test]
    fn render_without_entries() {
        assert_eq!(
            render_analysis(&Analysis::default(), 0),
            "No unprocessed entries.\n"
        );
    }

    #[test]
    fn reflect_with_mark_consumes_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = MemPaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        std::fs::write(
            paths.diary_dir.join("2026-10-17_session_001.md"),
            "## Decisions Made\n\n- Use SQLite\n",
        )
        .unwrap();
        let config = MemConfig::default();

        execute(&paths, &config, true, true).unwrap();

        let miner = PatternMiner::from_paths(&paths);
        assert!(miner.unprocessed_entries().unwrap().is_empty());
        assert!(michi_store::try_lock_file(&paths.lock_file).is_ok());
    }
}
