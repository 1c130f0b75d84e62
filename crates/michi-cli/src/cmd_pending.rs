use michi_diary::{MemPaths, PatternMiner};

/// `michi pending`
pub fn execute(paths: &MemPaths) -> anyhow::Result<()> {
    if !paths.is_initialized() {
        println!("(no diary at {})", paths.diary_dir.display());
        return Ok(());
    }
    let miner = PatternMiner::from_paths(paths);
    let entries = miner.unprocessed_entries()?;
    if entries.is_empty() {
        println!("(no unprocessed entries)");
        return Ok(());
    }
    for entry in &entries {
        println!("{}", entry.display());
    }
    Ok(())
}
