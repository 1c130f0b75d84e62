use michi_config::MemConfig;
use michi_diary::MemPaths;

/// `michi config`
pub fn execute(paths: &MemPaths, config: &MemConfig) -> anyhow::Result<()> {
    println!("# {}", paths.config_json.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
