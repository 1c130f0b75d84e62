//! Session diary writing and pattern mining.
//!
//! Both halves assume a single writer per store at a time; neither takes a
//! lock. Callers that may run concurrently should hold
//! [`michi_store::try_lock_file`] on [`MemPaths::lock_file`] around writes.

pub mod entry;
pub mod miner;
pub mod paths;
pub mod processed;
pub mod writer;

pub use entry::{render_entry, EntryRecord};
pub use miner::{extract_patterns, Analysis, PatternCount, PatternMiner};
pub use paths::{processed_log_in, MemPaths, PROCESSED_LOG_FILE};
pub use processed::ProcessedLog;
pub use writer::{entry_file_name, format_date, today, EntryWriter};
