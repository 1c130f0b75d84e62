use serde::{Deserialize, Serialize};

/// Structured record of one session's work, as handed to the writer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub work_done: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub preferences: Vec<String>,
}

impl EntryRecord {
    /// True when no section would be rendered.
    pub fn has_no_sections(&self) -> bool {
        self.summary.as_deref().map_or(true, str::is_empty)
            && self.work_done.is_empty()
            && self.decisions.is_empty()
            && self.preferences.is_empty()
    }
}

/// Render a diary document.
///
/// Four header lines, a blank line, then each non-empty section as
/// `## Heading`, blank line, body, blank line. Output ends with exactly one
/// newline.
pub fn render_entry(record: &EntryRecord, date: &str, session: u32) -> String {
    let mut out = String::new();

    out.push_str(&format!("Project: {}\n", or_na(record.project.as_deref())));
    out.push_str(&format!("Branch: {}\n", or_na(record.branch.as_deref())));
    out.push_str(&format!("Date: {date}\n"));
    out.push_str(&format!("Session: {session:03}\n"));
    out.push('\n');

    if let Some(summary) = record.summary.as_deref().filter(|s| !s.is_empty()) {
        out.push_str("## Summary\n\n");
        out.push_str(summary);
        out.push_str("\n\n");
    }
    push_list(&mut out, "Work Done", &record.work_done);
    push_list(&mut out, "Decisions Made", &record.decisions);
    push_list(&mut out, "Preferences Learned", &record.preferences);

    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out.push('\n');
    out
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("## {heading}\n\n"));
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
    out.push('\n');
}

fn or_na(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "N/A",
    }
}
