use serde::Serialize;

const RECENT_VISITS: &str = "recent visits summary";
const ACTION_ITEMS: &str = "action items";

/// The two labelled bullet lists the completion is asked to produce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummarySections {
    pub recent_visits: Vec<String>,
    pub action_items: Vec<String>,
}

#[derive(Clone, Copy)]
enum Section {
    RecentVisits,
    ActionItems,
}

/// Splits a stored summary into its sections. Returns `None` when neither
/// heading is present so callers can show the text as-is.
pub fn parse_summary(text: &str) -> Option<SummarySections> {
    let mut sections = SummarySections::default();
    let mut current = None;
    let mut saw_heading = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(section) = heading(trimmed) {
            current = Some(section);
            saw_heading = true;
            continue;
        }

        let Some(section) = current else {
            continue;
        };
        let item = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
            .or_else(|| trimmed.strip_prefix("• "))
            .unwrap_or(trimmed)
            .trim();
        if item.is_empty() {
            continue;
        }

        match section {
            Section::RecentVisits => sections.recent_visits.push(item.to_string()),
            Section::ActionItems => sections.action_items.push(item.to_string()),
        }
    }

    saw_heading.then_some(sections)
}

fn heading(line: &str) -> Option<Section> {
    let normalized = line
        .trim_matches(|c: char| c == '*' || c == '#' || c.is_whitespace())
        .trim_end_matches(':')
        .trim_matches('*')
        .to_ascii_lowercase();

    match normalized.as_str() {
        RECENT_VISITS => Some(Section::RecentVisits),
        ACTION_ITEMS => Some(Section::ActionItems),
        _ => None,
    }
}
