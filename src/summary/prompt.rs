use chrono::FixedOffset;

use crate::entities::activity;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes elderly care \
information that have been logged by care providers who visit them regularly.";

const PROMPT_HEAD: &str = "Analyze care visit records and create a care summary.

VISIT RECORDS (oldest to newest):
";

const PROMPT_TAIL: &str = "
TASK 1 - SUMMARIZE VISITS:
For each visit date, write:
\"Issues identified: [findings/None]. Issues resolved: [resolutions/None].\"

TASK 2 - CREATE ACTION ITEMS:
1. List all identified issues
2. Remove any issues that were later resolved (including related issues)
3. Convert remaining issues into clear instructions

Example output:
Recent visits summary:
- 1/1/2024: Issues identified: Needs walker for mobility. Issues resolved: None.
- 1/5/2024: Issues identified: None. Issues resolved: Provided walker, mobility improved.
- 1/8/2024: Issues identified: Feeling lonely. Issues resolved: None.

Action items:
- Connect resident with social activities to address loneliness

Note: \"Needs walker\" was removed from action items as it was resolved on 1/5.

YOUR RESPONSE MUST FOLLOW THIS FORMAT:
Recent visits summary:
- [Date]: Issues identified: [findings/None]. Issues resolved: [resolutions/None].

Action items:
- [Instructions for unresolved issues]
OR
- No outstanding action items";

/// Renders one visit as a bullet pairing what was found with what was done.
pub fn visit_line(activity: &activity::Model, offset: &FixedOffset) -> String {
    let date = activity.activity_date.with_timezone(offset).format("%-m/%-d/%Y");
    format!(
        "- {} ({}): Issues identified: {}. Issues resolved: {}.",
        date,
        activity.category.label(),
        or_none(activity.issue.as_deref()),
        or_none(activity.resolved.as_deref()),
    )
}

/// Builds the user prompt from activities fetched newest first.
pub fn build_prompt(recent_newest_first: &[activity::Model], offset: &FixedOffset) -> String {
    let visits = recent_newest_first
        .iter()
        .rev()
        .map(|a| visit_line(a, offset))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{PROMPT_HEAD}{visits}\n{PROMPT_TAIL}")
}

/// Free text folded onto one line so each visit stays a single bullet.
fn or_none(text: Option<&str>) -> String {
    let folded = text
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    match folded.trim_end_matches('.') {
        "" => "None".to_string(),
        t => t.to_string(),
    }
}
