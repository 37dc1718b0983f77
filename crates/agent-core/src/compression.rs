//! Compression Step
//!
//! Turns the finished conversation into a compact report plus a block of
//! raw evidence notes.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::message::{Conversation, Message, Role};

pub const COMPRESS_RESEARCH_SYSTEM_PROMPT: &str = r"You are a research assistant that has conducted research on a topic by calling several tools and web searches. Your job is now to clean up the findings, but preserve all of the relevant statements and information that the researcher has gathered.

<Task>
Clean up information gathered from tool calls and web searches in the existing messages.
All relevant information should be repeated and rewritten verbatim, but in a cleaner format.
Only remove information that is clearly irrelevant or duplicative.
</Task>

<Output Format>
**List of Queries and Tool Calls Made**
**Fully Comprehensive Findings**
**List of All Relevant Sources (with citations in the report)**
</Output Format>

<Citation Rules>
- Assign each unique URL a single citation number in your text
- End with ### Sources that lists each source with corresponding numbers
- Number sources sequentially without gaps (1,2,3,4...)
</Citation Rules>

Today's date is {date}.";

pub const COMPRESS_RESEARCH_HUMAN_MESSAGE: &str = "All above messages are about research conducted by an AI researcher. \
Please clean up these findings. DO NOT summarize the information. Return the raw information in a cleaner format. \
Make sure all relevant information is preserved - you can rewrite findings verbatim.";

/// What happens to note blocks already present in the state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawNotesPolicy {
    /// Append the new block after earlier ones
    #[default]
    Accumulate,
    /// Replace earlier blocks with this run's block
    ResetPerRun,
}

/// Date string used in the compression prompt, e.g. `Fri Oct 16, 2026`
pub fn today_str() -> String {
    format_date(Local::now())
}

pub fn format_date(date: DateTime<Local>) -> String {
    date.format("%a %b %-d, %Y").to_string()
}

/// Messages sent to the compression model.
///
/// Tool results and assistant turns that request tools are dropped; only
/// plain natural-language turns survive between the system and closing
/// instructions.
pub fn compression_messages(conversation: &Conversation, date: &str) -> Vec<Message> {
    let system = Message::system(COMPRESS_RESEARCH_SYSTEM_PROMPT.replace("{date}", date));
    let closing = Message::user(COMPRESS_RESEARCH_HUMAN_MESSAGE);

    std::iter::once(system)
        .chain(
            conversation
                .messages()
                .iter()
                .filter(|m| m.role != Role::Tool && !m.has_tool_calls())
                .cloned(),
        )
        .chain(std::iter::once(closing))
        .collect()
}

/// Newline join of every tool and assistant message, in conversation order
pub fn raw_notes_block(conversation: &Conversation) -> String {
    conversation
        .messages()
        .iter()
        .filter(|m| matches!(m.role, Role::Tool | Role::Assistant))
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fold a new block into the existing notes
pub fn merge_raw_notes(notes: &mut Vec<String>, block: String, policy: RawNotesPolicy) {
    if policy == RawNotesPolicy::ResetPerRun {
        notes.clear();
    }
    notes.push(block);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::query_call;
    use chrono::TimeZone;

    fn researched() -> Conversation {
        let mut conv = Conversation::from_brief("Research JAMF");
        conv.push(Message::assistant("").with_tool_calls(vec![query_call("quick_search", "jamf", "1")]));
        conv.push(Message::tool("JAMF makes Apple device management software.", "1"));
        conv.push(Message::assistant("Let me reflect.").with_tool_calls(vec![query_call("think", "gaps", "2")]));
        conv.push(Message::tool("Reflection recorded: gaps", "2"));
        conv.push(Message::assistant("JAMF is an Apple MDM vendor."));
        conv
    }

    #[test]
    fn test_filtered_list_has_no_tool_artifacts() {
        let messages = compression_messages(&researched(), "Fri Oct 16, 2026");

        assert!(messages.iter().all(|m| m.role != Role::Tool));
        assert!(messages.iter().all(|m| !m.has_tool_calls()));

        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert!(messages[0].content.ends_with("Today's date is Fri Oct 16, 2026."));
        assert_eq!(messages[2].content, "JAMF is an Apple MDM vendor.");
        assert_eq!(messages[3].content, COMPRESS_RESEARCH_HUMAN_MESSAGE);
    }

    #[test]
    fn test_raw_notes_block_uses_unfiltered_conversation() {
        let block = raw_notes_block(&researched());
        let expected = [
            "",
            "JAMF makes Apple device management software.",
            "Let me reflect.",
            "Reflection recorded: gaps",
            "JAMF is an Apple MDM vendor.",
        ]
        .join("\n");
        assert_eq!(block, expected);
    }

    #[test]
    fn test_raw_notes_policies() {
        let mut notes = vec!["earlier".to_string()];
        merge_raw_notes(&mut notes, "now".into(), RawNotesPolicy::Accumulate);
        assert_eq!(notes, vec!["earlier", "now"]);

        merge_raw_notes(&mut notes, "latest".into(), RawNotesPolicy::ResetPerRun);
        assert_eq!(notes, vec!["latest"]);
    }

    #[test]
    fn test_date_format() {
        let date = Local.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        assert_eq!(format_date(date), "Mon Jan 5, 2026");
    }
}
