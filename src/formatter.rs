use serde::Serialize;

use crate::parser::FailureRecord;

/// Slack rejects section text longer than this
pub const MAX_SECTION_TEXT: usize = 3000;

/// Slack rejects messages with more blocks than this
pub const MAX_BLOCKS: usize = 50;

// header + divider + screenshot note
const RESERVED_BLOCKS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        TextObject::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            TextObject::Mrkdwn { text } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { text: TextObject },
    Divider,
    Context { elements: Vec<TextObject> },
}

/// Message body posted to the channel: fallback text plus display blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessagePayload {
    pub text: String,
    pub blocks: Vec<Block>,
}

/// Build the failure summary message.
///
/// Layout is the header section, then a divider and one section per failure
/// when there are failures, then a context note when screenshots will follow.
pub fn format_failures_as_blocks(
    failures: &[FailureRecord],
    header: &str,
    screenshot_count: usize,
) -> MessagePayload {
    let mut blocks = vec![Block::Section {
        text: TextObject::mrkdwn(escape_truncated(header, MAX_SECTION_TEXT)),
    }];

    if !failures.is_empty() {
        blocks.push(Block::Divider);

        let slots = MAX_BLOCKS - RESERVED_BLOCKS;
        if failures.len() <= slots {
            blocks.extend(failures.iter().map(failure_block));
        } else {
            let shown = slots - 1;
            blocks.extend(failures[..shown].iter().map(failure_block));
            blocks.push(Block::Section {
                text: TextObject::mrkdwn(format!(
                    "…and {} more failures",
                    failures.len() - shown
                )),
            });
        }
    }

    if screenshot_count > 0 {
        blocks.push(screenshot_note(screenshot_count));
    }

    MessagePayload {
        text: header.to_string(),
        blocks,
    }
}

fn failure_block(failure: &FailureRecord) -> Block {
    let name = escape_mrkdwn(&failure.test_name);
    let source = escape_mrkdwn(&failure.source_file);

    let overhead = format!("*{}*\n_{}_\n``````", name, source).chars().count();
    let error = escape_truncated(
        &failure.error_message,
        MAX_SECTION_TEXT.saturating_sub(overhead),
    );
    let text = format!("*{}*\n_{}_\n```{}```", name, source, error);

    Block::Section {
        text: TextObject::mrkdwn(truncate_chars(&text, MAX_SECTION_TEXT)),
    }
}

fn screenshot_note(count: usize) -> Block {
    let text = if count == 1 {
        ":camera: 1 screenshot will follow in this thread".to_string()
    } else {
        format!(":camera: {} screenshots will follow in this thread", count)
    };
    Block::Context {
        elements: vec![TextObject::mrkdwn(text)],
    }
}

/// Escape the characters Slack treats as control sequences in mrkdwn
pub fn escape_mrkdwn(text: &str) -> String {
    text.chars().map(escape_char).collect()
}

fn escape_char(c: char) -> String {
    match c {
        '&' => "&amp;".to_string(),
        '<' => "&lt;".to_string(),
        '>' => "&gt;".to_string(),
        _ => c.to_string(),
    }
}

/// Escape `raw` and fit it into `max` chars without splitting an entity
fn escape_truncated(raw: &str, max: usize) -> String {
    let escaped = escape_mrkdwn(raw);
    if escaped.chars().count() <= max {
        return escaped;
    }
    if max == 0 {
        return String::new();
    }

    let budget = max - 1;
    let mut truncated = String::new();
    let mut used = 0;
    for c in raw.chars() {
        let piece = escape_char(c);
        let len = piece.chars().count();
        if used + len > budget {
            break;
        }
        truncated.push_str(&piece);
        used += len;
    }
    truncated.push('…');
    truncated
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut truncated: String = text.chars().take(max - 1).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn failure(name: &str, error: &str) -> FailureRecord {
        FailureRecord {
            test_name: name.to_string(),
            error_message: error.to_string(),
            source_file: "a.cy.js".to_string(),
        }
    }

    fn section_texts(payload: &MessagePayload) -> Vec<String> {
        payload
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Section { text } => Some(text.text().to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_header_failures_and_screenshot_note() {
        let failures = vec![
            failure("logs in", "expected true"),
            failure("logs out", "timed out"),
        ];

        let payload = format_failures_as_blocks(&failures, "Custom header", 3);

        assert_eq!(payload.text, "Custom header");
        assert_eq!(payload.blocks.len(), 5);
        assert_eq!(
            payload.blocks[0],
            Block::Section {
                text: TextObject::mrkdwn("Custom header")
            }
        );
        assert_eq!(payload.blocks[1], Block::Divider);
        assert_eq!(
            payload.blocks[2],
            Block::Section {
                text: TextObject::mrkdwn("*logs in*\n_a.cy.js_\n```expected true```")
            }
        );
        assert_eq!(
            payload.blocks[4],
            Block::Context {
                elements: vec![TextObject::mrkdwn(
                    ":camera: 3 screenshots will follow in this thread"
                )]
            }
        );
    }

    #[test]
    fn test_zero_failures_only_header() {
        let payload = format_failures_as_blocks(&[], "Nothing broke", 0);
        assert_eq!(
            payload.blocks,
            vec![Block::Section {
                text: TextObject::mrkdwn("Nothing broke")
            }]
        );
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let failures = vec![failure("one", "e1"), failure("two", "e2")];
        assert_eq!(
            format_failures_as_blocks(&failures, "h", 2),
            format_failures_as_blocks(&failures, "h", 2)
        );
    }

    #[test]
    fn test_screenshot_count_only_toggles_note() {
        let failures = vec![failure("one", "e1"), failure("two", "e2")];

        let without = format_failures_as_blocks(&failures, "h", 0);
        let with = format_failures_as_blocks(&failures, "h", 4);

        assert_eq!(with.text, without.text);
        assert_eq!(with.blocks.len(), without.blocks.len() + 1);
        assert_eq!(&with.blocks[..without.blocks.len()], &without.blocks[..]);
        assert!(matches!(with.blocks.last(), Some(Block::Context { .. })));
    }

    #[test]
    fn test_single_screenshot_wording() {
        let payload = format_failures_as_blocks(&[failure("one", "e1")], "h", 1);
        assert_eq!(
            payload.blocks.last(),
            Some(&Block::Context {
                elements: vec![TextObject::mrkdwn(
                    ":camera: 1 screenshot will follow in this thread"
                )]
            })
        );
    }

    #[test]
    fn test_long_error_truncated_to_section_limit() {
        let long_error = "x".repeat(10_000);
        let payload = format_failures_as_blocks(&[failure("big", &long_error)], "h", 0);

        let texts = section_texts(&payload);
        let failure_text = &texts[1];
        assert!(failure_text.chars().count() <= MAX_SECTION_TEXT);
        assert!(failure_text.starts_with("*big*\n_a.cy.js_\n```x"));
        assert!(failure_text.ends_with("…```"));
    }

    #[test]
    fn test_truncation_keeps_entities_whole() {
        let payload = format_failures_as_blocks(&[failure("amp", &"&".repeat(1_000))], "h", 0);

        let texts = section_texts(&payload);
        let failure_text = &texts[1];
        assert!(failure_text.chars().count() <= MAX_SECTION_TEXT);
        assert!(failure_text.ends_with("&amp;…```"));

        let error = failure_text
            .trim_start_matches("*amp*\n_a.cy.js_\n```")
            .trim_end_matches("…```");
        assert_eq!(error.replace("&amp;", ""), "");
    }

    #[test]
    fn test_long_header_truncated_on_entity_boundary() {
        let header = format!("{}<", "a".repeat(2_998));
        let payload = format_failures_as_blocks(&[], &header, 0);

        let texts = section_texts(&payload);
        assert_eq!(texts[0], format!("{}…", "a".repeat(2_998)));
    }

    #[test]
    fn test_block_count_capped() {
        let failures: Vec<_> = (0..60)
            .map(|i| failure(&format!("test {}", i), "boom"))
            .collect();

        let payload = format_failures_as_blocks(&failures, "h", 2);
        assert_eq!(payload.blocks.len(), MAX_BLOCKS);

        let texts = section_texts(&payload);
        let overflow = &texts[texts.len() - 1];
        assert_eq!(overflow, "…and 14 more failures");
    }

    #[test]
    fn test_mrkdwn_control_characters_escaped() {
        let payload = format_failures_as_blocks(
            &[failure("a <b> & c", "expected <div> to exist")],
            "h",
            0,
        );
        let texts = section_texts(&payload);
        assert_eq!(
            texts[1],
            "*a &lt;b&gt; &amp; c*\n_a.cy.js_\n```expected &lt;div&gt; to exist```"
        );
    }

    #[test]
    fn test_blocks_serialize_to_slack_shape() {
        let payload = format_failures_as_blocks(&[failure("t", "e")], "h", 1);
        let json = serde_json::to_value(&payload.blocks).unwrap();
        assert_eq!(json[0]["type"], "section");
        assert_eq!(json[0]["text"]["type"], "mrkdwn");
        assert_eq!(json[1], serde_json::json!({ "type": "divider" }));
        assert_eq!(json[3]["type"], "context");
        assert_eq!(json[3]["elements"][0]["type"], "mrkdwn");
    }
}
