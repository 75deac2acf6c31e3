//! Small presentation helpers shared by the list preview and the meeting
//! coordinator.

use shared::protocol::MessageSummary;
use url::Url;

const PREVIEW_MAX_CHARS: usize = 80;
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '>', '"', '\''];

/// One-line preview for the conversation list: the message text truncated,
/// or a description of its attachments when there is no text.
pub fn preview_line(summary: &MessageSummary) -> String {
    let text = summary.text.trim();
    if !text.is_empty() {
        return truncate(text, PREVIEW_MAX_CHARS);
    }
    match summary.attachment_count {
        0 => String::new(),
        1 => "1 attachment".to_string(),
        n => format!("{n} attachments"),
    }
}

/// Extract well-formed http(s) links from message text. Trailing punctuation
/// that commonly clings to pasted links is stripped before parsing.
pub fn extract_links(text: &str) -> Vec<Url> {
    text.split_whitespace()
        .filter(|token| token.starts_with("http://") || token.starts_with("https://"))
        .map(|token| token.trim_end_matches(TRAILING_PUNCTUATION))
        .filter_map(|token| Url::parse(token).ok())
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::domain::{MessageId, UserId};

    fn summary(text: &str, attachment_count: usize) -> MessageSummary {
        MessageSummary {
            id: MessageId::new("m1"),
            text: text.to_string(),
            sender_id: UserId::new("u1"),
            sent_at: Utc::now(),
            attachment_count,
        }
    }

    #[test]
    fn preview_prefers_text_over_attachment_count() {
        assert_eq!(preview_line(&summary("hello there", 2)), "hello there");
    }

    #[test]
    fn preview_describes_attachments_when_text_is_empty() {
        assert_eq!(preview_line(&summary("", 0)), "");
        assert_eq!(preview_line(&summary("  ", 1)), "1 attachment");
        assert_eq!(preview_line(&summary("", 3)), "3 attachments");
    }

    #[test]
    fn long_previews_are_truncated_with_ellipsis() {
        let long = "x".repeat(200);
        let preview = preview_line(&summary(&long, 0));
        assert!(preview.chars().count() <= 80);
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn extracts_links_and_strips_trailing_punctuation() {
        let links = extract_links("join here: https://meet.example.com/meet-abc, thanks!");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://meet.example.com/meet-abc");
    }

    #[test]
    fn ignores_malformed_and_non_http_tokens() {
        let links = extract_links("ftp://old.example.com https://: mailto:x@y.z plain-text");
        assert!(links.is_empty());
    }

    #[test]
    fn finds_multiple_links() {
        let links = extract_links("https://a.example.com and https://b.example.com/path.");
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].path(), "/path");
    }
}
