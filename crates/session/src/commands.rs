//! Outbound command builders
//!
//! Pure construction of outbound envelopes from UI intents. No state, no IO.

use chrono::Utc;

use agentdeck_protocol::{Envelope, Sender};

/// Current time as ISO-8601 (RFC 3339), the wire timestamp format.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Build a user chat envelope. Returns `None` when the trimmed text is empty;
/// that is the only validation applied.
pub fn chat(text: &str) -> Option<Envelope> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(Envelope::Chat {
        content: trimmed.to_string(),
        sender: Sender::User,
        timestamp: now_iso(),
    })
}

/// Build a file-content request for `path`.
pub fn file_content_request(path: &str) -> Envelope {
    Envelope::GetFileContent {
        path: path.to_string(),
    }
}

/// Ask the backend to rescan the workspace and re-push the tree.
pub fn refresh_file_tree() -> Envelope {
    Envelope::RefreshFileTree
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_trims_and_stamps() {
        let envelope = chat("  hi  ").expect("non-empty");
        match envelope {
            Envelope::Chat {
                content,
                sender,
                timestamp,
            } => {
                assert_eq!(content, "hi");
                assert_eq!(sender, Sender::User);
                // RFC 3339 shape, e.g. 2026-08-29T12:00:00+00:00
                assert!(timestamp.contains('T'), "timestamp: {}", timestamp);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn empty_or_whitespace_chat_is_rejected() {
        assert!(chat("").is_none());
        assert!(chat("   \n\t ").is_none());
    }

    #[test]
    fn file_content_request_carries_the_path() {
        match file_content_request("workspace/a.txt") {
            Envelope::GetFileContent { path } => assert_eq!(path, "workspace/a.txt"),
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn refresh_serializes_to_the_bare_tag() {
        let json = serde_json::to_string(&refresh_file_tree()).expect("serialize");
        assert_eq!(json, r#"{"type":"refreshFileTree"}"#);
    }
}
