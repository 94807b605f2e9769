//! The wire envelope exchanged in both directions

use serde::{Deserialize, Serialize};

use crate::types::{AgentStatus, FileTreeNode, Sender};

/// One discrete typed message on the socket.
///
/// The `type` tag selects the payload shape. Envelopes are immutable once
/// constructed; consumers only read them. Unknown tags fail to parse and are
/// dropped by the dispatcher rather than crashing consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Envelope {
    /// Transcript content, both directions
    Chat {
        content: String,
        #[serde(default)]
        sender: Sender,
        /// ISO-8601; backends occasionally omit it, in which case the
        /// transcript stamps arrival time
        #[serde(default)]
        timestamp: String,
    },
    /// Backend-reported failure, shown as a system transcript entry
    Error { message: String },
    /// Current agent activity, overwrites the previous value
    Status {
        status: AgentStatus,
        #[serde(default)]
        action: String,
    },
    /// Wholesale replacement of the workspace tree
    FileTree { tree: Vec<FileTreeNode> },
    /// Wholesale replacement of the set of files the agent is touching
    ActiveFiles { files: Vec<String> },
    /// Backend-driven navigation: open this file in the viewer
    SelectFile { path: String },
    /// Client request for a file body
    GetFileContent { path: String },
    /// File body, either solicited or pushed after `SelectFile`
    FileContent { path: String, content: String },
    /// Client request to rescan and re-push the workspace tree
    RefreshFileTree,
}

#[cfg(test)]
mod tests {
    use super::Envelope;
    use crate::types::{AgentStatus, NodeKind, Sender};

    #[test]
    fn deserializes_chat_with_defaults() {
        let json = r#"{"type":"chat","content":"Solicitud completada"}"#;
        let parsed: Envelope = serde_json::from_str(json).expect("parse chat");
        match parsed {
            Envelope::Chat {
                content,
                sender,
                timestamp,
            } => {
                assert_eq!(content, "Solicitud completada");
                assert_eq!(sender, Sender::Assistant);
                assert!(timestamp.is_empty());
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn roundtrip_chat_from_user() {
        let msg = Envelope::Chat {
            content: "hi".into(),
            sender: Sender::User,
            timestamp: "2026-08-29T12:00:00Z".into(),
        };
        let json = serde_json::to_string(&msg).expect("serialize");
        assert!(json.contains("\"type\":\"chat\""));
        assert!(json.contains("\"sender\":\"user\""));
        let reparsed: Envelope = serde_json::from_str(&json).expect("reparse");
        assert_eq!(reparsed, msg);
    }

    #[test]
    fn deserializes_status_frame() {
        let json = r#"{"type":"status","status":"thinking","action":"Procesando: hola"}"#;
        let parsed: Envelope = serde_json::from_str(json).expect("parse status");
        match parsed {
            Envelope::Status { status, action } => {
                assert_eq!(status, AgentStatus::Thinking);
                assert_eq!(action, "Procesando: hola");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn deserializes_file_tree_with_nested_children() {
        let json = r#"{
          "type":"fileTree",
          "tree":[
            {"name":"reports","path":"workspace/reports","type":"directory","children":[
              {"name":"summary.md","path":"workspace/reports/summary.md","type":"file"}
            ]},
            {"name":"a.txt","path":"workspace/a.txt","type":"file"}
          ]
        }"#;
        let parsed: Envelope = serde_json::from_str(json).expect("parse fileTree");
        match parsed {
            Envelope::FileTree { tree } => {
                assert_eq!(tree.len(), 2);
                assert_eq!(tree[0].kind, NodeKind::Directory);
                assert_eq!(tree[0].children.len(), 1);
                assert_eq!(tree[0].children[0].path, "workspace/reports/summary.md");
                assert!(tree[1].children.is_empty());
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn camel_case_tags_on_the_wire() {
        let json = serde_json::to_string(&Envelope::GetFileContent {
            path: "workspace/a.txt".into(),
        })
        .expect("serialize");
        assert!(json.contains("\"type\":\"getFileContent\""));

        let json = serde_json::to_string(&Envelope::RefreshFileTree).expect("serialize");
        assert_eq!(json, r#"{"type":"refreshFileTree"}"#);

        let json = serde_json::to_string(&Envelope::ActiveFiles {
            files: vec!["workspace/a.txt".into()],
        })
        .expect("serialize");
        assert!(json.contains("\"type\":\"activeFiles\""));
    }

    #[test]
    fn unknown_tag_is_a_parse_error() {
        let err = serde_json::from_str::<Envelope>(r#"{"type":"totallyNew","x":1}"#);
        assert!(err.is_err());
    }

    #[test]
    fn roundtrip_file_content() {
        let msg = Envelope::FileContent {
            path: "workspace/a.txt".into(),
            content: "hello".into(),
        };
        let json = serde_json::to_string(&msg).expect("serialize");
        let reparsed: Envelope = serde_json::from_str(&json).expect("reparse");
        assert_eq!(reparsed, msg);
    }
}
