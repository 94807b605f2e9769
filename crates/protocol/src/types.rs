//! Core types shared across the protocol

use serde::{Deserialize, Serialize};

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
    System,
}

impl Default for Sender {
    // Backend chat frames may omit the sender; they are assistant output.
    fn default() -> Self {
        Sender::Assistant
    }
}

/// What the agent is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Thinking,
    #[serde(alias = "executing")]
    Working,
    Waiting,
    Error,
}

impl Default for AgentStatus {
    fn default() -> Self {
        AgentStatus::Idle
    }
}

/// Kind of a workspace tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// One entry in the workspace file tree.
///
/// `path` is the natural key and is unique across the whole tree. The backend
/// replaces the tree wholesale on every push; there is no incremental patch
/// format on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTreeNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileTreeNode>,
}

/// A message in the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub content: String,
    pub sender: Sender,
    /// ISO-8601
    pub timestamp: String,
}

/// Current agent status plus a human-readable action line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: AgentStatus,
    pub action: String,
}

/// The file currently open in the viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentFile {
    pub path: String,
    pub name: String,
    pub extension: String,
}

impl CurrentFile {
    /// Derive name and extension from a workspace path.
    pub fn from_path(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        let extension = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_string(),
            _ => String::new(),
        };
        Self {
            path: path.to_string(),
            name,
            extension,
        }
    }
}
