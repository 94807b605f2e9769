//! Workspace projections: file tree and active-file set
//!
//! Both are replaced wholesale on every push. No diffing exists on the wire,
//! so none is attempted here.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use agentdeck_protocol::{Envelope, FileTreeNode};

use crate::router::{MessageRouter, Subscription};

/// Mirror of the backend's workspace tree.
pub struct FileTreeProjection {
    inner: Arc<Mutex<Vec<FileTreeNode>>>,
    _subscription: Subscription,
}

impl FileTreeProjection {
    pub fn new(router: &Arc<MessageRouter>) -> Self {
        let inner = Arc::new(Mutex::new(Vec::new()));

        let state = inner.clone();
        let subscription = router.subscribe(Box::new(move |envelope| {
            if let Envelope::FileTree { tree } = envelope {
                *state.lock().expect("file tree poisoned") = tree.clone();
            }
            Ok(())
        }));

        Self {
            inner,
            _subscription: subscription,
        }
    }

    pub fn tree(&self) -> Vec<FileTreeNode> {
        self.inner.lock().expect("file tree poisoned").clone()
    }
}

/// Paths the agent is currently touching.
pub struct ActiveFilesProjection {
    inner: Arc<Mutex<HashSet<String>>>,
    _subscription: Subscription,
}

impl ActiveFilesProjection {
    pub fn new(router: &Arc<MessageRouter>) -> Self {
        let inner = Arc::new(Mutex::new(HashSet::new()));

        let state = inner.clone();
        let subscription = router.subscribe(Box::new(move |envelope| {
            if let Envelope::ActiveFiles { files } = envelope {
                *state.lock().expect("active files poisoned") = files.iter().cloned().collect();
            }
            Ok(())
        }));

        Self {
            inner,
            _subscription: subscription,
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.inner
            .lock()
            .expect("active files poisoned")
            .contains(path)
    }

    pub fn files(&self) -> HashSet<String> {
        self.inner.lock().expect("active files poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdeck_protocol::NodeKind;

    #[test]
    fn file_tree_replaces_wholesale() {
        let router = MessageRouter::new();
        let tree = FileTreeProjection::new(&router);

        router.dispatch(
            r#"{"type":"fileTree","tree":[
                {"name":"old.txt","path":"old.txt","type":"file"},
                {"name":"keep","path":"keep","type":"directory","children":[]}
            ]}"#,
        );
        assert_eq!(tree.tree().len(), 2);

        router.dispatch(
            r#"{"type":"fileTree","tree":[{"name":"a.txt","path":"a.txt","type":"file"}]}"#,
        );

        let nodes = tree.tree();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "a.txt");
        assert_eq!(nodes[0].kind, NodeKind::File);
    }

    #[test]
    fn empty_tree_push_clears_the_projection() {
        let router = MessageRouter::new();
        let tree = FileTreeProjection::new(&router);

        router.dispatch(
            r#"{"type":"fileTree","tree":[{"name":"a.txt","path":"a.txt","type":"file"}]}"#,
        );
        router.dispatch(r#"{"type":"fileTree","tree":[]}"#);

        assert!(tree.tree().is_empty());
    }

    #[test]
    fn active_files_replace_wholesale() {
        let router = MessageRouter::new();
        let active = ActiveFilesProjection::new(&router);

        router.dispatch(r#"{"type":"activeFiles","files":["a.txt","b.txt"]}"#);
        assert!(active.contains("a.txt"));
        assert!(active.contains("b.txt"));

        router.dispatch(r#"{"type":"activeFiles","files":["c.txt"]}"#);
        assert!(!active.contains("a.txt"));
        assert!(active.contains("c.txt"));
        assert_eq!(active.files().len(), 1);
    }

    #[test]
    fn duplicate_paths_collapse_into_the_set() {
        let router = MessageRouter::new();
        let active = ActiveFilesProjection::new(&router);

        router.dispatch(r#"{"type":"activeFiles","files":["a.txt","a.txt"]}"#);
        assert_eq!(active.files().len(), 1);
    }
}
