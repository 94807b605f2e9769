//! Current-file projection
//!
//! Tracks which file the viewer has open and its content. Selection comes
//! from two directions: a local intent (`select`) and backend-driven
//! navigation (`selectFile`, or an unsolicited `fileContent` push). Content
//! is momentarily stale between selection and the matching `fileContent`
//! frame; that window is intentional.

use std::sync::{Arc, Mutex};

use tracing::debug;

use agentdeck_protocol::{CurrentFile, Envelope};

use crate::commands;
use crate::error::SessionError;
use crate::router::{MessageRouter, Subscription};

#[derive(Default)]
struct Inner {
    file: Option<CurrentFile>,
    content: String,
}

pub struct CurrentFileProjection {
    inner: Arc<Mutex<Inner>>,
    router: Arc<MessageRouter>,
    _subscription: Subscription,
}

impl CurrentFileProjection {
    pub fn new(router: &Arc<MessageRouter>) -> Self {
        let inner = Arc::new(Mutex::new(Inner::default()));

        let state = inner.clone();
        let send_router = router.clone();
        let subscription = router.subscribe(Box::new(move |envelope| {
            match envelope {
                Envelope::FileContent { path, content } => {
                    let mut inner = state.lock().expect("current file poisoned");
                    match &inner.file {
                        Some(file) if file.path == *path => {
                            inner.content = content.clone();
                        }
                        Some(file) => {
                            debug!(
                                component = "current_file",
                                event = "file_content.path_mismatch",
                                selected = %file.path,
                                received = %path,
                                "Dropping file content for a non-selected path"
                            );
                        }
                        // Unsolicited push: the backend drives navigation.
                        None => {
                            inner.file = Some(CurrentFile::from_path(path));
                            inner.content = content.clone();
                        }
                    }
                }
                Envelope::SelectFile { path } => {
                    {
                        let mut inner = state.lock().expect("current file poisoned");
                        inner.file = Some(CurrentFile::from_path(path));
                        inner.content.clear();
                    }
                    send_router.send(&commands::file_content_request(path))?;
                }
                _ => {}
            }
            Ok(())
        }));

        Self {
            inner,
            router: router.clone(),
            _subscription: subscription,
        }
    }

    /// Local selection intent: adopt the path and request its content.
    ///
    /// The selection sticks even when the request fails; the caller surfaces
    /// the failed operation and may retry by selecting again.
    pub fn select(&self, path: &str) -> Result<(), SessionError> {
        {
            let mut inner = self.inner.lock().expect("current file poisoned");
            inner.file = Some(CurrentFile::from_path(path));
            inner.content.clear();
        }
        self.router.send(&commands::file_content_request(path))
    }

    pub fn file(&self) -> Option<CurrentFile> {
        self.inner
            .lock()
            .expect("current file poisoned")
            .file
            .clone()
    }

    pub fn content(&self) -> String {
        self.inner
            .lock()
            .expect("current file poisoned")
            .content
            .clone()
    }
}
