//! Out-of-band payload interpretation
//!
//! Frames carry no type tag, so both peers have to agree on what the next
//! payload means. [`SequencedHandler`] keeps a queue of expected kinds: the
//! owner calls [`SequencedHandler::expect`] before the matching payload arrives,
//! and anything unannounced is treated as text.

use crate::error::Result;
use crate::handler::MessageHandler;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// How the next payload should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadKind {
    /// UTF-8 text message
    #[default]
    Text,
    /// File contents
    File,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadKind::Text => write!(f, "text"),
            PayloadKind::File => write!(f, "file"),
        }
    }
}

/// Routes payloads to a text or file handler according to announced kinds
pub struct SequencedHandler {
    text: Arc<dyn MessageHandler>,
    file: Arc<dyn MessageHandler>,
    expected: Mutex<VecDeque<PayloadKind>>,
}

impl SequencedHandler {
    /// Create a dispatcher over a text handler and a file handler
    pub fn new(text: Arc<dyn MessageHandler>, file: Arc<dyn MessageHandler>) -> Self {
        Self {
            text,
            file,
            expected: Mutex::new(VecDeque::new()),
        }
    }

    /// Announce the kind of an upcoming payload
    ///
    /// Announcements are consumed in order, one per payload.
    pub fn expect(&self, kind: PayloadKind) {
        self.queue().push_back(kind);
    }

    /// Number of announcements not yet consumed
    pub fn pending(&self) -> usize {
        self.queue().len()
    }

    fn next_kind(&self) -> PayloadKind {
        self.queue().pop_front().unwrap_or_default()
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<PayloadKind>> {
        self.expected.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MessageHandler for SequencedHandler {
    async fn handle(&self, payload: Bytes) -> Result<()> {
        let kind = self.next_kind();
        debug!(%kind, len = payload.len(), "dispatching payload");

        match kind {
            PayloadKind::Text => self.text.handle(payload).await,
            PayloadKind::File => self.file.handle(payload).await,
        }
    }
}
