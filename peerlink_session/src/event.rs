//! Session events

/// Session event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A payload was handed to the transport
    MessageSent { len: usize },

    /// A payload was received and passed to the handler
    MessageReceived { len: usize },

    /// The handler rejected a payload; the loop keeps running
    HandlerFailed { error: String },

    /// The receive loop stopped and the channel was released
    Closed { reason: String },
}
