//! # PeerLink Session
//!
//! Owner-side layer on top of PeerLink framed channels.
//!
//! ## Features
//!
//! - Background receive loop feeding a [`MessageHandler`]
//! - Text / file dispatch driven by out-of-band announcements
//! - File adapters for sending and saving payloads
//! - Session events over a broadcast channel
//! - TCP listener and connector configured by [`PeerConfig`](peerlink_config::PeerConfig)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use peerlink_config::PeerConfig;
//! use peerlink_session::{FnHandler, PeerSession, connect};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PeerConfig::default().with_remote_address("127.0.0.1:50001");
//!     let channel = connect(&config).await?;
//!
//!     let handler = FnHandler::new(|payload: Bytes| async move {
//!         println!("received {} bytes", payload.len());
//!         Ok(())
//!     });
//!     let mut session = PeerSession::start(channel, handler);
//!
//!     session.send_text("hello").await?;
//!     session.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod handler;
pub mod session;
pub mod store;

pub use connection::{PeerListener, connect};
pub use dispatch::{PayloadKind, SequencedHandler};
pub use error::{Result, SessionError};
pub use event::SessionEvent;
pub use handler::{FnHandler, MessageHandler, StoreHandler, TextHandler};
pub use session::{DEFAULT_EVENT_CAPACITY, LoopExit, PeerSession, run_receive_loop};
pub use store::{FsPayloadStore, PayloadStore};

/// Prelude
pub mod prelude {
    pub use crate::connection::{PeerListener, connect};
    pub use crate::dispatch::{PayloadKind, SequencedHandler};
    pub use crate::error::{Result, SessionError};
    pub use crate::event::SessionEvent;
    pub use crate::handler::{FnHandler, MessageHandler, StoreHandler, TextHandler};
    pub use crate::session::{LoopExit, PeerSession};
    pub use crate::store::{FsPayloadStore, PayloadStore};
}
