//! Peer session: one framed channel plus a background receive loop

use crate::error::{Result, SessionError};
use crate::event::SessionEvent;
use crate::handler::MessageHandler;
use crate::store::PayloadStore;
use bytes::Bytes;
use peerlink_core::{ChannelError, ChannelState};
use peerlink_network::FramedChannel;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default capacity of the event broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Why a receive loop stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The remote side ended the stream
    PeerClosed,
    /// The channel was closed locally
    Disposed,
    /// A failed send closed the channel while the loop was reading
    SendFailed,
}

/// Receive payloads until the channel ends, handing each one to `handler`
///
/// Handler failures are reported as [`SessionEvent::HandlerFailed`] and do not
/// stop the loop. A clean end of stream or a local close ends the loop with
/// `Ok`; transport failures and oversized inbound frames are returned as errors.
/// The channel is always closed when this returns.
pub async fn run_receive_loop<R, W, H>(
    channel: &FramedChannel<R, W>,
    handler: &H,
    events: &broadcast::Sender<SessionEvent>,
) -> std::result::Result<LoopExit, ChannelError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
    H: MessageHandler + ?Sized,
{
    let outcome = loop {
        let payload = match channel.receive().await {
            Ok(payload) => payload,
            Err(ChannelError::ConnectionClosed) => break Ok(LoopExit::PeerClosed),
            Err(ChannelError::Closed) if channel.close_cause().is_some() => {
                break Ok(LoopExit::SendFailed);
            }
            Err(ChannelError::Closed) => break Ok(LoopExit::Disposed),
            Err(err) => break Err(err),
        };

        let len = payload.len();
        let _ = events.send(SessionEvent::MessageReceived { len });

        if let Err(err) = handler.handle(payload).await {
            warn!(error = %err, len, "message handler failed");
            let _ = events.send(SessionEvent::HandlerFailed {
                error: err.to_string(),
            });
        }
    };

    channel.close().await;

    let reason = match &outcome {
        Ok(LoopExit::PeerClosed) => "peer closed the connection".to_string(),
        Ok(LoopExit::Disposed) => "channel closed locally".to_string(),
        Ok(LoopExit::SendFailed) => format!(
            "send failed: {}",
            channel.close_cause().unwrap_or("unknown cause")
        ),
        Err(err) => err.to_string(),
    };
    info!(%reason, "receive loop stopped");
    let _ = events.send(SessionEvent::Closed { reason });

    outcome
}

/// Owner of a framed channel
///
/// Spawns the receive loop on start and exposes sending, events and shutdown.
/// Sends may be issued from any task while the loop is running.
pub struct PeerSession<R, W> {
    channel: Arc<FramedChannel<R, W>>,
    event_tx: broadcast::Sender<SessionEvent>,
    receiver_handle: Option<JoinHandle<std::result::Result<LoopExit, ChannelError>>>,
}

impl<R, W> PeerSession<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Start a session on `channel`, delivering payloads to `handler`
    pub fn start<H>(channel: FramedChannel<R, W>, handler: H) -> Self
    where
        H: MessageHandler + 'static,
    {
        Self::start_with_capacity(channel, handler, DEFAULT_EVENT_CAPACITY)
    }

    /// Start a session with a custom event channel capacity
    pub fn start_with_capacity<H>(channel: FramedChannel<R, W>, handler: H, capacity: usize) -> Self
    where
        H: MessageHandler + 'static,
    {
        let channel = Arc::new(channel);
        let (event_tx, _) = broadcast::channel(capacity.max(1));

        let loop_channel = channel.clone();
        let loop_events = event_tx.clone();
        let receiver_handle = tokio::spawn(async move {
            run_receive_loop(&loop_channel, &handler, &loop_events).await
        });

        debug!("session started");

        Self {
            channel,
            event_tx,
            receiver_handle: Some(receiver_handle),
        }
    }

    /// Send a text message
    pub async fn send_text(&self, text: &str) -> Result<()> {
        self.send_bytes(Bytes::copy_from_slice(text.as_bytes())).await
    }

    /// Send a raw payload
    pub async fn send_bytes(&self, payload: impl Into<Bytes>) -> Result<()> {
        let payload = payload.into();
        let len = payload.len();

        self.channel.send(payload).await?;

        let _ = self.event_tx.send(SessionEvent::MessageSent { len });
        Ok(())
    }

    /// Load a file through `store` and send its contents as one payload
    ///
    /// Returns the number of payload bytes sent.
    pub async fn send_file(&self, store: &dyn PayloadStore, path: &Path) -> Result<usize> {
        let payload = store.load(path).await?;
        let len = payload.len();

        self.send_bytes(payload).await?;
        info!(path = %path.display(), len, "sent file");

        Ok(len)
    }

    /// Subscribe to session events
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Current channel state
    pub fn state(&self) -> ChannelState {
        self.channel.state()
    }

    /// Underlying channel
    pub fn channel(&self) -> &FramedChannel<R, W> {
        &self.channel
    }

    /// Wait for the receive loop to stop on its own
    ///
    /// Can only be awaited once; later calls return `AlreadyJoined`.
    pub async fn closed(&mut self) -> Result<LoopExit> {
        let handle = self
            .receiver_handle
            .take()
            .ok_or(SessionError::AlreadyJoined)?;

        let outcome = handle
            .await
            .map_err(|e| SessionError::TaskFailed(e.to_string()))?;

        Ok(outcome?)
    }

    /// Close the channel and wait for the receive loop to finish
    pub async fn shutdown(&mut self) -> Result<LoopExit> {
        self.channel.close().await;
        self.closed().await
    }
}

impl<R, W> Drop for PeerSession<R, W> {
    fn drop(&mut self) {
        if let Some(handle) = self.receiver_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::handler::FnHandler;
    use peerlink_network::StreamChannel;
    use tokio::io::{DuplexStream, duplex};
    use tokio::sync::mpsc;

    fn channel_pair() -> (StreamChannel<DuplexStream>, StreamChannel<DuplexStream>) {
        let (a, b) = duplex(64 * 1024);
        (FramedChannel::from_stream(a), FramedChannel::from_stream(b))
    }

    fn collecting() -> (impl MessageHandler + 'static, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler = FnHandler::new(move |payload: Bytes| {
            let tx = tx.clone();
            async move {
                tx.send(payload).unwrap();
                Ok(())
            }
        });
        (handler, rx)
    }

    #[tokio::test]
    async fn test_receive_loop_delivers_in_order() {
        let (a, b) = channel_pair();
        let (handler, mut rx) = collecting();
        let mut session = PeerSession::start(b, handler);

        for msg in ["one", "two", "three"] {
            a.send(msg).await.unwrap();
        }

        assert_eq!(&rx.recv().await.unwrap()[..], b"one");
        assert_eq!(&rx.recv().await.unwrap()[..], b"two");
        assert_eq!(&rx.recv().await.unwrap()[..], b"three");

        assert_eq!(session.shutdown().await.unwrap(), LoopExit::Disposed);
        assert_eq!(session.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn test_peer_close_ends_loop() {
        let (a, b) = channel_pair();
        let (handler, _rx) = collecting();
        let mut session = PeerSession::start(b, handler);
        let mut events = session.subscribe_events();

        a.close().await;

        assert_eq!(session.closed().await.unwrap(), LoopExit::PeerClosed);
        match events.recv().await.unwrap() {
            SessionEvent::Closed { reason } => assert!(reason.contains("peer")),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_handler_failure_keeps_loop_running() {
        let (a, b) = channel_pair();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handler = FnHandler::new(move |payload: Bytes| {
            let tx = tx.clone();
            async move {
                if &payload[..] == b"bad" {
                    return Err(SessionError::Handler("rejected".to_string()));
                }
                tx.send(payload).unwrap();
                Ok(())
            }
        });

        let mut session = PeerSession::start(b, handler);
        let mut events = session.subscribe_events();

        a.send("bad").await.unwrap();
        a.send("good").await.unwrap();

        assert_eq!(&rx.recv().await.unwrap()[..], b"good");
        assert_eq!(events.recv().await.unwrap(), SessionEvent::MessageReceived { len: 3 });
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::HandlerFailed { .. }
        ));
        assert_eq!(events.recv().await.unwrap(), SessionEvent::MessageReceived { len: 4 });

        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_emits_event() {
        let (a, b) = channel_pair();
        let (handler, _rx) = collecting();
        let mut session = PeerSession::start(a, handler);
        let mut events = session.subscribe_events();

        session.send_text("hello").await.unwrap();

        assert_eq!(&b.receive().await.unwrap()[..], b"hello");
        assert_eq!(events.recv().await.unwrap(), SessionEvent::MessageSent { len: 5 });

        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_after_shutdown() {
        let (_a, b) = channel_pair();
        let (handler, _rx) = collecting();
        let mut session = PeerSession::start(b, handler);

        session.shutdown().await.unwrap();

        let result = session.send_text("late").await;
        assert_eq!(
            result.unwrap_err().channel_kind(),
            Some(peerlink_core::ChannelErrorKind::Closed)
        );
    }

    #[tokio::test]
    async fn test_send_failure_reported_by_loop() {
        // 读方向的对端保持存活，写方向的对端已断开
        let (read_local, _read_remote) = duplex(1024);
        let (write_local, write_remote) = duplex(1024);
        drop(write_remote);

        let channel = FramedChannel::new(read_local, write_local);
        let (handler, _rx) = collecting();
        let mut session = PeerSession::start(channel, handler);
        let mut events = session.subscribe_events();

        let result = session.send_text("hello").await;
        assert_eq!(
            result.unwrap_err().channel_kind(),
            Some(peerlink_core::ChannelErrorKind::TransportFailure)
        );

        assert_eq!(session.closed().await.unwrap(), LoopExit::SendFailed);
        match events.recv().await.unwrap() {
            SessionEvent::Closed { reason } => assert!(reason.starts_with("send failed")),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_twice() {
        let (_a, b) = channel_pair();
        let (handler, _rx) = collecting();
        let mut session = PeerSession::start(b, handler);

        session.shutdown().await.unwrap();
        assert!(matches!(
            session.closed().await,
            Err(SessionError::AlreadyJoined)
        ));
    }

    #[tokio::test]
    async fn test_inbound_frame_too_large_is_error() {
        use peerlink_config::ChannelConfig;
        use tokio::io::AsyncWriteExt;

        let (mut raw, local) = duplex(1024);
        let config = ChannelConfig::default().with_max_frame_length(16);
        let channel = FramedChannel::from_stream_with_config(local, &config);
        let (handler, _rx) = collecting();
        let mut session = PeerSession::start(channel, handler);

        raw.write_all(&1000u32.to_le_bytes()).await.unwrap();

        let result = session.closed().await;
        assert_eq!(
            result.unwrap_err().channel_kind(),
            Some(peerlink_core::ChannelErrorKind::FrameTooLarge)
        );
    }
}
