//! Session integration tests over loopback TCP

use bytes::Bytes;
use peerlink_config::PeerConfig;
use peerlink_session::{
    FnHandler, FsPayloadStore, LoopExit, PayloadKind, PeerListener, PeerSession, SequencedHandler,
    SessionEvent, StoreHandler, TextHandler, connect,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn loopback_config() -> PeerConfig {
    PeerConfig::default()
        .with_bind_address("127.0.0.1")
        .with_port(0)
}

#[tokio::test]
async fn test_text_then_file_between_peers() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("photo.jpg");
    let image: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    tokio::fs::write(&source, &image).await.unwrap();

    let listener = PeerListener::bind(loopback_config()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = loopback_config()
        .with_remote_address(addr.to_string())
        .with_save_dir(dir.path().join("inbox"));

    let (accepted, connected) = tokio::join!(listener.accept(), connect(&config));
    let (receiver_channel, _) = accepted.unwrap();
    let sender_channel = connected.unwrap();

    // Receiving side: text goes to an mpsc, files go to the inbox
    let (text_tx, mut text_rx) = mpsc::unbounded_channel();
    let (saved_tx, mut saved_rx) = mpsc::unbounded_channel();

    let text = Arc::new(TextHandler::new(move |text: String| {
        let text_tx = text_tx.clone();
        async move {
            text_tx.send(text).unwrap();
            Ok(())
        }
    }));
    let file = Arc::new(
        StoreHandler::new(Arc::new(FsPayloadStore::from_config(&config))).on_saved(move |path| {
            saved_tx.send(path).unwrap();
        }),
    );
    let dispatcher = Arc::new(SequencedHandler::new(text, file));
    let mut receiver = PeerSession::start(receiver_channel, dispatcher.clone());

    let mut sender = PeerSession::start(
        sender_channel,
        FnHandler::new(|_payload: Bytes| async { Ok(()) }),
    );

    sender.send_text("here comes a picture").await.unwrap();
    assert_eq!(text_rx.recv().await.unwrap(), "here comes a picture");

    dispatcher.expect(PayloadKind::File);
    let store = FsPayloadStore::from_config(&config);
    let sent = sender.send_file(&store, &source).await.unwrap();
    assert_eq!(sent, image.len());

    let saved = saved_rx.recv().await.unwrap();
    assert_eq!(saved, config.received_file_path());
    assert_eq!(tokio::fs::read(&saved).await.unwrap(), image);

    sender.send_text("did you get it?").await.unwrap();
    assert_eq!(text_rx.recv().await.unwrap(), "did you get it?");

    assert_eq!(sender.shutdown().await.unwrap(), LoopExit::Disposed);
    let exit = tokio::time::timeout(Duration::from_secs(2), receiver.closed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit, LoopExit::PeerClosed);
}

#[tokio::test]
async fn test_event_stream() {
    let listener = PeerListener::bind(loopback_config()).await.unwrap();
    let config = loopback_config().with_remote_address(listener.local_addr().unwrap().to_string());

    let (accepted, connected) = tokio::join!(listener.accept(), connect(&config));
    let (remote, _) = accepted.unwrap();

    let mut session = PeerSession::start(
        connected.unwrap(),
        FnHandler::new(|_payload: Bytes| async { Ok(()) }),
    );
    let mut events = session.subscribe_events();

    session.send_text("ping").await.unwrap();
    remote.send("pong!").await.unwrap();

    assert_eq!(events.recv().await.unwrap(), SessionEvent::MessageSent { len: 4 });
    assert_eq!(events.recv().await.unwrap(), SessionEvent::MessageReceived { len: 5 });

    session.shutdown().await.unwrap();
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::Closed { .. }
    ));
}

#[tokio::test]
async fn test_file_replaces_previous() {
    let dir = tempfile::tempdir().unwrap();
    let listener = PeerListener::bind(loopback_config()).await.unwrap();
    let config = loopback_config()
        .with_remote_address(listener.local_addr().unwrap().to_string())
        .with_save_dir(dir.path());

    let (accepted, connected) = tokio::join!(listener.accept(), connect(&config));
    let (receiver_channel, _) = accepted.unwrap();
    let sender = connected.unwrap();

    let (saved_tx, mut saved_rx) = mpsc::unbounded_channel();
    let handler = StoreHandler::new(Arc::new(FsPayloadStore::from_config(&config))).on_saved(
        move |path| {
            saved_tx.send(path).unwrap();
        },
    );
    let mut receiver = PeerSession::start(receiver_channel, handler);

    sender.send("first, longer payload").await.unwrap();
    saved_rx.recv().await.unwrap();
    sender.send("second").await.unwrap();
    let path = saved_rx.recv().await.unwrap();

    assert_eq!(tokio::fs::read(&path).await.unwrap(), b"second");
    receiver.shutdown().await.unwrap();
}
