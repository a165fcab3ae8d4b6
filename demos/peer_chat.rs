//! PeerLink 点对点聊天示例
//!
//! 在同一进程里启动两个对端：一端监听，一端连接。连接方先发一条文本，
//! 再发送一张图片，接收方按约定把第二条消息当作文件保存到临时目录。
//!
//! ## 运行方式
//!
//! ```bash
//! cargo run --example peer_chat
//! ```
//!
//! 设置 `RUST_LOG=debug` 可以看到通道层的详细日志。

use bytes::Bytes;
use peerlink::logging::{LogFormat, init_logging};
use peerlink::prelude::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> peerlink::Result<()> {
    init_logging(2, LogFormat::Text)?;

    println!("╔═════════════════════════════════════════╗");
    println!("║   PeerLink 点对点聊天示例               ║");
    println!("╚═════════════════════════════════════════╝\n");

    let workdir = tempfile::tempdir()?;
    let image_path = workdir.path().join("sunset.png");
    let image: Vec<u8> = (0..64 * 1024u32).map(|i| (i * 7 % 256) as u8).collect();
    tokio::fs::write(&image_path, &image).await?;

    // 接收方配置：只监听本机，文件保存到临时目录
    let listen_config = PeerConfig::default()
        .with_bind_address("127.0.0.1")
        .with_port(0)
        .with_save_dir(workdir.path().join("inbox"));
    listen_config.validate()?;
    println!("{}", listen_config.summary());

    let listener = PeerListener::bind(listen_config.clone()).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "接收方开始监听");
    println!("👂 接收方监听于 {}", addr);

    let connect_config = PeerConfig::default().with_remote_address(addr.to_string());
    let (accepted, connected) = tokio::join!(listener.accept(), connect(&connect_config));
    let (inbound, peer_addr) = accepted?;
    let outbound = connected?;
    println!("🔗 已建立连接: {}\n", peer_addr);

    // 接收方：文本打印出来，文件交给 StoreHandler 保存
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let text_done = done_tx.clone();
    let text = Arc::new(TextHandler::new(move |text: String| {
        let text_done = text_done.clone();
        async move {
            println!("💬 收到文本: {}", text);
            let _ = text_done.send(());
            Ok(())
        }
    }));
    let file = Arc::new(
        StoreHandler::new(Arc::new(FsPayloadStore::from_config(&listen_config))).on_saved(
            move |path| {
                println!("🖼  收到文件，已保存到 {}", path.display());
                let _ = done_tx.send(());
            },
        ),
    );
    let dispatcher = Arc::new(SequencedHandler::new(text, file));
    let mut receiver = PeerSession::start_with_capacity(
        inbound,
        dispatcher.clone(),
        listen_config.event_capacity,
    );

    let mut events = receiver.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::MessageReceived { len } => println!("📨 事件: 收到消息 ({} 字节)", len),
                SessionEvent::MessageSent { len } => println!("📤 事件: 发送消息 ({} 字节)", len),
                SessionEvent::HandlerFailed { error } => println!("❌ 事件: 处理失败 - {}", error),
                SessionEvent::Closed { reason } => {
                    println!("📡 事件: 会话结束 - {}", reason);
                    break;
                }
            }
        }
    });

    // 发送方不关心收到的内容
    let mut sender = PeerSession::start(
        outbound,
        FnHandler::new(|_payload: Bytes| async { Ok(()) }),
    );

    sender.send_text("你好，马上给你发一张图片").await?;
    let _ = done_rx.recv().await;

    dispatcher.expect(PayloadKind::File);
    let store = FsPayloadStore::from_config(&connect_config);
    let sent = sender.send_file(&store, &image_path).await?;
    println!("📤 已发送文件 {} 字节", sent);
    let _ = done_rx.recv().await;

    let saved = tokio::fs::read(listen_config.received_file_path()).await?;
    println!("✓ 文件内容一致: {}\n", saved == image);

    // 发送方关闭后，接收方的接收循环会看到对端关闭
    sender.shutdown().await?;
    let exit = receiver.closed().await?;
    info!(?exit, "接收循环退出");
    println!("🔚 接收循环退出: {:?}", exit);

    let _ = event_task.await;
    Ok(())
}
