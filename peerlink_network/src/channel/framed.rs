//! 帧通道
//!
//! 包装一对字节流读写句柄，对外提供按消息收发的接口。

use crate::channel::metrics::ChannelMetrics;
use crate::channel::state::StateCell;
use crate::protocol::{Frame, FrameDecoder, FrameEncoder};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use peerlink_config::ChannelConfig;
use peerlink_core::{ChannelError, ChannelState, Result};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// 基于 TCP 连接的帧通道
pub type TcpChannel = FramedChannel<OwnedReadHalf, OwnedWriteHalf>;

/// 基于单个双向流拆分得到的帧通道
pub type StreamChannel<S> = FramedChannel<ReadHalf<S>, WriteHalf<S>>;

/// 帧通道
///
/// 独占一个读句柄和一个写句柄，直到连接关闭或被显式释放。
///
/// - 每个方向各有一把异步锁，同方向的并发调用按到达顺序串行执行
/// - `send` / `receive` 只需要 `&self`，可以通过 `Arc` 在读任务和写任务之间共享
/// - `close` 会让挂起中的读写立即以 `ChannelError::Closed` 返回
pub struct FramedChannel<R, W> {
    /// 读方向，释放后为 `None`
    reader: Mutex<Option<FramedRead<R, FrameDecoder>>>,
    /// 写方向，释放后为 `None`
    writer: Mutex<Option<FramedWrite<W, FrameEncoder>>>,
    /// 与解码器共享的状态
    state: StateCell,
    /// 关闭信号
    shutdown: CancellationToken,
    /// 收发统计
    metrics: ChannelMetrics,
    /// 因错误关闭时的原因，主动关闭时为空
    close_cause: OnceLock<String>,
    /// 单帧上限
    max_frame_length: u32,
    /// 写端优雅关闭的等待时间
    shutdown_grace: Duration,
}

impl<R, W> FramedChannel<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// 使用默认配置创建通道
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, &ChannelConfig::default())
    }

    /// 使用指定配置创建通道
    pub fn with_config(reader: R, writer: W, config: &ChannelConfig) -> Self {
        let state = StateCell::new();

        let decoder = FrameDecoder::with_max_frame_length(config.max_frame_length)
            .with_progress(state.clone());
        let encoder = FrameEncoder::with_max_frame_length(config.max_frame_length);

        let reader = FramedRead::with_capacity(reader, decoder, config.read_buffer_size);
        let mut writer = FramedWrite::new(writer, encoder);
        writer.set_backpressure_boundary(config.write_buffer_size);

        Self {
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            state,
            shutdown: CancellationToken::new(),
            metrics: ChannelMetrics::new(),
            close_cause: OnceLock::new(),
            max_frame_length: config.max_frame_length,
            shutdown_grace: config.shutdown_grace(),
        }
    }

    /// 发送一条消息
    ///
    /// 写入 `长度前缀 || 负载` 并刷新，直到传输层接受全部字节才返回。
    /// 负载超限时返回 `OversizedMessage`，此时没有任何字节被写入，通道仍可用。
    /// 其他失败都会关闭通道。
    pub async fn send(&self, payload: impl Into<Bytes>) -> Result<()> {
        let payload = payload.into();
        let len = payload.len();

        self.ensure_open()?;
        Frame::length_prefix(len, self.max_frame_length)?;

        let mut guard = self.writer.lock().await;
        // 等锁期间通道可能已被关闭
        self.ensure_open()?;
        let Some(writer) = guard.as_mut() else {
            return Err(ChannelError::Closed);
        };

        let result = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(ChannelError::Closed),
            result = writer.send(payload) => result,
        };

        match result {
            Ok(()) => {
                self.metrics.record_sent(len);
                trace!(len, "已发送帧");
                Ok(())
            }
            Err(err) => {
                // 写缓冲里可能残留半帧，写端不能再用
                guard.take();
                drop(guard);
                self.terminate(&err).await;
                Err(err)
            }
        }
    }

    /// 接收下一条消息
    ///
    /// 先等待 4 字节长度前缀，再等待对应长度的负载。流在任一阶段结束都返回
    /// `ConnectionClosed`，不会返回残缺的消息。可以在循环中反复调用。
    pub async fn receive(&self) -> Result<Bytes> {
        self.ensure_open()?;

        let mut guard = self.reader.lock().await;
        self.ensure_open()?;
        let Some(reader) = guard.as_mut() else {
            return Err(ChannelError::Closed);
        };

        self.state.transition(ChannelState::AwaitingLengthPrefix);

        let result = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(ChannelError::Closed),
            next = reader.next() => next.unwrap_or(Err(ChannelError::ConnectionClosed)),
        };

        match result {
            Ok(payload) => {
                self.state.transition(ChannelState::Idle);
                self.metrics.record_received(payload.len());
                trace!(len = payload.len(), "已接收帧");
                Ok(payload)
            }
            Err(err) => {
                guard.take();
                drop(guard);
                self.terminate(&err).await;
                Err(err)
            }
        }
    }

    /// 释放通道
    ///
    /// 唤醒挂起中的读写，优雅关闭写端并释放两个句柄。可以重复调用。
    pub async fn close(&self) {
        if self.state.close() {
            debug!("通道被主动关闭");
        }
        self.shutdown.cancel();
        self.release().await;
    }

    /// 当前状态
    pub fn state(&self) -> ChannelState {
        self.state.get()
    }

    /// 是否已关闭
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// 收发统计
    pub fn metrics(&self) -> &ChannelMetrics {
        &self.metrics
    }

    /// 单帧上限
    pub fn max_frame_length(&self) -> u32 {
        self.max_frame_length
    }

    /// 通道因错误关闭时的原因
    ///
    /// 由 `close` 主动关闭或尚未关闭时返回 `None`。
    pub fn close_cause(&self) -> Option<&str> {
        self.close_cause.get().map(String::as_str)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.is_closed() {
            return Err(ChannelError::Closed);
        }
        Ok(())
    }

    /// 因错误进入终态
    async fn terminate(&self, cause: &ChannelError) {
        // 原因先于状态写入，看到 Closed 的读方总能取到原因
        if !self.state.is_closed() && !matches!(cause, ChannelError::Closed) {
            let _ = self.close_cause.set(cause.to_string());
        }
        if self.state.close() {
            match cause {
                ChannelError::ConnectionClosed => debug!("对端关闭了连接"),
                ChannelError::Closed => debug!("通道已关闭"),
                err => warn!(error = %err, "通道因错误关闭"),
            }
        }
        self.shutdown.cancel();
        self.release().await;
    }

    /// 释放两个句柄
    ///
    /// 调用前必须已触发关闭信号，否则可能等待挂起中的读写。
    async fn release(&self) {
        drop(self.reader.lock().await.take());

        let writer = self.writer.lock().await.take();
        if let Some(writer) = writer {
            let mut inner = writer.into_inner();
            match tokio::time::timeout(self.shutdown_grace, inner.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => debug!(error = %err, "关闭写端失败"),
                Err(_) => debug!("关闭写端超时"),
            }
        }
    }
}

impl TcpChannel {
    /// 从已建立的 TCP 连接创建通道
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self::from_tcp_with_config(stream, &ChannelConfig::default())
    }

    /// 从已建立的 TCP 连接按配置创建通道
    pub fn from_tcp_with_config(stream: TcpStream, config: &ChannelConfig) -> Self {
        let (reader, writer) = stream.into_split();
        Self::with_config(reader, writer, config)
    }
}

impl<S> StreamChannel<S>
where
    S: AsyncRead + AsyncWrite + Send,
{
    /// 从单个双向流创建通道
    pub fn from_stream(stream: S) -> Self {
        Self::from_stream_with_config(stream, &ChannelConfig::default())
    }

    /// 从单个双向流按配置创建通道
    pub fn from_stream_with_config(stream: S, config: &ChannelConfig) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self::with_config(reader, writer, config)
    }
}

impl<R, W> Drop for FramedChannel<R, W> {
    fn drop(&mut self) {
        self.state.close();
        self.shutdown.cancel();
    }
}

impl<R, W> fmt::Debug for FramedChannel<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramedChannel")
            .field("state", &self.state.get())
            .field("max_frame_length", &self.max_frame_length)
            .field("frames_sent", &self.metrics.frames_sent())
            .field("frames_received", &self.metrics.frames_received())
            .finish()
    }
}
