//! 消息编解码器
//!
//! 提供流式消息的编解码功能，供 `FramedRead` / `FramedWrite` 使用。

use crate::channel::state::StateCell;
use crate::protocol::frame::Frame;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use peerlink_config::ChannelConfig;
use peerlink_core::{ChannelError, ChannelState};
use tokio_util::codec::{Decoder, Encoder};

/// 单次为未到达的消息体预留的最大缓冲
const MAX_RESERVE: usize = 64 * 1024;

/// 解码进度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// 等待长度前缀
    Head,
    /// 已读前缀，等待指定长度的消息体
    Body(usize),
}

/// 消息编码器
///
/// 将负载编码为 `长度前缀 || 负载`
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    max_frame_length: u32,
}

impl FrameEncoder {
    /// 创建新的编码器
    pub fn new() -> Self {
        Self::with_max_frame_length(Frame::MAX_PAYLOAD_SIZE)
    }

    /// 使用指定的单帧上限创建编码器
    pub fn with_max_frame_length(max_frame_length: u32) -> Self {
        Self { max_frame_length }
    }

    /// 单帧上限
    pub fn max_frame_length(&self) -> u32 {
        self.max_frame_length
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<Bytes> for FrameEncoder {
    type Error = ChannelError;

    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        // 先校验，失败时不向缓冲区写入任何字节
        let prefix = Frame::length_prefix(payload.len(), self.max_frame_length)?;

        dst.reserve(Frame::LENGTH_SIZE + payload.len());
        dst.put_u32_le(prefix);
        dst.extend_from_slice(&payload);

        Ok(())
    }
}

impl Encoder<Frame> for FrameEncoder {
    type Error = ChannelError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<Bytes>>::encode(self, item.payload, dst)
    }
}

/// 消息解码器
///
/// 从字节流中恢复消息边界，跨多次读取保留解码进度。
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    state: DecodeState,
    max_frame_length: u32,
    progress: StateCell,
}

impl FrameDecoder {
    /// 创建新的解码器
    pub fn new() -> Self {
        Self::with_max_frame_length(Frame::MAX_PAYLOAD_SIZE)
    }

    /// 使用指定的单帧上限创建解码器
    pub fn with_max_frame_length(max_frame_length: u32) -> Self {
        Self {
            state: DecodeState::Head,
            max_frame_length,
            progress: StateCell::new(),
        }
    }

    /// 将解码进度同步到外部状态单元
    pub fn with_progress(mut self, progress: StateCell) -> Self {
        self.progress = progress;
        self
    }

    /// 单帧上限
    pub fn max_frame_length(&self) -> u32 {
        self.max_frame_length
    }

    /// 是否处于两帧之间
    pub fn is_between_frames(&self) -> bool {
        self.state == DecodeState::Head
    }

    fn decode_head(&mut self, src: &mut BytesMut) -> Result<Option<usize>, ChannelError> {
        if src.len() < Frame::LENGTH_SIZE {
            return Ok(None);
        }

        let len = src.get_u32_le();
        if len > self.max_frame_length {
            return Err(ChannelError::FrameTooLarge {
                len,
                max: self.max_frame_length,
            });
        }

        self.progress.transition(ChannelState::AwaitingBody);
        Ok(Some(len as usize))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameDecoder {
    type Item = Bytes;
    type Error = ChannelError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let len = match self.state {
            DecodeState::Head => match self.decode_head(src)? {
                Some(len) => {
                    self.state = DecodeState::Body(len);
                    len
                }
                None => return Ok(None),
            },
            DecodeState::Body(len) => len,
        };

        if src.len() < len {
            src.reserve((len - src.len()).min(MAX_RESERVE));
            return Ok(None);
        }

        self.state = DecodeState::Head;
        self.progress.transition(ChannelState::Idle);

        Ok(Some(src.split_to(len).freeze()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(payload) => Ok(Some(payload)),
            // 两帧之间干净地结束
            None if src.is_empty() && self.is_between_frames() => Ok(None),
            // 前缀或消息体只收到一部分，不返回残缺消息
            None => Err(ChannelError::ConnectionClosed),
        }
    }
}

/// 编解码器组合
///
/// 同时提供编码和解码功能
#[derive(Debug, Clone, Default)]
pub struct FrameCodec {
    encoder: FrameEncoder,
    decoder: FrameDecoder,
}

impl FrameCodec {
    /// 创建新的编解码器
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用通道配置创建编解码器
    pub fn from_config(config: &ChannelConfig) -> Self {
        Self::with_max_frame_length(config.max_frame_length)
    }

    /// 使用指定的单帧上限创建编解码器
    pub fn with_max_frame_length(max_frame_length: u32) -> Self {
        Self {
            encoder: FrameEncoder::with_max_frame_length(max_frame_length),
            decoder: FrameDecoder::with_max_frame_length(max_frame_length),
        }
    }

    /// 拆分为独立的编码器和解码器
    pub fn split(self) -> (FrameEncoder, FrameDecoder) {
        (self.encoder, self.decoder)
    }

    /// 获取编码器引用
    pub fn encoder(&mut self) -> &mut FrameEncoder {
        &mut self.encoder
    }

    /// 获取解码器引用
    pub fn decoder(&mut self) -> &mut FrameDecoder {
        &mut self.decoder
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = ChannelError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        Encoder::<Bytes>::encode(&mut self.encoder, item, dst)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ChannelError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        Encoder::<Bytes>::encode(&mut self.encoder, item.payload, dst)
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = ChannelError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.decoder.decode(src)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.decoder.decode_eof(src)
    }
}
