//! 消息帧
//!
//! 定义网络消息的帧格式。

use bytes::{Buf, BufMut, Bytes, BytesMut};
use peerlink_core::{ChannelError, Result};
use std::fmt;
use std::str::Utf8Error;

/// 消息帧
///
/// 采用 Length-Prefix-Message 格式，长度为小端序 u32，只描述负载本身：
///
/// ```text
/// +--------+-----------------+
/// | Length |     Payload     |
/// | 4 bytes| `Length` bytes  |
/// +--------+-----------------+
/// ```
///
/// 协议层不区分文本帧和二进制帧，两者在线路上完全相同。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    /// 消息负载
    pub payload: Bytes,
}

impl Frame {
    /// 长度前缀大小
    pub const LENGTH_SIZE: usize = 4;

    /// 长度前缀可表示的最大负载
    pub const MAX_PAYLOAD_SIZE: u32 = u32::MAX;

    /// 创建新的消息帧
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// 创建空负载帧
    pub fn empty() -> Self {
        Self::default()
    }

    /// 以 UTF-8 编码的文本创建帧
    pub fn text(text: &str) -> Self {
        Self::new(Bytes::copy_from_slice(text.as_bytes()))
    }

    /// 负载长度
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// 负载是否为空
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// 按 UTF-8 解释负载
    pub fn as_text(&self) -> std::result::Result<&str, Utf8Error> {
        std::str::from_utf8(&self.payload)
    }

    /// 取出负载
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// 计算完整帧大小（包含长度前缀）
    pub fn frame_size(&self) -> usize {
        Self::LENGTH_SIZE + self.payload.len()
    }

    /// 校验负载长度并返回长度前缀
    ///
    /// 超过 `max`（以及 u32 范围）时返回 `OversizedMessage`。
    pub fn length_prefix(len: usize, max: u32) -> Result<u32> {
        match u32::try_from(len) {
            Ok(prefix) if prefix <= max => Ok(prefix),
            _ => Err(ChannelError::OversizedMessage { len, max }),
        }
    }

    /// 编码帧为字节流
    pub fn encode(&self) -> Result<BytesMut> {
        let prefix = Self::length_prefix(self.payload.len(), Self::MAX_PAYLOAD_SIZE)?;
        let mut buf = BytesMut::with_capacity(self.frame_size());

        buf.put_u32_le(prefix);
        buf.extend_from_slice(&self.payload);

        Ok(buf)
    }

    /// 从缓冲区头部解码一个完整的帧
    ///
    /// 数据不足时返回 `Ok(None)` 且不消耗任何字节。
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>> {
        if buf.len() < Self::LENGTH_SIZE {
            return Ok(None);
        }

        let len = Self::peek_length(buf) as usize;
        if buf.len() - Self::LENGTH_SIZE < len {
            return Ok(None);
        }

        buf.advance(Self::LENGTH_SIZE);
        let payload = buf.split_to(len).freeze();

        Ok(Some(Self { payload }))
    }

    /// 读取缓冲区头部的长度前缀，不消耗字节
    ///
    /// 调用方需保证缓冲区至少有 `LENGTH_SIZE` 字节。
    pub(crate) fn peek_length(buf: &[u8]) -> u32 {
        let mut prefix = [0u8; Self::LENGTH_SIZE];
        prefix.copy_from_slice(&buf[..Self::LENGTH_SIZE]);
        u32::from_le_bytes(prefix)
    }
}

impl From<Bytes> for Frame {
    fn from(payload: Bytes) -> Self {
        Self { payload }
    }
}

impl From<Frame> for Bytes {
    fn from(frame: Frame) -> Self {
        frame.payload
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame[payload_len={}]", self.payload.len())
    }
}
