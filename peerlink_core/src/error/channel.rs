//! 帧通道错误类型
//!
//! 定义 `send` / `receive` 可能返回的全部错误。

use std::io;
use thiserror::Error;

/// 帧通道错误
#[derive(Error, Debug)]
pub enum ChannelError {
    /// 底层流读写失败，不会自动重试
    #[error("传输失败: {0}")]
    TransportFailure(#[source] io::Error),

    /// 对端或本端关闭了流，属于正常的会话结束信号
    #[error("连接已关闭")]
    ConnectionClosed,

    /// 通道已被释放后仍尝试读写
    #[error("通道已关闭")]
    Closed,

    /// 发送的负载超出长度前缀可表示的范围（或配置上限）
    #[error("消息过大: {len} 字节 (上限 {max} 字节)")]
    OversizedMessage {
        /// 负载长度
        len: usize,
        /// 允许的最大长度
        max: u32,
    },

    /// 收到的长度前缀超出配置上限
    #[error("帧过大: {len} 字节 (上限 {max} 字节)")]
    FrameTooLarge {
        /// 前缀声明的长度
        len: u32,
        /// 允许的最大长度
        max: u32,
    },
}

impl ChannelError {
    /// 获取错误类型
    pub fn kind(&self) -> ChannelErrorKind {
        match self {
            ChannelError::TransportFailure(_) => ChannelErrorKind::TransportFailure,
            ChannelError::ConnectionClosed => ChannelErrorKind::ConnectionClosed,
            ChannelError::Closed => ChannelErrorKind::Closed,
            ChannelError::OversizedMessage { .. } => ChannelErrorKind::OversizedMessage,
            ChannelError::FrameTooLarge { .. } => ChannelErrorKind::FrameTooLarge,
        }
    }

    /// 该错误发生后通道是否不可再用
    ///
    /// 只有 `OversizedMessage` 在写入任何字节前被拒绝，通道仍然可用。
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChannelError::OversizedMessage { .. })
    }

    /// 是否为正常的会话结束信号
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, ChannelError::ConnectionClosed)
    }

    /// 创建传输失败错误
    pub fn transport(err: io::Error) -> Self {
        ChannelError::TransportFailure(err)
    }
}

impl From<io::Error> for ChannelError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => ChannelError::ConnectionClosed,
            _ => ChannelError::TransportFailure(err),
        }
    }
}

/// 通道错误类型（不携带负载，可复制）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelErrorKind {
    /// 传输失败
    TransportFailure,
    /// 连接关闭
    ConnectionClosed,
    /// 通道已关闭
    Closed,
    /// 消息过大
    OversizedMessage,
    /// 帧过大
    FrameTooLarge,
}
