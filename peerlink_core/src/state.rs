//! 通道状态
//!
//! 读方向的状态机：
//!
//! ```text
//! Idle -> AwaitingLengthPrefix -> AwaitingBody -> Idle
//!   \               \                  \
//!    +---------------+------------------+--> Closed (终态)
//! ```

use std::fmt;

/// 帧通道状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ChannelState {
    /// 空闲，没有进行中的读取
    #[default]
    Idle = 0,
    /// 等待 4 字节长度前缀
    AwaitingLengthPrefix = 1,
    /// 已读到前缀，等待消息体
    AwaitingBody = 2,
    /// 已关闭
    Closed = 3,
}

impl ChannelState {
    /// 转换为原始值，用于原子存储
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 从原始值还原，未知值视为已关闭
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ChannelState::Idle,
            1 => ChannelState::AwaitingLengthPrefix,
            2 => ChannelState::AwaitingBody,
            _ => ChannelState::Closed,
        }
    }

    /// 是否为终态
    pub fn is_closed(self) -> bool {
        self == ChannelState::Closed
    }

    /// 是否有读取正在进行
    pub fn is_reading(self) -> bool {
        matches!(
            self,
            ChannelState::AwaitingLengthPrefix | ChannelState::AwaitingBody
        )
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelState::Idle => "idle",
            ChannelState::AwaitingLengthPrefix => "awaiting-length-prefix",
            ChannelState::AwaitingBody => "awaiting-body",
            ChannelState::Closed => "closed",
        };
        f.write_str(name)
    }
}
