//! PeerLink 长度前缀帧协议与帧通道实现
//!
//! 线路格式：
//!
//! ```text
//! Frame := LengthPrefix(4 字节, u32, 小端序) || Payload(LengthPrefix 字节)
//! ```
//!
//! 文本和二进制负载在线路上没有任何区别，由调用方通过带外约定决定如何解释。

pub mod channel;
pub mod protocol;

// 导出主要类型到 crate root
pub use crate::channel::{ChannelMetrics, FramedChannel, StreamChannel, TcpChannel};
pub use crate::protocol::{Frame, FrameCodec, FrameDecoder, FrameEncoder};
// 重新导出 peerlink_core 的错误和状态类型
pub use peerlink_core::{ChannelError, ChannelErrorKind, ChannelState, Result};

// 预导出
pub mod prelude {
    pub use crate::channel::{FramedChannel, TcpChannel};
    pub use crate::protocol::Frame;
    pub use peerlink_core::{ChannelError, ChannelState, Result};
}
