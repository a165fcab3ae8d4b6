//! 帧通道
//!
//! 在原始字节流之上提供按消息收发、可取消、可释放的通道。

pub mod framed;
pub mod metrics;
pub mod state;

// 重新导出主要类型
pub use framed::{FramedChannel, StreamChannel, TcpChannel};
pub use metrics::ChannelMetrics;
pub use state::StateCell;
