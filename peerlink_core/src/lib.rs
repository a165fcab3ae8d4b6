//! PeerLink 核心类型
//!
//! 提供帧通道共享的错误类型和状态机定义。

pub mod error;
pub mod state;

// 导出主要类型到 crate root
pub use crate::error::{ChannelError, ChannelErrorKind, Result};
pub use crate::state::ChannelState;

// 预导出
pub mod prelude {
    pub use crate::error::{ChannelError, ChannelErrorKind, Result};
    pub use crate::state::ChannelState;
}
