//! 帧通道统一错误处理
//!
//! 提供通道级别的错误类型定义和分类。

pub mod channel;

// 重新导出主要类型
pub use channel::{ChannelError, ChannelErrorKind};

/// 帧通道统一 Result 类型
pub type Result<T> = std::result::Result<T, ChannelError>;
