//! 协议模块
//!
//! 帧格式定义和流式编解码。

pub mod codec;
pub mod frame;

// 重新导出主要类型
pub use codec::{FrameCodec, FrameDecoder, FrameEncoder};
pub use frame::Frame;
