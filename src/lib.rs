//! # PeerLink - 点对点直连设备间的长度前缀消息通道
//!
//! PeerLink 在一条已建立的字节流（通常是 TCP 连接）上提供按消息收发的通道。
//! 每条消息在线路上编码为 4 字节小端序长度前缀加负载，文本和文件在线路上
//! 没有区别。
//!
//! ## 特性
//!
//! - 基于 Tokio 的异步帧通道，读写方向可并发使用
//! - 挂起中的读写可被 `close` 取消
//! - 收发两个方向都可配置单帧上限
//! - 会话层：后台接收循环、文本 / 文件分发、文件保存
//! - TOML 配置与环境变量覆盖
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use peerlink::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> peerlink::Result<()> {
//!     let config = PeerConfig::default().with_remote_address("127.0.0.1:50001");
//!     let channel = connect(&config).await?;
//!
//!     channel.send("hello").await?;
//!     let reply = channel.receive().await?;
//!     println!("收到 {} 字节", reply.len());
//!
//!     channel.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## 模块组织
//!
//! ### 配置模块
//! - PeerConfig - 对端配置
//! - ChannelConfig - 帧通道配置
//!
//! ### 网络模块
//! - Frame - 帧
//! - FrameCodec - 编解码器
//! - FramedChannel - 帧通道
//!
//! ### 会话模块
//! - PeerSession - 会话
//! - SequencedHandler - 按约定顺序分发文本和文件
//! - PeerListener - 监听对端连接

pub mod logging;

// ============================================================================
// Crate Re-exports
// ============================================================================

pub use peerlink_config;
pub use peerlink_core;
pub use peerlink_network;

#[cfg(feature = "session")]
pub use peerlink_session;

pub use peerlink_config::{ChannelConfig, ConfigError, PeerConfig};
pub use peerlink_core::{ChannelError, ChannelErrorKind, ChannelState};
pub use peerlink_network::{Frame, FrameCodec, FramedChannel, StreamChannel, TcpChannel};

#[cfg(feature = "session")]
pub use peerlink_session::{
    LoopExit, PayloadKind, PeerListener, PeerSession, SequencedHandler, SessionError,
    SessionEvent, connect,
};

// ============================================================================
// Prelude Module
// ============================================================================

/// 预导出常用类型
///
/// 通过 `use peerlink::prelude::*;` 导入所有常用类型
pub mod prelude {
    pub use peerlink_config::{ChannelConfig, PeerConfig};
    pub use peerlink_core::{ChannelError, ChannelState};
    pub use peerlink_network::{Frame, FramedChannel, TcpChannel};

    #[cfg(feature = "session")]
    pub use peerlink_session::{
        FnHandler, FsPayloadStore, LoopExit, MessageHandler, PayloadKind, PayloadStore,
        PeerListener, PeerSession, SequencedHandler, SessionError, SessionEvent, StoreHandler,
        TextHandler, connect,
    };

    pub use crate::logging::{LogFormat, init_logging};
}

// ============================================================================
// Error Types
// ============================================================================

/// PeerLink 统一 Result 类型
pub type Result<T> = std::result::Result<T, Error>;

/// PeerLink 统一错误枚举
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 通道错误
    #[error(transparent)]
    Channel(#[from] peerlink_core::ChannelError),

    /// 会话错误
    #[cfg(feature = "session")]
    #[error(transparent)]
    Session(#[from] peerlink_session::SessionError),

    /// 配置错误
    #[error(transparent)]
    Config(#[from] peerlink_config::ConfigError),

    /// IO 错误
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// 自定义错误
    #[error("{0}")]
    Custom(String),
}

// ============================================================================
// Version Information
// ============================================================================

/// PeerLink 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// PeerLink 包名
pub const NAME: &str = env!("CARGO_PKG_NAME");
