//! 结构化日志初始化
//!
//! 各 crate 只通过 `tracing` 宏打点，订阅者由应用在启动时安装一次。

use crate::{Error, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 人类可读文本
    #[default]
    Text,
    /// 结构化 JSON
    Json,
}

/// 详细程度对应的日志级别
///
/// 0=error, 1=warn, 2=info, 3=debug, 4 及以上=trace
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    }
}

/// 默认过滤规则，只作用于 PeerLink 自己的 crate
pub fn default_directives(verbosity: u8) -> String {
    let level = level_for(verbosity);
    format!(
        "peerlink={0},peerlink_core={0},peerlink_network={0},peerlink_session={0},peer_chat={0}",
        level
    )
}

/// 安装全局日志订阅者，输出到 stderr
///
/// 设置了 `RUST_LOG` 时以它为准。重复调用返回错误。
pub fn init_logging(verbosity: u8, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

    let installed = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(verbosity >= 3)
                    .with_line_number(verbosity >= 3),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|e| Error::Custom(format!("日志初始化失败: {}", e)))?;
    tracing::debug!(verbosity, ?format, "日志已初始化");
    Ok(())
}

/// 测试用：info 级别文本输出，忽略重复初始化
pub fn init_test_logging() {
    let _ = init_logging(2, LogFormat::Text);
}
