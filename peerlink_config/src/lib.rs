//! 配置管理系统
//!
//! 提供对端连接、帧通道和接收文件落盘的配置，支持 TOML 文件与环境变量覆盖。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("解析配置文件失败: {0}")]
    Parse(String),

    /// 验证错误
    #[error("配置验证失败: {0}")]
    Validation(String),

    /// 环境变量错误
    #[error("环境变量解析失败: {0}")]
    EnvVar(String),
}

/// 配置 Result 类型
pub type Result<T> = std::result::Result<T, ConfigError>;

/// 对端配置
///
/// 描述本机监听地址、要连接的对端地址以及接收文件的保存位置。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeerConfig {
    /// 绑定地址
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 对端地址（`host:port`），为空时只作为监听方
    #[serde(default)]
    pub remote_address: Option<String>,

    /// 建连超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// 接收文件的保存目录
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,

    /// 接收文件的文件名（同名文件会被覆盖）
    #[serde(default = "default_received_file_name")]
    pub received_file_name: String,

    /// 会话事件广播通道容量
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// 帧通道配置
    #[serde(default)]
    pub channel: ChannelConfig,
}

/// 帧通道配置
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// 单帧负载的最大字节数，收发两个方向都生效
    #[serde(default = "default_max_frame_length")]
    pub max_frame_length: u32,

    /// 读缓冲区初始大小
    #[serde(default = "default_buffer_size")]
    pub read_buffer_size: usize,

    /// 写缓冲区背压阈值
    #[serde(default = "default_buffer_size")]
    pub write_buffer_size: usize,

    /// 关闭时等待写端优雅关闭的时间（毫秒）
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_ms: u64,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            remote_address: None,
            connect_timeout_secs: default_connect_timeout(),
            save_dir: default_save_dir(),
            received_file_name: default_received_file_name(),
            event_capacity: default_event_capacity(),
            channel: ChannelConfig::default(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_frame_length: default_max_frame_length(),
            read_buffer_size: default_buffer_size(),
            write_buffer_size: default_buffer_size(),
            shutdown_grace_ms: default_shutdown_grace(),
        }
    }
}

impl PeerConfig {
    /// 从 TOML 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 字符串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 从环境变量加载配置并覆盖
    ///
    /// 支持的环境变量：
    /// - PEERLINK_BIND_ADDRESS: 绑定地址
    /// - PEERLINK_PORT: 端口
    /// - PEERLINK_REMOTE_ADDRESS: 对端地址
    /// - PEERLINK_MAX_FRAME_LENGTH: 单帧最大字节数
    /// - PEERLINK_SAVE_DIR: 接收文件保存目录
    pub fn load_with_env_override(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// 使用给定的查找函数应用覆盖项
    ///
    /// `lookup` 以环境变量名为键，返回 `None` 表示未设置。
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("PEERLINK_BIND_ADDRESS") {
            self.bind_address = addr;
        }

        if let Some(port) = lookup("PEERLINK_PORT") {
            self.port = port.parse().map_err(|_| {
                ConfigError::EnvVar("PEERLINK_PORT 必须是有效的 u16 数字".to_string())
            })?;
        }

        if let Some(remote) = lookup("PEERLINK_REMOTE_ADDRESS") {
            self.remote_address = if remote.is_empty() { None } else { Some(remote) };
        }

        if let Some(max) = lookup("PEERLINK_MAX_FRAME_LENGTH") {
            self.channel.max_frame_length = max.parse().map_err(|_| {
                ConfigError::EnvVar("PEERLINK_MAX_FRAME_LENGTH 必须是有效的 u32 数字".to_string())
            })?;
        }

        if let Some(dir) = lookup("PEERLINK_SAVE_DIR") {
            self.save_dir = PathBuf::from(dir);
        }

        Ok(self)
    }

    /// 从文件加载并应用环境变量覆盖
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_file(path)?.load_with_env_override()
    }

    /// 验证配置是否有效
    pub fn validate(&self) -> Result<()> {
        if self.bind_address.is_empty() {
            return Err(ConfigError::Validation("绑定地址不能为空".to_string()));
        }

        if let Some(remote) = &self.remote_address {
            if !remote.contains(':') {
                return Err(ConfigError::Validation(format!(
                    "对端地址缺少端口: {}",
                    remote
                )));
            }
        }

        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation("建连超时不能为 0".to_string()));
        }

        if self.received_file_name.is_empty() {
            return Err(ConfigError::Validation("接收文件名不能为空".to_string()));
        }

        if self.received_file_name.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "接收文件名不能包含路径分隔符".to_string(),
            ));
        }

        if self.event_capacity == 0 {
            return Err(ConfigError::Validation("事件通道容量不能为 0".to_string()));
        }

        self.channel.validate()
    }

    /// 获取完整的绑定地址字符串
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// 建连超时
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// 接收文件的完整路径
    pub fn received_file_path(&self) -> PathBuf {
        self.save_dir.join(&self.received_file_name)
    }

    /// 设置端口
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// 设置绑定地址
    pub fn with_bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = address.into();
        self
    }

    /// 设置对端地址
    pub fn with_remote_address(mut self, address: impl Into<String>) -> Self {
        self.remote_address = Some(address.into());
        self
    }

    /// 设置建连超时
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// 设置接收文件保存目录
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }

    /// 设置帧通道配置
    pub fn with_channel(mut self, channel: ChannelConfig) -> Self {
        self.channel = channel;
        self
    }

    /// 获取配置摘要信息
    pub fn summary(&self) -> String {
        format!(
            "PeerLink 配置:\n  监听: {}\n  对端: {}\n  单帧上限: {} 字节\n  保存路径: {}",
            self.bind_addr(),
            self.remote_address.as_deref().unwrap_or("-"),
            self.channel.max_frame_length,
            self.received_file_path().display()
        )
    }
}

impl ChannelConfig {
    /// 验证通道配置
    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(ConfigError::Validation("读缓冲区不能为 0".to_string()));
        }

        if self.write_buffer_size == 0 {
            return Err(ConfigError::Validation("写缓冲区不能为 0".to_string()));
        }

        Ok(())
    }

    /// 设置单帧最大字节数
    pub fn with_max_frame_length(mut self, max: u32) -> Self {
        self.max_frame_length = max;
        self
    }

    /// 设置读缓冲区大小
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// 设置写缓冲区大小
    pub fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    /// 优雅关闭等待时间
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

// 默认值函数
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    50001
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("received")
}

fn default_received_file_name() -> String {
    "received_payload".to_string()
}

fn default_event_capacity() -> usize {
    100
}

fn default_max_frame_length() -> u32 {
    u32::MAX
}

fn default_buffer_size() -> usize {
    8192
}

fn default_shutdown_grace() -> u64 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = PeerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 50001);
        assert_eq!(config.channel.max_frame_length, u32::MAX);
        assert!(config.remote_address.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bind_addr() {
        let config = PeerConfig::default()
            .with_bind_address("127.0.0.1")
            .with_port(9000);
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn test_received_file_path() {
        let config = PeerConfig::default().with_save_dir("/tmp/inbox");
        assert_eq!(
            config.received_file_path(),
            PathBuf::from("/tmp/inbox/received_payload")
        );
    }

    #[test]
    fn test_validate_empty_address() {
        let config = PeerConfig::default().with_bind_address("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_remote_without_port() {
        let config = PeerConfig::default().with_remote_address("192.168.137.1");
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_file_name_with_separator() {
        let config = PeerConfig {
            received_file_name: "../escape".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_buffer() {
        let config = PeerConfig::default()
            .with_channel(ChannelConfig::default().with_read_buffer_size(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_toml_with_defaults() {
        let config = PeerConfig::from_toml_str(
            r#"
            port = 6000
            remote_address = "10.0.0.2:6000"

            [channel]
            max_frame_length = 1048576
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 6000);
        assert_eq!(config.remote_address.as_deref(), Some("10.0.0.2:6000"));
        assert_eq!(config.channel.max_frame_length, 1_048_576);
        assert_eq!(config.channel.read_buffer_size, 8192);
        assert_eq!(config.bind_address, "0.0.0.0");
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = PeerConfig::from_toml_str("port = \"not a number\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peerlink.toml");
        std::fs::write(&path, "bind_address = \"127.0.0.1\"\n").unwrap();

        let config = PeerConfig::from_file(&path).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.port, 50001);
    }

    #[test]
    fn test_from_missing_file() {
        let result = PeerConfig::from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_override_port_and_address() {
        let config = PeerConfig::default()
            .apply_overrides(lookup_from(&[
                ("PEERLINK_PORT", "9999"),
                ("PEERLINK_BIND_ADDRESS", "127.0.0.1"),
            ]))
            .unwrap();
        assert_eq!(config.port, 9999);
        assert_eq!(config.bind_address, "127.0.0.1");
    }

    #[test]
    fn test_override_invalid_port() {
        let result = PeerConfig::default()
            .apply_overrides(lookup_from(&[("PEERLINK_PORT", "invalid")]));
        assert!(matches!(result, Err(ConfigError::EnvVar(_))));
    }

    #[test]
    fn test_override_remote_and_frame_length() {
        let config = PeerConfig::default()
            .apply_overrides(lookup_from(&[
                ("PEERLINK_REMOTE_ADDRESS", "10.0.0.9:50001"),
                ("PEERLINK_MAX_FRAME_LENGTH", "4096"),
                ("PEERLINK_SAVE_DIR", "/var/tmp/peerlink"),
            ]))
            .unwrap();
        assert_eq!(config.remote_address.as_deref(), Some("10.0.0.9:50001"));
        assert_eq!(config.channel.max_frame_length, 4096);
        assert_eq!(config.save_dir, PathBuf::from("/var/tmp/peerlink"));
    }

    #[test]
    fn test_override_empty_remote_clears_it() {
        let config = PeerConfig::default()
            .with_remote_address("10.0.0.9:50001")
            .apply_overrides(lookup_from(&[("PEERLINK_REMOTE_ADDRESS", "")]))
            .unwrap();
        assert!(config.remote_address.is_none());
    }

    #[test]
    fn test_config_summary() {
        let config = PeerConfig::default();
        let summary = config.summary();
        assert!(summary.contains("0.0.0.0:50001"));
        assert!(summary.contains("PeerLink 配置"));
    }
}
