//! 通道指标
//!
//! 统计单个帧通道的收发情况。

use std::sync::atomic::{AtomicU64, Ordering};

/// 通道指标
#[derive(Debug, Default)]
pub struct ChannelMetrics {
    /// 已发送帧数
    frames_sent: AtomicU64,
    /// 已接收帧数
    frames_received: AtomicU64,
    /// 已发送负载字节数（不含长度前缀）
    payload_bytes_sent: AtomicU64,
    /// 已接收负载字节数（不含长度前缀）
    payload_bytes_received: AtomicU64,
}

impl ChannelMetrics {
    /// 创建新的通道指标
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次成功发送
    pub fn record_sent(&self, payload_len: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.payload_bytes_sent
            .fetch_add(payload_len as u64, Ordering::Relaxed);
    }

    /// 记录一次成功接收
    pub fn record_received(&self, payload_len: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.payload_bytes_received
            .fetch_add(payload_len as u64, Ordering::Relaxed);
    }

    /// 已发送帧数
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// 已接收帧数
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// 已发送负载字节数
    pub fn payload_bytes_sent(&self) -> u64 {
        self.payload_bytes_sent.load(Ordering::Relaxed)
    }

    /// 已接收负载字节数
    pub fn payload_bytes_received(&self) -> u64 {
        self.payload_bytes_received.load(Ordering::Relaxed)
    }

    /// 生成摘要报告
    pub fn summary(&self) -> String {
        format!(
            "通道指标:\n\
             - 发送帧: {}\n\
             - 接收帧: {}\n\
             - 发送字节: {}\n\
             - 接收字节: {}",
            self.frames_sent(),
            self.frames_received(),
            self.payload_bytes_sent(),
            self.payload_bytes_received()
        )
    }
}
