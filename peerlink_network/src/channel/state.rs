//! 共享状态单元
//!
//! 通道与解码器共享同一个原子状态，无需持有读锁即可观察读取进度。

use peerlink_core::ChannelState;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// 原子通道状态
#[derive(Debug, Clone, Default)]
pub struct StateCell(Arc<AtomicU8>);

impl StateCell {
    /// 创建处于 `Idle` 的状态单元
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前状态
    pub fn get(&self) -> ChannelState {
        ChannelState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// 迁移到新状态
    ///
    /// `Closed` 是终态，已关闭时返回 `false` 且不做修改。
    pub fn transition(&self, next: ChannelState) -> bool {
        let closed = ChannelState::Closed.as_u8();
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != closed).then_some(next.as_u8())
            })
            .is_ok()
    }

    /// 关闭，返回本次调用是否真正完成了关闭
    pub fn close(&self) -> bool {
        self.0.swap(ChannelState::Closed.as_u8(), Ordering::AcqRel)
            != ChannelState::Closed.as_u8()
    }

    /// 是否已关闭
    pub fn is_closed(&self) -> bool {
        self.get().is_closed()
    }
}
