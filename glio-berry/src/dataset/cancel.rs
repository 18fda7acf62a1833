//! 协作式取消令牌.

use crate::error::{PipelineError, PipelineResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 协作式取消信号. 克隆后的实例共享同一个标志.
///
/// 长时间运行的循环 (训练, 批量预测) 在每个批次边界检查它.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// 新的未取消信号.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 发出取消请求.
    #[inline]
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// 是否已被取消?
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// 已被取消时返回 [`PipelineError::Cancelled`].
    #[inline]
    pub fn check(&self, stage: &'static str) -> PipelineResult<()> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled { stage })
        } else {
            Ok(())
        }
    }
}
