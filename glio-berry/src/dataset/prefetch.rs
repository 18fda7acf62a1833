//! 后台预取.

use super::{Batch, BatchSource};
use crate::error::{PipelineError, PipelineResult};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

/// 在后台线程中预先读取批次的数据流.
///
/// 唯一的生产者线程独占底层数据流, 队列是 FIFO 的, 因此批次顺序与直接调用
/// 底层数据流完全一致. 队列容量固定, 生产者在队列满时阻塞.
///
/// # 注意
///
/// 底层数据流返回错误后, 生产者线程把该错误送出并退出; 之后的调用返回
/// [`PipelineError::StreamExhausted`].
pub struct Prefetcher {
    name: String,
    rx: Option<Receiver<PipelineResult<Batch>>>,
    handle: Option<JoinHandle<()>>,
    served: usize,
}

impl Prefetcher {
    /// 启动生产者线程. `capacity` 为 0 时按 1 处理.
    pub fn spawn<S>(mut source: S, capacity: usize) -> Self
    where
        S: BatchSource + Send + 'static,
    {
        let name = source.name().to_owned();
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        let handle = thread::spawn(move || loop {
            let batch = source.next_batch();
            let stop = batch.is_err();
            // 消费者已经放弃.
            if tx.send(batch).is_err() || stop {
                break;
            }
        });
        Self {
            name,
            rx: Some(rx),
            handle: Some(handle),
            served: 0,
        }
    }
}

impl BatchSource for Prefetcher {
    fn next_batch(&mut self) -> PipelineResult<Batch> {
        let received = self.rx.as_ref().and_then(|rx| rx.recv().ok());
        match received {
            Some(batch) => {
                if let Ok(b) = &batch {
                    self.served += b.len();
                }
                batch
            }
            None => Err(PipelineError::StreamExhausted {
                split: self.name.clone(),
                served: self.served,
            }),
        }
    }

    #[inline]
    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        // 先关闭接收端, 生产者的下一次发送会失败并退出.
        drop(self.rx.take());
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                log::warn!("prefetch thread of `{}` panicked", self.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    /// 产出 `limit` 个单样本批次后耗尽.
    struct Counter {
        next: usize,
        limit: usize,
    }

    impl BatchSource for Counter {
        fn next_batch(&mut self) -> PipelineResult<Batch> {
            if self.next == self.limit {
                return Err(PipelineError::StreamExhausted {
                    split: String::from("counter"),
                    served: self.next,
                });
            }
            self.next += 1;
            Ok(Batch {
                images: Array4::zeros((1, 1, 2, 2)),
                masks: Array4::zeros((1, 1, 2, 2)),
                indices: vec![self.next - 1],
            })
        }

        fn name(&self) -> &str {
            "counter"
        }
    }

    #[test]
    fn test_prefetch_keeps_order() {
        let mut p = Prefetcher::spawn(Counter { next: 0, limit: 6 }, 2);
        for i in 0..6 {
            assert_eq!(p.next_batch().unwrap().indices, vec![i]);
        }
        assert!(matches!(
            p.next_batch(),
            Err(PipelineError::StreamExhausted { served: 6, .. })
        ));
        // 生产者已退出.
        assert!(matches!(
            p.next_batch(),
            Err(PipelineError::StreamExhausted { served: 6, .. })
        ));
    }

    #[test]
    fn test_drop_unblocks_producer() {
        let mut p = Prefetcher::spawn(
            Counter {
                next: 0,
                limit: usize::MAX,
            },
            1,
        );
        assert!(p.next_batch().is_ok());
        drop(p);
    }
}
