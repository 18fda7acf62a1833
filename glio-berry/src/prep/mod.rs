//! 一次性离线预处理: 掩膜生成, 尺寸归一化, 灰度化.

mod binarize;
mod normalize;
pub mod otsu;

pub use binarize::{binarize, create_masks, mask_name};
pub use normalize::{grayscale_dir, resize_dir, resize_image, OutputTarget, ResizeFilter};
pub use otsu::otsu_threshold;

use crate::config::DecodePolicy;
use crate::error::{PipelineError, PipelineResult};
use std::path::PathBuf;

/// 一次目录批处理的结果.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// 已写出的文件, 按处理顺序.
    pub written: Vec<PathBuf>,

    /// 因无法解码而被跳过的输入文件.
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    #[inline]
    fn write(&mut self, path: PathBuf) {
        self.written.push(path);
    }

    #[inline]
    fn skip(&mut self, path: PathBuf) {
        self.skipped.push(path);
    }
}

/// 在解码策略下处理单个文件的结果.
pub(crate) enum Outcome<T> {
    Done(T),
    Skipped,
}

impl<T> Outcome<T> {
    /// 按 `policy` 分拣解码结果. 只有解码错误可以被跳过.
    pub(crate) fn of(r: PipelineResult<T>, policy: DecodePolicy) -> PipelineResult<Self> {
        match (r, policy) {
            (Ok(v), _) => Ok(Self::Done(v)),
            (Err(PipelineError::Decode { path, source }), DecodePolicy::Skip) => {
                log::warn!("skipping undecodable `{}`: {source}", path.display());
                Ok(Self::Skipped)
            }
            (Err(e), _) => Err(e),
        }
    }
}
