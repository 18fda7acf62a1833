//! 流水线运行时错误.
//!
//! 所有致命错误都会携带触发它的文件/目录/阶段信息.

use std::fmt;
use std::path::PathBuf;

/// 流水线各阶段的运行时错误.
#[derive(Debug)]
pub enum PipelineError {
    /// 目录不存在或不是目录.
    MissingDir {
        /// 出错的目录.
        path: PathBuf,
    },

    /// 目录中没有任何可用文件.
    EmptyDir {
        /// 出错的目录.
        path: PathBuf,
    },

    /// 图像目录与掩膜目录的文件个数不一致.
    CountMismatch {
        /// 图像目录.
        image_dir: PathBuf,
        /// 掩膜目录.
        mask_dir: PathBuf,
        /// 图像文件个数.
        images: usize,
        /// 掩膜文件个数.
        masks: usize,
    },

    /// 按字典序排列的第 `index` 个图像找不到配对键相同的掩膜.
    PairMismatch {
        /// 第一个没有掩膜的图像的位置.
        index: usize,
        /// 该图像文件.
        image: PathBuf,
        /// 第一个没有被配对的掩膜文件.
        mask: PathBuf,
    },

    /// 图像无法解码或无法编码.
    Decode {
        /// 出错的文件.
        path: PathBuf,
        /// 底层错误.
        source: image::ImageError,
    },

    /// 底层 I/O 错误.
    Io {
        /// 出错的文件或目录.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// 组装体数据时切片个数不符.
    SliceCount {
        /// 期望的切片个数.
        expected: usize,
        /// 实际的切片个数.
        found: usize,
    },

    /// 组装体数据时第 `index` 张切片形状与第一张不一致.
    SliceShape {
        /// 出错的切片索引.
        index: usize,
        /// 期望的 (高, 宽).
        expected: (usize, usize),
        /// 实际的 (高, 宽).
        found: (usize, usize),
    },

    /// 数据流在 `Raise` 策略下被耗尽.
    StreamExhausted {
        /// 数据流名称 (一般为数据集划分名).
        split: String,
        /// 耗尽前已经产出的样本个数.
        served: usize,
    },

    /// 模型文件损坏或与当前架构不兼容.
    Artifact {
        /// 模型文件路径.
        path: PathBuf,
        /// 具体原因.
        reason: String,
    },

    /// 在某阶段观察到取消信号.
    Cancelled {
        /// 被取消的阶段.
        stage: &'static str,
    },

    /// 张量后端返回了无法转换的数据.
    Backend {
        /// 出错的阶段.
        stage: &'static str,
        /// 具体原因.
        reason: String,
    },

    /// 配置项非法.
    InvalidConfig {
        /// 配置项名称.
        field: &'static str,
        /// 具体原因.
        reason: String,
    },
}

/// 流水线运行结果.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// 包装 I/O 错误.
    #[inline]
    pub(crate) fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// 包装图像编解码错误.
    #[inline]
    pub(crate) fn decode<P: Into<PathBuf>>(path: P, source: image::ImageError) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }

    /// 包装模型文件错误.
    #[inline]
    pub(crate) fn artifact<P: Into<PathBuf>, S: ToString>(path: P, reason: S) -> Self {
        Self::Artifact {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// 该错误是否属于配置错误 (目录缺失, 配对失败, 配置项非法).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingDir { .. }
                | Self::EmptyDir { .. }
                | Self::CountMismatch { .. }
                | Self::PairMismatch { .. }
                | Self::InvalidConfig { .. }
        )
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDir { path } => write!(f, "directory `{}` does not exist", path.display()),
            Self::EmptyDir { path } => write!(f, "directory `{}` contains no files", path.display()),
            Self::CountMismatch {
                image_dir,
                mask_dir,
                images,
                masks,
            } => write!(
                f,
                "`{}` has {images} images but `{}` has {masks} masks",
                image_dir.display(),
                mask_dir.display()
            ),
            Self::PairMismatch { index, image, mask } => write!(
                f,
                "image #{index} `{}` has no mask (first unpaired mask: `{}`)",
                image.display(),
                mask.display()
            ),
            Self::Decode { path, source } => {
                write!(f, "image codec error on `{}`: {source}", path.display())
            }
            Self::Io { path, source } => write!(f, "I/O error on `{}`: {source}", path.display()),
            Self::SliceCount { expected, found } => {
                write!(f, "volume needs exactly {expected} slices, got {found}")
            }
            Self::SliceShape {
                index,
                expected,
                found,
            } => write!(
                f,
                "slice #{index} has shape {found:?}, expected {expected:?}"
            ),
            Self::StreamExhausted { split, served } => {
                write!(f, "`{split}` stream exhausted after {served} samples")
            }
            Self::Artifact { path, reason } => {
                write!(f, "bad model artifact `{}`: {reason}", path.display())
            }
            Self::Cancelled { stage } => write!(f, "cancelled during {stage}"),
            Self::Backend { stage, reason } => {
                write!(f, "tensor backend failure during {stage}: {reason}")
            }
            Self::InvalidConfig { field, reason } => {
                write!(f, "invalid config `{field}`: {reason}")
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineError;
    use std::path::PathBuf;

    #[test]
    fn test_error_names_the_path() {
        let e = PipelineError::MissingDir {
            path: PathBuf::from("/data/Training/Image"),
        };
        assert!(e.to_string().contains("/data/Training/Image"));
        assert!(e.is_configuration());

        let e = PipelineError::SliceCount {
            expected: 192,
            found: 191,
        };
        assert!(e.to_string().contains("192"));
        assert!(!e.is_configuration());
    }
}
