//! 数据集操作.
//!
//! 数据根目录的组织方式:
//!
//! ```text
//! {root}/Training/{Image,Mask}
//! {root}/Validation/{Image,Mask}
//! {root}/Testing/{Image,Mask}
//! {root}/Volumes/{Image,Mask}
//! ```
//!
//! 每个 `Image`/`Mask` 目录都是平铺的单层目录.

mod cancel;
mod feeder;
mod manifest;
mod prefetch;

pub use cancel::CancelToken;
pub use feeder::{Batch, BatchSource, FeederOptions, PairedFeeder};
pub use manifest::{Manifest, Pair};
pub use prefetch::Prefetcher;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 按文件名字典序列出 `dir` 下 (不递归) 的所有普通文件. 以 `.` 开头的隐藏文件被忽略.
///
/// # 返回值
///
/// 1. `dir` 不是目录时返回 [`PipelineError::MissingDir`].
/// 2. `dir` 中没有任何文件时返回 [`PipelineError::EmptyDir`].
pub fn list_files(dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PipelineError::MissingDir {
            path: dir.to_owned(),
        });
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| PipelineError::io(dir, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        files.push(entry.into_path());
    }
    if files.is_empty() {
        return Err(PipelineError::EmptyDir {
            path: dir.to_owned(),
        });
    }
    Ok(files)
}

/// 数据集划分.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Split {
    /// 训练集.
    Training,

    /// 验证集.
    Validation,

    /// 测试集.
    Testing,
}

impl Split {
    /// 全部划分.
    pub const ALL: [Split; 3] = [Split::Training, Split::Validation, Split::Testing];

    /// 该划分在数据根目录下的子目录名.
    #[inline]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Training => "Training",
            Self::Validation => "Validation",
            Self::Testing => "Testing",
        }
    }
}

/// 数据目录布局.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
    volume_image: PathBuf,
    volume_mask: PathBuf,
}

impl DataLayout {
    /// 以 `root` 为数据根目录; 体数据目录为 `{root}/Volumes/{Image,Mask}`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_owned();
        Self {
            volume_image: root.join("Volumes").join("Image"),
            volume_mask: root.join("Volumes").join("Mask"),
            root,
        }
    }

    /// 从配置构建.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            root: config.data_root.clone(),
            volume_image: config.volume_image_dir.clone(),
            volume_mask: config.volume_mask_dir.clone(),
        }
    }

    /// 数据根目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 划分 `split` 的图像目录.
    #[inline]
    pub fn image_dir(&self, split: Split) -> PathBuf {
        self.root.join(split.dir_name()).join("Image")
    }

    /// 划分 `split` 的掩膜目录.
    #[inline]
    pub fn mask_dir(&self, split: Split) -> PathBuf {
        self.root.join(split.dir_name()).join("Mask")
    }

    /// 体数据的 (图像目录, 掩膜目录).
    #[inline]
    pub fn volume_dirs(&self) -> (&Path, &Path) {
        (&self.volume_image, &self.volume_mask)
    }

    /// 检查某划分的两个目录是否存在.
    pub fn check(&self, split: Split) -> PipelineResult<()> {
        for dir in [self.image_dir(split), self.mask_dir(split)] {
            if !dir.is_dir() {
                return Err(PipelineError::MissingDir { path: dir });
            }
        }
        Ok(())
    }

    /// 构建某划分的配对清单.
    pub fn manifest(&self, split: Split, suffix: &str) -> PipelineResult<Manifest> {
        self.check(split)?;
        Manifest::build(self.image_dir(split), self.mask_dir(split), suffix)
    }

    /// 构建体数据的配对清单.
    pub fn volume_manifest(&self, suffix: &str) -> PipelineResult<Manifest> {
        Manifest::build(&self.volume_image, &self.volume_mask, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_list_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png", ".hidden", "c.png"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("sub")).unwrap();
        let names: Vec<_> = list_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn test_list_files_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            list_files(dir.path()),
            Err(PipelineError::EmptyDir { .. })
        ));
        assert!(matches!(
            list_files(&dir.path().join("nope")),
            Err(PipelineError::MissingDir { .. })
        ));
    }

    #[test]
    fn test_layout() {
        let layout = DataLayout::new("/data");
        assert_eq!(
            layout.image_dir(Split::Validation),
            Path::new("/data/Validation/Image")
        );
        assert_eq!(layout.mask_dir(Split::Testing), Path::new("/data/Testing/Mask"));
        assert_eq!(layout.volume_dirs().1, Path::new("/data/Volumes/Mask"));
        assert!(matches!(
            layout.check(Split::Training),
            Err(PipelineError::MissingDir { .. })
        ));
        assert_eq!(
            DataLayout::from_config(&PipelineConfig::with_root("/data")),
            layout
        );
    }
}
