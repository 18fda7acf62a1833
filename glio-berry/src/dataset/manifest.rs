//! (图像, 掩膜) 配对清单.

use super::list_files;
use crate::error::{PipelineError, PipelineResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 一对图像与掩膜文件.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pair {
    /// 图像文件.
    pub image: PathBuf,

    /// 掩膜文件.
    pub mask: PathBuf,
}

/// 经过校验的有序配对清单.
///
/// 图像侧与掩膜侧都由同一个清单索引驱动, 因此二者不可能失步.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Manifest {
    image_dir: PathBuf,
    mask_dir: PathBuf,
    pairs: Vec<Pair>,
}

/// 文件的配对键: 文件名去掉 `suffix` (若以其结尾), 否则去掉扩展名.
fn pair_key<'a>(path: &'a Path, suffix: &str) -> Option<&'a str> {
    let name = path.file_name()?.to_str()?;
    match name.strip_suffix(suffix) {
        Some(stem) if !suffix.is_empty() => Some(stem),
        _ => path.file_stem()?.to_str(),
    }
}

impl Manifest {
    /// 列出两个目录, 按配对键把掩膜对应到图像上.
    ///
    /// 掩膜的配对键 (去掉 `suffix` 或扩展名后的文件名) 必须等于某个图像的文件名主干.
    /// 清单按图像文件名的字典序排列.
    ///
    /// # 返回值
    ///
    /// 1. 任一目录缺失或为空: [`PipelineError::MissingDir`] / [`PipelineError::EmptyDir`].
    /// 2. 文件个数不同: [`PipelineError::CountMismatch`].
    /// 3. 配对失败: [`PipelineError::PairMismatch`], 指明第一个找不到掩膜的图像,
    ///    以及字典序第一个未被配对的掩膜.
    pub fn build<P: AsRef<Path>, Q: AsRef<Path>>(
        image_dir: P,
        mask_dir: Q,
        suffix: &str,
    ) -> PipelineResult<Self> {
        let image_dir = image_dir.as_ref().to_owned();
        let mask_dir = mask_dir.as_ref().to_owned();
        let images = list_files(&image_dir)?;
        let masks = list_files(&mask_dir)?;
        if images.len() != masks.len() {
            return Err(PipelineError::CountMismatch {
                images: images.len(),
                masks: masks.len(),
                image_dir,
                mask_dir,
            });
        }

        // 键重复时保留字典序靠前的掩膜, 其余的视为未配对.
        let mut by_key: HashMap<&str, usize> = HashMap::with_capacity(masks.len());
        for (i, mask) in masks.iter().enumerate() {
            if let Some(key) = pair_key(mask, suffix) {
                by_key.entry(key).or_insert(i);
            }
        }

        let mut used = vec![false; masks.len()];
        let mut order = Vec::with_capacity(images.len());
        let mut missing = None;
        for (index, image) in images.iter().enumerate() {
            let found = image
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|stem| by_key.remove(stem));
            match found {
                Some(j) => {
                    used[j] = true;
                    order.push(j);
                }
                None if missing.is_none() => missing = Some(index),
                None => {}
            }
        }
        if let Some(index) = missing {
            let stray = used.iter().position(|&u| !u).unwrap_or_default();
            return Err(PipelineError::PairMismatch {
                index,
                image: images[index].clone(),
                mask: masks[stray].clone(),
            });
        }

        let pairs: Vec<_> = images
            .iter()
            .zip(order)
            .map(|(image, j)| Pair {
                image: image.clone(),
                mask: masks[j].clone(),
            })
            .collect();
        log::debug!(
            "manifest `{}` <-> `{}`: {} pairs",
            image_dir.display(),
            mask_dir.display(),
            pairs.len()
        );
        Ok(Self {
            image_dir,
            mask_dir,
            pairs,
        })
    }

    /// 配对个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// 是否为空? 由 [`Manifest::build`] 构建的清单总是非空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// 第 `index` 对.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Pair> {
        self.pairs.get(index)
    }

    /// 全部配对.
    #[inline]
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// 图像目录.
    #[inline]
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// 掩膜目录.
    #[inline]
    pub fn mask_dir(&self) -> &Path {
        &self.mask_dir
    }

    /// 对顺序敏感的清单校验和 (CRC32, 按顺序覆盖每对文件名).
    ///
    /// 两份清单的校验和相同, 说明它们以相同顺序列出了相同名字的文件.
    pub fn fingerprint(&self) -> u32 {
        let mut crc = flate2::Crc::new();
        for p in &self.pairs {
            for path in [&p.image, &p.mask] {
                let name = path.file_name().map(|s| s.to_string_lossy());
                crc.update(name.as_deref().unwrap_or_default().as_bytes());
                crc.update(&[0]);
            }
        }
        crc.sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, names: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        for n in names {
            fs::write(dir.join(n), b"").unwrap();
        }
    }

    #[test]
    fn test_pair_key() {
        assert_eq!(pair_key(Path::new("x/a-Mask.png"), "-Mask.png"), Some("a"));
        assert_eq!(pair_key(Path::new("x/a.png"), "-Mask.png"), Some("a"));
        assert_eq!(pair_key(Path::new("x/a.tif"), ""), Some("a"));
    }

    #[test]
    fn test_build_ok() {
        let root = tempfile::tempdir().unwrap();
        let (img, msk) = (root.path().join("Image"), root.path().join("Mask"));
        touch(&img, &["s01.png", "s02.png", "s03.png"]);
        touch(&msk, &["s01-Mask.png", "s02-Mask.png", "s03.png"]);
        let m = Manifest::build(&img, &msk, "-Mask.png").unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(m.get(1).unwrap().mask, msk.join("s02-Mask.png"));
        assert_eq!(m.fingerprint(), m.clone().fingerprint());
    }

    #[test]
    fn test_build_mismatch() {
        let root = tempfile::tempdir().unwrap();
        let (img, msk) = (root.path().join("Image"), root.path().join("Mask"));
        touch(&img, &["s01.png", "s02.png"]);
        touch(&msk, &["s01-Mask.png"]);
        assert!(matches!(
            Manifest::build(&img, &msk, "-Mask.png"),
            Err(PipelineError::CountMismatch {
                images: 2,
                masks: 1,
                ..
            })
        ));

        touch(&msk, &["s03-Mask.png"]);
        match Manifest::build(&img, &msk, "-Mask.png") {
            Err(PipelineError::PairMismatch { index, image, mask }) => {
                assert_eq!(index, 1);
                assert_eq!(image, img.join("s02.png"));
                assert_eq!(mask, msk.join("s03-Mask.png"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_build_hyphenated_stems() {
        // 加上后缀后两侧的字典序不同: `case-t1.png` < `case.png`, 而 `case-Mask.png` < `case-t1-Mask.png`.
        let root = tempfile::tempdir().unwrap();
        let (img, msk) = (root.path().join("Image"), root.path().join("Mask"));
        touch(&img, &["case.png", "case-t1.png", "case-t2.png"]);
        touch(&msk, &["case-Mask.png", "case-t1-Mask.png", "case-t2-Mask.png"]);
        let m = Manifest::build(&img, &msk, "-Mask.png").unwrap();
        let names: Vec<_> = m
            .pairs()
            .iter()
            .map(|p| {
                let name = |f: &Path| f.file_name().unwrap().to_string_lossy().into_owned();
                (name(&p.image), name(&p.mask))
            })
            .collect();
        assert_eq!(
            names,
            [
                ("case-t1.png".to_owned(), "case-t1-Mask.png".to_owned()),
                ("case-t2.png".to_owned(), "case-t2-Mask.png".to_owned()),
                ("case.png".to_owned(), "case-Mask.png".to_owned()),
            ]
        );
    }

    #[test]
    fn test_build_duplicate_key() {
        let root = tempfile::tempdir().unwrap();
        let (img, msk) = (root.path().join("Image"), root.path().join("Mask"));
        touch(&img, &["a.png", "b.png"]);
        touch(&msk, &["a-Mask.png", "a.png"]);
        match Manifest::build(&img, &msk, "-Mask.png") {
            Err(PipelineError::PairMismatch { index, mask, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(mask, msk.join("a.png"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
