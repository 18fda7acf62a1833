//! 由逐切片预测堆叠而成的三维标量场.

use crate::error::{PipelineError, PipelineResult};
use crate::Idx3d;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use itertools::Itertools;
use ndarray::{Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// 三维标量场, 形状为 (高, 宽, 切片数).
///
/// 第三个轴的顺序即切片目录中文件的字典序, 必须与物理空间顺序一致.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    data: Array3<f32>,
}

impl Volume {
    /// 将恰好 `expected` 张形状一致的切片沿第三个轴堆叠.
    ///
    /// # 注意
    ///
    /// 切片个数不等于 `expected` 时返回 [`PipelineError::SliceCount`],
    /// 不做任何截断或补齐; 任一切片形状与第一张不同时返回 [`PipelineError::SliceShape`].
    pub fn assemble<I>(slices: I, expected: usize) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = Array2<f32>>,
    {
        let slices: Vec<Array2<f32>> = slices.into_iter().collect();
        if slices.len() != expected {
            return Err(PipelineError::SliceCount {
                expected,
                found: slices.len(),
            });
        }
        let Some((h, w)) = slices.first().map(Array2::dim) else {
            return Err(PipelineError::SliceCount { expected, found: 0 });
        };
        if let Some((index, bad)) = slices.iter().enumerate().find(|(_, s)| s.dim() != (h, w)) {
            return Err(PipelineError::SliceShape {
                index,
                expected: (h, w),
                found: bad.dim(),
            });
        }

        let mut data = Array3::<f32>::zeros((h, w, expected));
        for (z, s) in slices.into_iter().enumerate() {
            data.index_axis_mut(Axis(2), z).assign(&s);
        }
        Ok(Self { data })
    }

    /// 直接包装已有三维数组.
    #[inline]
    pub fn from_array(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// 形状 (高, 宽, 切片数).
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 切片个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// 是否没有任何体素?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 底层数据.
    #[inline]
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// 取出底层数据.
    #[inline]
    pub fn into_inner(self) -> Array3<f32> {
        self.data
    }

    /// 第 `z` 张切片.
    ///
    /// # 注意
    ///
    /// `z` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(2), z)
    }

    /// 标量场的 (最小值, 最大值). 空体数据返回 `None`.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.data.iter().copied().minmax().into_option()
    }

    /// 以 zlib 压缩的 bincode 格式保存到 `path`. 已存在的文件会被覆盖.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> PipelineResult<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
        let mut e = ZlibEncoder::new(BufWriter::new(file), Compression::default());
        bincode::serialize_into(&mut e, self).map_err(|err| PipelineError::artifact(path, err))?;
        let mut inner = e.finish().map_err(|err| PipelineError::io(path, err))?;
        inner.flush().map_err(|err| PipelineError::io(path, err))
    }

    /// 读取由 [`Volume::save`] 保存的体数据.
    pub fn load<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        let d = ZlibDecoder::new(BufReader::new(file));
        bincode::deserialize_from(d).map_err(|e| PipelineError::artifact(path, e))
    }
}
