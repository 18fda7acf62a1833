//! Marching cubes 等值面提取.

use super::cases::{CORNERS, EDGES, TABLE};
use crate::data::Volume;
use crate::Idx3d;
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 等值面三角网格. 坐标为体素索引坐标 (h, w, z).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IsoMesh {
    /// 顶点坐标.
    pub vertices: Vec<[f32; 3]>,

    /// 三角形的顶点下标. 从外部 (标量较小的一侧) 看为逆时针.
    pub faces: Vec<[u32; 3]>,

    /// 单位法向, 指向标量减小的方向.
    pub normals: Vec<[f32; 3]>,

    /// 每个顶点所在网格棱两端采样值中的较大者.
    pub values: Vec<f32>,
}

impl IsoMesh {
    /// 是否没有任何三角形? 标量场处处不穿越阈值时为真.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// 顶点个数.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// 三角形个数.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// 顶点坐标的轴对齐包围盒 (最小角, 最大角). 空网格返回 `None`.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(mut lo, mut hi), v| {
            for i in 0..3 {
                lo[i] = lo[i].min(v[i]);
                hi[i] = hi[i].max(v[i]);
            }
            (lo, hi)
        }))
    }
}

/// 沿各轴的中心差分梯度, 边界处退化为单侧差分.
fn gradient(data: &Array3<f32>, (h, w, z): Idx3d) -> [f32; 3] {
    let (nh, nw, nz) = data.dim();
    let axis = |i: usize, n: usize, at: &dyn Fn(usize) -> Idx3d| {
        let lo = i.saturating_sub(1);
        let hi = (i + 1).min(n - 1);
        match hi - lo {
            0 => 0.0,
            step => (data[at(hi)] - data[at(lo)]) / step as f32,
        }
    };
    [
        axis(h, nh, &|i| (i, w, z)),
        axis(w, nw, &|i| (h, i, z)),
        axis(z, nz, &|i| (h, w, i)),
    ]
}

fn normalized([x, y, z]: [f32; 3]) -> [f32; 3] {
    let n = (x * x + y * y + z * z).sqrt();
    if n > f32::EPSILON {
        [x / n, y / n, z / n]
    } else {
        [0.0; 3]
    }
}

/// 增量构造网格, 同一条网格棱上的顶点只生成一次.
struct Builder<'a> {
    data: &'a Array3<f32>,
    level: f32,
    mesh: IsoMesh,
    cache: HashMap<(Idx3d, usize), u32>,
}

impl<'a> Builder<'a> {
    fn new(data: &'a Array3<f32>, level: f32) -> Self {
        Self {
            data,
            level,
            mesh: IsoMesh::default(),
            cache: HashMap::new(),
        }
    }

    /// 网格点 `a`, `b` 相邻, 且恰有一个在阈值之上.
    fn vertex(&mut self, a: Idx3d, b: Idx3d) -> u32 {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let axis = if lo.0 != hi.0 {
            0
        } else if lo.1 != hi.1 {
            1
        } else {
            2
        };
        if let Some(&id) = self.cache.get(&(lo, axis)) {
            return id;
        }

        let (va, vb) = (self.data[lo], self.data[hi]);
        let t = (self.level - va) / (vb - va);
        let lerp = |p: usize, q: usize| p as f32 + t * (q as f32 - p as f32);
        let (ga, gb) = (gradient(self.data, lo), gradient(self.data, hi));
        let g = [0, 1, 2].map(|i| -(ga[i] + t * (gb[i] - ga[i])));

        let id = self.mesh.vertices.len() as u32;
        self.mesh.vertices.push([
            lerp(lo.0, hi.0),
            lerp(lo.1, hi.1),
            lerp(lo.2, hi.2),
        ]);
        self.mesh.normals.push(normalized(g));
        self.mesh.values.push(va.max(vb));
        self.cache.insert((lo, axis), id);
        id
    }

    fn cell(&mut self, (h, w, z): Idx3d) {
        let corner = |c: usize| {
            let [dh, dw, dz] = CORNERS[c];
            (h + dh, w + dw, z + dz)
        };
        let case = (0..8).fold(0usize, |acc, c| {
            if self.data[corner(c)] > self.level {
                acc | (1 << c)
            } else {
                acc
            }
        });
        for &tri in TABLE[case].iter() {
            let face = tri.map(|e| {
                let (a, b) = EDGES[e as usize];
                self.vertex(corner(a), corner(b))
            });
            self.mesh.faces.push(face);
        }
    }
}

/// 在 `level` 处提取 `volume` 的等值面 (marching cubes).
///
/// 值严格大于 `level` 的体素视为内部. 顶点在网格棱上线性插值, 相邻单元共享顶点,
/// 因此内部的等值面是闭合且定向一致的.
///
/// 标量场处处不穿越 `level` 时返回空网格, 这不是错误; 调用方应检查 [`IsoMesh::is_empty`].
pub fn marching_cubes(volume: &Volume, level: f32) -> IsoMesh {
    let data = volume.data();
    let (nh, nw, nz) = data.dim();
    let mut builder = Builder::new(data, level);
    if nh < 2 || nw < 2 || nz < 2 {
        return builder.mesh;
    }
    for h in 0..nh - 1 {
        for w in 0..nw - 1 {
            for z in 0..nz - 1 {
                builder.cell((h, w, z));
            }
        }
    }
    log::debug!(
        "marching cubes at {level}: {} vertices, {} faces",
        builder.mesh.vertex_count(),
        builder.mesh.face_count()
    );
    builder.mesh
}
