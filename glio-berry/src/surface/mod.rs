//! 三维等值面提取.
//!
//! 以 marching cubes 从逐切片预测堆叠成的 [`Volume`](crate::data::Volume) 中提取三角网格.
//! 立方体 256 种情形的剖分表在首次使用时由面遍历推导, 歧义面把内部角点彼此分开.

mod cases;
mod march;

pub use march::{marching_cubes, IsoMesh};
