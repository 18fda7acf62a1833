//! 预测结果的后处理.
//!
//! 目前只有二维形态学去噪. 网络输出的概率图先经开运算去除孤立亮点, 再交给可视化或三维重建.

mod morph;

pub use morph::{dilation, erosion, opening, remove_blur};
