//! 可视化输出: 二维对比图与三维网格页面.

mod figure;
mod html;

pub use figure::{ComparisonFigure, PANEL_GAP};
pub use html::{mesh_page, mesh_trace, write_mesh_html, MESH_COLOR, PLOTLY_CDN};
