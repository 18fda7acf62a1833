//! 基于 plotly 的三维网格 HTML 页面.

use crate::error::{PipelineError, PipelineResult};
use crate::surface::IsoMesh;
use serde_json::{json, Value};
use std::path::Path;

/// 页面加载的 plotly.js 地址.
pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

/// 网格的颜色.
pub const MESH_COLOR: &str = "lightpink";

/// 生成 plotly `mesh3d` 轨迹. `x`, `y`, `z` 依次是顶点的三个坐标列, `i`, `j`, `k` 是三角形的三个顶点下标列.
pub fn mesh_trace(mesh: &IsoMesh) -> Value {
    let column = |c: usize| mesh.vertices.iter().map(|v| v[c]).collect::<Vec<_>>();
    let corner = |c: usize| mesh.faces.iter().map(|f| f[c]).collect::<Vec<_>>();
    json!({
        "type": "mesh3d",
        "x": column(0),
        "y": column(1),
        "z": column(2),
        "i": corner(0),
        "j": corner(1),
        "k": corner(2),
        "color": MESH_COLOR,
    })
}

/// 图表布局: 三个坐标轴按数据比例显示.
fn layout(title: &str) -> Value {
    json!({
        "title": title,
        "scene": { "aspectmode": "data" },
    })
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// 生成包含交互式三维网格的独立 HTML 页面.
///
/// 空网格生成一个只有说明文字的占位页面.
pub fn mesh_page(mesh: &IsoMesh, title: &str) -> String {
    let title_html = escape(title);
    if mesh.is_empty() {
        return format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title_html}</title></head>\n\
             <body>\n<h1>{title_html}</h1>\n\
             <p>The predicted volume never crosses the iso-level; no surface was extracted.</p>\n\
             </body>\n</html>\n"
        );
    }
    let data = Value::Array(vec![mesh_trace(mesh)]);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title_html}</title>\n\
         <script src=\"{PLOTLY_CDN}\"></script>\n</head>\n<body>\n\
         <div id=\"mesh\" style=\"width:100%;height:100vh;\"></div>\n\
         <script>\nPlotly.newPlot(\"mesh\", {data}, {layout});\n</script>\n\
         </body>\n</html>\n",
        layout = layout(title),
    )
}

/// 将 [`mesh_page`] 写到 `path`, 覆盖已有文件. 空网格会记录一条警告.
pub fn write_mesh_html<P: AsRef<Path>>(mesh: &IsoMesh, title: &str, path: P) -> PipelineResult<()> {
    let path = path.as_ref();
    if mesh.is_empty() {
        log::warn!(
            "empty iso-surface, writing placeholder page `{}`",
            path.display()
        );
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    std::fs::write(path, mesh_page(mesh, title)).map_err(|e| PipelineError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> IsoMesh {
        IsoMesh {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, 0.5]],
            faces: vec![[0, 1, 2]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            values: vec![1.0; 3],
        }
    }

    #[test]
    fn test_trace_columns() {
        let t = mesh_trace(&triangle());
        assert_eq!(t["type"], "mesh3d");
        assert_eq!(t["x"], json!([0.0, 1.0, 0.0]));
        assert_eq!(t["y"], json!([0.0, 0.0, 2.0]));
        assert_eq!(t["z"], json!([0.0, 0.0, 0.5]));
        assert_eq!(t["i"], json!([0]));
        assert_eq!(t["k"], json!([2]));
        assert_eq!(t["color"], MESH_COLOR);
    }

    #[test]
    fn test_page() {
        let page = mesh_page(&triangle(), "Glioblastoma <3D>");
        assert!(page.contains("Plotly.newPlot"));
        assert!(page.contains("\"aspectmode\":\"data\""));
        assert!(page.contains("Glioblastoma &lt;3D&gt;"));

        let empty = mesh_page(&IsoMesh::default(), "x");
        assert!(!empty.contains("Plotly.newPlot"));
        assert!(empty.contains("no surface"));
    }

    #[test]
    fn test_write_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("volume.html");
        write_mesh_html(&IsoMesh::default(), "x", &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<html>"));
    }
}
