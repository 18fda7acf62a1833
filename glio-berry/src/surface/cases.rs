//! 立方体的拓扑常量, 以及由此推导的 256 种情形的三角剖分表.
//!
//! 角点 `i` 的 (dh, dw, dz) 偏移见 [`CORNERS`]. 值严格大于等值面阈值的角点为 "内部".

use once_cell::sync::Lazy;

/// 角点相对单元原点的偏移 (dh, dw, dz).
pub(crate) const CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// 12 条棱的两个端点.
pub(crate) const EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// 6 个面的角点, 从立方体外部看为逆时针.
const FACES: [[usize; 4]; 6] = [
    [0, 3, 2, 1],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [2, 3, 7, 6],
    [0, 4, 7, 3],
    [1, 2, 6, 5],
];

/// `FACE_EDGES[f][i]` 是连接 `FACES[f][i]` 与 `FACES[f][(i + 1) % 4]` 的棱.
const FACE_EDGES: [[usize; 4]; 6] = [
    [3, 2, 1, 0],
    [4, 5, 6, 7],
    [0, 9, 4, 8],
    [2, 11, 6, 10],
    [8, 7, 11, 3],
    [1, 10, 5, 9],
];

/// 一个三角形, 元素为棱编号.
pub(crate) type EdgeTri = [u8; 3];

/// 按角点内外状态 (第 `i` 位对应角点 `i`) 索引的三角剖分表.
pub(crate) static TABLE: Lazy<Vec<Vec<EdgeTri>>> =
    Lazy::new(|| (0..=u8::MAX).map(triangulate).collect());

/// 两条棱是否位于同一个面上?
fn coplanar(a: usize, b: usize) -> bool {
    FACE_EDGES
        .iter()
        .any(|f| f.contains(&a) && f.contains(&b))
}

/// 对单个情形做三角剖分.
///
/// 先在每个面上把穿越棱连成有向线段 (内部角点在线段左侧), 有四个穿越点的歧义面把内部角点
/// 各自切开. 线段首尾相接形成若干闭环, 每个闭环以扇形剖分. 扇形的根选为第一个与其余
/// 非相邻顶点都不共面的顶点, 否则会生成贴在立方体面上的退化三角形.
fn triangulate(case: u8) -> Vec<EdgeTri> {
    let inside = |c: usize| case & (1 << c) != 0;
    let mut next: [Option<usize>; 12] = [None; 12];

    for (corners, edges) in FACES.iter().zip(FACE_EDGES.iter()) {
        let crossings = (0..4)
            .filter(|&i| inside(corners[i]) != inside(corners[(i + 1) % 4]))
            .count();
        match crossings {
            2 => {
                let mut entry = None;
                let mut exit = None;
                for i in 0..4 {
                    let (a, b) = (corners[i], corners[(i + 1) % 4]);
                    if inside(a) != inside(b) {
                        if inside(b) {
                            entry = Some(edges[i]);
                        } else {
                            exit = Some(edges[i]);
                        }
                    }
                }
                if let (Some(exit), Some(entry)) = (exit, entry) {
                    next[exit] = Some(entry);
                }
            }
            4 => {
                for i in 0..4 {
                    if inside(corners[i]) {
                        next[edges[i]] = Some(edges[(i + 3) % 4]);
                    }
                }
            }
            _ => {}
        }
    }

    let mut tris = Vec::new();
    let mut seen = [false; 12];
    for start in 0..12 {
        if seen[start] || next[start].is_none() {
            continue;
        }
        let mut ring = vec![start];
        seen[start] = true;
        let mut e = next[start];
        while let Some(cur) = e {
            if cur == start || seen[cur] {
                break;
            }
            ring.push(cur);
            seen[cur] = true;
            e = next[cur];
        }

        let n = ring.len();
        let root = (0..n)
            .find(|&r| (2..n.saturating_sub(1)).all(|k| !coplanar(ring[r], ring[(r + k) % n])))
            .unwrap_or(0);
        ring.rotate_left(root);
        for i in 1..n.saturating_sub(1) {
            tris.push([ring[0] as u8, ring[i + 1] as u8, ring[i] as u8]);
        }
    }
    tris
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_face_edges_match_corners() {
        for (corners, edges) in FACES.iter().zip(FACE_EDGES.iter()) {
            for i in 0..4 {
                let (p, q) = EDGES[edges[i]];
                let (a, b) = (corners[i], corners[(i + 1) % 4]);
                assert!((p, q) == (a, b) || (p, q) == (b, a));
            }
        }
    }

    #[test]
    fn test_trivial_cases() {
        assert!(TABLE[0].is_empty());
        assert!(TABLE[255].is_empty());
        assert_eq!(TABLE[1], vec![[0, 3, 8]]);
        assert_eq!(TABLE[3].len(), 2);
        // 对角的两个角点互不相连.
        assert_eq!(TABLE[0b1000_0001].len(), 2);
        assert!(TABLE.iter().all(|t| t.len() <= 5));
    }

    #[test]
    fn test_complement_uses_same_edges() {
        for case in 0..=u8::MAX {
            let mut a: Vec<u8> = TABLE[case as usize].iter().flatten().copied().collect();
            let mut b: Vec<u8> = TABLE[!case as usize].iter().flatten().copied().collect();
            a.sort_unstable();
            a.dedup();
            b.sort_unstable();
            b.dedup();
            assert_eq!(a, b, "case {case:#010b}");
        }
    }

    #[test]
    fn test_no_degenerate_triangles() {
        for (case, tris) in TABLE.iter().enumerate() {
            for t in tris {
                assert!(t[0] != t[1] && t[1] != t[2] && t[0] != t[2], "case {case}");
                // 三条棱不能共面, 否则三角形贴在立方体面上.
                let all_on_face = FACE_EDGES.iter().any(|f| {
                    t.iter().all(|&e| f.contains(&(e as usize)))
                });
                assert!(!all_on_face, "case {case}: {t:?}");
            }
        }
    }

    #[test]
    fn test_rings_close_inside_cell() {
        // 每个情形内, 除立方体面上的棱外, 每条有向边都有反向边与之配对.
        for (case, tris) in TABLE.iter().enumerate() {
            let mut count: HashMap<(u8, u8), i32> = HashMap::new();
            for t in tris {
                for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                    *count.entry((a, b)).or_default() += 1;
                    *count.entry((b, a)).or_default() -= 1;
                }
            }
            for (&(a, b), &c) in &count {
                if c != 0 {
                    assert!(coplanar(a as usize, b as usize), "case {case}: ({a}, {b})");
                }
            }
        }
    }
}
