//! # 3×3 矩阵工具
//!
//! 行列式、伴随矩阵求逆、叉积以及行向量与矩阵之间的转换。
//! 存储类型为 `nalgebra::Matrix3<f64>`，约定每一行是一个晶格矢量。
//!
//! ## 依赖关系
//! - 被 `indexing/` 下所有模块使用

use nalgebra::{Matrix3, Vector3};

/// 行列式（按第一行展开）
pub fn determinant(m: &Matrix3<f64>) -> f64 {
    m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
        - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
        + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
}

/// 伴随矩阵求逆
///
/// 只有行列式恰好为 0 时返回 `None`；接近奇异的矩阵照常求逆，
/// 由调用方用自己的阈值判断是否共面。
pub fn invert(m: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    let det = determinant(m);
    if det == 0.0 || !det.is_finite() {
        return None;
    }

    let [r0, r1, r2] = rows(m);
    // 伴随矩阵的列是两两叉积
    let adj = Matrix3::from_columns(&[cross(&r1, &r2), cross(&r2, &r0), cross(&r0, &r1)]);

    Some(adj / det)
}

/// 向量叉积
pub fn cross(a: &Vector3<f64>, b: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    )
}

/// 拆分为三个行向量
pub fn rows(m: &Matrix3<f64>) -> [Vector3<f64>; 3] {
    [
        m.row(0).transpose(),
        m.row(1).transpose(),
        m.row(2).transpose(),
    ]
}

/// 由三个行向量组装矩阵
pub fn from_rows(rows: &[Vector3<f64>; 3]) -> Matrix3<f64> {
    Matrix3::from_rows(&[
        rows[0].transpose(),
        rows[1].transpose(),
        rows[2].transpose(),
    ])
}
