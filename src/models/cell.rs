//! # 晶胞与取向矩阵数据模型
//!
//! 指标化的输出产物：Miller 指数、晶胞参数、UB 取向矩阵。
//!
//! ## 依赖关系
//! - 被 `indexing/cell.rs`, `indexing/simulate.rs` 和 `commands/` 使用
//! - 使用 `nalgebra`

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Miller 指数 (h, k, l)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexTriple {
    pub h: i32,
    pub k: i32,
    pub l: i32,
}

impl IndexTriple {
    pub fn new(h: i32, k: i32, l: i32) -> Self {
        IndexTriple { h, k, l }
    }

    pub fn as_vector(&self) -> Vector3<f64> {
        Vector3::new(self.h as f64, self.k as f64, self.l as f64)
    }

    pub fn is_origin(&self) -> bool {
        self.h == 0 && self.k == 0 && self.l == 0
    }
}

impl std::fmt::Display for IndexTriple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.h, self.k, self.l)
    }
}

/// 正空间晶胞参数（长度 Å，角度 度，体积 Å³）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub volume: f64,
    /// 晶胞标量 [a², b², c², b·c, a·c, a·b]
    pub scalars: [f64; 6],
}

impl CellParameters {
    /// 从 (a, b, c, alpha, beta, gamma) 构建，体积与标量由几何关系导出
    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        let rows = direct_rows(a, b, c, alpha, beta, gamma);
        let volume = rows.determinant();
        let (ra, rb, rc) = (rows.row(0), rows.row(1), rows.row(2));

        CellParameters {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
            volume,
            scalars: [
                ra.dot(&ra),
                rb.dot(&rb),
                rc.dot(&rc),
                rb.dot(&rc),
                ra.dot(&rc),
                ra.dot(&rb),
            ],
        }
    }

    /// 标准设置下的正空间基矢（行向量 a, b, c）
    pub fn direct_rows(&self) -> Matrix3<f64> {
        direct_rows(self.a, self.b, self.c, self.alpha, self.beta, self.gamma)
    }

    /// 度规张量 G = A·Aᵀ
    pub fn metric(&self) -> Matrix3<f64> {
        let [a2, b2, c2, bc, ac, ab] = self.scalars;
        Matrix3::new(a2, ab, ac, ab, b2, bc, ac, bc, c2)
    }
}

/// a 沿 x，b 在 xy 平面内
fn direct_rows(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Matrix3<f64> {
    let cos_alpha = alpha.to_radians().cos();
    let cos_beta = beta.to_radians().cos();
    let cos_gamma = gamma.to_radians().cos();
    let sin_gamma = gamma.to_radians().sin();

    let c1 = c * cos_beta;
    let c2 = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
    let c3 = (c * c - c1 * c1 - c2 * c2).sqrt();

    Matrix3::new(
        a,
        0.0,
        0.0,
        b * cos_gamma,
        b * sin_gamma,
        0.0,
        c1,
        c2,
        c3,
    )
}

/// UB 取向矩阵：q = UB · (h, k, l)ᵀ
///
/// 列为倒格矢 a*, b*, c*（Å⁻¹，不含 2π 因子）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationMatrix {
    pub matrix: Matrix3<f64>,
}

impl OrientationMatrix {
    pub fn new(matrix: Matrix3<f64>) -> Self {
        OrientationMatrix { matrix }
    }

    /// 由晶胞参数与转动矩阵构建：UB = U · B
    pub fn from_cell(cell: &CellParameters, rotation: &Matrix3<f64>) -> Option<Self> {
        let reciprocal = cell.direct_rows().try_inverse()?;
        Some(OrientationMatrix::new(rotation * reciprocal))
    }

    /// (h, k, l) 对应的衍射矢量
    pub fn diffraction_vector(&self, hkl: &IndexTriple) -> Vector3<f64> {
        self.matrix * hkl.as_vector()
    }

    /// 倒格矢（UB 的列）
    pub fn reciprocal_vectors(&self) -> [Vector3<f64>; 3] {
        [
            self.matrix.column(0).into_owned(),
            self.matrix.column(1).into_owned(),
            self.matrix.column(2).into_owned(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_from_parameters_cubic() {
        let cell = CellParameters::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0);

        assert!((cell.volume - 125.0).abs() < 1e-6);
        assert!((cell.scalars[0] - 25.0).abs() < 1e-9);
        assert!(cell.scalars[3].abs() < 1e-9);
    }

    #[test]
    fn test_cell_hexagonal_metric() {
        let cell = CellParameters::from_parameters(3.0, 3.0, 5.0, 90.0, 90.0, 120.0);
        let g = cell.metric();

        // a·b = a b cos(120°)
        assert!((g[(0, 1)] - (-4.5)).abs() < 1e-9);
        assert!((g[(2, 2)] - 25.0).abs() < 1e-9);
        // V = a² c sin(120°)
        assert!((cell.volume - 9.0 * 5.0 * (3.0_f64).sqrt() / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_orientation_maps_hkl_to_reciprocal_vectors() {
        let cell = CellParameters::from_parameters(4.0, 5.0, 8.0, 90.0, 90.0, 90.0);
        let ub = OrientationMatrix::from_cell(&cell, &Matrix3::identity()).unwrap();

        let q = ub.diffraction_vector(&IndexTriple::new(1, 2, 4));
        assert!((q[0] - 0.25).abs() < 1e-12);
        assert!((q[1] - 0.4).abs() < 1e-12);
        assert!((q[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_index_triple_display() {
        assert_eq!(IndexTriple::new(1, -1, 0).to_string(), "(1 -1 0)");
        assert!(IndexTriple::new(0, 0, 0).is_origin());
    }
}
