//! # 晶格约化与基矢规范化
//!
//! - `reduce`: 反复从一行中减去另一行的整数倍，使 B·Bᵀ 接近对角
//! - `orthogonalize`: 对精修后的 UB 取逆得到正空间基矢，约化、排序、
//!   定符号，再求逆得到规范化的倒空间基矢
//!
//! ## 依赖关系
//! - 被 `indexing/basis.rs` 和 `indexing/refine.rs` 调用
//! - 使用 `indexing/matrix.rs`

use super::matrix::{determinant, from_rows, invert, rows};
use nalgebra::Matrix3;

/// 约化迭代上限
pub const MAX_REDUCTION_STEPS: usize = 1000;

/// 整数比的取整偏移，略小于 0.5 以保证每步严格下降
const ROUNDING_OFFSET: f64 = 0.498;

/// 格点约化
///
/// 每一步计算相邻两行的点积与各自模长平方之比，取绝对值最大的整数比
/// 做一次行消去；最大值为 0 时基矢已约化。
pub fn reduce(basis: Matrix3<f64>) -> Matrix3<f64> {
    let mut r = rows(&basis);

    for _ in 0..MAX_REDUCTION_STEPS {
        let mut v = [0.0; 6];
        for j in 0..3 {
            let m = (j + 1) % 3;
            v[j] = r[j].dot(&r[j]);
            v[j + 3] = r[j].dot(&r[m]);
        }
        if v.iter().any(|x| !x.is_finite()) || v[..3].iter().any(|&x| x <= 0.0) {
            break;
        }

        let mut l = [0i64; 6];
        for j in 0..3 {
            let m = (j + 1) % 3;
            let offset = if v[j + 3] >= 0.0 {
                ROUNDING_OFFSET
            } else {
                -ROUNDING_OFFSET
            };
            l[j] = (v[j + 3] / v[j] + offset) as i64;
            l[j + 3] = (v[j + 3] / v[m] + offset) as i64;
        }

        // 第一个绝对值最大的位置
        let mut t = 0;
        let mut largest = 0;
        for (i, &x) in l.iter().enumerate() {
            if x.abs() > largest {
                largest = x.abs();
                t = i;
            }
        }
        if largest == 0 {
            break;
        }

        let factor = l[t] as f64;
        if t >= 3 {
            let j = t - 3;
            let m = (j + 1) % 3;
            r[j] -= r[m] * factor;
        } else {
            let m = (t + 1) % 3;
            r[m] -= r[t] * factor;
        }
    }

    from_rows(&r)
}

/// 规范化后的基矢对
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonicalBasis {
    /// 正空间基矢（行向量 a, b, c），h = direct · q
    pub direct: Matrix3<f64>,
    /// UB 矩阵（列为倒格矢 a*, b*, c*），q = ub · h
    pub ub: Matrix3<f64>,
}

impl CanonicalBasis {
    /// 倒格矢按行排列
    pub fn reciprocal_rows(&self) -> Matrix3<f64> {
        self.ub.transpose()
    }
}

/// 由精修后的 UB 得到规范化基矢
///
/// 行按模长升序（相等时保持原顺序），翻转符号使 a·b ≤ 0、a·c ≤ 0，
/// 并保证右手系。UB 或约化结果不可逆时返回 `None`。
pub fn orthogonalize(ub: &Matrix3<f64>) -> Option<CanonicalBasis> {
    let reduced = reduce(invert(ub)?);
    let r = rows(&reduced);

    let mut order = [0usize, 1, 2];
    order.sort_by(|&x, &y| {
        r[x].dot(&r[x])
            .partial_cmp(&r[y].dot(&r[y]))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut sorted = [r[order[0]], r[order[1]], r[order[2]]];

    // 相对阈值内的点积视为 0
    let positive = |x: &nalgebra::Vector3<f64>, y: &nalgebra::Vector3<f64>| {
        x.dot(y) > 1e-9 * x.norm() * y.norm()
    };
    if positive(&sorted[0], &sorted[1]) {
        sorted[1] = -sorted[1];
    }
    if positive(&sorted[0], &sorted[2]) {
        sorted[2] = -sorted[2];
    }

    let mut direct = from_rows(&sorted);
    let mut ub = invert(&direct)?;
    if determinant(&direct) < 0.0 {
        direct = -direct;
        ub = -ub;
    }

    Some(CanonicalBasis { direct, ub })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn gram_offdiag(m: &Matrix3<f64>) -> f64 {
        let r = rows(m);
        r[0].dot(&r[1]).abs() + r[1].dot(&r[2]).abs() + r[0].dot(&r[2]).abs()
    }

    #[test]
    fn test_reduce_orthogonal_is_unchanged() {
        let b = Matrix3::from_diagonal(&Vector3::new(0.2, 0.25, 0.1));
        assert_eq!(reduce(b), b);
    }

    #[test]
    fn test_reduce_removes_integer_shear() {
        // 行 2 = e2 + 3·e1，行 3 = e3 - 2·e2
        let b = Matrix3::new(1.0, 0.0, 0.0, 3.0, 1.0, 0.0, 0.0, -2.0, 1.0);
        let reduced = reduce(b);

        assert!(gram_offdiag(&reduced) < 1e-12);
        assert!((determinant(&reduced).abs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reduce_preserves_volume_and_shortens() {
        let b = Matrix3::new(0.2, 0.0, 0.0, 0.61, 0.25, 0.0, -0.4, 0.52, 0.13);
        let reduced = reduce(b);

        assert!((determinant(&reduced).abs() - determinant(&b).abs()).abs() < 1e-12);
        assert!(gram_offdiag(&reduced) < gram_offdiag(&b));
        let longest = |m: &Matrix3<f64>| rows(m).iter().map(|r| r.norm()).fold(0.0, f64::max);
        assert!(longest(&reduced) <= longest(&b));
    }

    #[test]
    fn test_reduce_degenerate_row_terminates() {
        let b = Matrix3::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        assert_eq!(reduce(b), b);
    }

    #[test]
    fn test_orthogonalize_orders_and_orients() {
        // 正空间行长度 3, 7, 5，排序后为左手系
        let direct = Matrix3::new(0.0, 0.0, 3.0, 7.0, 0.0, 0.0, 0.0, 5.0, 0.0);
        let ub = invert(&direct).unwrap();
        let canonical = orthogonalize(&ub).unwrap();

        let r = rows(&canonical.direct);
        assert!((r[0].norm() - 3.0).abs() < 1e-12);
        assert!((r[1].norm() - 5.0).abs() < 1e-12);
        assert!((r[2].norm() - 7.0).abs() < 1e-12);
        assert!(determinant(&canonical.direct) > 0.0);
        assert!(
            (canonical.direct * canonical.ub - Matrix3::identity()).norm() < 1e-12
        );
    }

    #[test]
    fn test_orthogonalize_sign_convention() {
        // a·b > 0, a·c > 0 的斜方基矢
        let direct = Matrix3::new(4.0, 0.0, 0.0, 1.0, 5.0, 0.0, 1.5, 0.5, 6.0);
        let canonical = orthogonalize(&invert(&direct).unwrap()).unwrap();
        let r = rows(&canonical.direct);

        assert!(r[0].dot(&r[1]) <= 1e-9);
        assert!(r[0].dot(&r[2]) <= 1e-9);
        assert!(determinant(&canonical.direct) > 0.0);
    }

    #[test]
    fn test_orthogonalize_singular() {
        assert!(orthogonalize(&Matrix3::zeros()).is_none());
    }
}
