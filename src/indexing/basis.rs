//! # 初始基矢选择
//!
//! 按模长从小到大排序衍射矢量，从最短的三个开始寻找不共面的组合，
//! 然后对选中的基矢做格点约化。
//!
//! ## 依赖关系
//! - 被 `indexing/mod.rs` 调用
//! - 使用 `indexing/matrix.rs`, `indexing/reduction.rs`

use super::log::RunLog;
use super::matrix::{cross, determinant, from_rows};
use super::reduction::reduce;
use super::IndexFailure;
use crate::models::VectorSet;
use nalgebra::{Matrix3, Vector3};

/// 至少需要的可用矢量数
pub const MIN_VECTORS: usize = 4;

/// 行列式绝对值低于该值视为共面
pub const COPLANAR_DETERMINANT: f64 = 1e-4;

/// 叉积分量阈值，决定共面时替换哪一行
const PAIR_CROSS_THRESHOLD: f64 = 0.05;

/// 选中的初始基矢
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedBasis {
    /// 约化后的基矢（行向量）
    pub basis: Matrix3<f64>,
    /// 被选中的三个矢量的峰序号
    pub sequence_ids: [i32; 3],
}

/// 选择三个不共面的最短矢量作为初始基矢
pub fn select_basis(set: &VectorSet, log: &mut RunLog) -> Result<SelectedBasis, IndexFailure> {
    let n = set.len();
    if n < MIN_VECTORS {
        return Err(IndexFailure::InsufficientPeaks {
            found: n,
            required: MIN_VECTORS,
        });
    }

    let vectors: Vec<Vector3<f64>> = set.vectors().iter().map(|v| v.as_vector()).collect();
    let magnitude: Vec<f64> = set
        .vectors()
        .iter()
        .map(|v| {
            let m = v.norm_squared();
            if m.is_nan() {
                0.9e9
            } else {
                m
            }
        })
        .collect();

    // 稳定排序，相等时保持输入顺序
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        magnitude[a]
            .partial_cmp(&magnitude[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut next = 3;
    let candidate = loop {
        let rows = [vectors[order[0]], vectors[order[1]], vectors[order[2]]];
        let basis = from_rows(&rows);
        if determinant(&basis).abs() >= COPLANAR_DETERMINANT {
            break basis;
        }
        if next >= n {
            log.line("ALL REFLECTIONS COPLANAR");
            return Err(IndexFailure::AllCoplanar { examined: n });
        }

        let pair = cross(&rows[0], &rows[1]);
        if pair.iter().any(|c| c.abs() >= PAIR_CROSS_THRESHOLD) {
            // 前两行足够独立，替换第三行
            order.swap(next, 2);
        } else {
            let tmp = order[next];
            order[next] = order[1];
            order[1] = order[2];
            order[2] = tmp;
        }
        next += 1;
    };

    let chosen = [order[0], order[1], order[2]];
    let ids = set.sequence_ids();
    let sequence_ids = [ids[chosen[0]], ids[chosen[1]], ids[chosen[2]]];
    log.line(format!(
        "BASIS PEAKS  SEQ {} {} {}",
        sequence_ids[0], sequence_ids[1], sequence_ids[2]
    ));

    let basis = reduce(candidate);
    for row in basis.row_iter() {
        log.line(format!("{:10.5} {:10.5} {:10.5}", row[0], row[1], row[2]));
    }

    Ok(SelectedBasis {
        basis,
        sequence_ids,
    })
}
