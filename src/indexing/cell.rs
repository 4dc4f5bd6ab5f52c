//! # 指数分配与晶胞提取
//!
//! - `assign_indices`: h = D·q 四舍五入，记录最大偏差
//! - `extract_cell`: 由规范化基矢求体积、晶胞标量、a/b/c 与三个夹角，
//!   组装 UB 矩阵并写入日志
//!
//! ## 依赖关系
//! - 被 `indexing/refine.rs` 和 `indexing/mod.rs` 调用
//! - 使用 `models/cell.rs`, `models/result.rs`

use super::log::RunLog;
use super::matrix::{determinant, rows};
use super::reduction::CanonicalBasis;
use crate::models::{CellParameters, IndexTriple, IndexedPeak, OrientationMatrix, VectorSet};
use nalgebra::{Matrix3, Vector3};

/// 为每个峰分配 Miller 指数
///
/// 取整方式为四舍五入（.5 远离 0）。任一坐标偏差超过 `tolerance` 的峰
/// 标记为超出容差。
pub fn assign_indices(direct: &Matrix3<f64>, set: &VectorSet, tolerance: f64) -> Vec<IndexedPeak> {
    set.iter()
        .map(|(seq, v)| {
            let h = direct * v.as_vector();
            let rounded = h.map(f64::round);
            let residual = (h - rounded).amax();

            IndexedPeak {
                seq,
                hkl: IndexTriple::new(rounded[0] as i32, rounded[1] as i32, rounded[2] as i32),
                residual,
                within_tolerance: residual <= tolerance,
            }
        })
        .collect()
}

/// 两矢量夹角（度）
///
/// 反正切形式：atan(√(1-c²)/c)，结果为负时加 180°。
fn legacy_angle(x: &Vector3<f64>, y: &Vector3<f64>) -> f64 {
    let c = (x.dot(y) / (x.norm() * y.norm())).clamp(-1.0, 1.0);
    let angle = ((1.0 - c * c).sqrt() / c).atan().to_degrees();
    if angle < 0.0 || (angle == 0.0 && c < 0.0) {
        angle + 180.0
    } else {
        angle
    }
}

/// 由规范化基矢提取晶胞参数与取向矩阵
pub fn extract_cell(
    basis: &CanonicalBasis,
    peaks: &[IndexedPeak],
    log: &mut RunLog,
) -> (CellParameters, OrientationMatrix) {
    let volume = 1.0 / determinant(&basis.reciprocal_rows());
    let [a, b, c] = rows(&basis.direct);

    let scalars = [
        a.dot(&a),
        b.dot(&b),
        c.dot(&c),
        b.dot(&c),
        a.dot(&c),
        a.dot(&b),
    ];

    let cell = CellParameters {
        a: a.norm(),
        b: b.norm(),
        c: c.norm(),
        alpha: legacy_angle(&b, &c),
        beta: legacy_angle(&a, &c),
        gamma: legacy_angle(&a, &b),
        volume,
        scalars,
    };
    let orientation = OrientationMatrix::new(basis.ub);

    log.blank();
    log.line(format!(" CELL VOLUME={:12.4}", cell.volume));
    log.blank();
    log.line(" *** CELL SCALARS ***");
    log.line(format!(
        "{:12.4} {:12.4} {:12.4}",
        scalars[0], scalars[1], scalars[2]
    ));
    log.line(format!(
        "{:12.4} {:12.4} {:12.4}",
        scalars[3], scalars[4], scalars[5]
    ));
    log.blank();
    log.line(format!(
        " A={:10.4} B={:10.4} C={:10.4}",
        cell.a, cell.b, cell.c
    ));
    log.line(format!(
        " ALPHA={:8.3} BETA={:8.3} GAMMA={:8.3}",
        cell.alpha, cell.beta, cell.gamma
    ));
    log.blank();
    log.line("#   SEQ   H   K   L");
    for (i, p) in peaks.iter().enumerate() {
        log.line(format!(
            "{:4} {:5} {:3} {:3} {:3}",
            i + 1,
            p.seq,
            p.hkl.h,
            p.hkl.k,
            p.hkl.l
        ));
    }
    log.blank();
    log.line(" ORIENTATION MATRIX");
    for row in orientation.matrix.row_iter() {
        log.line(format!("{:12.6} {:12.6} {:12.6}", row[0], row[1], row[2]));
    }

    (cell, orientation)
}
