//! # 精修循环
//!
//! 显式状态机：
//!
//! ```text
//! BuildCandidate → ProjectPeaks → Search → Refit → Orthogonalize → CheckIntegerFit
//!        ↑                                                               │
//!        └─────────────────────── 重试（容差继续放宽） ──────────────────┤
//!                                                                        ↓
//!                                                                     Accept
//! ```
//!
//! 搜索在首轮恰好停在 0.100 时，容差被重置为 -0.010 重新开始，
//! 以找到更紧的容差。该轮不计入容差历史。
//!
//! ## 依赖关系
//! - 被 `indexing/mod.rs` 调用
//! - 使用 `indexing/search.rs`, `indexing/reduction.rs`, `indexing/cell.rs`

use super::cell::assign_indices;
use super::log::RunLog;
use super::matrix::{determinant, invert, rows};
use super::reduction::{orthogonalize, CanonicalBasis};
use super::search::IndexSearch;
use super::{IndexFailure, IndexOptions};
use crate::models::VectorSet;
use nalgebra::{Matrix3, Vector3};

/// 被接受的拟合
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedFit {
    pub basis: CanonicalBasis,
    /// 最终容差
    pub tolerance: f64,
    /// 每轮整数检查的容差，非递减
    pub tolerance_history: Vec<f64>,
    /// 累计尝试的容差级数
    pub escalations: usize,
    /// 最终仍有峰超出容差
    pub mismatched: bool,
}

/// 状态机的阶段
#[derive(Debug)]
enum Phase {
    BuildCandidate,
    ProjectPeaks { frame: Matrix3<f64> },
    Search { coords: Vec<Vector3<f64>> },
    Refit { indices: Vec<Vector3<f64>> },
    Orthogonalize { ub: Matrix3<f64> },
    CheckIntegerFit { basis: CanonicalBasis },
    Accept { basis: CanonicalBasis, mismatched: bool },
}

/// 精修循环
pub struct RefinementLoop<'a> {
    options: &'a IndexOptions,
}

impl<'a> RefinementLoop<'a> {
    pub fn new(options: &'a IndexOptions) -> Self {
        RefinementLoop { options }
    }

    /// 以约化后的基矢 `basis`（行向量）为起点运行到接受或失败
    pub fn run(
        &self,
        basis: &Matrix3<f64>,
        set: &VectorSet,
        log: &mut RunLog,
    ) -> Result<AcceptedFit, IndexFailure> {
        let policy = &self.options.tolerance;

        // 基矢三行在前，其后为全部峰
        let mut augmented: Vec<Vector3<f64>> = rows(basis).to_vec();
        augmented.extend(set.vectors().iter().map(|v| v.as_vector()));

        let mut tolerance = policy.initial;
        let mut history = Vec::new();
        let mut escalations = 0;
        let mut restarted = false;
        // 每次重试至少放宽一级，重置最多一次
        let search_budget = policy.max_levels(policy.initial.min(policy.seed_restart)) + 2;
        let mut searches = 0;
        let mut phase = Phase::BuildCandidate;

        loop {
            phase = match phase {
                Phase::BuildCandidate => {
                    // 列为基矢
                    let frame = invert(&basis.transpose()).ok_or(IndexFailure::AllCoplanar {
                        examined: set.len(),
                    })?;
                    Phase::ProjectPeaks { frame }
                }

                Phase::ProjectPeaks { frame } => Phase::Search {
                    coords: augmented.iter().map(|q| frame * q).collect(),
                },

                Phase::Search { coords } => {
                    searches += 1;
                    if searches > search_budget {
                        return Err(IndexFailure::NonIntegerIndices { tolerance });
                    }
                    let outcome = IndexSearch::new(&coords, policy).run(tolerance)?;
                    escalations += outcome.attempts;
                    tolerance = outcome.tolerance;

                    if !restarted && (tolerance - policy.seed_trigger).abs() < 1e-5 {
                        restarted = true;
                        log.line(format!(
                            "FIRST FIT AT {:.3}, RESTARTING AT {:.3}",
                            tolerance, policy.seed_restart
                        ));
                        tolerance = policy.seed_restart;
                        Phase::BuildCandidate
                    } else {
                        Phase::Refit {
                            indices: outcome
                                .indices
                                .iter()
                                .map(|h| Vector3::new(h[0] as f64, h[1] as f64, h[2] as f64))
                                .collect(),
                        }
                    }
                }

                Phase::Refit { indices } => {
                    let ub = least_squares(&augmented, &indices)
                        .ok_or(IndexFailure::NonIntegerIndices { tolerance })?;
                    Phase::Orthogonalize { ub }
                }

                Phase::Orthogonalize { ub } => {
                    let basis =
                        orthogonalize(&ub).ok_or(IndexFailure::NonIntegerIndices { tolerance })?;
                    Phase::CheckIntegerFit { basis }
                }

                Phase::CheckIntegerFit { basis } => {
                    history.push(tolerance);
                    let peaks = assign_indices(&basis.direct, set, tolerance);
                    let mismatched = peaks.iter().any(|p| !p.within_tolerance);

                    if self.options.multiplicity_weight > 0.0 && mismatched {
                        log.line(format!("RETRY: PEAKS OUTSIDE {:.3}", tolerance));
                        Phase::BuildCandidate
                    } else if self.volume_excluded(&basis) {
                        log.line(format!("RETRY: VOLUME EXCLUDED AT {:.3}", tolerance));
                        Phase::BuildCandidate
                    } else {
                        Phase::Accept { basis, mismatched }
                    }
                }

                Phase::Accept { basis, mismatched } => {
                    log.blank();
                    log.line("******************");
                    log.line(format!(" ERROR LIMIT={:.3}", tolerance));
                    log.blank();
                    log.line(" REDUCED CELL");

                    return Ok(AcceptedFit {
                        basis,
                        tolerance,
                        tolerance_history: history,
                        escalations,
                        mismatched,
                    });
                }
            };
        }
    }

    /// 体积落在排除值 ±窗口内
    fn volume_excluded(&self, basis: &CanonicalBasis) -> bool {
        let Some(excluded) = self.options.excluded_volume else {
            return false;
        };
        let det = determinant(&basis.ub);
        if det == 0.0 {
            return false;
        }
        let volume = 1.0 / det.abs();
        (volume - excluded).abs() < self.options.tolerance.volume_window
    }
}

/// 最小二乘拟合 UB：min Σ |q - UB·h|²，UB = (Σ q hᵀ)(Σ h hᵀ)⁻¹
pub fn least_squares(vectors: &[Vector3<f64>], indices: &[Vector3<f64>]) -> Option<Matrix3<f64>> {
    let mut qh = Matrix3::zeros();
    let mut hh = Matrix3::zeros();
    for (q, h) in vectors.iter().zip(indices) {
        qh += q * h.transpose();
        hh += h * h.transpose();
    }
    Some(qh * invert(&hh)?)
}
