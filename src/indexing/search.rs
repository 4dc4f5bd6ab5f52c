//! # 整数指数搜索
//!
//! 在当前基矢坐标下寻找三组整数行 (k, l, m)，使每个矢量的坐标经线性组合后
//! 都落在整数附近，从而把分数坐标替换为整数指数。
//!
//! 坐标按 ×512 定点量化（四舍五入）。每次尝试先把容差增加一步，
//! 超过上限即判定失败。
//!
//! ## 依赖关系
//! - 被 `indexing/refine.rs` 调用
//! - 使用 `indexing/mod.rs` 的 `TolerancePolicy`, `IndexFailure`

use super::{IndexFailure, TolerancePolicy};
use nalgebra::Vector3;

/// 定点量化倍数
pub const QUANTUM: i64 = 512;

/// 判断定点值 `s` 是否接近某个整数，返回该整数
///
/// 取整方式为四舍五入（负数向远离 0 方向）；偏差必须严格小于 `window`。
pub fn nearest_within(s: i64, window: i64) -> Option<i64> {
    let half = QUANTUM / 2;
    let lb = if s >= 0 {
        (s + half) / QUANTUM
    } else {
        (s - half) / QUANTUM
    };

    if (s - lb * QUANTUM).abs() < window {
        Some(lb)
    } else {
        None
    }
}

/// 一次搜索的结果
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// 每个矢量在新基下的整数坐标
    pub indices: Vec<[i64; 3]>,
    /// 找到解时的容差
    pub tolerance: f64,
    /// 本次搜索尝试的容差级数
    pub attempts: usize,
}

/// 整数指数搜索器
pub struct IndexSearch<'a> {
    quantized: Vec<[i64; 3]>,
    policy: &'a TolerancePolicy,
}

impl<'a> IndexSearch<'a> {
    /// `coords` 为所有矢量在当前基矢下的分数坐标，最后一个为目标矢量
    pub fn new(coords: &[Vector3<f64>], policy: &'a TolerancePolicy) -> Self {
        let q = QUANTUM as f64;
        let quantized = coords
            .iter()
            .map(|c| {
                [
                    (c[0] * q).round() as i64,
                    (c[1] * q).round() as i64,
                    (c[2] * q).round() as i64,
                ]
            })
            .collect();

        IndexSearch { quantized, policy }
    }

    /// 从 `start` 容差开始逐级放宽，直到找到三组独立的整数行
    pub fn run(&self, start: f64) -> Result<SearchOutcome, IndexFailure> {
        let mut tolerance = start;
        let mut attempts = 0;
        let limit = self.policy.max_levels(start);

        loop {
            let next = tolerance + self.policy.step;
            // 步长过小时容差不再增长
            if !(next > tolerance) || attempts >= limit {
                return Err(IndexFailure::NonIntegerIndices { tolerance });
            }
            tolerance = next;
            if tolerance > self.policy.ceiling + 1e-9 {
                return Err(IndexFailure::NonIntegerIndices { tolerance });
            }
            attempts += 1;

            let window = (tolerance * QUANTUM as f64) as i64;
            if let Some(indices) = self.attempt(window) {
                return Ok(SearchOutcome {
                    indices,
                    tolerance,
                    attempts,
                });
            }
        }
    }

    /// 在给定窗口下按壳层扫描候选行
    fn attempt(&self, window: i64) -> Option<Vec<[i64; 3]>> {
        if self.quantized.is_empty() {
            return None;
        }
        let mut accepted: Vec<Vec<i64>> = Vec::with_capacity(3);

        for shell in 1..=self.policy.max_shell {
            for c in 0..=shell {
                for b in 0..=shell {
                    for a in 0..=shell {
                        if a.max(b).max(c) != shell {
                            continue;
                        }
                        for candidate in sign_variants(a, b, c) {
                            let Some(row) = self.evaluate(candidate, window) else {
                                continue;
                            };
                            accepted.push(row);
                            if !keeps_independent(&accepted) {
                                accepted.pop();
                                continue;
                            }
                            if accepted.len() == 3 {
                                return Some(self.transpose(&accepted));
                            }
                        }
                    }
                }
            }
        }

        None
    }

    /// 候选行作用于每个矢量，全部接近整数时返回整数结果
    fn evaluate(&self, la: [i64; 3], window: i64) -> Option<Vec<i64>> {
        self.quantized
            .iter()
            .map(|h| nearest_within(la[0] * h[0] + la[1] * h[1] + la[2] * h[2], window))
            .collect()
    }

    fn transpose(&self, rows: &[Vec<i64>]) -> Vec<[i64; 3]> {
        (0..self.quantized.len())
            .map(|j| [rows[0][j], rows[1][j], rows[2][j]])
            .collect()
    }
}

/// 三元组的符号组合顺序
fn sign_variants(a: i64, b: i64, c: i64) -> Vec<[i64; 3]> {
    let mut variants = vec![[a, b, c]];
    if b != 0 {
        variants.push([a, -b, c]);
    }
    if a == 0 {
        return variants;
    }
    if c != 0 {
        variants.push([a, b, -c]);
    }
    if b != 0 && c != 0 {
        variants.push([a, -b, -c]);
    }
    variants
}

/// 前三个矢量（基矢）上的取值构成的行必须线性无关
fn keeps_independent(rows: &[Vec<i64>]) -> bool {
    let head = |r: &Vec<i64>| [r[0], r[1], r[2]];
    match rows.len() {
        2 => {
            let (p, q) = (head(&rows[0]), head(&rows[1]));
            let cross = [
                p[1] * q[2] - p[2] * q[1],
                p[2] * q[0] - p[0] * q[2],
                p[0] * q[1] - p[1] * q[0],
            ];
            cross != [0, 0, 0]
        }
        3 => {
            let (p, q, r) = (head(&rows[0]), head(&rows[1]), head(&rows[2]));
            let det = p[0] * (q[1] * r[2] - q[2] * r[1]) - p[1] * (q[0] * r[2] - q[2] * r[0])
                + p[2] * (q[0] * r[1] - q[1] * r[0]);
            det != 0
        }
        _ => true,
    }
}
