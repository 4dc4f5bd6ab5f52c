//! # 指标化结果数据模型
//!
//! ## 依赖关系
//! - 由 `indexing/mod.rs` 产生
//! - 被 `commands/` 和 `parsers/peaks.rs` 使用

use super::cell::{CellParameters, IndexTriple, OrientationMatrix};

/// 单个峰的指标化结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedPeak {
    pub seq: i32,
    pub hkl: IndexTriple,
    /// 三个坐标中距最近整数的最大偏差
    pub residual: f64,
    /// 偏差不超过最终容差
    pub within_tolerance: bool,
}

/// 一次指标化运行的完整输出
#[derive(Debug, Clone)]
pub struct RunResult {
    pub orientation: OrientationMatrix,
    pub cell: CellParameters,
    /// 初始基矢所用三个峰的序号
    pub basis_seq: [i32; 3],
    /// 与输入峰顺序一致（跳过的峰除外）
    pub peaks: Vec<IndexedPeak>,
    /// 文本日志
    pub log: String,
    /// 最终接受时的容差
    pub tolerance: f64,
    /// 每轮整数检查使用的容差
    pub tolerance_history: Vec<f64>,
    /// 整数搜索尝试过的容差级数
    pub escalations: usize,
}

impl RunResult {
    /// 超出容差的峰数
    pub fn outlier_count(&self) -> usize {
        self.peaks.iter().filter(|p| !p.within_tolerance).count()
    }
}
