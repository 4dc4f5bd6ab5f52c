//! # 盲指标化模块
//!
//! 在没有任何晶胞先验的情况下，从一组 Laue 衍射峰确定约化基矢、
//! 每个峰的整数 Miller 指数、晶胞参数与 UB 取向矩阵。
//!
//! ## 流程
//! 1. `collector`: 测量峰 → 晶体坐标系衍射矢量
//! 2. `basis`: 选择三个最短的不共面矢量并约化
//! 3. `refine`: 整数搜索 → 最小二乘精修 → 规范化 → 整数检查，必要时重试
//! 4. `cell`: 分配指数，提取晶胞参数与取向矩阵
//!
//! 模块内没有终端输出和文件读写，所有诊断文本写入本次运行的 `RunLog`。
//!
//! ## 子模块
//! - `matrix`: 3×3 行列式、求逆、叉积
//! - `projector`: 投影与反向定位
//! - `reduction`: 格点约化与基矢规范化
//! - `search`: 定点整数搜索
//! - `simulate`: 生成合成峰
//!
//! ## 依赖关系
//! - 被 `commands/index.rs`, `commands/simulate.rs` 调用
//! - 使用 `models/`

pub mod basis;
pub mod cell;
pub mod collector;
pub mod log;
pub mod matrix;
pub mod projector;
pub mod reduction;
pub mod refine;
pub mod search;
pub mod simulate;

pub use projector::SampleGeometry;

use basis::select_basis;
use cell::{assign_indices, extract_cell};
use collector::collect_vectors;
use self::log::RunLog;
use refine::RefinementLoop;

use crate::models::{PeakMeasurement, RunResult, VectorSet};
use thiserror::Error;

/// 指标化失败
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexFailure {
    #[error("insufficient peaks: {found} usable, at least {required} required")]
    InsufficientPeaks { found: usize, required: usize },

    #[error("all reflections coplanar ({examined} examined)")]
    AllCoplanar { examined: usize },

    #[error("initial non-integer indices (tolerance reached {tolerance:.3})")]
    NonIntegerIndices { tolerance: f64 },
}

/// 容差策略
#[derive(Debug, Clone, PartialEq)]
pub struct TolerancePolicy {
    /// 起始容差，第一次搜索在此基础上加一步
    pub initial: f64,
    /// 每级放宽的步长
    pub step: f64,
    /// 容差上限
    pub ceiling: f64,
    /// 首轮命中该值时重置
    pub seed_trigger: f64,
    /// 重置后的起始容差
    pub seed_restart: f64,
    /// 整数搜索的最大壳层
    pub max_shell: i64,
    /// 排除体积的匹配窗口（Å³）
    pub volume_window: f64,
}

impl Default for TolerancePolicy {
    fn default() -> Self {
        TolerancePolicy {
            initial: 0.08,
            step: 0.02,
            ceiling: 0.30,
            seed_trigger: 0.100,
            seed_restart: -0.010,
            max_shell: 10,
            volume_window: 0.1,
        }
    }
}

/// 单次搜索允许的最多容差级数
pub const MAX_LEVELS: usize = 100_000;

impl TolerancePolicy {
    /// 从 `start` 放宽到上限所需的级数（至少 1，至多 `MAX_LEVELS`）
    pub fn max_levels(&self, start: f64) -> usize {
        let span = (self.ceiling - start) / self.step;
        if !(span > 0.0) {
            return 1;
        }
        if span >= MAX_LEVELS as f64 {
            return MAX_LEVELS;
        }
        span.ceil() as usize + 2
    }
}

/// 指标化选项
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexOptions {
    /// 最多使用的峰数
    pub max_peaks: Option<usize>,
    /// 非零时任一峰超出容差都会触发重试
    pub multiplicity_weight: f64,
    /// 拒绝体积与之相差不足窗口的晶胞
    pub excluded_volume: Option<f64>,
    pub tolerance: TolerancePolicy,
}

const BANNER: &str = "  *******LAUE INDEXER*******";

/// 从测量峰开始指标化
pub fn index_peaks(
    peaks: &[PeakMeasurement],
    options: &IndexOptions,
) -> Result<RunResult, IndexFailure> {
    let mut log = RunLog::new();
    log.line(BANNER);
    log.blank();

    let set = collect_vectors(peaks, options.max_peaks, &mut log);
    run(set, options, log)
}

/// 从已知的衍射矢量开始指标化
pub fn index_vectors(set: VectorSet, options: &IndexOptions) -> Result<RunResult, IndexFailure> {
    let mut log = RunLog::new();
    log.line(BANNER);
    log.blank();
    run(set, options, log)
}

fn run(set: VectorSet, options: &IndexOptions, mut log: RunLog) -> Result<RunResult, IndexFailure> {
    let selected = select_basis(&set, &mut log)?;
    let fit = RefinementLoop::new(options).run(&selected.basis, &set, &mut log)?;

    let peaks = assign_indices(&fit.basis.direct, &set, fit.tolerance);
    let (cell, orientation) = extract_cell(&fit.basis, &peaks, &mut log);

    Ok(RunResult {
        orientation,
        cell,
        basis_seq: selected.sequence_ids,
        peaks,
        log: log.into_text(),
        tolerance: fit.tolerance,
        tolerance_history: fit.tolerance_history,
        escalations: fit.escalations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::projector::{locate, project};
    use crate::models::{CellParameters, DiffractionVector, IndexTriple, OrientationMatrix};
    use nalgebra::{Matrix3, Rotation3, Vector3};

    fn vectors_from(ub: &Matrix3<f64>, hkl: &[(i32, i32, i32)]) -> VectorSet {
        VectorSet::from_pairs(hkl.iter().enumerate().map(|(i, &(h, k, l))| {
            let q = ub * Vector3::new(h as f64, k as f64, l as f64);
            (i as i32 + 1, DiffractionVector::from(q))
        }))
    }

    /// 把探测器对准出射方向，使任意 q_x < 0 的反射都能被记录
    fn aimed_peak(seq: i32, q: &Vector3<f64>) -> PeakMeasurement {
        let wl = -2.0 * q[0] / q.norm_squared();
        let s = q * wl + Vector3::x();
        let deta = 180.0 - s[1].atan2(s[0]).to_degrees();
        let geometry = SampleGeometry {
            chi: 0.0,
            phi: 0.0,
            omega: 0.0,
            deta,
            detd: 25.0,
            wl_min: 1e-3,
            wl_max: 1e3,
            half_size: 1e6,
        };
        let mut peak = locate(&DiffractionVector::from(*q), &geometry).unwrap();
        peak.seq = seq;
        peak
    }

    #[test]
    fn test_cubic_scenario() {
        let ub = Matrix3::from_diagonal_element(0.2);
        let hkl = [(1, 0, 0), (0, 1, 0), (0, 0, 1), (1, 1, 0), (1, 1, 1)];
        let result = index_vectors(vectors_from(&ub, &hkl), &IndexOptions::default()).unwrap();

        let expected: Vec<_> = hkl.iter().map(|&(h, k, l)| IndexTriple::new(h, k, l)).collect();
        let triples: Vec<_> = result.peaks.iter().map(|p| p.hkl).collect();
        assert_eq!(triples, expected);
        assert!((result.cell.volume - 125.0).abs() < 1e-3);
        assert!((result.cell.a - 5.0).abs() < 1e-9);
        assert!((result.cell.alpha - 90.0).abs() < 1e-6);
        assert!((result.orientation.matrix - ub).norm() < 1e-9);
        assert!(result.log.starts_with(BANNER));
        assert!(result.log.contains("CELL VOLUME="));
    }

    #[test]
    fn test_insufficient_peaks() {
        let ub = Matrix3::from_diagonal_element(0.2);
        let set = vectors_from(&ub, &[(1, 0, 0), (0, 1, 0), (0, 0, 1)]);

        assert_eq!(
            index_vectors(set, &IndexOptions::default()).unwrap_err(),
            IndexFailure::InsufficientPeaks {
                found: 3,
                required: 4
            }
        );
    }

    #[test]
    fn test_coplanar_peaks_rejected() {
        let ub = Matrix3::from_diagonal_element(0.2);
        let set = vectors_from(&ub, &[(1, 0, 0), (0, 1, 0), (1, 1, 0), (2, 1, 0), (1, -1, 0)]);

        assert!(matches!(
            index_vectors(set, &IndexOptions::default()),
            Err(IndexFailure::AllCoplanar { .. })
        ));
    }

    #[test]
    fn test_synthetic_orientation_recovered() {
        let cell = CellParameters::from_parameters(4.2, 5.1, 6.3, 90.0, 103.0, 90.0);
        let rotation = Rotation3::from_euler_angles(0.3, -0.5, 1.1);
        let truth = OrientationMatrix::from_cell(&cell, rotation.matrix()).unwrap();
        let hkl = [
            (1, 0, 0),
            (0, 1, 0),
            (0, 0, 1),
            (1, 1, 0),
            (0, 1, 1),
            (1, 0, 1),
            (1, 1, 1),
            (2, 1, 0),
            (1, 2, -1),
            (-1, 1, 2),
        ];
        let set = vectors_from(&truth.matrix, &hkl);
        let result = index_vectors(set.clone(), &IndexOptions::default()).unwrap();

        for (peak, q) in result.peaks.iter().zip(set.vectors()) {
            let predicted = result.orientation.diffraction_vector(&peak.hkl);
            assert!((predicted - q.as_vector()).norm() < 1e-9);
            assert!(peak.within_tolerance);
        }
        assert!((result.cell.volume - cell.volume).abs() < 1e-6);
    }

    #[test]
    fn test_order_invariance() {
        let cell = CellParameters::from_parameters(4.0, 5.0, 7.0, 90.0, 90.0, 90.0);
        let truth = OrientationMatrix::from_cell(&cell, &Matrix3::identity()).unwrap();
        let hkl = [
            (1, 0, 0),
            (0, 1, 0),
            (0, 0, 1),
            (1, 1, 0),
            (0, 1, 1),
            (1, 0, 1),
            (1, 1, 1),
            (1, 2, 1),
        ];
        let forward = vectors_from(&truth.matrix, &hkl);
        let reversed = VectorSet::from_pairs(
            forward
                .iter()
                .map(|(seq, v)| (seq, *v))
                .collect::<Vec<_>>()
                .into_iter()
                .rev(),
        );

        let a = index_vectors(forward, &IndexOptions::default()).unwrap();
        let b = index_vectors(reversed, &IndexOptions::default()).unwrap();

        assert!((a.orientation.matrix - b.orientation.matrix).norm() < 1e-9);
        for peak in &a.peaks {
            let twin = b.peaks.iter().find(|p| p.seq == peak.seq);
            assert_eq!(twin.map(|p| p.hkl), Some(peak.hkl));
        }
    }

    #[test]
    fn test_index_peaks_from_measurements() {
        let cell = CellParameters::from_parameters(5.5, 5.5, 8.0, 90.0, 90.0, 120.0);
        let unrotated = OrientationMatrix::from_cell(&cell, &Matrix3::identity()).unwrap();
        // 把 a* + b* + c* 转到 -x，非负指数的反射 q_x 都为负
        let [sa, sb, sc] = unrotated.reciprocal_vectors();
        let rotation = Rotation3::rotation_between(&(sa + sb + sc), &(-Vector3::x())).unwrap();
        let truth = OrientationMatrix::from_cell(&cell, rotation.matrix()).unwrap();
        let hkl = [(1, 0, 0), (0, 1, 0), (0, 0, 1), (1, 1, 0), (1, 0, 1), (0, 1, 1), (1, 1, 1)];

        let mut peaks = Vec::new();
        for (i, &(h, k, l)) in hkl.iter().enumerate() {
            let q = truth.diffraction_vector(&IndexTriple::new(h, k, l));
            assert!(q[0] < 0.0);
            peaks.push(aimed_peak(i as i32 + 1, &q));
        }
        // 零波长的峰被跳过
        let mut bad = peaks[0];
        bad.seq = 99;
        bad.wl = 0.0;
        peaks.push(bad);

        let result = index_peaks(&peaks, &IndexOptions::default()).unwrap();

        assert!(result.peaks.iter().all(|p| p.seq != 99));
        assert!((result.cell.volume - cell.volume).abs() < 1e-6);
        assert!(result.log.contains("#  SEQ      XCM      YCM       WL"));
        for peak in &result.peaks {
            let q = project(&peaks[peaks.iter().position(|p| p.seq == peak.seq).unwrap()]);
            let predicted = result.orientation.diffraction_vector(&peak.hkl);
            assert!((predicted - q.as_vector()).norm() < 1e-9);
        }
    }

    #[test]
    fn test_runs_are_independent() {
        let ub = Matrix3::from_diagonal_element(0.2);
        let hkl = [(1, 0, 0), (0, 1, 0), (0, 0, 1), (1, 1, 0), (1, 1, 1)];
        let first = index_vectors(vectors_from(&ub, &hkl), &IndexOptions::default()).unwrap();
        let second = index_vectors(vectors_from(&ub, &hkl), &IndexOptions::default()).unwrap();

        assert_eq!(first.log, second.log);
        assert_eq!(first.escalations, second.escalations);
    }
}
