//! # 合成峰生成
//!
//! 给定 UB 矩阵与样品/探测器几何，遍历指数范围内的 (h, k, l)，
//! 把每个反射放到 Ewald 球上并投影到探测器，得到可被指标化的峰表。
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs` 调用
//! - 使用 `indexing/projector.rs` 的 `locate`

use super::projector::{locate, SampleGeometry};
use crate::models::{DiffractionVector, IndexTriple, OrientationMatrix, PeakMeasurement};

/// 带真实指数的合成峰
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticPeak {
    pub peak: PeakMeasurement,
    pub hkl: IndexTriple,
}

/// 生成落在探测器上的合成峰，序号从 1 开始
pub fn simulate(
    orientation: &OrientationMatrix,
    geometry: &SampleGeometry,
    max_index: i32,
) -> Vec<SyntheticPeak> {
    let mut peaks = Vec::new();

    for h in -max_index..=max_index {
        for k in -max_index..=max_index {
            for l in -max_index..=max_index {
                let hkl = IndexTriple::new(h, k, l);
                if hkl.is_origin() {
                    continue;
                }

                let q = DiffractionVector::from(orientation.diffraction_vector(&hkl));
                if let Some(mut peak) = locate(&q, geometry) {
                    peak.seq = peaks.len() as i32 + 1;
                    peaks.push(SyntheticPeak { peak, hkl });
                }
            }
        }
    }

    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::projector::project;
    use crate::models::CellParameters;
    use nalgebra::Matrix3;

    fn geometry() -> SampleGeometry {
        SampleGeometry {
            chi: 30.0,
            phi: 15.0,
            omega: -20.0,
            deta: 90.0,
            detd: 20.0,
            wl_min: 0.4,
            wl_max: 3.5,
            half_size: 15.0,
        }
    }

    #[test]
    fn test_synthetic_peaks_project_back() {
        let cell = CellParameters::from_parameters(5.0, 6.0, 7.0, 90.0, 90.0, 90.0);
        let ub = OrientationMatrix::from_cell(&cell, &Matrix3::identity()).unwrap();
        let peaks = simulate(&ub, &geometry(), 3);

        for (i, s) in peaks.iter().enumerate() {
            assert_eq!(s.peak.seq, i as i32 + 1);
            assert!(s.peak.wl >= 0.4 && s.peak.wl <= 3.5);
            assert!(s.peak.xcm.abs() <= 15.0 && s.peak.ycm.abs() <= 15.0);

            let q = project(&s.peak).as_vector();
            assert!((q - ub.diffraction_vector(&s.hkl)).norm() < 1e-9);
        }
    }

    #[test]
    fn test_no_origin_and_bounded_indices() {
        let cell = CellParameters::from_parameters(4.0, 4.0, 4.0, 90.0, 90.0, 90.0);
        let ub = OrientationMatrix::from_cell(&cell, &Matrix3::identity()).unwrap();
        let peaks = simulate(&ub, &geometry(), 2);

        assert!(peaks.iter().all(|s| !s.hkl.is_origin()));
        assert!(peaks
            .iter()
            .all(|s| s.hkl.h.abs() <= 2 && s.hkl.k.abs() <= 2 && s.hkl.l.abs() <= 2));
    }
}
