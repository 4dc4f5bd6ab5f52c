//! # 峰收集
//!
//! 对每个测量峰调用投影，组装带序号的衍射矢量集合。
//! 波长不高于下限或投影结果非有限的峰被跳过。
//!
//! ## 依赖关系
//! - 被 `indexing/mod.rs` 的 `index_peaks` 调用
//! - 使用 `indexing/projector.rs`

use super::log::RunLog;
use super::projector::project;
use crate::models::{PeakMeasurement, VectorSet};

/// 波长下限（Å）
pub const MIN_WAVELENGTH: f64 = 1e-5;

/// 收集可用的衍射矢量
///
/// `max_peaks` 为 `Some(n)` 时最多收集 n 个可用峰（按输入顺序）。
pub fn collect_vectors(
    peaks: &[PeakMeasurement],
    max_peaks: Option<usize>,
    log: &mut RunLog,
) -> VectorSet {
    let limit = max_peaks.unwrap_or(usize::MAX);
    let mut set = VectorSet::new();

    log.line("#  SEQ      XCM      YCM       WL");

    for peak in peaks {
        if set.len() >= limit {
            break;
        }
        if !(peak.wl > MIN_WAVELENGTH) {
            continue;
        }

        let vector = project(peak);
        if !vector.is_finite() {
            continue;
        }

        log.line(format!(
            "{:6} {:8.3} {:8.3} {:8.4}",
            peak.seq, peak.xcm, peak.ycm, peak.wl
        ));
        set.push(peak.seq, vector);
    }

    log.line(format!("{} usable peaks", set.len()));
    set
}
