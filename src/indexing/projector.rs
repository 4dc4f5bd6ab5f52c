//! # 衍射矢量投影
//!
//! 把单个测量峰（样品角、探测器角与距离、探测器坐标、波长）换算为
//! 晶体固定坐标系下的衍射矢量，以及反方向的定位计算。
//!
//! ## 坐标约定
//! - 入射束沿 +x，倒易原点位于 (1/λ, 0, 0) 平移之后的原点
//! - 探测器坐标 (xcm, ycm) 与距离 detd 组成方向 (-detd, xcm, ycm)，
//!   再绕 z 轴转过 -deta 进入衍射仪坐标系
//! - 依次施加 -omega（绕 z）、-chi（绕 x）、-phi（绕 z）回到晶体坐标系
//!
//! ## 依赖关系
//! - 被 `indexing/collector.rs` 和 `indexing/simulate.rs` 调用
//! - 使用 `models/peak.rs`

use crate::models::{DiffractionVector, PeakMeasurement};
use nalgebra::{Matrix3, Vector3};

/// 绕 z 轴转动（角度，度）
fn rot_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.to_radians().sin_cos();
    Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
}

/// 绕 x 轴转动（角度，度）
fn rot_x(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.to_radians().sin_cos();
    Matrix3::new(1.0, 0.0, 0.0, 0.0, c, -s, 0.0, s, c)
}

/// 晶体坐标系 → 实验室坐标系：R_z(ω)·R_x(χ)·R_z(φ)
fn goniometer(chi: f64, phi: f64, omega: f64) -> Matrix3<f64> {
    rot_z(omega) * rot_x(chi) * rot_z(phi)
}

/// 测量峰 → 晶体坐标系衍射矢量
///
/// 波长为 0 时结果含 NaN/inf，由调用方过滤。
pub fn project(peak: &PeakMeasurement) -> DiffractionVector {
    let r = (peak.xcm * peak.xcm + peak.ycm * peak.ycm + peak.detd * peak.detd).sqrt();
    let scale = 1.0 / (r * peak.wl);
    let on_detector = Vector3::new(-peak.detd, peak.xcm, peak.ycm) * scale;

    let mut q = rot_z(-peak.deta) * on_detector;
    q[0] -= 1.0 / peak.wl;

    // -omega, -chi, -phi
    let crystal = rot_z(-peak.phi) * rot_x(-peak.chi) * rot_z(-peak.omega) * q;
    DiffractionVector::from(crystal)
}

/// 样品取向与探测器几何，用于反向定位
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleGeometry {
    pub chi: f64,
    pub phi: f64,
    pub omega: f64,
    pub deta: f64,
    pub detd: f64,
    /// 可用波长下限（Å）
    pub wl_min: f64,
    /// 可用波长上限（Å）
    pub wl_max: f64,
    /// 探测器半宽，|xcm|、|ycm| 不超过该值
    pub half_size: f64,
}

/// 晶体坐标系衍射矢量 → 探测器上的测量峰
///
/// 反射不满足 Ewald 条件、波长超出范围或落在探测器外时返回 `None`。
/// 返回值的 `seq` 为 0，由调用方编号。
pub fn locate(q: &DiffractionVector, geometry: &SampleGeometry) -> Option<PeakMeasurement> {
    let q_lab = goniometer(geometry.chi, geometry.phi, geometry.omega) * q.as_vector();
    let q2 = q_lab.norm_squared();
    if q2 <= 0.0 {
        return None;
    }

    let wl = -2.0 * q_lab[0] / q2;
    if !(wl > 0.0 && wl >= geometry.wl_min && wl <= geometry.wl_max) {
        return None;
    }

    // 出射方向单位矢量
    let scattered = q_lab * wl + Vector3::x();
    let d = rot_z(geometry.deta) * scattered;
    if d[0] >= 0.0 {
        return None;
    }

    let xcm = -geometry.detd * d[1] / d[0];
    let ycm = -geometry.detd * d[2] / d[0];
    if xcm.abs() > geometry.half_size || ycm.abs() > geometry.half_size {
        return None;
    }

    Some(PeakMeasurement {
        seq: 0,
        chi: geometry.chi,
        phi: geometry.phi,
        omega: geometry.omega,
        deta: geometry.deta,
        detd: geometry.detd,
        xcm,
        ycm,
        wl,
    })
}
