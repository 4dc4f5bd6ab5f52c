//! # 衍射峰数据模型
//!
//! 定义单个测量峰、晶体坐标系下的衍射矢量，以及带序号的矢量集合。
//!
//! ## 依赖关系
//! - 被 `parsers/peaks.rs` 和 `indexing/` 使用
//! - 使用 `nalgebra` 的 `Vector3`

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// 单个测量峰（角度单位：度，波长单位：Å）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakMeasurement {
    /// 峰序号
    pub seq: i32,
    /// 样品取向角 chi
    pub chi: f64,
    /// 样品取向角 phi
    pub phi: f64,
    /// 样品取向角 omega
    pub omega: f64,
    /// 探测器水平角
    pub deta: f64,
    /// 样品到探测器中心的距离（与 xcm/ycm 同一长度单位）
    pub detd: f64,
    /// 峰在探测器上相对中心的水平坐标
    pub xcm: f64,
    /// 峰在探测器上相对中心的竖直坐标
    pub ycm: f64,
    /// 波长
    pub wl: f64,
}

/// 晶体固定坐标系下的衍射矢量 Q/2π（Å⁻¹）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffractionVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl DiffractionVector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        DiffractionVector { x, y, z }
    }

    pub fn as_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// 模长平方
    pub fn norm_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<Vector3<f64>> for DiffractionVector {
    fn from(v: Vector3<f64>) -> Self {
        DiffractionVector::new(v[0], v[1], v[2])
    }
}

/// 衍射矢量集合，序号数组与矢量一一对齐
#[derive(Debug, Clone, Default)]
pub struct VectorSet {
    vectors: Vec<DiffractionVector>,
    seq: Vec<i32>,
}

impl VectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 (序号, 矢量) 对构建
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (i32, DiffractionVector)>,
    {
        let mut set = VectorSet::new();
        for (seq, v) in pairs {
            set.push(seq, v);
        }
        set
    }

    pub fn push(&mut self, seq: i32, vector: DiffractionVector) {
        self.vectors.push(vector);
        self.seq.push(seq);
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn vectors(&self) -> &[DiffractionVector] {
        &self.vectors
    }

    pub fn sequence_ids(&self) -> &[i32] {
        &self.seq
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &DiffractionVector)> {
        self.seq.iter().copied().zip(self.vectors.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_set_keeps_sequence_alignment() {
        let set = VectorSet::from_pairs(vec![
            (7, DiffractionVector::new(0.1, 0.0, 0.0)),
            (3, DiffractionVector::new(0.0, 0.2, 0.0)),
        ]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.sequence_ids(), &[7, 3]);
        let (seq, v) = set.iter().nth(1).unwrap();
        assert_eq!(seq, 3);
        assert!((v.y - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_diffraction_vector_norm() {
        let v = DiffractionVector::new(0.3, 0.4, 0.0);
        assert!((v.norm_squared() - 0.25).abs() < 1e-12);
        assert!(v.is_finite());
        assert!(!DiffractionVector::new(f64::NAN, 0.0, 0.0).is_finite());
    }
}
