//! # 数据模型模块
//!
//! 定义测量峰、衍射矢量、晶胞参数与指标化结果的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `indexing/` 和 `commands/` 使用
//! - 子模块: peak, cell, result

pub mod cell;
pub mod peak;
pub mod result;

pub use cell::{CellParameters, IndexTriple, OrientationMatrix};
pub use peak::{DiffractionVector, PeakMeasurement, VectorSet};
pub use result::{IndexedPeak, RunResult};
