//! # 批量处理模块
//!
//! 对目录中的多个峰表并行指标化。每次运行互不共享状态。
//!
//! ## 功能
//! - 收集匹配的峰表文件
//! - 并行处理
//! - 进度反馈与统计
//!
//! ## 依赖关系
//! - 被 `commands/index.rs` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::FileCollector;
pub use runner::{BatchResult, BatchRunner, ProcessResult};
