//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `index`: 对峰表做盲指标化（单文件或目录批量）
//! - `simulate`: 由已知晶胞与几何生成合成峰表
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: index, simulate

pub mod index;
pub mod simulate;

use clap::{Parser, Subcommand};

/// scd-indexer - 单晶 Laue 衍射峰盲指标化工具
#[derive(Parser)]
#[command(name = "scd-indexer")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Blind auto-indexing of single-crystal Laue diffraction peaks", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Index a peak table (or every peak table in a directory)
    Index(index::IndexArgs),

    /// Generate a synthetic peak table from a known cell and orientation
    Simulate(simulate::SimulateArgs),
}
