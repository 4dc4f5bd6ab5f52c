//! # simulate 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/simulate.rs`

use clap::Args;
use std::path::PathBuf;

/// simulate 子命令参数
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Cell parameters: a b c alpha beta gamma (Å, degrees)
    #[arg(long, required = true, num_args = 6, value_names = ["A", "B", "C", "ALPHA", "BETA", "GAMMA"], allow_negative_numbers = true)]
    pub cell: Vec<f64>,

    /// Crystal orientation as Euler angles roll pitch yaw (degrees)
    #[arg(long, num_args = 3, value_names = ["ROLL", "PITCH", "YAW"], allow_negative_numbers = true, default_values_t = [0.0, 0.0, 0.0])]
    pub euler: Vec<f64>,

    // ─────────────────────────────────────────────────────────────
    // 样品与探测器几何
    // ─────────────────────────────────────────────────────────────
    /// Goniometer angle chi (degrees)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub chi: f64,

    /// Goniometer angle phi (degrees)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub phi: f64,

    /// Goniometer angle omega (degrees)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub omega: f64,

    /// Detector angle (degrees)
    #[arg(long, default_value_t = 90.0, allow_negative_numbers = true)]
    pub deta: f64,

    /// Sample to detector distance (same unit as the detector coordinates)
    #[arg(long, default_value_t = 20.0)]
    pub detd: f64,

    /// Shortest wavelength in the incident band (Å)
    #[arg(long, default_value_t = 0.5)]
    pub wl_min: f64,

    /// Longest wavelength in the incident band (Å)
    #[arg(long, default_value_t = 3.5)]
    pub wl_max: f64,

    /// Detector half size (peaks with |xcm| or |ycm| above this are dropped)
    #[arg(long, default_value_t = 15.0)]
    pub half_size: f64,

    /// Largest |h|, |k|, |l| to enumerate
    #[arg(long, default_value_t = 3)]
    pub max_index: i32,

    // ─────────────────────────────────────────────────────────────
    // 输出
    // ─────────────────────────────────────────────────────────────
    /// Output peak table (CSV)
    #[arg(short, long, default_value = "peaks.csv")]
    pub output: PathBuf,

    /// Also write the true h,k,l of every synthetic peak to this CSV file
    #[arg(long)]
    pub truth: Option<PathBuf>,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
