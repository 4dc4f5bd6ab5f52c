//! # index 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/index.rs`

use clap::Args;
use std::path::PathBuf;

/// index 子命令参数
#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Input: peak table (CSV) or directory containing peak tables
    pub input: PathBuf,

    /// Run log path (single mode, default: <input-stem>.log next to the input)
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Write per-peak h,k,l and residuals to this CSV file (single mode)
    #[arg(long)]
    pub hkl_csv: Option<PathBuf>,

    /// Sequence numbers to use (e.g., "1:20,25,30:32")
    #[arg(long)]
    pub seq: Option<String>,

    /// Use at most this many peaks
    #[arg(long, env = "SCD_INDEXER_MAX_PEAKS")]
    pub max_peaks: Option<usize>,

    /// Multiplicity weight (nonzero: any peak outside tolerance forces a retry)
    #[arg(long, default_value_t = 0.0)]
    pub weight: f64,

    /// Reject cells whose volume lies within the volume window of this value (Å³)
    #[arg(long)]
    pub exclude_volume: Option<f64>,

    // ─────────────────────────────────────────────────────────────
    // 容差参数
    // ─────────────────────────────────────────────────────────────
    /// Starting tolerance (the first search adds one step)
    #[arg(long, env = "SCD_INDEXER_INITIAL_TOLERANCE", default_value_t = 0.08)]
    pub initial_tolerance: f64,

    /// Tolerance escalation step
    #[arg(long, env = "SCD_INDEXER_TOLERANCE_STEP", default_value_t = 0.02)]
    pub tolerance_step: f64,

    /// Give up once the tolerance exceeds this value
    #[arg(long, env = "SCD_INDEXER_MAX_TOLERANCE", default_value_t = 0.30)]
    pub max_tolerance: f64,

    /// Largest index magnitude tried by the integer search
    #[arg(long, env = "SCD_INDEXER_MAX_INDEX", default_value_t = 10)]
    pub max_index: i64,

    /// Number of h,k,l rows printed to the terminal
    #[arg(long, default_value_t = 20)]
    pub show: usize,

    // ─────────────────────────────────────────────────────────────
    // 批量处理参数
    // ─────────────────────────────────────────────────────────────
    /// Output directory for logs and h,k,l files (batch mode, default: next to each input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Glob pattern for input files (batch mode, e.g., "*.csv,*.peaks")
    #[arg(long, default_value = "*.csv")]
    pub pattern: String,

    /// Number of parallel jobs (0 = auto, batch mode only)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Recurse into subdirectories (batch mode)
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
