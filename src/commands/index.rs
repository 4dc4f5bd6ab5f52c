//! # index 子命令实现
//!
//! 读取峰表，运行盲指标化，写出运行日志与 h,k,l 文件，
//! 并在终端打印晶胞、取向矩阵和指数表。
//!
//! ## 功能
//! - 单文件和目录批量两种模式
//! - 按序号筛选峰
//! - 批量模式并行运行（rayon），每个输入一份日志
//!
//! ## 依赖关系
//! - 使用 `cli/index.rs` 定义的 IndexArgs
//! - 使用 `batch/` 模块进行批量处理
//! - 使用 `indexing/` 模块进行指标化
//! - 使用 `parsers/peaks.rs` 读写峰表

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::index::IndexArgs;
use crate::error::{IndexerError, Result};
use crate::indexing::{self, basis::MIN_VECTORS, IndexOptions, TolerancePolicy};
use crate::models::RunResult;
use crate::parsers;
use crate::utils::output;

use nalgebra::Matrix3;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 容差步长下限
const MIN_TOLERANCE_STEP: f64 = 1e-4;

/// 执行指标化
pub fn execute(args: IndexArgs) -> Result<()> {
    output::print_header("Laue Peak Indexing");

    let options = build_options(&args)?;
    let sequences = args
        .seq
        .as_deref()
        .map(parsers::parse_sequence_list)
        .transpose()?;

    if args.input.is_file() {
        execute_single_file(&args, &options, sequences.as_deref())
    } else if args.input.is_dir() {
        execute_batch(&args, options, sequences)
    } else {
        Err(IndexerError::FileNotFound {
            path: args.input.display().to_string(),
        })
    }
}

/// 由命令行参数构建指标化选项
fn build_options(args: &IndexArgs) -> Result<IndexOptions> {
    if !args.weight.is_finite() || args.weight < 0.0 {
        return Err(IndexerError::InvalidArgument(format!(
            "--weight must be a non-negative number, got {}",
            args.weight
        )));
    }
    if !(args.tolerance_step >= MIN_TOLERANCE_STEP) {
        return Err(IndexerError::InvalidArgument(format!(
            "--tolerance-step must be at least {}, got {}",
            MIN_TOLERANCE_STEP, args.tolerance_step
        )));
    }
    if !(args.max_tolerance > args.initial_tolerance) {
        return Err(IndexerError::InvalidArgument(format!(
            "--max-tolerance ({}) must exceed --initial-tolerance ({})",
            args.max_tolerance, args.initial_tolerance
        )));
    }
    if args.max_index < 1 {
        return Err(IndexerError::InvalidArgument(format!(
            "--max-index must be at least 1, got {}",
            args.max_index
        )));
    }
    if let Some(n) = args.max_peaks {
        if n < MIN_VECTORS {
            return Err(IndexerError::InvalidArgument(format!(
                "--max-peaks must be at least {}, got {}",
                MIN_VECTORS, n
            )));
        }
    }
    if let Some(v) = args.exclude_volume {
        if !(v > 0.0) {
            return Err(IndexerError::InvalidArgument(format!(
                "--exclude-volume must be positive, got {}",
                v
            )));
        }
    }

    Ok(IndexOptions {
        max_peaks: args.max_peaks,
        multiplicity_weight: args.weight,
        excluded_volume: args.exclude_volume,
        tolerance: TolerancePolicy {
            initial: args.initial_tolerance,
            step: args.tolerance_step,
            ceiling: args.max_tolerance,
            max_shell: args.max_index,
            ..TolerancePolicy::default()
        },
    })
}

/// 读取峰表并指标化
fn index_file(path: &Path, options: &IndexOptions, sequences: Option<&[i32]>) -> Result<RunResult> {
    let mut peaks = parsers::read_peak_file(path)?;
    if let Some(seqs) = sequences {
        peaks = parsers::select_sequences(&peaks, seqs);
    }
    Ok(indexing::index_peaks(&peaks, options)?)
}

/// 与输入同名的输出路径
fn sibling_path(input: &Path, dir: Option<&Path>, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("peaks");
    let dir = dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{}{}", stem, suffix))
}

fn write_log(path: &Path, result: &RunResult) -> Result<()> {
    fs::write(path, &result.log).map_err(|e| IndexerError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 单文件模式
fn execute_single_file(
    args: &IndexArgs,
    options: &IndexOptions,
    sequences: Option<&[i32]>,
) -> Result<()> {
    output::print_info(&format!("Single file mode: '{}'", args.input.display()));

    let result = index_file(&args.input, options, sequences)?;
    output::print_success(&format!(
        "Indexed {} peaks at tolerance {:.3} ({} tolerance levels tried)",
        result.peaks.len(),
        result.tolerance,
        result.escalations
    ));
    let history: Vec<String> = result
        .tolerance_history
        .iter()
        .map(|t| format!("{:.3}", t))
        .collect();
    output::print_info(&format!("Integer fit checked at: {}", history.join(", ")));
    output::print_info(&format!(
        "Initial basis from peaks SEQ {} {} {}",
        result.basis_seq[0], result.basis_seq[1], result.basis_seq[2]
    ));

    print_cell_table(&result);
    print_orientation(&result.orientation.matrix);
    print_hkl_table(&result, args.show);

    let outliers = result.outlier_count();
    if outliers > 0 {
        output::print_warning(&format!(
            "{} peaks lie outside the final tolerance",
            outliers
        ));
    }

    let log_path = args
        .log
        .clone()
        .unwrap_or_else(|| sibling_path(&args.input, None, ".log"));
    write_log(&log_path, &result)?;
    output::print_written("run log", &log_path.display().to_string());

    if let Some(ref hkl_path) = args.hkl_csv {
        parsers::write_hkl_file(hkl_path, &result.peaks)?;
        output::print_written("h,k,l table", &hkl_path.display().to_string());
    }

    Ok(())
}

/// 批量处理配置
struct BatchIndexConfig {
    options: IndexOptions,
    sequences: Option<Vec<i32>>,
    output_dir: Option<PathBuf>,
    overwrite: bool,
}

/// 批量处理模式
fn execute_batch(args: &IndexArgs, options: IndexOptions, sequences: Option<Vec<i32>>) -> Result<()> {
    output::print_info(&format!("Batch mode: directory '{}'", args.input.display()));

    let files = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)?
        .recursive(args.recursive)
        .collect();

    if files.is_empty() {
        return Err(IndexerError::NoFilesFound {
            pattern: args.pattern.clone(),
        });
    }
    output::print_info(&format!("Found {} peak tables", files.len()));

    if let Some(ref dir) = args.output {
        fs::create_dir_all(dir).map_err(|e| IndexerError::FileWriteError {
            path: dir.display().to_string(),
            source: e,
        })?;
    }

    let config = Arc::new(BatchIndexConfig {
        options,
        sequences,
        output_dir: args.output.clone(),
        overwrite: args.overwrite,
    });

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!("Running on {} threads", runner.jobs()));
    let result = runner.run(files, |file| process_batch_file(file, &config))?;

    output::print_separator();
    for summary in &result.summaries {
        output::print_done(summary);
    }
    output::print_success(&format!(
        "Batch complete: {} files, {} success, {} skipped, {} failed",
        result.total(),
        result.success,
        result.skipped,
        result.failed
    ));

    if !result.failures.is_empty() {
        output::print_warning("Failed files:");
        for (path, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", path, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
    }

    Ok(())
}

/// 处理批量模式中的单个文件
fn process_batch_file(input: &PathBuf, config: &Arc<BatchIndexConfig>) -> ProcessResult {
    let dir = config.output_dir.as_deref();
    let log_path = sibling_path(input, dir, ".log");
    let hkl_path = sibling_path(input, dir, "_hkl.csv");

    if log_path.exists() && !config.overwrite {
        return ProcessResult::Skipped(format!(
            "Output exists, skipping: {}",
            log_path.display()
        ));
    }

    let outcome = index_file(input, &config.options, config.sequences.as_deref()).and_then(|r| {
        write_log(&log_path, &r)?;
        parsers::write_hkl_file(&hkl_path, &r.peaks)?;
        Ok(r)
    });

    match outcome {
        Ok(r) => ProcessResult::Success(format!(
            "{}: a={:.4} b={:.4} c={:.4} α={:.2} β={:.2} γ={:.2} V={:.2} (tol {:.3}, {} peaks)",
            input.display(),
            r.cell.a,
            r.cell.b,
            r.cell.c,
            r.cell.alpha,
            r.cell.beta,
            r.cell.gamma,
            r.cell.volume,
            r.tolerance,
            r.peaks.len()
        )),
        Err(e) => ProcessResult::Failed(input.display().to_string(), e.to_string()),
    }
}

/// 打印晶胞参数
fn print_cell_table(result: &RunResult) {
    use tabled::{Table, Tabled};

    #[derive(Tabled)]
    struct CellRow {
        #[tabled(rename = "Parameter")]
        name: &'static str,
        #[tabled(rename = "Value")]
        value: String,
    }

    let cell = &result.cell;
    let [ra, rb, rc] = result.orientation.reciprocal_vectors();
    let rows = vec![
        CellRow { name: "a (Å)", value: format!("{:.4}", cell.a) },
        CellRow { name: "b (Å)", value: format!("{:.4}", cell.b) },
        CellRow { name: "c (Å)", value: format!("{:.4}", cell.c) },
        CellRow { name: "α (°)", value: format!("{:.3}", cell.alpha) },
        CellRow { name: "β (°)", value: format!("{:.3}", cell.beta) },
        CellRow { name: "γ (°)", value: format!("{:.3}", cell.gamma) },
        CellRow { name: "V (Å³)", value: format!("{:.4}", cell.volume) },
        CellRow {
            name: "|a*| |b*| |c*| (Å⁻¹)",
            value: format!("{:.5} {:.5} {:.5}", ra.norm(), rb.norm(), rc.norm()),
        },
    ];

    output::print_header("Reduced Cell");
    println!("{}", Table::new(&rows));
}

fn print_orientation(matrix: &Matrix3<f64>) {
    let rows = [
        [matrix[(0, 0)], matrix[(0, 1)], matrix[(0, 2)]],
        [matrix[(1, 0)], matrix[(1, 1)], matrix[(1, 2)]],
        [matrix[(2, 0)], matrix[(2, 1)], matrix[(2, 2)]],
    ];
    println!();
    output::print_matrix("Orientation matrix (UB)", &rows);
}

/// 打印 h,k,l 表
fn print_hkl_table(result: &RunResult, count: usize) {
    use tabled::{Table, Tabled};

    #[derive(Tabled)]
    struct HklRow {
        #[tabled(rename = "SEQ")]
        seq: i32,
        #[tabled(rename = "(hkl)")]
        hkl: String,
        #[tabled(rename = "Max dev")]
        residual: String,
        #[tabled(rename = "Fit")]
        fit: &'static str,
    }

    let rows: Vec<HklRow> = result
        .peaks
        .iter()
        .take(count)
        .map(|p| HklRow {
            seq: p.seq,
            hkl: p.hkl.to_string(),
            residual: format!("{:.4}", p.residual),
            fit: if p.within_tolerance { "yes" } else { "no" },
        })
        .collect();

    if rows.is_empty() {
        return;
    }

    output::print_header(&format!("Indexed Peaks ({} of {})", rows.len(), result.peaks.len()));
    println!("{}", Table::new(&rows));
    if result.peaks.len() > rows.len() {
        output::print_skip(&format!(
            "{} more peaks in the run log",
            result.peaks.len() - rows.len()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn parse(extra: &[&str]) -> IndexArgs {
        let mut argv = vec!["scd-indexer", "index", "peaks.csv"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Index(args) => args,
            _ => panic!("expected index command"),
        }
    }

    #[test]
    fn test_default_options_match_policy() {
        let options = build_options(&parse(&[])).unwrap();
        assert_eq!(options, IndexOptions::default());
    }

    #[test]
    fn test_options_from_flags() {
        let options = build_options(&parse(&[
            "--weight",
            "1",
            "--exclude-volume",
            "125.5",
            "--max-peaks",
            "30",
            "--max-index",
            "6",
        ]))
        .unwrap();

        assert_eq!(options.multiplicity_weight, 1.0);
        assert_eq!(options.excluded_volume, Some(125.5));
        assert_eq!(options.max_peaks, Some(30));
        assert_eq!(options.tolerance.max_shell, 6);
    }

    #[test]
    fn test_invalid_options_rejected() {
        for extra in [
            &["--tolerance-step", "0"][..],
            &["--tolerance-step", "1e-20"][..],
            &["--max-tolerance", "0.05"][..],
            &["--max-index", "0"][..],
            &["--max-peaks", "3"][..],
            &["--exclude-volume", "0"][..],
        ] {
            assert!(
                matches!(build_options(&parse(extra)), Err(IndexerError::InvalidArgument(_))),
                "accepted {:?}",
                extra
            );
        }
    }

    #[test]
    fn test_sibling_paths() {
        let input = Path::new("data/run1.csv");
        assert_eq!(sibling_path(input, None, ".log"), PathBuf::from("data/run1.log"));
        assert_eq!(
            sibling_path(input, Some(Path::new("out")), "_hkl.csv"),
            PathBuf::from("out/run1_hkl.csv")
        );
    }
}
