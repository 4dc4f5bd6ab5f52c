//! # simulate 子命令实现
//!
//! 由晶胞参数、晶体取向与样品/探测器几何生成合成峰表，
//! 可直接作为 `index` 的输入。
//!
//! ## 依赖关系
//! - 使用 `cli/simulate.rs` 定义的 SimulateArgs
//! - 使用 `indexing/simulate.rs` 生成峰
//! - 使用 `parsers/peaks.rs` 写出峰表

use crate::cli::simulate::SimulateArgs;
use crate::error::{IndexerError, Result};
use crate::indexing::{simulate::simulate, SampleGeometry};
use crate::models::{CellParameters, OrientationMatrix};
use crate::parsers;
use crate::utils::output;

use nalgebra::Rotation3;
use std::path::Path;

/// 执行合成峰生成
pub fn execute(args: SimulateArgs) -> Result<()> {
    output::print_header("Synthetic Laue Peaks");

    let cell = build_cell(&args.cell)?;
    let orientation = build_orientation(&cell, &args.euler)?;
    let geometry = build_geometry(&args)?;

    output::print_info(&format!(
        "Cell: a={:.4} b={:.4} c={:.4} α={:.3} β={:.3} γ={:.3} (V={:.3} Å³)",
        cell.a, cell.b, cell.c, cell.alpha, cell.beta, cell.gamma, cell.volume
    ));

    if args.output.exists() && !args.overwrite {
        output::print_skip(&format!(
            "Output exists, use --overwrite to replace: {}",
            args.output.display()
        ));
        return Ok(());
    }
    ensure_parent_exists(&args.output)?;

    let synthetic = simulate(&orientation, &geometry, args.max_index);
    if synthetic.is_empty() {
        return Err(IndexerError::Other(
            "No reflection reaches the detector; widen the wavelength band or the detector"
                .to_string(),
        ));
    }
    output::print_success(&format!(
        "{} reflections with |h|,|k|,|l| <= {} reach the detector",
        synthetic.len(),
        args.max_index
    ));

    let peaks: Vec<_> = synthetic.iter().map(|s| s.peak).collect();
    parsers::write_peak_file(&args.output, &peaks)?;
    output::print_written("peak table", &args.output.display().to_string());

    if let Some(ref truth) = args.truth {
        ensure_parent_exists(truth)?;
        let triples: Vec<_> = synthetic.iter().map(|s| (s.peak.seq, s.hkl)).collect();
        parsers::write_truth_file(truth, &triples)?;
        output::print_written("true h,k,l", &truth.display().to_string());
    }

    Ok(())
}

/// 校验并构建晶胞
fn build_cell(values: &[f64]) -> Result<CellParameters> {
    let [a, b, c, alpha, beta, gamma] = values else {
        return Err(IndexerError::InvalidArgument(format!(
            "--cell needs 6 values, got {}",
            values.len()
        )));
    };

    if [a, b, c].iter().any(|&&x| !(x > 0.0)) {
        return Err(IndexerError::InvalidArgument(
            "cell lengths must be positive".to_string(),
        ));
    }
    if [alpha, beta, gamma].iter().any(|&&x| !(x > 0.0 && x < 180.0)) {
        return Err(IndexerError::InvalidArgument(
            "cell angles must lie strictly between 0 and 180 degrees".to_string(),
        ));
    }

    let cell = CellParameters::from_parameters(*a, *b, *c, *alpha, *beta, *gamma);
    if !(cell.volume.is_finite() && cell.volume > 0.0) {
        return Err(IndexerError::InvalidArgument(format!(
            "angles {} {} {} do not form a cell",
            alpha, beta, gamma
        )));
    }
    Ok(cell)
}

/// 由欧拉角（度）构建 UB
fn build_orientation(cell: &CellParameters, euler: &[f64]) -> Result<OrientationMatrix> {
    let [roll, pitch, yaw] = euler else {
        return Err(IndexerError::InvalidArgument(format!(
            "--euler needs 3 values, got {}",
            euler.len()
        )));
    };

    let rotation =
        Rotation3::from_euler_angles(roll.to_radians(), pitch.to_radians(), yaw.to_radians());
    OrientationMatrix::from_cell(cell, rotation.matrix())
        .ok_or_else(|| IndexerError::InvalidArgument("cell matrix is singular".to_string()))
}

fn build_geometry(args: &SimulateArgs) -> Result<SampleGeometry> {
    if !(args.wl_min > 0.0 && args.wl_max > args.wl_min) {
        return Err(IndexerError::InvalidRange(format!(
            "wavelength band {}-{} (must be 0 < min < max)",
            args.wl_min, args.wl_max
        )));
    }
    if !(args.detd > 0.0) || !(args.half_size > 0.0) {
        return Err(IndexerError::InvalidArgument(
            "--detd and --half-size must be positive".to_string(),
        ));
    }
    if args.max_index < 1 {
        return Err(IndexerError::InvalidArgument(format!(
            "--max-index must be at least 1, got {}",
            args.max_index
        )));
    }

    Ok(SampleGeometry {
        chi: args.chi,
        phi: args.phi,
        omega: args.omega,
        deta: args.deta,
        detd: args.detd,
        wl_min: args.wl_min,
        wl_max: args.wl_max,
        half_size: args.half_size,
    })
}

fn ensure_parent_exists(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => {
            Err(IndexerError::DirectoryNotFound {
                path: dir.display().to_string(),
            })
        }
        _ => Ok(()),
    }
}
