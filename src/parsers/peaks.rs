//! # 峰表读写
//!
//! 峰表为 CSV，表头 `seq,chi,phi,omega,deta,detd,xcm,ycm,wl`，
//! 一行一个测量峰。以 `#` 开头的行视为注释。
//!
//! ## 功能
//! - 读取峰表（行号写入错误信息）
//! - 按序号列表筛选峰（`1:20,25,30:32`）
//! - 写出峰表（`simulate` 子命令）
//! - 导出每个峰的 h,k,l
//!
//! ## 依赖关系
//! - 被 `commands/index.rs`, `commands/simulate.rs` 调用
//! - 使用 `models/peak.rs`, `models/result.rs`
//! - 使用 `csv` + `serde`，`regex` 解析序号列表

use crate::error::{IndexerError, Result};
use crate::models::{IndexTriple, IndexedPeak, PeakMeasurement};

use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::Path;

const FORMAT: &str = "peak table";

/// 从文件读取峰表
pub fn read_peak_file(path: &Path) -> Result<Vec<PeakMeasurement>> {
    let content = fs::read_to_string(path).map_err(|e| IndexerError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_peak_content(&content, &path.display().to_string())
}

/// 解析峰表文本
pub fn parse_peak_content(content: &str, path_label: &str) -> Result<Vec<PeakMeasurement>> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut peaks = Vec::new();
    for (i, record) in reader.deserialize::<PeakMeasurement>().enumerate() {
        let peak = record.map_err(|e| IndexerError::ParseError {
            format: FORMAT.to_string(),
            path: path_label.to_string(),
            reason: format!("row {}: {}", i + 1, e),
        })?;
        peaks.push(peak);
    }

    if peaks.is_empty() {
        return Err(IndexerError::ParseError {
            format: FORMAT.to_string(),
            path: path_label.to_string(),
            reason: "no peaks found".to_string(),
        });
    }

    Ok(peaks)
}

/// 写出峰表
pub fn write_peak_file(path: &Path, peaks: &[PeakMeasurement]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for peak in peaks {
        writer.serialize(peak)?;
    }
    writer.flush().map_err(|e| IndexerError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// h,k,l 导出的一行
#[derive(Debug, Serialize)]
struct HklRecord {
    seq: i32,
    h: i32,
    k: i32,
    l: i32,
    residual: f64,
    within_tolerance: bool,
}

/// 导出每个峰的 Miller 指数与偏差
pub fn write_hkl_file(path: &Path, peaks: &[IndexedPeak]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for p in peaks {
        writer.serialize(HklRecord {
            seq: p.seq,
            h: p.hkl.h,
            k: p.hkl.k,
            l: p.hkl.l,
            residual: p.residual,
            within_tolerance: p.within_tolerance,
        })?;
    }
    writer.flush().map_err(|e| IndexerError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// 写出带真实指数的合成峰（用于核对）
pub fn write_truth_file(path: &Path, peaks: &[(i32, IndexTriple)]) -> Result<()> {
    #[derive(Serialize)]
    struct TruthRecord {
        seq: i32,
        h: i32,
        k: i32,
        l: i32,
    }

    let mut writer = csv::Writer::from_path(path)?;
    for (seq, hkl) in peaks {
        writer.serialize(TruthRecord {
            seq: *seq,
            h: hkl.h,
            k: hkl.k,
            l: hkl.l,
        })?;
    }
    writer.flush().map_err(|e| IndexerError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// 解析序号列表，如 `1:20,25,30:32`（也接受 `1-20`）
///
/// 结果排序并去重。
pub fn parse_sequence_list(list: &str) -> Result<Vec<i32>> {
    let item = Regex::new(r"^\s*(\d+)\s*(?:[:-]\s*(\d+))?\s*$")
        .map_err(|e| IndexerError::Other(e.to_string()))?;

    let mut result = Vec::new();
    for part in list.split(',') {
        let caps = item
            .captures(part)
            .ok_or_else(|| IndexerError::InvalidRange(list.to_string()))?;

        let start: i32 = caps[1]
            .parse()
            .map_err(|_| IndexerError::InvalidRange(list.to_string()))?;
        let end: i32 = match caps.get(2) {
            Some(m) => m
                .as_str()
                .parse()
                .map_err(|_| IndexerError::InvalidRange(list.to_string()))?,
            None => start,
        };

        if end < start {
            return Err(IndexerError::InvalidRange(format!(
                "{} (start must not exceed end)",
                list
            )));
        }
        result.extend(start..=end);
    }

    result.sort_unstable();
    result.dedup();
    Ok(result)
}

/// 只保留序号在列表中的峰，保持原顺序
pub fn select_sequences(peaks: &[PeakMeasurement], sequences: &[i32]) -> Vec<PeakMeasurement> {
    peaks
        .iter()
        .filter(|p| sequences.binary_search(&p.seq).is_ok())
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# two peaks from one frame
seq,chi,phi,omega,deta,detd,xcm,ycm,wl
1, 0.0, 0.0, 0.0, 90.0, 20.0, 1.25, -3.5, 1.2
2, 0.0, 0.0, 0.0, 90.0, 20.0, -4.0, 2.0, 0.85
";

    #[test]
    fn test_parse_peak_content() {
        let peaks = parse_peak_content(SAMPLE, "sample.csv").unwrap();

        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].seq, 1);
        assert!((peaks[0].ycm + 3.5).abs() < 1e-12);
        assert!((peaks[1].wl - 0.85).abs() < 1e-12);
        assert!((peaks[1].deta - 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_row_reports_row_number() {
        let content = "\
seq,chi,phi,omega,deta,detd,xcm,ycm,wl
1,0,0,0,90,20,1,1,1
2,0,0,0,90,20,abc,1,1
";
        match parse_peak_content(content, "bad.csv") {
            Err(IndexerError::ParseError { path, reason, .. }) => {
                assert_eq!(path, "bad.csv");
                assert!(reason.starts_with("row 2"), "{}", reason);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_table_is_error() {
        let content = "seq,chi,phi,omega,deta,detd,xcm,ycm,wl\n";
        assert!(matches!(
            parse_peak_content(content, "empty.csv"),
            Err(IndexerError::ParseError { .. })
        ));
    }

    #[test]
    fn test_parse_sequence_list() {
        assert_eq!(parse_sequence_list("3").unwrap(), vec![3]);
        assert_eq!(
            parse_sequence_list("1:3, 7,5-6").unwrap(),
            vec![1, 2, 3, 5, 6, 7]
        );
        assert_eq!(parse_sequence_list("2:4,3").unwrap(), vec![2, 3, 4]);
    }

    #[test]
    fn test_parse_sequence_list_rejects_bad_input() {
        for bad in ["", "a", "1:", "5:2", "1,,2", "1:2:3"] {
            assert!(
                matches!(parse_sequence_list(bad), Err(IndexerError::InvalidRange(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_select_sequences_keeps_order() {
        let mut peaks = parse_peak_content(SAMPLE, "sample.csv").unwrap();
        peaks.reverse();
        let selected = select_sequences(&peaks, &[1]);

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].seq, 1);
        assert_eq!(select_sequences(&peaks, &[1, 2])[0].seq, 2);
    }

    #[test]
    fn test_write_then_read_peak_file() {
        let peaks = parse_peak_content(SAMPLE, "sample.csv").unwrap();
        let path = std::env::temp_dir().join(format!("scd_indexer_peaks_{}.csv", std::process::id()));

        write_peak_file(&path, &peaks).unwrap();
        let back = read_peak_file(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(back, peaks);
    }
}
