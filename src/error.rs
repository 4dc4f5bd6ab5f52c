//! # 统一错误处理模块
//!
//! 定义 scd-indexer 的所有错误类型，使用 `thiserror` 派生。
//! 指标化核心自身的失败类型 `IndexFailure` 定义在 `indexing/` 中，
//! 这里通过 `#[from]` 包装。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 使用 `indexing::IndexFailure`

use crate::indexing::IndexFailure;
use thiserror::Error;

/// scd-indexer 统一错误类型
#[derive(Error, Debug)]
pub enum IndexerError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────
    // 指标化失败
    // ─────────────────────────────────────────────────────────────
    #[error("Indexing failed: {0}")]
    Indexing(#[from] IndexFailure),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid range format: {0}")]
    InvalidRange(String),

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("No matching files found with pattern: {pattern}")]
    NoFilesFound { pattern: String },

    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, IndexerError>;
