//! # 解析器模块
//!
//! 峰表的读取与写出。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: peaks

pub mod peaks;

pub use peaks::{
    parse_sequence_list, read_peak_file, select_sequences, write_hkl_file, write_peak_file,
    write_truth_file,
};
