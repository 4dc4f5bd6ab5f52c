//! # 批量执行器
//!
//! 在独立的 rayon 线程池中并行处理文件。每个文件的处理互不依赖，
//! 结果按输入顺序汇总。
//!
//! ## 依赖关系
//! - 被 `commands/index.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{IndexerError, Result};
use crate::utils::progress;

use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 单个文件处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessResult {
    /// 处理成功，附带一行摘要
    Success(String),
    /// 跳过（输出已存在）
    Skipped(String),
    /// 处理失败：(文件路径, 错误信息)
    Failed(String, String),
}

/// 批量处理结果统计
#[derive(Debug, Default)]
pub struct BatchResult {
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
    /// 成功文件的摘要，按输入顺序
    pub summaries: Vec<String>,
    /// 失败详情
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success(summary) => {
                self.success += 1;
                self.summaries.push(summary);
            }
            ProcessResult::Skipped(_) => self.skipped += 1,
            ProcessResult::Failed(path, err) => {
                self.failed += 1;
                self.failures.push((path, err));
            }
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    /// 创建新的批量执行器，`jobs == 0` 时使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理文件列表
    pub fn run<F>(&self, files: Vec<PathBuf>, processor: F) -> Result<BatchResult>
    where
        F: Fn(&PathBuf) -> ProcessResult + Sync + Send,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| IndexerError::Other(format!("Failed to start worker pool: {}", e)))?;

        let pb = progress::create_progress_bar(files.len() as u64, "Indexing");
        let failed_count = AtomicUsize::new(0);

        let results: Vec<ProcessResult> = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    let result = processor(file);
                    if let ProcessResult::Failed(_, _) = result {
                        let failed = failed_count.fetch_add(1, Ordering::Relaxed) + 1;
                        pb.set_message(format!("Indexing ({} failed)", failed));
                    }
                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();

        let mut batch_result = BatchResult::default();
        for result in results {
            batch_result.merge(result);
        }

        Ok(batch_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_counts() {
        let mut result = BatchResult::default();
        result.merge(ProcessResult::Success("a".into()));
        result.merge(ProcessResult::Skipped("b".into()));
        result.merge(ProcessResult::Failed("c".into(), "boom".into()));

        assert_eq!(result.total(), 3);
        assert_eq!(result.summaries, vec!["a".to_string()]);
        assert_eq!(result.failures, vec![("c".to_string(), "boom".to_string())]);
    }

    #[test]
    fn test_results_keep_input_order() {
        let files: Vec<PathBuf> = (0..16).map(|i| PathBuf::from(format!("{}.csv", i))).collect();
        let result = BatchRunner::new(4)
            .run(files, |f| {
                ProcessResult::Success(f.display().to_string())
            })
            .unwrap();

        let expected: Vec<String> = (0..16).map(|i| format!("{}.csv", i)).collect();
        assert_eq!(result.success, 16);
        assert_eq!(result.summaries, expected);
    }
}
