//! # 运行日志
//!
//! 单次指标化运行的文本日志。每次运行新建一个 `RunLog`，
//! 各阶段依次追加，结束时随 `RunResult` 返回给调用方。
//!
//! ## 依赖关系
//! - 被 `indexing/` 下各阶段写入
//! - 由 `commands/index.rs` 写入磁盘

use std::fmt;

/// 单次运行的日志缓冲
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    text: String,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一行
    pub fn line(&mut self, line: impl AsRef<str>) {
        self.text.push_str(line.as_ref());
        self.text.push('\n');
    }

    pub fn blank(&mut self) {
        self.text.push('\n');
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for RunLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_do_not_share_log() {
        let mut first = RunLog::new();
        first.line("CELL VOLUME= 125.000");

        let second = RunLog::new();
        assert!(second.is_empty());
        assert_eq!(first.as_str(), "CELL VOLUME= 125.000\n");
    }
}
