//! # scd-indexer - 单晶 Laue 衍射峰盲指标化
//!
//! 从一组测量峰（样品取向角、探测器几何、峰位与波长）出发，
//! 在没有任何晶胞先验的情况下求出约化晶胞、UB 取向矩阵
//! 和每个峰的 Miller 指数。
//!
//! ## 子命令
//! - `index`    - 对峰表（或目录中的全部峰表）做指标化
//! - `simulate` - 由已知晶胞与几何生成合成峰表
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/   (峰表读写)
//!   │     ├── indexing/  (指标化核心)
//!   │     ├── batch/     (并行批量处理)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (终端输出与进度条)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod indexing;
mod models;
mod parsers;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
