//! CLI 子命令
//!
//! 按功能分组的命令处理器，每个命令返回可序列化的报告

mod pick;
mod resolve;
mod simulate;

pub use pick::*;
pub use resolve::*;
pub use simulate::*;
