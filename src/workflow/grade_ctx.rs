//! 批改上下文
//!
//! 封装"这是第几份、处于哪种模式"这一信息，仅用于日志与展示。

use std::fmt::Display;

/// 批改上下文
#[derive(Debug, Clone, Copy)]
pub struct GradeCtx {
    /// 本次会话中的序号（从 1 开始）
    pub sequence: usize,
    /// 是否处于批量模式
    pub batch: bool,
}

impl GradeCtx {
    /// 单份试改模式的上下文
    pub fn trial() -> Self {
        Self {
            sequence: 1,
            batch: false,
        }
    }

    /// 批量模式下第 n 份的上下文
    pub fn batch(sequence: usize) -> Self {
        Self {
            sequence,
            batch: true,
        }
    }
}

impl Display for GradeCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = if self.batch { "批量" } else { "试改" };
        write!(f, "[{}模式 第{}份]", mode, self.sequence)
    }
}
