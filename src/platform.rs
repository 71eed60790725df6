//! 批改平台识别与选择器档案
//!
//! 按主机名子串识别两个已知平台，其余一律落到通用档案。
//! 每个平台维护一组按优先级排列的 CSS 选择器，依次尝试，
//! 全部落空后由页面脚本走"最大可见图片"启发式兜底。

use serde::{Deserialize, Serialize};

/// 批改平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// 智学网
    Zhixue,
    /// 好分数
    Haofenshu,
    /// 未识别的平台，使用通用档案
    Generic,
}

/// 平台的选择器档案
#[derive(Debug, Clone)]
pub struct SelectorProfile {
    /// 答题卡图片元素，按优先级排列
    pub image_selectors: &'static [&'static str],
    /// 分数输入框，按优先级排列
    pub score_selectors: &'static [&'static str],
    /// 学生姓名标签，按优先级排列
    pub name_selectors: &'static [&'static str],
}

impl Platform {
    /// 从页面 URL 的主机名识别平台
    pub fn detect(url: &str) -> Self {
        if url.contains("zhixue.com") {
            Platform::Zhixue
        } else if url.contains("haofenshu") || url.contains("yunxiao.com") {
            Platform::Haofenshu
        } else {
            Platform::Generic
        }
    }

    /// 平台展示名
    pub fn name(self) -> &'static str {
        match self {
            Platform::Zhixue => "智学网",
            Platform::Haofenshu => "好分数",
            Platform::Generic => "通用",
        }
    }

    /// 该平台的选择器档案
    pub fn profile(self) -> SelectorProfile {
        match self {
            Platform::Zhixue => SelectorProfile {
                image_selectors: &[
                    ".mark-body canvas",
                    ".mark-container img.answer-image",
                    ".yuejuan-main canvas",
                    ".answer-sheet img",
                ],
                score_selectors: &[
                    ".score-input input",
                    "input.mark-score",
                    ".mark-action input[type='text']",
                ],
                name_selectors: &[".student-info .name", ".mark-header .student-name"],
            },
            Platform::Haofenshu => SelectorProfile {
                image_selectors: &[
                    ".marking-area img",
                    ".paper-image img",
                    ".marking-area canvas",
                ],
                score_selectors: &[
                    ".score-board input",
                    ".give-score input",
                    "input[placeholder*='分数']",
                ],
                name_selectors: &[".stu-name", ".paper-head .name"],
            },
            Platform::Generic => SelectorProfile {
                image_selectors: &[
                    "canvas",
                    "img[src*='answer']",
                    "img[src*='paper']",
                    ".answer img",
                ],
                score_selectors: &[
                    "input[type='number']",
                    "input[placeholder*='分']",
                    "input[type='text']",
                ],
                name_selectors: &["[class*='student-name']", "[class*='stu-name']"],
            },
        }
    }
}
