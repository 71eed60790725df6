//! 阅卷分析
//!
//! 把批改历史聚合成摘要统计（均分、及格率、档位分布），
//! 并为 AI 洞察拼装提示词。

use crate::models::StudentResult;

/// 及格线（绝对分数）
pub const PASS_THRESHOLD: f64 = 6.0;

/// 档位分布
///
/// 按得分率划档：优秀 ≥85%，良好 ≥70%，及格 ≥50%，其余为待加油。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Distribution {
    /// 待加油（<50%）
    pub needs_work: usize,
    /// 及格（50%~70%）
    pub pass: usize,
    /// 良好（70%~85%）
    pub good: usize,
    /// 优秀（≥85%）
    pub excellent: usize,
}

/// 历史摘要统计
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    /// 样本数
    pub count: usize,
    /// 平均得分
    pub average_score: f64,
    /// 及格率（百分比，0~100）
    pub pass_rate: f64,
    /// 档位分布
    pub distribution: Distribution,
}

/// 聚合批改历史
pub fn summarize(entries: &[StudentResult]) -> HistorySummary {
    if entries.is_empty() {
        return HistorySummary {
            count: 0,
            average_score: 0.0,
            pass_rate: 0.0,
            distribution: Distribution::default(),
        };
    }

    let count = entries.len();
    let total: f64 = entries.iter().map(|r| r.score).sum();
    let passed = entries
        .iter()
        .filter(|r| r.score >= PASS_THRESHOLD)
        .count();

    let mut distribution = Distribution::default();
    for entry in entries {
        let pct = entry.percentage();
        if pct >= 85.0 {
            distribution.excellent += 1;
        } else if pct >= 70.0 {
            distribution.good += 1;
        } else if pct >= 50.0 {
            distribution.pass += 1;
        } else {
            distribution.needs_work += 1;
        }
    }

    HistorySummary {
        count,
        average_score: total / count as f64,
        pass_rate: passed as f64 / count as f64 * 100.0,
        distribution,
    }
}

/// 把摘要格式化为 AI 洞察的输入
pub fn format_summary_prompt(summary: &HistorySummary) -> String {
    format!(
        "已批改 {} 份，平均得分 {:.2}，及格率 {:.1}%。\
         档位分布：优秀 {} 人，良好 {} 人，及格 {} 人，待加油 {} 人。",
        summary.count,
        summary.average_score,
        summary.pass_rate,
        summary.distribution.excellent,
        summary.distribution.good,
        summary.distribution.pass,
        summary.distribution.needs_work,
    )
}

/// 摘要的终端展示
pub fn format_summary_report(summary: &HistorySummary) -> String {
    format!(
        "样本数: {}\n平均得分: {:.2}\n及格率: {:.1}%\n优秀: {} | 良好: {} | 及格: {} | 待加油: {}",
        summary.count,
        summary.average_score,
        summary.pass_rate,
        summary.distribution.excellent,
        summary.distribution.good,
        summary.distribution.pass,
        summary.distribution.needs_work,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn sample(score: f64, max_score: f64) -> StudentResult {
        StudentResult {
            id: String::new(),
            student_name: String::new(),
            class_name: None,
            score,
            max_score,
            comment: String::new(),
            breakdown: Vec::new(),
            graded_at: Local::now(),
        }
    }

    #[test]
    fn mixed_scores_bucket_into_three_tiers() {
        let entries = vec![sample(8.0, 10.0), sample(5.0, 10.0), sample(9.0, 10.0)];
        let summary = summarize(&entries);

        assert_eq!(summary.count, 3);
        assert!((summary.average_score - 7.33).abs() < 0.01);
        assert!((summary.pass_rate - 66.7).abs() < 0.1);
        assert_eq!(
            summary.distribution,
            Distribution {
                needs_work: 0,
                pass: 1,
                good: 1,
                excellent: 1,
            }
        );
    }

    #[test]
    fn empty_history_yields_zeroed_summary() {
        let summary = summarize(&[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average_score, 0.0);
        assert_eq!(summary.pass_rate, 0.0);
    }

    #[test]
    fn boundary_percentages_land_in_upper_bucket() {
        let entries = vec![
            sample(8.5, 10.0), // 85% → 优秀
            sample(7.0, 10.0), // 70% → 良好
            sample(5.0, 10.0), // 50% → 及格
            sample(4.9, 10.0), // 49% → 待加油
        ];
        let distribution = summarize(&entries).distribution;
        assert_eq!(distribution.excellent, 1);
        assert_eq!(distribution.good, 1);
        assert_eq!(distribution.pass, 1);
        assert_eq!(distribution.needs_work, 1);
    }
}
