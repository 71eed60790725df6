//! 批改结果模型

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 单个评分细项
///
/// `region` 为答题卡上的证据区域，四个 0~1 的归一化坐标
/// （left, top, width, height）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownItem {
    /// 细项名称
    pub label: String,
    /// 得分
    pub score: f64,
    /// 满分
    pub max_score: f64,
    /// 评语
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// 是否为扣分项
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deduction: Option<bool>,
    /// 证据区域
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<[f64; 4]>,
}

/// 一名学生的批改结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentResult {
    /// 结果标识
    pub id: String,
    /// 学生姓名（入库前会被扫描到的姓名覆盖）
    pub student_name: String,
    /// 班级
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// 总得分
    pub score: f64,
    /// 总满分
    pub max_score: f64,
    /// 总评
    pub comment: String,
    /// 评分细项
    #[serde(default)]
    pub breakdown: Vec<BreakdownItem>,
    /// 批改时间
    #[serde(default = "Local::now")]
    pub graded_at: DateTime<Local>,
}

impl StudentResult {
    /// 得分率（max_score 为 0 时返回 0）
    pub fn percentage(&self) -> f64 {
        if self.max_score > 0.0 {
            self.score / self.max_score * 100.0
        } else {
            0.0
        }
    }

    /// 模型输出的一致性检查，仅用于告警，不修改任何字段
    ///
    /// 总分未被钳制到满分、细项之和未与总分对账，均保持原样——
    /// 模型输出按参考信息对待，由阅卷人最终确认。
    pub fn consistency_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.score > self.max_score {
            warnings.push(format!(
                "总分 {} 超过满分 {}",
                self.score, self.max_score
            ));
        }
        if !self.breakdown.is_empty() {
            let sum: f64 = self
                .breakdown
                .iter()
                .map(|item| {
                    if item.is_deduction.unwrap_or(false) {
                        -item.score
                    } else {
                        item.score
                    }
                })
                .sum();
            if (sum - self.score).abs() > 0.01 {
                warnings.push(format!("细项合计 {} 与总分 {} 不一致", sum, self.score));
            }
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(score: f64, max_score: f64) -> StudentResult {
        StudentResult {
            id: "r1".to_string(),
            student_name: "李四".to_string(),
            class_name: None,
            score,
            max_score,
            comment: String::new(),
            breakdown: Vec::new(),
            graded_at: Local::now(),
        }
    }

    #[test]
    fn over_max_score_warns_but_is_not_clamped() {
        let result = sample(12.0, 10.0);
        let warnings = result.consistency_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(result.score, 12.0);
    }

    #[test]
    fn mismatched_breakdown_sum_warns() {
        let mut result = sample(8.0, 10.0);
        result.breakdown = vec![
            BreakdownItem {
                label: "第一步".to_string(),
                score: 3.0,
                max_score: 4.0,
                comment: None,
                is_deduction: None,
                region: None,
            },
            BreakdownItem {
                label: "第二步".to_string(),
                score: 3.0,
                max_score: 6.0,
                comment: None,
                is_deduction: None,
                region: None,
            },
        ];
        assert_eq!(result.consistency_warnings().len(), 1);
    }

    #[test]
    fn deduction_items_count_negative() {
        let mut result = sample(8.0, 10.0);
        result.breakdown = vec![
            BreakdownItem {
                label: "基础分".to_string(),
                score: 10.0,
                max_score: 10.0,
                comment: None,
                is_deduction: None,
                region: None,
            },
            BreakdownItem {
                label: "书写扣分".to_string(),
                score: 2.0,
                max_score: 2.0,
                comment: Some("字迹潦草".to_string()),
                is_deduction: Some(true),
                region: Some([0.1, 0.2, 0.5, 0.3]),
            },
        ];
        assert!(result.consistency_warnings().is_empty());
    }
}
