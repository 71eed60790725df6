//! 模型输出解析
//!
//! 两种后端最终都产出一段"应当是 JSON"的文本。这里统一做三件事：
//! 剥掉代码围栏、解析成宽松形状、显式校验成 `StudentResult`。
//! 不信任服务端的输出形状。

use chrono::Local;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::{BreakdownItem, StudentResult};
use crate::utils::logging::truncate_text;

/// 剥离 markdown 代码围栏，返回内部文本
///
/// 模型（尤其是 JSON 模式未生效时）常把结果包在 ```json ... ``` 里。
pub fn strip_code_fence(text: &str) -> String {
    let re = Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("静态正则必定合法");
    match re.captures(text) {
        Some(caps) => caps[1].trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// 模型返回的宽松结果形状（字段名兼容驼峰与下划线）
#[derive(Debug, Deserialize)]
struct RawResult {
    #[serde(alias = "studentName", default)]
    student_name: Option<String>,
    #[serde(alias = "className", default)]
    class_name: Option<String>,
    score: f64,
    #[serde(alias = "maxScore")]
    max_score: f64,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    breakdown: Vec<RawBreakdownItem>,
}

#[derive(Debug, Deserialize)]
struct RawBreakdownItem {
    label: String,
    score: f64,
    #[serde(alias = "maxScore")]
    max_score: f64,
    #[serde(default)]
    comment: Option<String>,
    #[serde(alias = "isDeduction", default)]
    is_deduction: Option<bool>,
    #[serde(default)]
    region: Option<[f64; 4]>,
}

/// 把模型文本解析为批改结果
///
/// 总分与细项之和的关系不在这里校验（模型输出按参考信息对待），
/// 形状不对才算失败。
pub fn parse_student_result(text: &str) -> AppResult<StudentResult> {
    let payload = strip_code_fence(text);
    let raw: RawResult = serde_json::from_str(&payload)
        .map_err(|e| AppError::malformed_result(e.to_string(), truncate_text(&payload, 200)))?;

    Ok(StudentResult {
        id: format!("res-{}", Local::now().format("%Y%m%d%H%M%S%3f")),
        student_name: raw.student_name.unwrap_or_default(),
        class_name: raw.class_name,
        score: raw.score,
        max_score: raw.max_score,
        comment: raw.comment.unwrap_or_default(),
        breakdown: raw
            .breakdown
            .into_iter()
            .map(|item| BreakdownItem {
                label: item.label,
                score: item.score,
                max_score: item.max_score,
                comment: item.comment,
                is_deduction: item.is_deduction,
                region: item.region,
            })
            .collect(),
        graded_at: Local::now(),
    })
}

/// 批改结果的结构化输出 schema（Gemini responseSchema 方言）
pub fn grading_response_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "studentName": { "type": "string" },
            "className": { "type": "string" },
            "score": { "type": "number" },
            "maxScore": { "type": "number" },
            "comment": { "type": "string" },
            "breakdown": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "label": { "type": "string" },
                        "score": { "type": "number" },
                        "maxScore": { "type": "number" },
                        "comment": { "type": "string" },
                        "isDeduction": { "type": "boolean" },
                        "region": {
                            "type": "array",
                            "items": { "type": "number" }
                        }
                    },
                    "required": ["label", "score", "maxScore"]
                }
            }
        },
        "required": ["score", "maxScore", "comment"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_json_is_unwrapped() {
        let text = "结果如下：\n```json\n{\"score\": 8}\n```\n";
        assert_eq!(strip_code_fence(text), "{\"score\": 8}");
    }

    #[test]
    fn bare_json_passes_through() {
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn camel_case_response_parses() {
        let text = r#"{
            "studentName": "王五",
            "score": 7.5,
            "maxScore": 10,
            "comment": "步骤完整",
            "breakdown": [
                {"label": "列式", "score": 3, "maxScore": 3},
                {"label": "计算", "score": 4.5, "maxScore": 7, "isDeduction": false,
                 "region": [0.1, 0.4, 0.8, 0.2]}
            ]
        }"#;
        let result = parse_student_result(text).unwrap();
        assert_eq!(result.student_name, "王五");
        assert_eq!(result.score, 7.5);
        assert_eq!(result.breakdown.len(), 2);
        assert_eq!(result.breakdown[1].region, Some([0.1, 0.4, 0.8, 0.2]));
    }

    #[test]
    fn malformed_payload_reports_raw_snippet() {
        let err = parse_student_result("不是 JSON").unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("不是 JSON"));
    }

    #[test]
    fn malformed_payload_snippet_is_truncated() {
        let long = "x".repeat(300);
        let err = parse_student_result(&long).unwrap_err();
        let message = err.to_string();
        assert!(message.contains(&format!("{}...", "x".repeat(200))));
        assert!(!message.contains(&"x".repeat(201)));
    }
}
