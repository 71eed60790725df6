//! 批改策略
//!
//! flash / pro / reasoning 三档，仅对托管提供方（google）生效：
//! 映射到不同的模型标识与思考预算。其他提供方忽略该轴。

use serde::{Deserialize, Serialize};

/// 批改策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GradingStrategy {
    /// 快速批改
    #[default]
    Flash,
    /// 高质量批改
    Pro,
    /// 带思考预算的深度批改
    Reasoning,
}

impl GradingStrategy {
    /// 托管提供方下对应的模型标识
    pub fn google_model(self) -> &'static str {
        match self {
            GradingStrategy::Flash => "gemini-2.5-flash",
            GradingStrategy::Pro => "gemini-2.5-pro",
            GradingStrategy::Reasoning => "gemini-2.5-flash",
        }
    }

    /// 托管提供方下的思考预算（token 数），None 表示不下发
    pub fn thinking_budget(self) -> Option<i32> {
        match self {
            GradingStrategy::Flash => Some(0),
            GradingStrategy::Pro => None,
            GradingStrategy::Reasoning => Some(8192),
        }
    }

    /// 从持久化字符串解析策略
    ///
    /// 早期版本直接把模型标识存成了策略值，这里做一次性字面量迁移。
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "flash" => Some(GradingStrategy::Flash),
            "pro" => Some(GradingStrategy::Pro),
            "reasoning" => Some(GradingStrategy::Reasoning),
            // 遗留值迁移
            "gemini-2.5-flash" => Some(GradingStrategy::Flash),
            "gemini-2.5-pro" => Some(GradingStrategy::Pro),
            _ => None,
        }
    }

    /// 持久化字符串
    pub fn as_str(self) -> &'static str {
        match self {
            GradingStrategy::Flash => "flash",
            GradingStrategy::Pro => "pro",
            GradingStrategy::Reasoning => "reasoning",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_model_ids_migrate_to_strategies() {
        assert_eq!(
            GradingStrategy::parse("gemini-2.5-flash"),
            Some(GradingStrategy::Flash)
        );
        assert_eq!(
            GradingStrategy::parse("gemini-2.5-pro"),
            Some(GradingStrategy::Pro)
        );
    }

    #[test]
    fn round_trip_through_persisted_string() {
        for s in [
            GradingStrategy::Flash,
            GradingStrategy::Pro,
            GradingStrategy::Reasoning,
        ] {
            assert_eq!(GradingStrategy::parse(s.as_str()), Some(s));
        }
    }
}
