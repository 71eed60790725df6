//! 模型服务配置
//!
//! 用户可编辑、整体序列化保存的单条配置记录。

use serde::{Deserialize, Serialize};

use crate::error::{AppError, ConfigError};

/// AI 服务提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// 托管的多模态服务（Gemini），endpoint 配置被忽略
    Google,
    /// 任意 OpenAI 兼容的 chat-completion 端点
    OpenaiCompatible,
    /// 智谱开放平台（OpenAI 兼容协议，仅默认端点不同）
    ZhipuCompatible,
}

impl ProviderKind {
    /// 提供方标识（与序列化值一致）
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::OpenaiCompatible => "openai-compatible",
            ProviderKind::ZhipuCompatible => "zhipu-compatible",
        }
    }

    /// 从字符串解析提供方
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "google" => Ok(ProviderKind::Google),
            "openai-compatible" | "openai" => Ok(ProviderKind::OpenaiCompatible),
            "zhipu-compatible" | "zhipu" => Ok(ProviderKind::ZhipuCompatible),
            other => Err(AppError::Config(ConfigError::UnknownProvider {
                value: other.to_string(),
            })),
        }
    }

    /// 该提供方的默认端点
    pub fn default_endpoint(self) -> &'static str {
        match self {
            // 托管提供方不使用用户配置的 endpoint
            ProviderKind::Google => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::OpenaiCompatible => "https://api.openai.com/v1",
            ProviderKind::ZhipuCompatible => "https://open.bigmodel.cn/api/paas/v4",
        }
    }
}

/// 模型服务配置记录
///
/// 对托管提供方（google），`endpoint` 被忽略；strategy 轴也只对它生效。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub provider: ProviderKind,
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Google,
            endpoint: ProviderKind::Google.default_endpoint().to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key: String::new(),
        }
    }
}

impl AppConfig {
    /// 校验配置是否可用于发起调用
    ///
    /// API 密钥缺失在调用发起前同步检出，而不是等到请求失败。
    pub fn validate(&self) -> Result<(), AppError> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::Config(ConfigError::MissingApiKey {
                provider: self.provider.name().to_string(),
            }));
        }
        Ok(())
    }

    /// 实际生效的端点（托管提供方忽略用户配置）
    pub fn effective_endpoint(&self) -> &str {
        match self.provider {
            ProviderKind::Google => ProviderKind::Google.default_endpoint(),
            _ if self.endpoint.trim().is_empty() => self.provider.default_endpoint(),
            _ => &self.endpoint,
        }
    }
}
