//! 托管多模态服务（Gemini）客户端
//!
//! 请求形状为 `models/{model}:generateContent`，结构化输出走
//! `responseMimeType: application/json` + `responseSchema`；
//! 批改策略在这里映射为模型标识与思考预算。

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, ProviderError};
use crate::models::{AppConfig, GradingStrategy};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: i32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    /// 思考片段，拼接最终文本时跳过
    #[serde(default)]
    thought: Option<bool>,
}

/// 托管提供方客户端
pub struct GoogleProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    thinking_budget: Option<i32>,
}

impl GoogleProvider {
    /// 创建客户端；模型标识与思考预算由批改策略决定
    pub fn new(config: &AppConfig, strategy: GradingStrategy) -> Self {
        Self {
            client: Client::new(),
            base_url: config.effective_endpoint().to_string(),
            api_key: config.api_key.clone(),
            model: strategy.google_model().to_string(),
            thinking_budget: strategy.thinking_budget(),
        }
    }

    /// 当前生效的模型标识
    pub fn model(&self) -> &str {
        &self.model
    }

    /// 发起一次 generateContent 调用并取回拼接后的文本
    ///
    /// `image_parts` 为 (mime, base64 数据) 序列；
    /// `structured` 为 Some 时下发 JSON 结构化输出配置。
    pub async fn generate(
        &self,
        system: Option<&str>,
        text: &str,
        image_parts: &[(String, String)],
        structured: Option<JsonValue>,
    ) -> AppResult<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        debug!("调用 Gemini API，模型: {}", self.model);

        let mut parts: Vec<Part> = vec![Part {
            text: Some(text.to_string()),
            ..Part::default()
        }];
        for (mime, data) in image_parts {
            parts.push(Part {
                inline_data: Some(InlineData {
                    mime_type: mime.clone(),
                    data: data.clone(),
                }),
                ..Part::default()
            });
        }

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction: system.map(|s| Content {
                role: None,
                parts: vec![Part {
                    text: Some(s.to_string()),
                    ..Part::default()
                }],
            }),
            generation_config: Some(GenerationConfig {
                temperature: Some(0.3),
                response_mime_type: structured
                    .as_ref()
                    .map(|_| "application/json".to_string()),
                response_schema: structured,
                thinking_config: self
                    .thinking_budget
                    .map(|thinking_budget| ThinkingConfig { thinking_budget }),
            }),
        };

        let endpoint = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Gemini API 请求失败: {}", e);
                AppError::provider_request_failed(&endpoint, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(ProviderError::BadStatus {
                endpoint,
                status: status.as_u16(),
                body,
            }));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::provider_request_failed(&endpoint, e))?;

        let content = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter(|p| !p.thought.unwrap_or(false))
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(AppError::Provider(ProviderError::EmptyResponse {
                model: self.model.clone(),
            }));
        }

        debug!("Gemini API 调用成功");
        Ok(content.trim().to_string())
    }
}
