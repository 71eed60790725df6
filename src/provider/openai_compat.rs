//! OpenAI 兼容端点客户端
//!
//! 覆盖 openai-compatible 与 zhipu-compatible 两种配置
//! （后者只是默认端点不同）。图片以 data URL 形式走 vision
//! content part；需要结构化结果时请求 `response_format: json_object`。
//! 批改策略轴对这类提供方不生效。

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl, ResponseFormat,
    },
    Client,
};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, ProviderError};
use crate::models::AppConfig;

/// OpenAI 兼容客户端
pub struct OpenAiCompatProvider {
    client: Client<OpenAIConfig>,
    endpoint: String,
    model: String,
}

impl OpenAiCompatProvider {
    /// 创建客户端
    pub fn new(config: &AppConfig) -> Self {
        let endpoint = config.effective_endpoint().to_string();
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(&endpoint);

        Self {
            client: Client::with_config(openai_config),
            endpoint,
            model: config.model.clone(),
        }
    }

    /// 当前生效的模型标识
    pub fn model(&self) -> &str {
        &self.model
    }

    /// 发起一次 chat-completion 调用并取回文本
    ///
    /// `image_data_urls` 为 data URL 形式的图片；
    /// `json_mode` 为 true 时请求 JSON 输出模式。
    pub async fn chat(
        &self,
        system: Option<&str>,
        text: &str,
        image_data_urls: &[String],
        json_mode: bool,
    ) -> AppResult<String> {
        debug!("调用 OpenAI 兼容 API，模型: {}", self.model);

        let mut messages = Vec::new();

        if let Some(sys_msg) = system {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(|e| AppError::provider_request_failed(&self.endpoint, e))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = if image_data_urls.is_empty() {
            ChatCompletionRequestUserMessageArgs::default()
                .content(text)
                .build()
                .map_err(|e| AppError::provider_request_failed(&self.endpoint, e))?
        } else {
            let mut content_parts: Vec<ChatCompletionRequestUserMessageContentPart> = Vec::new();
            content_parts.push(ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: text.to_string(),
                },
            ));
            for url in image_data_urls {
                content_parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                    ChatCompletionRequestMessageContentPartImage {
                        image_url: ImageUrl {
                            url: url.clone(),
                            detail: Some(ImageDetail::Auto),
                        },
                    },
                ));
            }
            ChatCompletionRequestUserMessageArgs::default()
                .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
                .build()
                .map_err(|e| AppError::provider_request_failed(&self.endpoint, e))?
        };
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(0.3);
        if json_mode {
            builder.response_format(ResponseFormat::JsonObject);
        }
        let request = builder
            .build()
            .map_err(|e| AppError::provider_request_failed(&self.endpoint, e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("OpenAI 兼容 API 调用失败: {}", e);
            AppError::provider_request_failed(&self.endpoint, e)
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::Provider(ProviderError::EmptyResponse {
                    model: self.model.clone(),
                })
            })?;

        debug!("OpenAI 兼容 API 调用成功");
        Ok(content.trim().to_string())
    }
}
