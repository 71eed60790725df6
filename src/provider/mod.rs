//! AI 服务网关
//!
//! 把两种后端方言（Gemini generateContent / OpenAI 兼容 chat-completion）
//! 收敛到四个操作后面：连通性测试、评分标准生成、按标准批改、阅卷洞察。
//! 不做重试、退避或限流处理，传输与解析错误直接上抛。

pub mod google;
pub mod openai_compat;
pub mod parse;

use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{AppConfig, GradingStrategy, PageContext, ProviderKind, StudentResult};

pub use google::GoogleProvider;
pub use openai_compat::OpenAiCompatProvider;

const GRADING_SYSTEM_PROMPT: &str = "你是一位严谨的阅卷老师。根据给定的评分标准批改学生的答题卡图片，\
只输出一个 JSON 对象，字段为：studentName（如能从卷面辨认）、score（总得分，数字）、\
maxScore（总满分，数字）、comment（总评）、breakdown（数组，每项含 label、score、maxScore，\
可选 comment、isDeduction、region——region 为 [left, top, width, height] 四个 0~1 的归一化坐标，\
指向该细项的卷面依据区域）。不要输出 JSON 以外的任何内容。";

const RUBRIC_SYSTEM_PROMPT: &str = "你是一位资深的命题与阅卷专家。第一张图是题目，第二张图是标准答案。\
请据此产出一份可直接用于批改的评分标准（markdown 格式）：列出每个得分点的名称、分值与判定依据，\
并给出总分。只输出评分标准本身。";

const INSIGHT_SYSTEM_PROMPT: &str = "你是一位教学分析助手。根据给出的批改统计摘要，\
用两三句话指出整体水平与最值得关注的问题，语气面向任课教师。";

/// AI 服务网关
///
/// 两种后端的具体客户端以枚举分发，调用方只看到统一的四个操作。
pub enum Provider {
    Google(GoogleProvider),
    OpenAiCompat(OpenAiCompatProvider),
}

impl Provider {
    /// 按配置构造网关；API 密钥缺失在这里同步检出
    pub fn from_config(config: &AppConfig, strategy: GradingStrategy) -> AppResult<Self> {
        config.validate()?;
        match config.provider {
            ProviderKind::Google => Ok(Provider::Google(GoogleProvider::new(config, strategy))),
            ProviderKind::OpenaiCompatible | ProviderKind::ZhipuCompatible => {
                Ok(Provider::OpenAiCompat(OpenAiCompatProvider::new(config)))
            }
        }
    }

    /// 当前生效的模型标识
    pub fn model(&self) -> &str {
        match self {
            Provider::Google(p) => p.model(),
            Provider::OpenAiCompat(p) => p.model(),
        }
    }

    /// 连通性测试（健康快照用）
    pub async fn test_connection(&self) -> AppResult<()> {
        let reply = match self {
            Provider::Google(p) => p.generate(None, "请回复“OK”。", &[], None).await?,
            Provider::OpenAiCompat(p) => p.chat(None, "请回复“OK”。", &[], false).await?,
        };
        info!("✓ AI 服务连通 (模型: {}, 回复: {})", self.model(), reply);
        Ok(())
    }

    /// 由题目图与标准答案图生成评分标准（markdown 文本）
    pub async fn generate_rubric(
        &self,
        question_image: &str,
        answer_image: &str,
    ) -> AppResult<String> {
        let text = "请根据这两张图生成评分标准。";
        match self {
            Provider::Google(p) => {
                let images = [data_url_parts(question_image), data_url_parts(answer_image)];
                p.generate(Some(RUBRIC_SYSTEM_PROMPT), text, &images, None)
                    .await
            }
            Provider::OpenAiCompat(p) => {
                let urls = vec![question_image.to_string(), answer_image.to_string()];
                p.chat(Some(RUBRIC_SYSTEM_PROMPT), text, &urls, false).await
            }
        }
    }

    /// 按评分标准批改一张答题卡
    pub async fn grade(&self, ctx: &PageContext, rubric: &str) -> AppResult<StudentResult> {
        let text = format!("评分标准如下：\n\n{}\n\n请批改图中的答题卡。", rubric);
        let raw = match self {
            Provider::Google(p) => {
                let (mime, data) = ctx.image_parts();
                let images = [(mime.to_string(), data.to_string())];
                p.generate(
                    Some(GRADING_SYSTEM_PROMPT),
                    &text,
                    &images,
                    Some(parse::grading_response_schema()),
                )
                .await?
            }
            Provider::OpenAiCompat(p) => {
                let urls = vec![ctx.image_base64.clone()];
                p.chat(Some(GRADING_SYSTEM_PROMPT), &text, &urls, true)
                    .await?
            }
        };
        parse::parse_student_result(&raw)
    }

    /// 请求一段基于统计摘要的简短洞察
    pub async fn generate_insight(&self, summary: &str) -> AppResult<String> {
        match self {
            Provider::Google(p) => p.generate(Some(INSIGHT_SYSTEM_PROMPT), summary, &[], None).await,
            Provider::OpenAiCompat(p) => {
                p.chat(Some(INSIGHT_SYSTEM_PROMPT), summary, &[], false).await
            }
        }
    }
}

/// data URL → (mime, base64 数据)，无前缀时按 image/png 处理
fn data_url_parts(data_url: &str) -> (String, String) {
    if let Some(rest) = data_url.strip_prefix("data:") {
        if let Some((mime, data)) = rest.split_once(";base64,") {
            return (mime.to_string(), data.to_string());
        }
    }
    ("image/png".to_string(), data_url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_fails_construction_synchronously() {
        let config = AppConfig::default();
        let result = Provider::from_config(&config, GradingStrategy::default());
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn strategy_only_applies_to_managed_provider() {
        let mut config = AppConfig {
            api_key: "k".to_string(),
            model: "glm-4v-plus".to_string(),
            provider: ProviderKind::ZhipuCompatible,
            ..AppConfig::default()
        };
        let provider = Provider::from_config(&config, GradingStrategy::Pro).unwrap();
        assert_eq!(provider.model(), "glm-4v-plus");

        config.provider = ProviderKind::Google;
        let provider = Provider::from_config(&config, GradingStrategy::Pro).unwrap();
        assert_eq!(provider.model(), "gemini-2.5-pro");
    }
}
