//! 评分标准服务 - 业务能力层
//!
//! 由两张参考图（题目 + 标准答案）生成评分标准，或直接读写
//! 用户手工编辑过的标准文本。

use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::{AppError, AppResult, StoreError};
use crate::provider::Provider;
use crate::store::StateStore;

/// 评分标准服务
pub struct RubricService;

impl RubricService {
    pub fn new() -> Self {
        Self
    }

    /// 读取本地图片文件并编码为 data URL
    pub async fn load_image_as_data_url(&self, path: &str) -> AppResult<String> {
        let bytes = fs::read(path).await.map_err(|e| {
            AppError::Store(StoreError::ReadFailed {
                path: path.to_string(),
                source: Box::new(e),
            })
        })?;
        let mime = match Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("webp") => "image/webp",
            _ => "image/png",
        };
        Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
    }

    /// 生成评分标准并持久化
    pub async fn generate_and_save(
        &self,
        provider: &Provider,
        store: &StateStore,
        question_image_path: &str,
        answer_image_path: &str,
    ) -> AppResult<String> {
        info!("📝 正在根据参考图生成评分标准...");
        let question = self.load_image_as_data_url(question_image_path).await?;
        let answer = self.load_image_as_data_url(answer_image_path).await?;

        let rubric = provider.generate_rubric(&question, &answer).await?;
        store.save_rubric(&rubric).await?;
        info!("✓ 评分标准已生成并保存 ({} 字符)", rubric.chars().count());
        Ok(rubric)
    }

    /// 读取当前评分标准
    pub async fn load(&self, store: &StateStore) -> AppResult<Option<String>> {
        store.load_rubric().await
    }
}

impl Default for RubricService {
    fn default() -> Self {
        Self::new()
    }
}
