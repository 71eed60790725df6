use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, StoreError};
use crate::models::{AppConfig, GradingStrategy};

/// 单值状态存储
///
/// 职责：
/// - 数据目录下的模型配置 / 评分标准 / 策略读写
/// - 策略遗留值的一次性迁移（读到旧值时立即回写新值）
/// - 不认识批改流程
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// 创建状态存储（目录不存在时首次写入会创建）
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    async fn ensure_dir(&self) -> AppResult<()> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            AppError::Store(StoreError::WriteFailed {
                path: self.dir.display().to_string(),
                source: Box::new(e),
            })
        })
    }

    async fn read_if_exists(&self, name: &str) -> AppResult<Option<String>> {
        let path = self.path(name);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Store(StoreError::ReadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })),
        }
    }

    async fn write(&self, name: &str, content: &str) -> AppResult<()> {
        self.ensure_dir().await?;
        let path = self.path(name);
        fs::write(&path, content).await.map_err(|e| {
            AppError::Store(StoreError::WriteFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })
    }

    // ========== 模型服务配置 ==========

    /// 读取模型服务配置，不存在时返回 None
    pub async fn load_app_config(&self) -> AppResult<Option<AppConfig>> {
        let Some(content) = self.read_if_exists("config.json").await? else {
            return Ok(None);
        };
        let config = serde_json::from_str(&content).map_err(|e| {
            AppError::Store(StoreError::SerdeFailed {
                path: self.path("config.json").display().to_string(),
                source: Box::new(e),
            })
        })?;
        Ok(Some(config))
    }

    /// 保存模型服务配置
    pub async fn save_app_config(&self, config: &AppConfig) -> AppResult<()> {
        let content = serde_json::to_string_pretty(config)?;
        self.write("config.json", &content).await?;
        debug!("模型服务配置已保存");
        Ok(())
    }

    // ========== 评分标准 ==========

    /// 读取评分标准文本
    pub async fn load_rubric(&self) -> AppResult<Option<String>> {
        self.read_if_exists("rubric.md").await
    }

    /// 保存评分标准文本
    pub async fn save_rubric(&self, rubric: &str) -> AppResult<()> {
        self.write("rubric.md", rubric).await
    }

    // ========== 批改策略 ==========

    /// 读取批改策略
    ///
    /// 读到遗留的模型标识值时迁移为新策略值并回写；
    /// 文件缺失或值无法识别时取默认策略。
    pub async fn load_strategy(&self) -> AppResult<GradingStrategy> {
        let Some(raw) = self.read_if_exists("strategy").await? else {
            return Ok(GradingStrategy::default());
        };
        let trimmed = raw.trim();
        match GradingStrategy::parse(trimmed) {
            Some(strategy) => {
                if strategy.as_str() != trimmed {
                    info!("迁移遗留策略值 '{}' → '{}'", trimmed, strategy.as_str());
                    self.save_strategy(strategy).await?;
                }
                Ok(strategy)
            }
            None => Ok(GradingStrategy::default()),
        }
    }

    /// 保存批改策略
    pub async fn save_strategy(&self, strategy: GradingStrategy) -> AppResult<()> {
        self.write("strategy", strategy.as_str()).await
    }

    /// 数据目录
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderKind;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("grader_state_{}_{}", std::process::id(), tag))
    }

    #[tokio::test]
    async fn app_config_round_trips_through_disk() {
        let store = StateStore::new(temp_dir("config"));
        let config = AppConfig {
            provider: ProviderKind::OpenaiCompatible,
            endpoint: "https://api.example.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: "sk-abc".to_string(),
        };
        store.save_app_config(&config).await.unwrap();
        let restored = store.load_app_config().await.unwrap().unwrap();
        assert_eq!(config, restored);
    }

    #[tokio::test]
    async fn missing_files_yield_defaults() {
        let store = StateStore::new(temp_dir("missing"));
        assert!(store.load_app_config().await.unwrap().is_none());
        assert!(store.load_rubric().await.unwrap().is_none());
        assert_eq!(
            store.load_strategy().await.unwrap(),
            GradingStrategy::default()
        );
    }

    #[tokio::test]
    async fn legacy_strategy_value_is_migrated_and_rewritten() {
        let dir = temp_dir("legacy");
        let store = StateStore::new(&dir);
        store.write("strategy", "gemini-2.5-pro").await.unwrap();

        let strategy = store.load_strategy().await.unwrap();
        assert_eq!(strategy, GradingStrategy::Pro);

        // 第二次读取应命中已迁移的新值
        let raw = tokio::fs::read_to_string(dir.join("strategy")).await.unwrap();
        assert_eq!(raw.trim(), "pro");
    }
}
