//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS"的能力。
//! 所有页面操作（扫描、检测、写分）都经由这里下发。

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{AppError, AppResult, BrowserError};

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露带超时的 eval() 能力
/// - 不认识 PageContext / StudentResult
/// - 不处理业务流程
pub struct JsExecutor {
    page: Page,
    eval_timeout: Duration,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page, eval_timeout: Duration) -> Self {
        Self { page, eval_timeout }
    }

    /// 获取 page 的引用（用于读取 URL 等元信息）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 当前页面 URL
    pub async fn current_url(&self) -> AppResult<String> {
        let url = self.page.url().await?;
        Ok(url.unwrap_or_default())
    }

    /// 执行 JS 代码并返回 JSON 结果
    ///
    /// 脚本超过配置时限未返回时报 `ScriptTimeout`，
    /// 避免单次挂起的求值把整个批改循环拖死。
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let code = js_code.into();
        let result = timeout(self.eval_timeout, self.page.evaluate(code))
            .await
            .map_err(|_| {
                AppError::Browser(BrowserError::ScriptTimeout {
                    timeout_ms: self.eval_timeout.as_millis() as u64,
                })
            })??;
        let json_value = result.into_value().map_err(|e| {
            AppError::Browser(BrowserError::ScriptExecutionFailed {
                source: Box::new(e),
            })
        })?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }
}
