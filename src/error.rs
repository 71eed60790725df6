use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 浏览器相关错误
    Browser(BrowserError),
    /// 页面采集错误
    Page(PageError),
    /// AI 服务错误
    Provider(ProviderError),
    /// 本地存储错误
    Store(StoreError),
    /// 配置错误
    Config(ConfigError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl AppError {
    /// 该错误是否属于可重试的瞬时错误
    ///
    /// 批改循环用此区分"静默重试"与"终止并上报"：
    /// 页面采集类错误（元素未出现、提取失败）在批量模式下重试；
    /// AI 服务错误与配置错误一律视为致命，避免反复烧掉配额。
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Page(_) | AppError::Browser(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Browser(e) => write!(f, "浏览器错误: {}", e),
            AppError::Page(e) => write!(f, "页面错误: {}", e),
            AppError::Provider(e) => write!(f, "AI 服务响应异常: {}", e),
            AppError::Store(e) => write!(f, "存储错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Browser(e) => Some(e),
            AppError::Page(e) => Some(e),
            AppError::Provider(e) => Some(e),
            AppError::Store(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 浏览器相关错误
#[derive(Debug)]
pub enum BrowserError {
    /// 连接浏览器失败
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 未找到批改平台标签页
    GradingTabNotFound,
    /// 执行脚本失败
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 脚本执行超时
    ScriptTimeout { timeout_ms: u64 },
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::ConnectionFailed { port, source } => {
                write!(f, "无法连接到浏览器 (端口: {}): {}", port, source)
            }
            BrowserError::GradingTabNotFound => {
                write!(f, "未找到批改平台标签页，请先在浏览器中打开阅卷页面")
            }
            BrowserError::ScriptExecutionFailed { source } => {
                write!(f, "执行脚本失败: {}", source)
            }
            BrowserError::ScriptTimeout { timeout_ms } => {
                write!(f, "脚本执行超时 ({} 毫秒)", timeout_ms)
            }
        }
    }
}

impl std::error::Error for BrowserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowserError::ConnectionFailed { source, .. }
            | BrowserError::ScriptExecutionFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 页面采集错误
#[derive(Debug)]
pub enum PageError {
    /// 未找到答题卡图片元素
    NoAnswerImage,
    /// 图片提取失败（常见于跨域限制）
    ImageExtractionFailed { detail: String },
    /// 未找到可写入的分数输入框
    NoScoreInput,
    /// 分数写入失败
    ScoreFillFailed { detail: String },
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageError::NoAnswerImage => write!(f, "未在页面上找到答题卡图片"),
            PageError::ImageExtractionFailed { detail } => {
                write!(f, "答题卡图片提取失败: {}", detail)
            }
            PageError::NoScoreInput => write!(f, "未找到可写入的分数输入框"),
            PageError::ScoreFillFailed { detail } => write!(f, "分数写入失败: {}", detail),
        }
    }
}

impl std::error::Error for PageError {}

/// AI 服务错误
#[derive(Debug)]
pub enum ProviderError {
    /// 网络请求失败
    RequestFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 服务端返回非 2xx 响应
    BadStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 返回内容为空
    EmptyResponse { model: String },
    /// 返回的 JSON 无法解析为批改结果
    MalformedResult { detail: String, raw: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::RequestFailed { endpoint, source } => {
                write!(f, "请求失败 ({}): {}", endpoint, source)
            }
            ProviderError::BadStatus {
                endpoint,
                status,
                body,
            } => {
                write!(f, "服务端返回 {} ({}): {}", status, endpoint, body)
            }
            ProviderError::EmptyResponse { model } => {
                write!(f, "模型返回内容为空 (模型: {})", model)
            }
            ProviderError::MalformedResult { detail, raw } => {
                write!(f, "批改结果解析失败: {} (原始内容: {})", detail, raw)
            }
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProviderError::RequestFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 本地存储错误
#[derive(Debug)]
pub enum StoreError {
    /// 读取失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 序列化/反序列化失败
    SerdeFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ReadFailed { path, source } => {
                write!(f, "读取失败 ({}): {}", path, source)
            }
            StoreError::WriteFailed { path, source } => {
                write!(f, "写入失败 ({}): {}", path, source)
            }
            StoreError::SerdeFailed { path, source } => {
                write!(f, "序列化失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::ReadFailed { source, .. }
            | StoreError::WriteFailed { source, .. }
            | StoreError::SerdeFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// API 密钥缺失
    MissingApiKey { provider: String },
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 未知的服务提供方
    UnknownProvider { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingApiKey { provider } => {
                write!(f, "尚未配置 API 密钥 (提供方: {})", provider)
            }
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
            ConfigError::UnknownProvider { value } => {
                write!(f, "未知的服务提供方: {}", value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Store(StoreError::SerdeFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Store(StoreError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建 AI 服务请求错误
    pub fn provider_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Provider(ProviderError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建图片提取错误
    pub fn image_extraction_failed(detail: impl Into<String>) -> Self {
        AppError::Page(PageError::ImageExtractionFailed {
            detail: detail.into(),
        })
    }

    /// 创建批改结果解析错误
    pub fn malformed_result(detail: impl Into<String>, raw: impl Into<String>) -> Self {
        AppError::Provider(ProviderError::MalformedResult {
            detail: detail.into(),
            raw: raw.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_errors_are_transient() {
        let err = AppError::Page(PageError::NoAnswerImage);
        assert!(err.is_transient());
    }

    #[test]
    fn provider_and_config_errors_are_fatal() {
        let provider = AppError::Provider(ProviderError::EmptyResponse {
            model: "gemini-2.5-flash".to_string(),
        });
        let config = AppError::Config(ConfigError::MissingApiKey {
            provider: "google".to_string(),
        });
        assert!(!provider.is_transient());
        assert!(!config.is_transient());
    }
}
