use serde::Deserialize;

/// 程序运行配置
///
/// 与持久化的模型服务配置（`AppConfig`）不同，这里是进程级配置：
/// 浏览器端口、数据目录等，启动时从 `grader.toml` 与环境变量合成。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 用于定位批改标签页的 URL 子串（空则按已知平台主机名匹配）
    pub target_url: String,
    /// 持久化数据目录（config.json / rubric.md / history.json）
    pub data_dir: String,
    /// 页面脚本执行超时（毫秒）
    pub eval_timeout_ms: u64,
    /// 默认 API 密钥（尚无持久化配置时使用）
    pub default_api_key: String,
    /// 生成评分标准用的题目参考图路径
    pub rubric_question_image: String,
    /// 生成评分标准用的标准答案参考图路径
    pub rubric_answer_image: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            target_url: String::new(),
            data_dir: "grader_data".to_string(),
            eval_timeout_ms: 15_000,
            default_api_key: String::new(),
            rubric_question_image: String::new(),
            rubric_answer_image: String::new(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从环境变量构造配置，未设置的字段取默认值
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            target_url: std::env::var("TARGET_URL").unwrap_or(default.target_url),
            data_dir: std::env::var("GRADER_DATA_DIR").unwrap_or(default.data_dir),
            eval_timeout_ms: std::env::var("EVAL_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.eval_timeout_ms),
            default_api_key: std::env::var("GRADER_API_KEY").unwrap_or(default.default_api_key),
            rubric_question_image: std::env::var("RUBRIC_QUESTION_IMAGE").unwrap_or(default.rubric_question_image),
            rubric_answer_image: std::env::var("RUBRIC_ANSWER_IMAGE").unwrap_or(default.rubric_answer_image),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 加载配置：`grader.toml`（存在时）打底，环境变量覆盖
    pub fn load() -> Self {
        let file_config = std::fs::read_to_string("grader.toml")
            .ok()
            .and_then(|content| toml::from_str::<Config>(&content).ok());

        match file_config {
            Some(base) => Self::overlay_env(base),
            None => Self::from_env(),
        }
    }

    fn overlay_env(base: Self) -> Self {
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(base.browser_debug_port),
            target_url: std::env::var("TARGET_URL").unwrap_or(base.target_url),
            data_dir: std::env::var("GRADER_DATA_DIR").unwrap_or(base.data_dir),
            eval_timeout_ms: std::env::var("EVAL_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(base.eval_timeout_ms),
            default_api_key: std::env::var("GRADER_API_KEY").unwrap_or(base.default_api_key),
            rubric_question_image: std::env::var("RUBRIC_QUESTION_IMAGE").unwrap_or(base.rubric_question_image),
            rubric_answer_image: std::env::var("RUBRIC_ANSWER_IMAGE").unwrap_or(base.rubric_answer_image),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(base.verbose_logging),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overlay_parses_partial_files() {
        let config: Config = toml::from_str("browser_debug_port = 2001\n").unwrap();
        assert_eq!(config.browser_debug_port, 2001);
        assert_eq!(config.data_dir, "grader_data");
    }
}
