/// 日志工具模块
///
/// 提供 tracing 订阅器初始化与输出辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志订阅器
///
/// RUST_LOG 优先；未设置时 verbose 决定 debug / info。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// 记录程序启动信息
pub fn log_startup(mode: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 AI 阅卷助手启动 - {} 模式", mode);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
