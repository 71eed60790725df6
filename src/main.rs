use anyhow::Result;

use exam_grader::config::Config;
use exam_grader::orchestrator::{self, App, StopCause};
use exam_grader::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load();

    // 初始化日志
    logging::init(config.verbose_logging);

    // 运行模式：check / trial / batch / rubric / analyze
    let mode = std::env::args().nth(1).unwrap_or_else(|| "check".to_string());
    logging::log_startup(&mode);

    match mode.as_str() {
        "check" => {
            let app = App::initialize(config).await?;
            let snapshot = app.check_health().await;
            if !snapshot.all_ok() {
                anyhow::bail!("健康检查未通过");
            }
        }
        "trial" => {
            let mut app = App::initialize(config).await?;
            app.run_trial().await?;
        }
        "batch" => {
            let mut app = App::initialize(config).await?;
            let report = app.run_batch().await?;
            if let StopCause::Fatal(e) = report.cause {
                anyhow::bail!("批量批改异常终止: {}", e);
            }
        }
        "rubric" => {
            orchestrator::app::run_rubric_generation(&config).await?;
        }
        "analyze" => {
            orchestrator::app::run_analysis(&config).await?;
        }
        other => {
            anyhow::bail!(
                "未知模式: {}（可用: check / trial / batch / rubric / analyze）",
                other
            );
        }
    }

    Ok(())
}
