//! 应用编排 - 编排层
//!
//! App 是唯一持有 Browser / JsExecutor 的模块，负责：
//! 初始化（连浏览器、装配 AI 网关与存储）、健康快照、
//! 试改与批量两种运行模式。评分标准生成与阅卷分析不依赖
//! 浏览器，作为独立任务提供。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chromiumoxide::Browser;
use std::time::Duration;
use tracing::{info, warn};

use crate::analysis;
use crate::browser;
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::JsExecutor;
use crate::models::{AppConfig, GradingStrategy, PageContext, StudentResult};
use crate::orchestrator::batch_loop::{
    run_batch_loop, BatchDelays, BatchReport, GradingSession,
};
use crate::provider::Provider;
use crate::services::{PageAdapter, RubricService};
use crate::store::{HistoryStore, StateStore};
use crate::workflow::{GradeCtx, GradingFlow};

/// 系统健康快照：API 连通、评分标准就绪、页面可用
#[derive(Debug, Clone, Copy)]
pub struct HealthSnapshot {
    pub api_ok: bool,
    pub rubric_ok: bool,
    pub page_ok: bool,
}

impl HealthSnapshot {
    pub fn all_ok(&self) -> bool {
        self.api_ok && self.rubric_ok && self.page_ok
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    _browser: Browser,
    executor: JsExecutor,
    provider: Provider,
    state_store: StateStore,
    history: HistoryStore,
    flow: GradingFlow,
}

impl App {
    /// 初始化应用：装配存储与 AI 网关，连接浏览器并定位批改标签页
    pub async fn initialize(config: Config) -> Result<Self> {
        let state_store = StateStore::new(&config.data_dir);
        let app_config = resolve_app_config(&state_store, &config).await?;
        let strategy = state_store.load_strategy().await?;
        let provider = Provider::from_config(&app_config, strategy)?;

        let rubric = state_store.load_rubric().await?.unwrap_or_default();
        if rubric.trim().is_empty() {
            warn!("⚠️ 尚未配置评分标准，批改前请先运行 rubric 模式");
        }

        let history = HistoryStore::load(
            std::path::Path::new(&config.data_dir).join("history.json"),
        )
        .await?;

        let target = if config.target_url.is_empty() {
            None
        } else {
            Some(config.target_url.as_str())
        };
        let (browser, page) =
            browser::connect_to_grading_tab(config.browser_debug_port, target)
                .await
                .context("连接浏览器失败")?;
        let executor = JsExecutor::new(page, Duration::from_millis(config.eval_timeout_ms));

        info!(
            "🚀 初始化完成，提供方: {}，模型: {}，策略: {}",
            app_config.provider.name(),
            provider.model(),
            strategy.as_str()
        );

        Ok(Self {
            config,
            _browser: browser,
            executor,
            provider,
            state_store,
            history,
            flow: GradingFlow::new(rubric),
        })
    }

    /// 采集一次系统健康快照
    pub async fn check_health(&self) -> HealthSnapshot {
        let api_ok = match self.provider.test_connection().await {
            Ok(()) => true,
            Err(e) => {
                warn!("API 连通性检查失败: {}", e);
                false
            }
        };
        let rubric_ok = !self.flow.rubric().trim().is_empty();
        let page_ok = match PageAdapter::new().check_ready(&self.executor).await {
            Ok(ready) => {
                info!("页面就绪: 平台 {}，有图 {}", ready.platform.name(), ready.has_image);
                ready.has_image
            }
            Err(e) => {
                warn!("页面就绪检查失败: {}", e);
                false
            }
        };

        let snapshot = HealthSnapshot {
            api_ok,
            rubric_ok,
            page_ok,
        };
        info!(
            "🩺 健康快照: API {} | 评分标准 {} | 页面 {}",
            mark(snapshot.api_ok),
            mark(snapshot.rubric_ok),
            mark(snapshot.page_ok)
        );
        snapshot
    }

    /// 试改模式：单份扫描-批改-确认-写分
    pub async fn run_trial(&mut self) -> Result<()> {
        let ctx = GradeCtx::trial();
        let page = self.flow.scan(&self.executor).await?;
        let outcome = self.flow.grade(&self.provider, page, ctx).await?;

        println!("{}", serde_json::to_string_pretty(&outcome.result)?);
        for item in &outcome.result.breakdown {
            info!(
                "  · {} {}/{}{}",
                item.label,
                item.score,
                item.max_score,
                item.comment
                    .as_deref()
                    .map(|c| format!(" ({})", c))
                    .unwrap_or_default()
            );
        }

        self.history.push(outcome.result.clone());
        self.history.save().await?;

        if confirm("是否将该分数写入页面？[y/N] ").await? {
            self.flow.submit(&self.executor, outcome.result.score).await?;
        } else {
            info!("已跳过写分");
        }
        Ok(())
    }

    /// 批量模式：无人值守的扫描-批改-写分循环，Ctrl-C 请求停止
    pub async fn run_batch(&mut self) -> Result<BatchReport> {
        if self.flow.rubric().trim().is_empty() {
            anyhow::bail!("评分标准为空，无法进入批量模式");
        }

        let running = Arc::new(AtomicBool::new(true));
        let stop_flag = running.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("收到停止请求，等待当前步骤完成...");
                stop_flag.store(false, Ordering::SeqCst);
            }
        });

        let session = LiveSession {
            flow: &self.flow,
            provider: &self.provider,
            executor: &self.executor,
            history: &mut self.history,
            sequence: 0,
        };
        let report = run_batch_loop(session, running, BatchDelays::default()).await;
        Ok(report)
    }

    /// 保存模型服务配置（供外部配置流程使用）
    pub async fn save_app_config(&self, app_config: &AppConfig) -> AppResult<()> {
        self.state_store.save_app_config(app_config).await
    }

    /// 只读访问批改历史
    pub fn history(&self) -> &[StudentResult] {
        self.history.entries()
    }

    /// 进程配置
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// 评分标准生成任务（不依赖浏览器）
pub async fn run_rubric_generation(config: &Config) -> Result<()> {
    if config.rubric_question_image.is_empty() || config.rubric_answer_image.is_empty() {
        anyhow::bail!(
            "请通过 RUBRIC_QUESTION_IMAGE 与 RUBRIC_ANSWER_IMAGE 指定题目图与标准答案图"
        );
    }
    let state_store = StateStore::new(&config.data_dir);
    let app_config = resolve_app_config(&state_store, config).await?;
    let strategy = state_store.load_strategy().await?;
    let provider = Provider::from_config(&app_config, strategy)?;

    let rubric = RubricService::new()
        .generate_and_save(
            &provider,
            &state_store,
            &config.rubric_question_image,
            &config.rubric_answer_image,
        )
        .await?;
    println!("{}", rubric);
    Ok(())
}

/// 阅卷分析任务（不依赖浏览器）
pub async fn run_analysis(config: &Config) -> Result<()> {
    let state_store = StateStore::new(&config.data_dir);
    let history = HistoryStore::load(
        std::path::Path::new(&config.data_dir).join("history.json"),
    )
    .await?;

    let summary = analysis::summarize(history.entries());
    println!("{}", analysis::format_summary_report(&summary));

    if summary.count == 0 {
        return Ok(());
    }

    // 洞察是锦上添花，AI 不可用时只出统计
    match resolve_app_config(&state_store, config).await {
        Ok(app_config) => {
            let strategy = state_store.load_strategy().await?;
            match Provider::from_config(&app_config, strategy) {
                Ok(provider) => {
                    let prompt = analysis::format_summary_prompt(&summary);
                    match provider.generate_insight(&prompt).await {
                        Ok(insight) => println!("\n💡 {}", insight),
                        Err(e) => warn!("洞察生成失败: {}", e),
                    }
                }
                Err(e) => warn!("AI 服务不可用，跳过洞察: {}", e),
            }
        }
        Err(e) => warn!("AI 服务不可用，跳过洞察: {}", e),
    }
    Ok(())
}

/// 解析模型服务配置：磁盘记录优先，否则用环境默认密钥落一份新记录
async fn resolve_app_config(state_store: &StateStore, config: &Config) -> Result<AppConfig> {
    if let Some(app_config) = state_store.load_app_config().await? {
        return Ok(app_config);
    }
    let app_config = AppConfig {
        api_key: config.default_api_key.clone(),
        ..AppConfig::default()
    };
    if !app_config.api_key.is_empty() {
        state_store.save_app_config(&app_config).await?;
    }
    Ok(app_config)
}

/// 真实批改会话：扫描走页面适配，批改附带历史入库，写分走页面回填
struct LiveSession<'a> {
    flow: &'a GradingFlow,
    provider: &'a Provider,
    executor: &'a JsExecutor,
    history: &'a mut HistoryStore,
    sequence: usize,
}

impl GradingSession for LiveSession<'_> {
    async fn scan(&mut self) -> AppResult<PageContext> {
        self.flow.scan(self.executor).await
    }

    async fn grade(&mut self, page: &PageContext) -> AppResult<StudentResult> {
        self.sequence += 1;
        let outcome = self
            .flow
            .grade(self.provider, page.clone(), GradeCtx::batch(self.sequence))
            .await?;
        self.history.push(outcome.result.clone());
        self.history.save().await?;
        Ok(outcome.result)
    }

    async fn submit(&mut self, score: f64) -> AppResult<()> {
        self.flow.submit(self.executor, score).await
    }
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✓"
    } else {
        "✗"
    }
}

/// 终端确认（试改模式写分前使用）
async fn confirm(prompt: &str) -> Result<bool> {
    let prompt = prompt.to_string();
    let answer = tokio::task::spawn_blocking(move || {
        use std::io::Write;
        print!("{}", prompt);
        std::io::stdout().flush().ok();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await??;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
