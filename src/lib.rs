//! # AI 阅卷助手
//!
//! 一个挂载在浏览器阅卷页面上的自动批改工具：扫描答题卡图片，
//! 交给多模态大模型按评分标准打分，再把分数写回页面。
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供带超时的 eval() 能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `PageAdapter` - 页面扫描 / 就绪检测 / 分数写回能力
//! - `RubricService` - 评分标准生成与读写能力
//! - `provider/` - 两种 AI 后端方言收敛成的统一网关
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份答题卡"的完整处理流程
//! - `GradeCtx` - 上下文封装（模式 + 序号）
//! - `GradingFlow` - 流程编排（scan → grade → 姓名覆盖 → submit）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 资源所有者，试改 / 批量模式调度，健康快照
//! - `orchestrator/batch_loop` - 批量批改轮询状态机
//!
//! ## 模块结构

pub mod analysis;
pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod platform;
pub mod provider;
pub mod services;
pub mod store;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::connect_to_grading_tab;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{AppConfig, GradingStrategy, PageContext, StudentResult};
pub use orchestrator::{App, BatchDelays, BatchReport, GradingSession, StopCause};
pub use platform::Platform;
pub use provider::Provider;
pub use workflow::{GradeCtx, GradingFlow};
