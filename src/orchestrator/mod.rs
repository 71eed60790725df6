//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 持有稀缺资源（Browser / JsExecutor / Provider / 存储），驱动
//! 试改与批量两种模式，并维护系统健康快照。
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App（资源所有者，模式调度）
//!     ↓
//! orchestrator::batch_loop（批量轮询状态机）
//!     ↓
//! workflow::GradingFlow（单份答题卡的扫描 → 批改 → 写回）
//!     ↓
//! services（能力层：page_adapter / rubric_service）+ provider（AI 网关）
//!     ↓
//! infrastructure（基础设施：JsExecutor）
//! ```

pub mod app;
pub mod batch_loop;

pub use app::{App, HealthSnapshot};
pub use batch_loop::{
    run_batch_loop, BatchDelays, BatchReport, GradingSession, StopCause, WAIT_HINT_THRESHOLD,
};
