//! 本地持久化
//!
//! 扩展形态下的 key-value 存储在这里对应数据目录下的几个 JSON 文件：
//! `config.json`（模型服务配置）、`rubric.md`（评分标准）、
//! `strategy`（批改策略）、`history.json`（批改历史，上限 500 条）。

pub mod history_store;
pub mod state_store;

pub use history_store::{HistoryStore, HISTORY_CAP};
pub use state_store::StateStore;
