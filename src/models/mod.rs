pub mod app_config;
pub mod page_context;
pub mod result;
pub mod strategy;

pub use app_config::{AppConfig, ProviderKind};
pub use page_context::{PageContext, ReadyState};
pub use result::{BreakdownItem, StudentResult};
pub use strategy::GradingStrategy;
