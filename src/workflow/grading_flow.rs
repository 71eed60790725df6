//! 批改流程 - 流程层
//!
//! 定义"一份答题卡"的完整处理：扫描 → 批改 → 用扫描到的姓名
//! 覆盖结果姓名 → 一致性告警。分数写回与历史入库由编排层决定，
//! 这里不持有任何资源。

use tracing::{info, warn};

use crate::error::AppResult;
use crate::infrastructure::JsExecutor;
use crate::models::{PageContext, StudentResult};
use crate::provider::Provider;
use crate::services::PageAdapter;
use crate::workflow::grade_ctx::GradeCtx;

/// 一次批改的产物
#[derive(Debug)]
pub struct GradeOutcome {
    /// 页面扫描结果
    pub page: PageContext,
    /// 批改结果（姓名已被扫描值覆盖）
    pub result: StudentResult,
}

/// 批改流程
pub struct GradingFlow {
    adapter: PageAdapter,
    rubric: String,
}

impl GradingFlow {
    /// 创建批改流程；评分标准在构造时给定
    pub fn new(rubric: String) -> Self {
        Self {
            adapter: PageAdapter::new(),
            rubric,
        }
    }

    /// 扫描当前页面
    pub async fn scan(&self, executor: &JsExecutor) -> AppResult<PageContext> {
        self.adapter.scan_page(executor).await
    }

    /// 对一份已扫描的答题卡执行批改
    pub async fn grade(
        &self,
        provider: &Provider,
        page: PageContext,
        ctx: GradeCtx,
    ) -> AppResult<GradeOutcome> {
        info!("{} 🤖 正在批改，学生: {}", ctx, page.display_name());

        let mut result = provider.grade(&page, &self.rubric).await?;

        // 模型辨认的姓名以页面扫描值为准
        if let Some(name) = &page.student_name {
            result.student_name = name.clone();
        }

        for warning in result.consistency_warnings() {
            warn!("{} ⚠️ 批改结果异常: {}", ctx, warning);
        }

        info!(
            "{} ✓ 批改完成: {} 得分 {}/{}",
            ctx,
            result.student_name,
            result.score,
            result.max_score
        );

        Ok(GradeOutcome { page, result })
    }

    /// 把分数写回页面
    pub async fn submit(&self, executor: &JsExecutor, score: f64) -> AppResult<()> {
        self.adapter.fill_score(executor, score).await
    }

    /// 当前使用的评分标准
    pub fn rubric(&self) -> &str {
        &self.rubric
    }
}
