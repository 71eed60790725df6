//! 批量批改轮询循环 - 编排层
//!
//! 在宿主页面上反复寻找"尚未批改的新学生"，不需要操作员介入。
//! 宿主页面没有任何同步的完成信号，唯一的推进依据是轮询到的
//! 学生姓名发生了变化（阅卷人在另一个窗口翻到了下一份）；
//! 页面没有姓名标签时，退化为比较答题卡图片内容。
//!
//! 状态（last_graded_name / wait_attempts / graded_count）由本任务
//! 独占持有；跨任务共享的只有一个 running 标志，每个 await 恢复点
//! 都要重查它。固定延迟轮询，无退避增长、无重试上限，仅在连续
//! 等待达到阈值后打一条提示。
//!
//! 失败策略：
//! - 页面扫描失败且循环仍在运行 → 静默重试，不打扰操作员；
//! - 批改（AI 调用）或写分失败 → 立即停止并上报。反复失败的
//!   AI 调用往往意味着配置问题，继续重试只会烧掉配额。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{PageContext, StudentResult};

/// 连续等待达到该次数后打一条提示
pub const WAIT_HINT_THRESHOLD: u32 = 4;

/// 批改会话能力
///
/// 循环只依赖这三个操作，真实实现由编排层组装
/// （扫描 = 页面适配，批改 = AI 网关 + 历史入库，写分 = 页面回填）。
pub trait GradingSession {
    fn scan(&mut self) -> impl std::future::Future<Output = AppResult<PageContext>>;
    fn grade(
        &mut self,
        page: &PageContext,
    ) -> impl std::future::Future<Output = AppResult<StudentResult>>;
    fn submit(&mut self, score: f64) -> impl std::future::Future<Output = AppResult<()>>;
}

/// 循环内的固定延迟
#[derive(Debug, Clone, Copy)]
pub struct BatchDelays {
    /// 同名学生 / 扫描失败后的重试间隔
    pub wait_retry: Duration,
    /// 批改完成到写分之间的间隔（留给页面渲染）
    pub submit_delay: Duration,
    /// 写分完成到下一次扫描的间隔
    pub next_scan: Duration,
}

impl Default for BatchDelays {
    fn default() -> Self {
        Self {
            wait_retry: Duration::from_secs(2),
            submit_delay: Duration::from_millis(800),
            next_scan: Duration::from_secs(2),
        }
    }
}

/// 循环终止原因
#[derive(Debug)]
pub enum StopCause {
    /// 操作员要求停止
    Requested,
    /// 致命错误（批改失败、写分失败，或停止后暴露的扫描错误）
    Fatal(AppError),
}

/// 循环结束时的汇报
#[derive(Debug)]
pub struct BatchReport {
    /// 本次会话成功批改的份数
    pub graded: usize,
    /// 结束时的连续等待计数
    pub wait_attempts: u32,
    /// 终止原因
    pub cause: StopCause,
}

/// 运行批量批改循环
///
/// `running` 为共享的运行标志：操作员置 false 表示请求停止。
/// 进行中的扫描或批改不会被打断，完成后在下一个检查点退出；
/// 致命错误退出前循环自己会把标志清为 false。
pub async fn run_batch_loop<S: GradingSession>(
    mut session: S,
    running: Arc<AtomicBool>,
    delays: BatchDelays,
) -> BatchReport {
    let mut last_graded_name: Option<String> = None;
    let mut last_graded_image: Option<String> = None;
    let mut wait_attempts: u32 = 0;
    let mut graded: usize = 0;

    info!("🔁 批量批改循环启动");

    let cause = loop {
        if !running.load(Ordering::SeqCst) {
            break StopCause::Requested;
        }

        match session.scan().await {
            Ok(page) => {
                if !running.load(Ordering::SeqCst) {
                    break StopCause::Requested;
                }

                // 没有姓名标签的平台退化为比较图片内容，
                // 否则同一份卷子会被反复批改写分
                let is_same = match (&page.student_name, &last_graded_name) {
                    (Some(name), Some(last)) => name == last,
                    (None, _) => {
                        last_graded_image.as_deref() == Some(page.image_base64.as_str())
                    }
                    (Some(_), None) => false,
                };
                if is_same {
                    wait_attempts += 1;
                    if wait_attempts >= WAIT_HINT_THRESHOLD {
                        info!(
                            "⏳ 已连续等待 {} 次，仍是学生 {}，请在阅卷窗口翻到下一份",
                            wait_attempts,
                            page.display_name()
                        );
                    } else {
                        debug!("学生 {} 尚未翻页，等待中", page.display_name());
                    }
                    sleep(delays.wait_retry).await;
                    continue;
                }

                wait_attempts = 0;
                let student_name = page.student_name.clone();

                match session.grade(&page).await {
                    Ok(result) => {
                        // 留给页面渲染，再写分
                        sleep(delays.submit_delay).await;
                        if !running.load(Ordering::SeqCst) {
                            break StopCause::Requested;
                        }

                        if let Err(e) = session.submit(result.score).await {
                            running.store(false, Ordering::SeqCst);
                            break StopCause::Fatal(e);
                        }

                        graded += 1;
                        last_graded_name = student_name;
                        last_graded_image = Some(page.image_base64);
                        info!(
                            "✅ 第 {} 份完成: {} 得分 {}/{}",
                            graded, result.student_name, result.score, result.max_score
                        );
                        sleep(delays.next_scan).await;
                    }
                    Err(e) => {
                        // 批改失败从不静默重试
                        running.store(false, Ordering::SeqCst);
                        break StopCause::Fatal(e);
                    }
                }
            }
            Err(e) => {
                if running.load(Ordering::SeqCst) {
                    // 运行中的扫描失败与"同一学生"同等对待：静默重试，共用等待计数
                    wait_attempts += 1;
                    if wait_attempts >= WAIT_HINT_THRESHOLD {
                        info!(
                            "⏳ 已连续等待 {} 次，页面扫描暂不可用 ({})，请检查阅卷窗口",
                            wait_attempts, e
                        );
                    } else {
                        debug!("页面扫描暂不可用 ({})，{} 次等待后重试", e, wait_attempts);
                    }
                    sleep(delays.wait_retry).await;
                    continue;
                }
                break StopCause::Fatal(e);
            }
        }
    };

    match &cause {
        StopCause::Requested => info!("⏹ 批量批改循环停止，共完成 {} 份", graded),
        StopCause::Fatal(e) => warn!("❌ 批量批改循环异常终止 ({} 份后): {}", graded, e),
    }

    BatchReport {
        graded,
        wait_attempts,
        cause,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use crate::platform::Platform;
    use chrono::Local;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    fn page(name: &str) -> PageContext {
        PageContext {
            platform: Platform::Generic,
            student_name: Some(name.to_string()),
            image_base64: "data:image/png;base64,AAAA".to_string(),
            captured_at: Local::now(),
        }
    }

    fn nameless_page(image: &str) -> PageContext {
        PageContext {
            platform: Platform::Generic,
            student_name: None,
            image_base64: image.to_string(),
            captured_at: Local::now(),
        }
    }

    fn result(name: &str) -> StudentResult {
        StudentResult {
            id: format!("r-{}", name),
            student_name: name.to_string(),
            class_name: None,
            score: 8.0,
            max_score: 10.0,
            comment: String::new(),
            breakdown: Vec::new(),
            graded_at: Local::now(),
        }
    }

    /// 单条扫描脚本
    enum ScanScript {
        /// 正常扫到某个学生
        Student(&'static str),
        /// 扫到卷面图但没有姓名标签
        Nameless(&'static str),
        /// 页面错误
        Fail,
        /// 返回错误前把 running 置 false（模拟停止请求与扫描竞态）
        StopThenFail,
    }

    #[derive(Default)]
    struct Counts {
        scans: AtomicUsize,
        grades: AtomicUsize,
        submits: AtomicUsize,
    }

    /// 脚本驱动的会话：预设好每次 scan 的应答，
    /// 在第 `stop_after_submits` 次写分后请求停止
    struct ScriptedSession {
        scans: VecDeque<ScanScript>,
        running: Arc<AtomicBool>,
        counts: Arc<Counts>,
        stop_after_submits: usize,
        fail_grading: bool,
    }

    impl ScriptedSession {
        fn new(
            scans: Vec<ScanScript>,
            running: Arc<AtomicBool>,
            stop_after_submits: usize,
        ) -> (Self, Arc<Counts>) {
            let counts = Arc::new(Counts::default());
            (
                Self {
                    scans: scans.into(),
                    running,
                    counts: counts.clone(),
                    stop_after_submits,
                    fail_grading: false,
                },
                counts,
            )
        }
    }

    impl GradingSession for ScriptedSession {
        async fn scan(&mut self) -> AppResult<PageContext> {
            self.counts.scans.fetch_add(1, Ordering::SeqCst);
            match self.scans.pop_front() {
                Some(ScanScript::Student(name)) => Ok(page(name)),
                Some(ScanScript::Nameless(image)) => Ok(nameless_page(image)),
                Some(ScanScript::Fail) => Err(AppError::Page(PageError::NoAnswerImage)),
                Some(ScanScript::StopThenFail) => {
                    self.running.store(false, Ordering::SeqCst);
                    Err(AppError::Page(PageError::NoAnswerImage))
                }
                None => {
                    // 脚本意外耗尽：停掉循环避免测试死循环
                    self.running.store(false, Ordering::SeqCst);
                    Err(AppError::Page(PageError::NoAnswerImage))
                }
            }
        }

        async fn grade(&mut self, page: &PageContext) -> AppResult<StudentResult> {
            self.counts.grades.fetch_add(1, Ordering::SeqCst);
            if self.fail_grading {
                return Err(AppError::Provider(
                    crate::error::ProviderError::EmptyResponse {
                        model: "test".to_string(),
                    },
                ));
            }
            Ok(result(page.display_name()))
        }

        async fn submit(&mut self, _score: f64) -> AppResult<()> {
            let done = self.counts.submits.fetch_add(1, Ordering::SeqCst) + 1;
            if done >= self.stop_after_submits {
                self.running.store(false, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    fn zero_delays() -> BatchDelays {
        BatchDelays {
            wait_retry: Duration::ZERO,
            submit_delay: Duration::ZERO,
            next_scan: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn repeated_student_waits_exactly_n_times_then_grades() {
        let running = Arc::new(AtomicBool::new(true));
        // 甲批改后重复出现 3 次，随后换成乙
        let scans = vec![
            ScanScript::Student("甲"),
            ScanScript::Student("甲"),
            ScanScript::Student("甲"),
            ScanScript::Student("甲"),
            ScanScript::Student("乙"),
        ];
        let (session, counts) = ScriptedSession::new(scans, running.clone(), 2);
        let report = run_batch_loop(session, running, zero_delays()).await;

        // 1 次批改甲 + 恰好 3 次同名等待 + 1 次批改乙
        assert_eq!(counts.scans.load(Ordering::SeqCst), 5);
        assert_eq!(counts.grades.load(Ordering::SeqCst), 2);
        assert_eq!(report.graded, 2);
        // 姓名变化时 wait_attempts 归零，之后未再等待
        assert_eq!(report.wait_attempts, 0);
        assert!(matches!(report.cause, StopCause::Requested));
    }

    #[tokio::test]
    async fn grading_failure_halts_loop_and_clears_running_flag() {
        let running = Arc::new(AtomicBool::new(true));
        let scans = vec![ScanScript::Student("甲"), ScanScript::Student("乙")];
        let (mut session, counts) = ScriptedSession::new(scans, running.clone(), usize::MAX);
        session.fail_grading = true;

        let report = run_batch_loop(session, running.clone(), zero_delays()).await;

        assert!(matches!(report.cause, StopCause::Fatal(_)));
        assert_eq!(report.graded, 0);
        // running 标志被循环自己清掉，且不再调度任何扫描
        assert!(!running.load(Ordering::SeqCst));
        assert_eq!(counts.scans.load(Ordering::SeqCst), 1);
        assert_eq!(counts.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn scan_failure_while_running_retries_exactly_once_each() {
        let running = Arc::new(AtomicBool::new(true));
        let scans = vec![
            ScanScript::Fail,
            ScanScript::Fail,
            ScanScript::Student("甲"),
        ];
        let (session, counts) = ScriptedSession::new(scans, running.clone(), 1);
        let report = run_batch_loop(session, running, zero_delays()).await;

        // 两次失败各触发一次重试，随后正常批改——循环正常停止，错误未上抛
        assert_eq!(counts.scans.load(Ordering::SeqCst), 3);
        assert_eq!(report.graded, 1);
        assert!(matches!(report.cause, StopCause::Requested));
    }

    #[tokio::test]
    async fn scan_failure_after_stop_surfaces_the_error() {
        let running = Arc::new(AtomicBool::new(true));
        // 扫描进行中操作员请求停止，错误在恢复点被发现并上抛
        let scans = vec![ScanScript::StopThenFail];
        let (session, _counts) = ScriptedSession::new(scans, running.clone(), usize::MAX);
        let report = run_batch_loop(session, running, zero_delays()).await;

        assert!(matches!(report.cause, StopCause::Fatal(_)));
        assert_eq!(report.graded, 0);
    }

    #[tokio::test]
    async fn submit_runs_once_per_graded_student() {
        let running = Arc::new(AtomicBool::new(true));
        let scans = vec![
            ScanScript::Student("甲"),
            ScanScript::Student("乙"),
            ScanScript::Student("丙"),
        ];
        let (session, counts) = ScriptedSession::new(scans, running.clone(), 3);
        let report = run_batch_loop(session, running, zero_delays()).await;

        assert_eq!(report.graded, 3);
        assert_eq!(counts.submits.load(Ordering::SeqCst), 3);
        assert_eq!(counts.grades.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn nameless_repeats_wait_instead_of_regrading() {
        let running = Arc::new(AtomicBool::new(true));
        // 姓名标签落空的平台：同一张卷面图反复出现，随后换人
        let scans = vec![
            ScanScript::Nameless("img-1"),
            ScanScript::Nameless("img-1"),
            ScanScript::Nameless("img-1"),
            ScanScript::Nameless("img-1"),
            ScanScript::Nameless("img-1"),
            ScanScript::Student("乙"),
        ];
        let (session, counts) = ScriptedSession::new(scans, running.clone(), 2);
        let report = run_batch_loop(session, running, zero_delays()).await;

        // 同一张图只批改写分一次，其余按"尚未翻页"等待
        assert_eq!(counts.scans.load(Ordering::SeqCst), 6);
        assert_eq!(counts.grades.load(Ordering::SeqCst), 2);
        assert_eq!(counts.submits.load(Ordering::SeqCst), 2);
        assert_eq!(report.graded, 2);
        assert!(matches!(report.cause, StopCause::Requested));
    }

    #[tokio::test]
    async fn nameless_new_image_is_graded() {
        let running = Arc::new(AtomicBool::new(true));
        let scans = vec![
            ScanScript::Nameless("img-1"),
            ScanScript::Nameless("img-2"),
        ];
        let (session, counts) = ScriptedSession::new(scans, running.clone(), 2);
        let report = run_batch_loop(session, running, zero_delays()).await;

        assert_eq!(counts.grades.load(Ordering::SeqCst), 2);
        assert_eq!(report.graded, 2);
    }

    #[tokio::test]
    async fn wait_counter_spans_same_name_and_scan_failures() {
        let running = Arc::new(AtomicBool::new(true));
        // 批改甲之后：扫描失败与同名等待交替出现，计数不区分两者
        let scans = vec![
            ScanScript::Student("甲"),
            ScanScript::Fail,
            ScanScript::Student("甲"),
            ScanScript::Fail,
        ];
        let (session, counts) = ScriptedSession::new(scans, running.clone(), usize::MAX);
        let report = run_batch_loop(session, running, zero_delays()).await;

        assert_eq!(report.graded, 1);
        assert_eq!(counts.grades.load(Ordering::SeqCst), 1);
        assert_eq!(report.wait_attempts, 3);
    }

    #[tokio::test]
    async fn stop_before_first_scan_exits_immediately() {
        let running = Arc::new(AtomicBool::new(false));
        let (session, counts) = ScriptedSession::new(Vec::new(), running.clone(), usize::MAX);
        let report = run_batch_loop(session, running, zero_delays()).await;

        assert_eq!(counts.scans.load(Ordering::SeqCst), 0);
        assert!(matches!(report.cause, StopCause::Requested));
    }
}
