//! 页面适配服务 - 业务能力层
//!
//! 对应扩展形态下的三类消息：扫描页面（REQUEST_PAGE_DATA）、
//! 就绪检测（CHECK_READY）、写入分数（FILL_SCORE）。
//!
//! 职责：
//! - 按平台档案在页面上定位答题卡图片 / 姓名标签 / 分数输入框
//! - 图片提取：canvas 直接导出；img 与背景图带凭据 fetch 后重编码
//! - 写分绕过前端框架的响应式拦截：原生属性 setter + 合成事件
//! - 只包装 eval 调用，不关心批改流程

use chrono::Local;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, PageError};
use crate::infrastructure::JsExecutor;
use crate::models::{PageContext, ReadyState};
use crate::platform::Platform;

/// 启发式兜底的最小图片尺寸（像素）
const MIN_IMAGE_WIDTH: u32 = 200;
const MIN_IMAGE_HEIGHT: u32 = 150;

const SCAN_JS: &str = r#"
(async () => {
    const imageSelectors = __IMAGE_SELECTORS__;
    const nameSelectors = __NAME_SELECTORS__;
    const visible = (el) => {
        const r = el.getBoundingClientRect();
        const s = getComputedStyle(el);
        return r.width > 1 && r.height > 1 && s.visibility !== 'hidden' && s.display !== 'none';
    };
    const pickImage = () => {
        for (const sel of imageSelectors) {
            const el = document.querySelector(sel);
            if (el && visible(el)) return el;
        }
        let best = null, bestArea = 0;
        for (const el of document.querySelectorAll('img, canvas, div')) {
            if (!visible(el)) continue;
            if (el.tagName === 'DIV' && getComputedStyle(el).backgroundImage === 'none') continue;
            const r = el.getBoundingClientRect();
            if (r.width < __MIN_WIDTH__ || r.height < __MIN_HEIGHT__) continue;
            const area = r.width * r.height;
            if (area > bestArea) { best = el; bestArea = area; }
        }
        return best;
    };
    const blobToDataUrl = (blob) => new Promise((resolve, reject) => {
        const reader = new FileReader();
        reader.onload = () => resolve(reader.result);
        reader.onerror = () => reject(new Error('blob read failed'));
        reader.readAsDataURL(blob);
    });
    const extract = async (el) => {
        if (el.tagName === 'CANVAS') return el.toDataURL('image/png');
        let url = el.currentSrc || el.src;
        if (!url) {
            const bg = getComputedStyle(el).backgroundImage;
            const m = bg && bg.match(/url\(["']?([^"')]+)["']?\)/);
            if (m) url = m[1];
        }
        if (!url) throw new Error('图片元素没有可用的来源');
        const resp = await fetch(url, { credentials: 'include' });
        if (!resp.ok) throw new Error('图片请求返回 ' + resp.status);
        return blobToDataUrl(await resp.blob());
    };
    const studentName = () => {
        for (const sel of nameSelectors) {
            const el = document.querySelector(sel);
            const text = el && el.textContent && el.textContent.trim();
            if (text) return text;
        }
        return null;
    };
    try {
        const el = pickImage();
        if (!el) return { ok: false, error: 'no-image' };
        const image = await extract(el);
        return { ok: true, image: image, studentName: studentName() };
    } catch (e) {
        return { ok: false, error: String((e && e.message) || e) };
    }
})()
"#;

const CHECK_READY_JS: &str = r#"
(() => {
    const imageSelectors = __IMAGE_SELECTORS__;
    const visible = (el) => {
        const r = el.getBoundingClientRect();
        const s = getComputedStyle(el);
        return r.width > 1 && r.height > 1 && s.visibility !== 'hidden' && s.display !== 'none';
    };
    for (const sel of imageSelectors) {
        const el = document.querySelector(sel);
        if (el && visible(el)) return { hasImage: true };
    }
    for (const el of document.querySelectorAll('img, canvas')) {
        if (!visible(el)) continue;
        const r = el.getBoundingClientRect();
        if (r.width >= __MIN_WIDTH__ && r.height >= __MIN_HEIGHT__) return { hasImage: true };
    }
    return { hasImage: false };
})()
"#;

const FILL_SCORE_JS: &str = r#"
(() => {
    const scoreSelectors = __SCORE_SELECTORS__;
    const visible = (el) => {
        const r = el.getBoundingClientRect();
        const s = getComputedStyle(el);
        return r.width > 1 && r.height > 1 && s.visibility !== 'hidden' && s.display !== 'none';
    };
    let el = null;
    for (const sel of scoreSelectors) {
        const found = document.querySelector(sel);
        if (found && visible(found)) { el = found; break; }
    }
    if (!el) {
        const active = document.activeElement;
        if (active && (active.tagName === 'INPUT' || active.tagName === 'TEXTAREA')) el = active;
    }
    if (!el) return { ok: false, error: 'no-input' };
    try {
        const proto = el.tagName === 'TEXTAREA'
            ? HTMLTextAreaElement.prototype
            : HTMLInputElement.prototype;
        const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
        setter.call(el, __SCORE__);
        el.dispatchEvent(new Event('input', { bubbles: true }));
        el.dispatchEvent(new Event('change', { bubbles: true }));
        el.dispatchEvent(new KeyboardEvent('keydown', { key: 'Enter', keyCode: 13, bubbles: true }));
        el.dispatchEvent(new Event('blur', { bubbles: true }));
        return { ok: true };
    } catch (e) {
        return { ok: false, error: String((e && e.message) || e) };
    }
})()
"#;

#[derive(Deserialize)]
struct ScanReply {
    ok: bool,
    #[serde(default)]
    image: Option<String>,
    #[serde(rename = "studentName", default)]
    student_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct CheckReadyReply {
    #[serde(rename = "hasImage")]
    has_image: bool,
}

#[derive(Deserialize)]
struct FillReply {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// 页面适配服务
pub struct PageAdapter;

impl PageAdapter {
    pub fn new() -> Self {
        Self
    }

    /// 从当前页面 URL 识别平台
    pub async fn detect_platform(&self, executor: &JsExecutor) -> AppResult<Platform> {
        let url = executor.current_url().await?;
        Ok(Platform::detect(&url))
    }

    /// 扫描页面，产出一份新的 PageContext
    pub async fn scan_page(&self, executor: &JsExecutor) -> AppResult<PageContext> {
        let platform = self.detect_platform(executor).await?;
        let profile = platform.profile();
        debug!("扫描页面，平台: {}", platform.name());

        let js = SCAN_JS
            .replace(
                "__IMAGE_SELECTORS__",
                &serde_json::to_string(profile.image_selectors)?,
            )
            .replace(
                "__NAME_SELECTORS__",
                &serde_json::to_string(profile.name_selectors)?,
            )
            .replace("__MIN_WIDTH__", &MIN_IMAGE_WIDTH.to_string())
            .replace("__MIN_HEIGHT__", &MIN_IMAGE_HEIGHT.to_string());

        let reply: ScanReply = executor.eval_as(js).await?;
        if !reply.ok {
            return Err(match reply.error.as_deref() {
                Some("no-image") | None => AppError::Page(PageError::NoAnswerImage),
                Some(detail) => AppError::image_extraction_failed(detail),
            });
        }
        let image_base64 = reply
            .image
            .ok_or(AppError::Page(PageError::NoAnswerImage))?;

        info!(
            "✓ 页面扫描完成，学生: {}",
            reply.student_name.as_deref().unwrap_or("未知")
        );

        Ok(PageContext {
            platform,
            student_name: reply.student_name,
            image_base64,
            captured_at: Local::now(),
        })
    }

    /// 就绪检测：页面上是否已有可提取的答题卡图片
    pub async fn check_ready(&self, executor: &JsExecutor) -> AppResult<ReadyState> {
        let platform = self.detect_platform(executor).await?;
        let profile = platform.profile();

        let js = CHECK_READY_JS
            .replace(
                "__IMAGE_SELECTORS__",
                &serde_json::to_string(profile.image_selectors)?,
            )
            .replace("__MIN_WIDTH__", &MIN_IMAGE_WIDTH.to_string())
            .replace("__MIN_HEIGHT__", &MIN_IMAGE_HEIGHT.to_string());

        let reply: CheckReadyReply = executor.eval_as(js).await?;
        Ok(ReadyState {
            has_image: reply.has_image,
            platform,
        })
    }

    /// 把分数写入页面的原生输入框
    ///
    /// 直接赋值会被响应式框架拦截后忽略，所以先调用原生 setter，
    /// 再派发 input/change/Enter-keydown/blur 合成事件通知宿主框架；
    /// 所有选择器都落空时退回当前聚焦的输入框。
    pub async fn fill_score(&self, executor: &JsExecutor, score: f64) -> AppResult<()> {
        let platform = self.detect_platform(executor).await?;
        let profile = platform.profile();

        let js = FILL_SCORE_JS
            .replace(
                "__SCORE_SELECTORS__",
                &serde_json::to_string(profile.score_selectors)?,
            )
            .replace("__SCORE__", &serde_json::to_string(&score.to_string())?);

        let reply: FillReply = executor.eval_as(js).await?;
        if !reply.ok {
            return Err(match reply.error.as_deref() {
                Some("no-input") | None => AppError::Page(PageError::NoScoreInput),
                Some(detail) => AppError::Page(PageError::ScoreFillFailed {
                    detail: detail.to_string(),
                }),
            });
        }
        info!("✓ 分数 {} 已写入页面", score);
        Ok(())
    }
}

impl Default for PageAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_script_embeds_platform_selectors() {
        let profile = Platform::Zhixue.profile();
        let js = SCAN_JS.replace(
            "__IMAGE_SELECTORS__",
            &serde_json::to_string(profile.image_selectors).unwrap(),
        );
        assert!(js.contains(".mark-body canvas"));
        assert!(!js.contains("__IMAGE_SELECTORS__"));
    }

    #[test]
    fn fill_script_quotes_the_score() {
        let js = FILL_SCORE_JS
            .replace("__SCORE_SELECTORS__", "[]")
            .replace(
                "__SCORE__",
                &serde_json::to_string(&8.5_f64.to_string()).unwrap(),
            );
        assert!(js.contains("setter.call(el, \"8.5\")"));
    }

    #[test]
    fn fill_script_has_focused_input_fallback() {
        assert!(FILL_SCORE_JS.contains("document.activeElement"));
    }
}
