use anyhow::Result;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::platform::Platform;

/// 连接到调试端口上的浏览器并定位批改标签页
///
/// 查找顺序：
/// 1. `target_url` 非空时，匹配 URL 包含该子串的标签页；
/// 2. 否则匹配任意已识别平台（非 Generic）的标签页；
/// 3. 两者都落空则退回第一个标签页（通用档案兜底）。
pub async fn connect_to_grading_tab(
    port: u16,
    target_url: Option<&str>,
) -> Result<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await?;
    debug!("获取到 {} 个标签页", pages.len());

    if let Some(needle) = target_url {
        for p in pages.iter() {
            if let Ok(Some(url)) = p.url().await {
                if url.contains(needle) {
                    info!("✓ 找到目标标签页: {}", url);
                    return Ok((browser, p.clone()));
                }
            }
        }
        warn!("未找到 URL 包含 '{}' 的标签页，转为平台匹配", needle);
    }

    for p in pages.iter() {
        if let Ok(Some(url)) = p.url().await {
            let platform = Platform::detect(&url);
            if platform != Platform::Generic {
                info!("✓ 识别到 {} 批改页面: {}", platform.name(), url);
                return Ok((browser, p.clone()));
            }
        }
    }

    match pages.into_iter().next() {
        Some(page) => {
            let url = page.url().await.ok().flatten().unwrap_or_default();
            warn!("未识别到已知平台，使用通用档案处理当前标签页: {}", url);
            Ok((browser, page))
        }
        None => {
            anyhow::bail!("浏览器中没有任何标签页，请先打开阅卷页面")
        }
    }
}
