//! 页面采集结果

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// 一次页面扫描的产物
///
/// 每次扫描新建，产出后不再修改，下一次扫描即丢弃。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContext {
    /// 识别出的批改平台
    pub platform: Platform,
    /// 学生姓名（页面上未找到姓名标签时为 None）
    pub student_name: Option<String>,
    /// base64 编码的答题卡图片（data URL）
    pub image_base64: String,
    /// 采集时间
    pub captured_at: DateTime<Local>,
}

impl PageContext {
    /// 学生姓名展示值
    pub fn display_name(&self) -> &str {
        self.student_name.as_deref().unwrap_or("未知学生")
    }

    /// 图片的 MIME 类型与纯 base64 数据
    ///
    /// data URL 形如 `data:image/png;base64,AAAA...`；
    /// 无前缀时按 image/png 处理。
    pub fn image_parts(&self) -> (&str, &str) {
        if let Some(rest) = self.image_base64.strip_prefix("data:") {
            if let Some((mime, data)) = rest.split_once(";base64,") {
                return (mime, data);
            }
        }
        ("image/png", self.image_base64.as_str())
    }
}

/// 页面就绪状态（CHECK_READY 的应答）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReadyState {
    pub has_image: bool,
    pub platform: Platform,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_splits_into_mime_and_payload() {
        let ctx = PageContext {
            platform: Platform::Generic,
            student_name: Some("张三".to_string()),
            image_base64: "data:image/jpeg;base64,/9j/4AAQ".to_string(),
            captured_at: Local::now(),
        };
        let (mime, data) = ctx.image_parts();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(data, "/9j/4AAQ");
    }

    #[test]
    fn bare_base64_defaults_to_png() {
        let ctx = PageContext {
            platform: Platform::Generic,
            student_name: None,
            image_base64: "iVBORw0KGgo".to_string(),
            captured_at: Local::now(),
        };
        let (mime, data) = ctx.image_parts();
        assert_eq!(mime, "image/png");
        assert_eq!(data, "iVBORw0KGgo");
        assert_eq!(ctx.display_name(), "未知学生");
    }
}
