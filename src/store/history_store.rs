use std::path::PathBuf;

use tokio::fs;
use tracing::debug;

use crate::error::{AppError, AppResult, StoreError};
use crate::models::StudentResult;

/// 批改历史上限，超出后从尾部（最旧）淘汰
pub const HISTORY_CAP: usize = 500;

/// 批改历史存储
///
/// 内存中维护最新在前的结果列表，整体序列化为一个 JSON 文件。
/// 应用视角下只追加；越过上限的旧条目被静默丢弃。
pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<StudentResult>,
}

impl HistoryStore {
    /// 从磁盘加载历史，文件不存在时得到空列表
    pub async fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                AppError::Store(StoreError::SerdeFailed {
                    path: path.display().to_string(),
                    source: Box::new(e),
                })
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(AppError::Store(StoreError::ReadFailed {
                    path: path.display().to_string(),
                    source: Box::new(e),
                }))
            }
        };
        Ok(Self { path, entries })
    }

    /// 追加一条结果（最新在前），越界淘汰最旧条目
    pub fn push(&mut self, result: StudentResult) {
        self.entries.insert(0, result);
        if self.entries.len() > HISTORY_CAP {
            self.entries.truncate(HISTORY_CAP);
        }
    }

    /// 当前历史（最新在前）
    pub fn entries(&self) -> &[StudentResult] {
        &self.entries
    }

    /// 写回磁盘
    pub async fn save(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Store(StoreError::WriteFailed {
                    path: parent.display().to_string(),
                    source: Box::new(e),
                })
            })?;
        }
        let content = serde_json::to_string(&self.entries)?;
        fs::write(&self.path, content).await.map_err(|e| {
            AppError::Store(StoreError::WriteFailed {
                path: self.path.display().to_string(),
                source: Box::new(e),
            })
        })?;
        debug!("批改历史已保存 ({} 条)", self.entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn sample(id: usize) -> StudentResult {
        StudentResult {
            id: format!("r{}", id),
            student_name: format!("学生{}", id),
            class_name: None,
            score: 8.0,
            max_score: 10.0,
            comment: String::new(),
            breakdown: Vec::new(),
            graded_at: Local::now(),
        }
    }

    #[tokio::test]
    async fn newest_entry_sits_at_the_front() {
        let mut store = HistoryStore::load(
            std::env::temp_dir().join(format!("grader_hist_front_{}.json", std::process::id())),
        )
        .await
        .unwrap();
        store.push(sample(1));
        store.push(sample(2));
        assert_eq!(store.entries()[0].id, "r2");
        assert_eq!(store.entries()[1].id, "r1");
    }

    #[tokio::test]
    async fn cap_evicts_oldest_entry() {
        let mut store = HistoryStore::load(
            std::env::temp_dir().join(format!("grader_hist_cap_{}.json", std::process::id())),
        )
        .await
        .unwrap();
        for i in 0..HISTORY_CAP {
            store.push(sample(i));
        }
        assert_eq!(store.entries().len(), HISTORY_CAP);

        // 第 501 条挤掉最早的 r0
        store.push(sample(HISTORY_CAP));
        assert_eq!(store.entries().len(), HISTORY_CAP);
        assert_eq!(store.entries()[0].id, format!("r{}", HISTORY_CAP));
        assert!(store.entries().iter().all(|r| r.id != "r0"));
    }

    #[tokio::test]
    async fn history_survives_reload() {
        let path =
            std::env::temp_dir().join(format!("grader_hist_reload_{}.json", std::process::id()));
        let mut store = HistoryStore::load(&path).await.unwrap();
        store.push(sample(7));
        store.save().await.unwrap();

        let reloaded = HistoryStore::load(&path).await.unwrap();
        assert_eq!(reloaded.entries().len(), 1);
        assert_eq!(reloaded.entries()[0].id, "r7");
    }
}
