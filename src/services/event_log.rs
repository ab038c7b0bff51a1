//! 任务事件日志 - 业务能力层
//!
//! 只负责"追加写一行 JSON"能力，不关心队列状态

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::models::LogEntry;

/// 追加写入的事件日志（每行一个 JSON 对象）
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条事件
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("打开事件日志 {} 失败", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("写入事件日志 {} 失败", self.path.display()))?;

        debug!("事件已写入 {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogLevel;
    use chrono::Utc;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            job_id: Some("job-1".into()),
            message: message.into(),
        }
    }

    #[test]
    fn test_appends_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new(dir.path().join("events.log"));

        log.append(&entry("started")).unwrap();
        log.append(&entry("completed")).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: LogEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.message, "started");
        assert_eq!(first.job_id.as_deref(), Some("job-1"));
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["level"], "info");
        assert_eq!(second["jobId"], "job-1");
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new(dir.path().join("missing").join("events.log"));
        assert!(log.append(&entry("x")).is_err());
    }
}
