//! 抓取任务相关的数据结构

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::JobError;

/// 任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    /// 通过 JSearch API 导入
    JsearchImport,
    /// 浏览器抓取搜索结果
    ListingScrape,
    /// 浏览器抓取，只保留站内申请的职位
    ListingScrapeEasyApplyOnly,
}

impl JobType {
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::JsearchImport => "jsearch-import",
            JobType::ListingScrape => "listing-scrape",
            JobType::ListingScrapeEasyApplyOnly => "listing-scrape-easy-apply-only",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "jsearch-import" => Ok(JobType::JsearchImport),
            "listing-scrape" => Ok(JobType::ListingScrape),
            "listing-scrape-easy-apply-only" => Ok(JobType::ListingScrapeEasyApplyOnly),
            other => Err(JobError::UnknownJobType {
                value: other.to_string(),
            }),
        }
    }
}

/// 任务参数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParams {
    pub query: String,
    pub location: String,
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

/// 任务记录
///
/// 由任务队列独占；进入终态后结果不再变化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub params: JobParams,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `start_job` 的返回值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobHandle {
    pub id: String,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// 任务生命周期日志
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub message: String,
}

/// 轮询接口返回的队列状态
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub running_jobs: Vec<JobRecord>,
    pub history: Vec<JobRecord>,
    pub logs: Vec<LogEntry>,
}

/// 抓取任务的统计结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeSummary {
    /// 实际抓取的搜索页数
    pub pages: usize,
    /// 去重后的候选职位数
    pub candidates: usize,
    /// 新写入的职位数
    pub inserted: usize,
    /// 已存在而跳过的职位数
    pub skipped: usize,
    /// 因申请方式不符被过滤的职位数
    pub filtered: usize,
}
