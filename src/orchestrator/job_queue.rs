//! 任务队列 - 编排层
//!
//! ## 职责
//!
//! - 校验请求参数，分配任务 ID
//! - 以独立的 tokio 任务运行处理器（调用方不等待）
//! - 运行中的任务放在活动表；结束后移入有界历史环
//! - 生命周期事件同时写入内存日志环和追加写入的事件日志文件
//!
//! 每个任务 ID 只由它自己的任务写入；锁只保护很短的临界区

use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use serde_json::Value as JsonValue;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppResult, JobError};
use crate::models::{
    JobHandle, JobParams, JobRecord, JobStatus, JobType, LogEntry, LogLevel, QueueStatus,
};
use crate::services::EventLog;

/// 任务处理器
///
/// 每次调用独占自己的浏览器会话和存储交互，处理器之间不共享可变状态
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(
        &self,
        job_type: JobType,
        params: &JobParams,
        log: &JobLogger,
    ) -> Result<JsonValue>;
}

#[derive(Default)]
struct QueueState {
    active: HashMap<String, JobRecord>,
    history: VecDeque<JobRecord>,
    logs: VecDeque<LogEntry>,
}

struct QueueShared {
    state: Mutex<QueueState>,
    event_log: EventLog,
    history_capacity: usize,
    log_capacity: usize,
}

impl QueueShared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // 临界区内不会 panic，中毒时直接取回数据
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn log(&self, level: LogLevel, job_id: Option<&str>, message: String) {
        match level {
            LogLevel::Info => info!("[任务 {}] {}", job_id.unwrap_or("-"), message),
            LogLevel::Warn => warn!("[任务 {}] {}", job_id.unwrap_or("-"), message),
            LogLevel::Error => error!("[任务 {}] {}", job_id.unwrap_or("-"), message),
        }

        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            job_id: job_id.map(str::to_string),
            message,
        };

        if let Err(e) = self.event_log.append(&entry) {
            warn!("写入事件日志失败（忽略）: {:#}", e);
        }

        let mut state = self.lock();
        state.logs.push_back(entry);
        while state.logs.len() > self.log_capacity {
            state.logs.pop_front();
        }
    }

    fn finish(&self, id: &str, outcome: Result<JsonValue>) {
        let (status, message) = {
            let mut state = self.lock();
            let Some(mut record) = state.active.remove(id) else {
                return;
            };
            record.finished_at = Some(Utc::now());
            let message = match outcome {
                Ok(result) => {
                    record.status = JobStatus::Completed;
                    record.result = Some(result);
                    format!("✅ 任务完成: {}", record.job_type)
                }
                Err(e) => {
                    record.status = JobStatus::Failed;
                    record.error = Some(format!("{:#}", e));
                    format!("❌ 任务失败: {}: {:#}", record.job_type, e)
                }
            };
            let status = record.status;
            state.history.push_back(record);
            while state.history.len() > self.history_capacity {
                state.history.pop_front();
            }
            (status, message)
        };

        let level = match status {
            JobStatus::Failed => LogLevel::Error,
            _ => LogLevel::Info,
        };
        self.log(level, Some(id), message);
    }
}

/// 处理器写任务日志的句柄
#[derive(Clone)]
pub struct JobLogger {
    shared: Arc<QueueShared>,
    job_id: String,
}

impl JobLogger {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn info(&self, message: impl Into<String>) {
        self.shared
            .log(LogLevel::Info, Some(&self.job_id), message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.shared
            .log(LogLevel::Warn, Some(&self.job_id), message.into());
    }
}

/// 任务队列
#[derive(Clone)]
pub struct JobQueue {
    shared: Arc<QueueShared>,
    handler: Arc<dyn JobHandler>,
}

impl JobQueue {
    /// 根据配置创建任务队列
    pub fn new(config: &Config, handler: Arc<dyn JobHandler>) -> Self {
        Self::with_capacities(
            EventLog::new(&config.job_log_file),
            config.job_history_capacity,
            config.job_log_buffer_capacity,
            handler,
        )
    }

    pub fn with_capacities(
        event_log: EventLog,
        history_capacity: usize,
        log_capacity: usize,
        handler: Arc<dyn JobHandler>,
    ) -> Self {
        Self {
            shared: Arc::new(QueueShared {
                state: Mutex::new(QueueState::default()),
                event_log,
                history_capacity,
                log_capacity,
            }),
            handler,
        }
    }

    /// 提交任务并立即返回；处理器在后台运行
    ///
    /// 必须在 tokio 运行时中调用
    pub fn start_job(&self, job_type: JobType, params: JobParams) -> AppResult<JobHandle> {
        let params = JobParams {
            query: params.query.trim().to_string(),
            location: params.location.trim().to_string(),
        };
        if params.query.is_empty() {
            return Err(JobError::MissingParameter { name: "query" }.into());
        }
        if params.location.is_empty() {
            return Err(JobError::MissingParameter { name: "location" }.into());
        }

        let id = Uuid::new_v4().to_string();
        let record = JobRecord {
            id: id.clone(),
            job_type,
            params: params.clone(),
            status: JobStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            result: None,
            error: None,
        };
        self.shared.lock().active.insert(id.clone(), record);
        self.shared.log(
            LogLevel::Info,
            Some(&id),
            format!(
                "🚀 任务开始: {} (query={}, location={})",
                job_type, params.query, params.location
            ),
        );

        let shared = Arc::clone(&self.shared);
        let handler = Arc::clone(&self.handler);
        let logger = JobLogger {
            shared: Arc::clone(&self.shared),
            job_id: id.clone(),
        };
        let job_id = id.clone();

        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(handler.handle(job_type, &params, &logger))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(anyhow::anyhow!("任务处理器异常终止")));
            shared.finish(&job_id, outcome);
        });

        Ok(JobHandle {
            id,
            status: JobStatus::Running,
        })
    }

    /// 当前队列状态
    ///
    /// - 运行中的任务按开始时间排序
    /// - 历史任务最新的在前
    /// - 日志按时间顺序
    pub fn status(&self) -> QueueStatus {
        let state = self.shared.lock();
        let mut running_jobs: Vec<JobRecord> = state.active.values().cloned().collect();
        running_jobs.sort_by_key(|r| r.started_at);
        QueueStatus {
            running_jobs,
            history: state.history.iter().rev().cloned().collect(),
            logs: state.logs.iter().cloned().collect(),
        }
    }

    /// 查询单个任务（活动表或历史环）
    pub fn job(&self, id: &str) -> Option<JobRecord> {
        let state = self.shared.lock();
        state
            .active
            .get(id)
            .or_else(|| state.history.iter().find(|r| r.id == id))
            .cloned()
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.shared.lock().active.contains_key(id)
    }
}
