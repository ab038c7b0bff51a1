//! 申请流程上下文
//!
//! 封装"我正在申请哪个职位、第几轮、识别出什么状态"这一信息

use std::fmt::Display;

use uuid::Uuid;

use crate::models::PageState;
use crate::services::listing_extractor::external_id_from_url;

/// 申请流程上下文
///
/// 每条日志都带上它，出错时可以据此复现
#[derive(Debug, Clone)]
pub struct ApplyCtx {
    /// 职位 ID（URL 中解析不出时使用随机 ID）
    pub job_id: String,

    /// 职位页面 URL
    pub job_url: String,

    /// 当前迭代轮次（从1开始，0 表示尚未进入循环）
    pub iteration: usize,

    /// 本轮识别出的页面状态
    pub state: Option<PageState>,
}

impl ApplyCtx {
    /// 创建新的申请上下文
    pub fn new(job_url: &str) -> Self {
        let job_id = external_id_from_url(job_url)
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string()[..8].to_string());
        Self {
            job_id,
            job_url: job_url.to_string(),
            iteration: 0,
            state: None,
        }
    }
}

impl Display for ApplyCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.state {
            Some(state) => write!(
                f,
                "[职位 #{} 第{}轮 状态#{}]",
                self.job_id, self.iteration, state
            ),
            None => write!(f, "[职位 #{} 第{}轮]", self.job_id, self.iteration),
        }
    }
}
