//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责任务调度和资源归属，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `job_queue` - 任务队列
//! - 校验参数、分配任务 ID
//! - 后台运行处理器（tokio::spawn）
//! - 维护活动表、历史环、日志环
//! - 追加写入事件日志
//!
//! ### `scrape_coordinator` - 抓取协调器
//! - 三种任务类型的处理器
//! - 每次运行独占并最终释放抓取会话（`ListingSession`）
//! - 停在登录墙上属于致命错误
//!
//! ## 层次关系
//!
//! ```text
//! job_queue (任务生命周期)
//!     ↓
//! scrape_coordinator (一次抓取 / 导入)
//!     ↓
//! services (能力层：fetch / extract / store)
//!     ↓
//! infrastructure (基础设施：JsExecutor)
//! ```
//!
//! 申请流程（`workflow::ApplyFlow`）由调用方直接驱动，不经过队列。

pub mod job_queue;
pub mod scrape_coordinator;

pub use job_queue::{JobHandler, JobLogger, JobQueue};
pub use scrape_coordinator::{
    BrowserListingSession, ListingSession, ListingSessionFactory, ScrapeCoordinator,
};
