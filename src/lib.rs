//! # Job Apply Agent
//!
//! 职位抓取与 Easy Apply 自动申请
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() / content() 能力
//! - `browser/` - 启动无头浏览器或连接调试端口，`BrowserSession` 保证释放
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个服务只处理一个页面或一份表单
//! - `PageFetcher` - 打开 URL 并返回渲染后的 HTML
//! - `ListingExtractor` / `DetailExtractor` - 搜索结果页 / 职位详情页解析
//! - `FormInspector` / `PageClassifier` - 表单清单与页面状态识别
//! - `AnswerResolver` - LLM 推理 + 规则兜底
//! - `ActionExecutor` - 填写、选择、点击
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"申请一个职位"的完整流程
//! - `ApplyCtx` - 上下文封装（job_id + iteration + state）
//! - `ApplyFlow` - 有限次循环：识别 → 回答 → 前进 → 提交
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/job_queue` - 任务队列，管理任务生命周期和日志
//! - `orchestrator/scrape_coordinator` - 三种抓取 / 导入任务的处理器
//!
//! ## 模块结构

pub mod browser;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
