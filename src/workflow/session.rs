//! 申请会话
//!
//! 流程层只通过 [`ApplySession`] 操作页面，测试中可以替换为脚本化实现

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::browser::BrowserSession;
use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::models::{ContainerSnapshot, FormAnswers};
use crate::services::{ActionExecutor, ClassifierMarkers, FormInspector, PageFetcher, RenderedPage};

/// 申请流程所需的全部页面能力
#[async_trait]
pub trait ApplySession: Send {
    /// 启动浏览器
    async fn start(&mut self) -> Result<()>;

    /// 打开职位页面，返回导航后停留的页面；失败属于致命错误
    async fn navigate(&mut self, url: &str) -> Result<RenderedPage>;

    /// 职位页面上是否有"已申请"标记
    async fn already_applied(&mut self) -> Result<bool>;

    /// 打开站内申请弹窗
    async fn open_apply_modal(&mut self) -> Result<bool>;

    /// 是否出现成功提示
    async fn has_success_signal(&mut self) -> Result<bool>;

    /// 读取容器快照（包含表单清单）
    async fn snapshot(&mut self) -> Result<ContainerSnapshot>;

    /// 填写答案，返回成功落地的数量
    async fn apply_answers(&mut self, answers: &FormAnswers) -> Result<usize>;

    /// 点击下一步
    async fn advance(&mut self) -> Result<bool>;

    /// 点击提交
    async fn submit(&mut self) -> Result<bool>;

    /// 释放会话资源；必须可重复调用
    async fn close(&mut self);
}

/// 基于真实浏览器的申请会话
pub struct BrowserApplySession {
    config: Config,
    session: Option<BrowserSession>,
    fetcher: PageFetcher,
    inspector: FormInspector,
    actions: ActionExecutor,
    success_phrases: Vec<String>,
}

impl BrowserApplySession {
    pub fn new(config: &Config, markers: &ClassifierMarkers) -> Self {
        Self {
            config: config.clone(),
            session: None,
            fetcher: PageFetcher::new(config),
            inspector: FormInspector::new(),
            actions: ActionExecutor::new(),
            success_phrases: markers.success.clone(),
        }
    }

    fn executor(&self) -> Result<&JsExecutor> {
        self.session
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("浏览器会话尚未启动"))?
            .executor()
    }
}

#[async_trait]
impl ApplySession for BrowserApplySession {
    async fn start(&mut self) -> Result<()> {
        if self.session.is_none() {
            self.session = Some(BrowserSession::open(&self.config).await?);
        }
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<RenderedPage> {
        let executor = self.executor()?;
        self.fetcher.navigate(executor, url).await?;
        self.fetcher.current_page(executor, url).await
    }

    async fn already_applied(&mut self) -> Result<bool> {
        self.actions.already_applied(self.executor()?).await
    }

    async fn open_apply_modal(&mut self) -> Result<bool> {
        let opened = self.actions.open_easy_apply(self.executor()?).await?;
        if opened {
            sleep(self.config.step_delay()).await;
        }
        Ok(opened)
    }

    async fn has_success_signal(&mut self) -> Result<bool> {
        self.actions
            .has_success_signal(self.executor()?, &self.success_phrases)
            .await
    }

    async fn snapshot(&mut self) -> Result<ContainerSnapshot> {
        let executor = self.executor()?;
        let probe = self.actions.snapshot_container(executor).await?;
        let inventory = self.inspector.inspect(executor).await?;
        Ok(ContainerSnapshot {
            text: probe.text,
            has_prefilled_email: probe.has_prefilled_email,
            inventory,
        })
    }

    async fn apply_answers(&mut self, answers: &FormAnswers) -> Result<usize> {
        let landed = self.actions.apply_answers(self.executor()?, answers).await?;
        sleep(self.config.step_delay()).await;
        Ok(landed)
    }

    async fn advance(&mut self) -> Result<bool> {
        let clicked = self.actions.click_next(self.executor()?).await?;
        sleep(self.config.step_delay()).await;
        Ok(clicked)
    }

    async fn submit(&mut self) -> Result<bool> {
        let clicked = self.actions.click_submit(self.executor()?).await?;
        sleep(self.config.step_delay()).await;
        Ok(clicked)
    }

    async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
            info!("🔒 浏览器会话已关闭");
        } else {
            debug!("浏览器会话未启动，无需关闭");
        }
    }
}
