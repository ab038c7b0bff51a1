//! 抓取协调器 - 编排层
//!
//! 实现三种任务类型的处理器：
//! - `jsearch-import`：JSearch API → 职位映射 → 存储
//! - `listing-scrape`：分页抓取搜索结果 → 逐个抓取详情 → 存储
//! - `listing-scrape-easy-apply-only`：同上，只保留站内申请的职位
//!
//! 每次运行独占一个抓取会话，结束时无论成败都会关闭

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::browser::BrowserSession;
use crate::clients::{JSearchClient, JobStore};
use crate::config::Config;
use crate::models::{ApplyType, JobParams, JobType, ScrapeSummary};
use crate::orchestrator::job_queue::{JobHandler, JobLogger};
use crate::services::listing_extractor::{page_count, search_url};
use crate::services::{DetailExtractor, ListingExtractor, PageFetcher, RenderedPage};

/// 抓取循环所需的页面能力
///
/// 每次抓取任务创建一个新会话，测试中可以替换为脚本化实现
#[async_trait]
pub trait ListingSession: Send {
    /// 启动浏览器
    async fn start(&mut self) -> Result<()>;

    /// 打开 URL 并返回渲染后的页面
    async fn fetch(&mut self, url: &str) -> Result<RenderedPage>;

    /// 释放会话资源；必须可重复调用
    async fn close(&mut self);
}

/// 为每次抓取创建会话
pub type ListingSessionFactory = Arc<dyn Fn(&Config) -> Box<dyn ListingSession> + Send + Sync>;

/// 基于真实浏览器的抓取会话
pub struct BrowserListingSession {
    config: Config,
    session: Option<BrowserSession>,
    fetcher: PageFetcher,
}

impl BrowserListingSession {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            session: None,
            fetcher: PageFetcher::new(config),
        }
    }
}

#[async_trait]
impl ListingSession for BrowserListingSession {
    async fn start(&mut self) -> Result<()> {
        if self.session.is_none() {
            self.session = Some(BrowserSession::open(&self.config).await?);
        }
        Ok(())
    }

    async fn fetch(&mut self, url: &str) -> Result<RenderedPage> {
        let executor = self
            .session
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("浏览器会话尚未启动"))?
            .executor()?;
        self.fetcher.fetch_page(executor, url).await
    }

    async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
            info!("🔒 抓取会话已关闭");
        } else {
            debug!("抓取会话未启动，无需关闭");
        }
    }
}

/// 抓取协调器
pub struct ScrapeCoordinator {
    config: Config,
    store: Arc<dyn JobStore>,
    sessions: ListingSessionFactory,
}

impl ScrapeCoordinator {
    pub fn new(config: &Config, store: Arc<dyn JobStore>) -> Self {
        Self::with_sessions(
            config,
            store,
            Arc::new(|config: &Config| -> Box<dyn ListingSession> {
                Box::new(BrowserListingSession::new(config))
            }),
        )
    }

    /// 使用自定义会话工厂创建
    pub fn with_sessions(
        config: &Config,
        store: Arc<dyn JobStore>,
        sessions: ListingSessionFactory,
    ) -> Self {
        Self {
            config: config.clone(),
            store,
            sessions,
        }
    }

    /// 通过 JSearch API 导入
    async fn import_jsearch(&self, params: &JobParams, log: &JobLogger) -> Result<ScrapeSummary> {
        let client = JSearchClient::new(&self.config)?;
        let postings = client.search(&params.query, &params.location).await?;

        let mut summary = ScrapeSummary {
            pages: 1,
            candidates: postings.len(),
            ..Default::default()
        };
        for posting in postings {
            if self.store.insert_if_absent(posting).await? {
                summary.inserted += 1;
            } else {
                summary.skipped += 1;
            }
        }
        log.info(format!(
            "📥 JSearch 导入完成: 新增 {}，跳过 {}",
            summary.inserted, summary.skipped
        ));
        Ok(summary)
    }

    /// 浏览器抓取；会话在返回前关闭
    async fn scrape_listings(
        &self,
        params: &JobParams,
        easy_apply_only: bool,
        log: &JobLogger,
    ) -> Result<ScrapeSummary> {
        let mut session = (self.sessions)(&self.config);
        let result = match session.start().await {
            Ok(()) => {
                self.scrape_with(session.as_mut(), params, easy_apply_only, log)
                    .await
            }
            Err(e) => Err(e),
        };
        session.close().await;
        result
    }

    async fn scrape_with(
        &self,
        session: &mut dyn ListingSession,
        params: &JobParams,
        easy_apply_only: bool,
        log: &JobLogger,
    ) -> Result<ScrapeSummary> {
        let config = &self.config;
        let listings = ListingExtractor::new(&config.search_base_url);
        let details = DetailExtractor::new(config.description_max_chars);

        let mut seen: HashSet<String> = HashSet::new();
        let mut summary = ScrapeSummary::default();
        let mut total_pages = config.max_search_pages.max(1);

        let mut page_index = 0;
        while page_index < total_pages {
            let url = search_url(
                &config.search_base_url,
                &params.query,
                &params.location,
                page_index,
                config.listing_page_size,
                easy_apply_only,
            )?;
            let page = session.fetch(&url).await?;
            page.ensure_signed_in()?;
            let html = page.html;
            if page_index == 0 {
                total_pages = page_count(&html, config.listing_page_size)
                    .min(config.max_search_pages.max(1));
            }
            summary.pages += 1;

            let candidates = listings.extract_candidates(&html, &mut seen);
            log.info(format!(
                "📄 第 {}/{} 页: {} 个新候选职位",
                page_index + 1,
                total_pages,
                candidates.len()
            ));
            if candidates.is_empty() {
                break;
            }
            summary.candidates += candidates.len();

            for candidate in candidates {
                if self.store.contains(&candidate.id).await? {
                    summary.skipped += 1;
                    continue;
                }

                let detail = match session.fetch(&candidate.url).await {
                    Ok(page) => page,
                    Err(e) => {
                        log.warn(format!("⚠️ 职位 {} 详情加载失败，跳过: {:#}", candidate.id, e));
                        continue;
                    }
                };
                detail.ensure_signed_in()?;
                let posting = details.extract(&detail.html, &candidate);

                if easy_apply_only && posting.apply_type != ApplyType::InternalForm {
                    summary.filtered += 1;
                } else if self.store.insert_if_absent(posting).await? {
                    summary.inserted += 1;
                } else {
                    summary.skipped += 1;
                }

                sleep(config.step_delay()).await;
            }

            page_index += 1;
        }

        log.info(format!(
            "📊 抓取完成: {} 页，{} 个候选，新增 {}，跳过 {}，过滤 {}",
            summary.pages, summary.candidates, summary.inserted, summary.skipped, summary.filtered
        ));
        Ok(summary)
    }
}

#[async_trait]
impl JobHandler for ScrapeCoordinator {
    async fn handle(
        &self,
        job_type: JobType,
        params: &JobParams,
        log: &JobLogger,
    ) -> Result<JsonValue> {
        let summary = match job_type {
            JobType::JsearchImport => self.import_jsearch(params, log).await?,
            JobType::ListingScrape => self.scrape_listings(params, false, log).await?,
            JobType::ListingScrapeEasyApplyOnly => self.scrape_listings(params, true, log).await?,
        };
        Ok(serde_json::to_value(summary)?)
    }
}
