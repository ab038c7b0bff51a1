//! 浏览器会话
//!
//! 每个抓取 / 申请任务独占一个会话，任务之间从不共享

use anyhow::Result;
use chromiumoxide::Browser;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::browser::{connect_to_browser, launch_headless_browser};
use crate::config::Config;
use crate::error::{AppError, BrowserError};
use crate::infrastructure::JsExecutor;

/// 浏览器会话
///
/// - 无头模式：会话拥有整个浏览器进程，关闭时退出浏览器
/// - 连接模式：会话只拥有自己新建的页面，关闭时只关闭该页面
pub struct BrowserSession {
    browser: Option<Browser>,
    handler_task: Option<JoinHandle<()>>,
    executor: Option<JsExecutor>,
    owns_browser: bool,
}

impl BrowserSession {
    /// 根据配置启动或连接浏览器，并打开一个空白页面
    pub async fn open(config: &Config) -> Result<Self> {
        let (browser, handler_task) = if config.browser_headless {
            launch_headless_browser(config).await?
        } else {
            connect_to_browser(config.browser_debug_port).await?
        };

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(AppError::Browser(BrowserError::PageCreationFailed {
                    source: Box::new(e),
                })
                .into());
            }
        };

        info!("✓ 浏览器会话已就绪");
        Ok(Self {
            browser: Some(browser),
            handler_task: Some(handler_task),
            executor: Some(JsExecutor::new(page)),
            owns_browser: config.browser_headless,
        })
    }

    /// 获取页面执行器
    pub fn executor(&self) -> Result<&JsExecutor> {
        self.executor
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("浏览器会话已关闭"))
    }

    pub fn is_closed(&self) -> bool {
        self.executor.is_none() && self.browser.is_none()
    }

    /// 释放会话持有的所有资源；重复调用是安全的
    pub async fn close(&mut self) {
        if let Some(executor) = self.executor.take() {
            if let Err(e) = executor.close().await {
                debug!("关闭页面失败（忽略）: {}", e);
            }
        }

        if let Some(mut browser) = self.browser.take() {
            if self.owns_browser {
                if let Err(e) = browser.close().await {
                    warn!("关闭浏览器失败: {}", e);
                }
                if let Err(e) = browser.wait().await {
                    debug!("等待浏览器进程退出失败（忽略）: {}", e);
                }
            }
        }

        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        debug!("浏览器会话已释放");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // 未经 close() 的会话至少停止事件循环，浏览器进程由 Browser 自身的 Drop 处理
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }
}
