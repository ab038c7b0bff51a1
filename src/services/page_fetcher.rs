//! 页面抓取服务 - 业务能力层
//!
//! 只负责"打开 URL 并拿到渲染后的 HTML"能力

use std::time::Duration;

use anyhow::Result;
use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, BrowserError};
use crate::infrastructure::JsExecutor;

/// 登录墙页面的 URL 路径特征
const SIGN_IN_PATHS: &[&str] = &["/authwall", "/login", "/uas/login", "/checkpoint/", "/signup"];

/// 登录表单特征
const SIGN_IN_FORM_SELECTOR: &str =
    "input[name=\"session_password\"], form.login__form, form[action*=\"login-submit\"]";

/// 导航后停留的页面
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    /// 导航结束后的实际 URL（可能被重定向）
    pub url: String,
    pub html: String,
}

impl RenderedPage {
    /// 页面是否停在登录墙上
    pub fn is_sign_in_wall(&self) -> bool {
        let path = reqwest::Url::parse(&self.url)
            .map(|u| u.path().to_lowercase())
            .unwrap_or_else(|_| self.url.to_lowercase());
        if SIGN_IN_PATHS.iter().any(|p| path.starts_with(p)) {
            return true;
        }
        let Ok(form) = Selector::parse(SIGN_IN_FORM_SELECTOR) else {
            return false;
        };
        Html::parse_document(&self.html).select(&form).next().is_some()
    }

    /// 未登录属于致命的会话错误
    pub fn ensure_signed_in(&self) -> Result<()> {
        if self.is_sign_in_wall() {
            warn!("🔐 页面停在登录墙: {}", self.url);
            return Err(AppError::Browser(BrowserError::NotSignedIn {
                url: self.url.clone(),
            })
            .into());
        }
        Ok(())
    }
}

/// 页面抓取服务
///
/// 职责：
/// - 导航到 URL
/// - 等待动态内容渲染
/// - 返回渲染后的 HTML
pub struct PageFetcher {
    settle: Duration,
}

impl PageFetcher {
    pub fn new(config: &Config) -> Self {
        Self {
            settle: config.page_settle(),
        }
    }

    pub fn with_settle(settle: Duration) -> Self {
        Self { settle }
    }

    /// 打开 URL 并返回渲染后的 HTML
    ///
    /// 导航失败属于致命错误，直接向上返回
    pub async fn fetch_html(&self, executor: &JsExecutor, url: &str) -> Result<String> {
        Ok(self.fetch_page(executor, url).await?.html)
    }

    /// 打开 URL，滚动触发懒加载，返回最终 URL 与 HTML
    pub async fn fetch_page(&self, executor: &JsExecutor, url: &str) -> Result<RenderedPage> {
        self.navigate(executor, url).await?;

        // 滚动一次以触发懒加载的列表项
        executor.scroll_to_bottom(self.settle).await?;

        let page = self.current_page(executor, url).await?;
        debug!("页面 {} 已渲染，HTML 长度: {}", page.url, page.html.len());
        Ok(page)
    }

    /// 读取当前页面；`requested` 作为拿不到 URL 时的兜底
    pub async fn current_page(&self, executor: &JsExecutor, requested: &str) -> Result<RenderedPage> {
        let url = executor
            .url()
            .await?
            .unwrap_or_else(|| requested.to_string());
        let html = executor.content().await?;
        Ok(RenderedPage { url, html })
    }

    /// 只导航并等待页面稳定，不读取 HTML
    pub async fn navigate(&self, executor: &JsExecutor, url: &str) -> Result<()> {
        if let Err(e) = executor.goto(url).await {
            return Err(AppError::Browser(BrowserError::NavigationFailed {
                url: url.to_string(),
                source: e.into(),
            })
            .into());
        }
        sleep(self.settle).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn page(url: &str, html: &str) -> RenderedPage {
        RenderedPage {
            url: url.into(),
            html: html.into(),
        }
    }

    #[test]
    fn test_sign_in_wall_by_url() {
        assert!(page("https://www.linkedin.com/authwall?trk=x", "<html></html>").is_sign_in_wall());
        assert!(page("https://www.linkedin.com/login?session_redirect=y", "").is_sign_in_wall());
        assert!(page("https://www.linkedin.com/checkpoint/lg/login", "").is_sign_in_wall());
        assert!(!page("https://www.linkedin.com/jobs/view/1/", "<h1>Engineer</h1>").is_sign_in_wall());
    }

    #[test]
    fn test_sign_in_wall_by_form() {
        let html = r#"<form class="login__form" action="/checkpoint/lg/login-submit">
            <input name="session_key"><input name="session_password" type="password"></form>"#;
        assert!(page("https://www.linkedin.com/jobs/search/?keywords=rust", html).is_sign_in_wall());
    }

    #[test]
    fn test_ensure_signed_in_is_fatal_browser_error() {
        let err = page("https://www.linkedin.com/authwall", "").ensure_signed_in().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::Browser(BrowserError::NotSignedIn { .. }))
        ));
        assert!(page("https://www.linkedin.com/jobs/search/", "<ul></ul>")
            .ensure_signed_in()
            .is_ok());
    }
}
