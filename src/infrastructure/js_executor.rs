//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"导航 / 读取 HTML / 执行 JS"的能力

use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{AppError, BrowserError};

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 goto() / content() / eval() 能力
/// - 不认识职位 / 表单
/// - 不处理业务流程
#[derive(Clone)]
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 导航到指定 URL 并等待导航完成
    pub async fn goto(&self, url: &str) -> Result<()> {
        debug!("导航到: {}", url);
        self.page
            .goto(url)
            .await
            .with_context(|| format!("导航到 {} 失败", url))?;
        self.page
            .wait_for_navigation()
            .await
            .with_context(|| format!("等待页面 {} 加载失败", url))?;
        Ok(())
    }

    /// 返回当前页面渲染后的 HTML
    pub async fn content(&self) -> Result<String> {
        let html = self.page.content().await.context("读取页面 HTML 失败")?;
        Ok(html)
    }

    /// 当前页面 URL
    pub async fn url(&self) -> Result<Option<String>> {
        Ok(self.page.url().await?)
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await.map_err(|e| {
            AppError::Browser(BrowserError::ScriptExecutionFailed {
                source: Box::new(e),
            })
        })?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 执行返回布尔值的 JS，非布尔结果视为 false
    pub async fn eval_bool(&self, js_code: impl Into<String>) -> Result<bool> {
        let value = self.eval(js_code).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// 滚动到页面底部以触发懒加载内容
    pub async fn scroll_to_bottom(&self, settle: Duration) -> Result<()> {
        self.eval("(() => { window.scrollTo(0, document.body.scrollHeight); return true; })()")
            .await?;
        tokio::time::sleep(settle).await;
        Ok(())
    }

    /// 关闭页面
    pub async fn close(self) -> Result<()> {
        self.page.close().await?;
        Ok(())
    }
}
