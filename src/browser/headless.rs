use std::path::Path;

use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{AppError, BrowserError};

/// 启动无头浏览器
///
/// 返回浏览器句柄以及后台处理 CDP 事件的任务
pub async fn launch_headless_browser(config: &Config) -> Result<(Browser, JoinHandle<()>)> {
    info!("🚀 启动无头浏览器...");

    let mut builder = BrowserConfig::builder().new_headless_mode().args(vec![
        "--disable-gpu",
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--disable-blink-features=AutomationControlled",
        "--window-size=1366,900",
    ]);
    if let Some(executable) = &config.chrome_executable {
        debug!("使用自定义浏览器: {}", executable);
        builder = builder.chrome_executable(Path::new(executable));
    }

    let browser_config = builder.build().map_err(|e| {
        error!("配置无头浏览器失败: {}", e);
        AppError::Browser(BrowserError::ConfigurationFailed { message: e })
    })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动无头浏览器失败: {}", e);
        AppError::Browser(BrowserError::LaunchFailed {
            source: Box::new(e),
        })
    })?;
    debug!("无头浏览器启动成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    Ok((browser, handler_task))
}
