//! 需要本机安装 Chrome/Chromium，默认忽略
//!
//! 运行: cargo test --test live_browser_test -- --ignored

use job_apply_agent::browser::BrowserSession;
use job_apply_agent::services::{FormInspector, PageFetcher};
use job_apply_agent::Config;

#[tokio::test]
#[ignore]
async fn test_fetch_html_from_real_browser() {
    let config = Config::from_env();
    let mut session = BrowserSession::open(&config).await.unwrap();

    let html = {
        let executor = session.executor().unwrap();
        PageFetcher::new(&config)
            .fetch_html(executor, "https://example.com/")
            .await
    };
    session.close().await;

    let html = html.unwrap();
    assert!(html.contains("Example Domain"));
    assert!(session.is_closed());
}

#[tokio::test]
#[ignore]
async fn test_inspect_page_without_form() {
    let config = Config::from_env();
    let mut session = BrowserSession::open(&config).await.unwrap();

    let inventory = {
        let executor = session.executor().unwrap();
        PageFetcher::new(&config)
            .navigate(executor, "https://example.com/")
            .await
            .unwrap();
        FormInspector::new().inspect(executor).await
    };
    session.close().await;

    assert!(inventory.unwrap().is_empty());
}
