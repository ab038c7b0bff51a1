/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::info;

use crate::config::Config;

/// 记录程序启动信息
pub fn log_startup(config: &Config, mode: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", mode);
    info!(
        "🌐 浏览器模式: {}",
        if config.browser_headless {
            "无头浏览器".to_string()
        } else {
            format!("连接调试端口 {}", config.browser_debug_port)
        }
    );
    info!(
        "🤖 LLM: {}",
        if config.llm_enabled() {
            config.llm_model_name.as_str()
        } else {
            "未配置（仅使用规则兜底）"
        }
    );
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
