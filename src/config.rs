use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- 浏览器配置 ---
    /// 是否启动无头浏览器（false 时连接到已登录的调试端口）
    pub browser_headless: bool,
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 自定义浏览器可执行文件路径
    pub chrome_executable: Option<String>,
    /// 页面加载后等待动态内容的时间（毫秒）
    pub page_settle_ms: u64,
    /// 两次操作之间的节奏间隔（毫秒）
    pub step_delay_ms: u64,

    // --- 搜索抓取配置 ---
    /// 搜索结果页基础 URL
    pub search_base_url: String,
    /// 每页职位数量
    pub listing_page_size: usize,
    /// 单次任务最多抓取的搜索页数
    pub max_search_pages: usize,
    /// 职位描述最大字符数
    pub description_max_chars: usize,

    // --- 申请流程配置 ---
    /// 申请流程最大迭代次数
    pub apply_max_iterations: usize,

    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_max_attempts: u32,
    pub llm_backoff_base_secs: u64,

    // --- JSearch API 配置 ---
    pub jsearch_api_key: String,
    pub jsearch_api_host: String,
    pub jsearch_num_pages: u32,

    // --- 任务队列配置 ---
    /// 任务事件日志文件（追加写入，每行一个 JSON）
    pub job_log_file: String,
    /// 历史任务保留数量
    pub job_history_capacity: usize,
    /// 内存日志缓冲条数
    pub job_log_buffer_capacity: usize,

    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_headless: true,
            browser_debug_port: 9222,
            chrome_executable: None,
            page_settle_ms: 1500,
            step_delay_ms: 1200,
            search_base_url: "https://www.linkedin.com/jobs/search/".to_string(),
            listing_page_size: 25,
            max_search_pages: 5,
            description_max_chars: 5000,
            apply_max_iterations: 15,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_max_attempts: 3,
            llm_backoff_base_secs: 5,
            jsearch_api_key: String::new(),
            jsearch_api_host: "jsearch.p.rapidapi.com".to_string(),
            jsearch_num_pages: 1,
            job_log_file: "job-queue.log".to_string(),
            job_history_capacity: 25,
            job_log_buffer_capacity: 200,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_headless: env_parse("BROWSER_HEADLESS").unwrap_or(default.browser_headless),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").unwrap_or(default.browser_debug_port),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(default.chrome_executable),
            page_settle_ms: env_parse("PAGE_SETTLE_MS").unwrap_or(default.page_settle_ms),
            step_delay_ms: env_parse("STEP_DELAY_MS").unwrap_or(default.step_delay_ms),
            search_base_url: std::env::var("SEARCH_BASE_URL").unwrap_or(default.search_base_url),
            listing_page_size: env_parse("LISTING_PAGE_SIZE").unwrap_or(default.listing_page_size),
            max_search_pages: env_parse("MAX_SEARCH_PAGES").unwrap_or(default.max_search_pages),
            description_max_chars: env_parse("DESCRIPTION_MAX_CHARS").unwrap_or(default.description_max_chars),
            apply_max_iterations: env_parse("APPLY_MAX_ITERATIONS").unwrap_or(default.apply_max_iterations),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_max_attempts: env_parse("LLM_MAX_ATTEMPTS").unwrap_or(default.llm_max_attempts),
            llm_backoff_base_secs: env_parse("LLM_BACKOFF_BASE_SECS").unwrap_or(default.llm_backoff_base_secs),
            jsearch_api_key: std::env::var("JSEARCH_API_KEY").unwrap_or(default.jsearch_api_key),
            jsearch_api_host: std::env::var("JSEARCH_API_HOST").unwrap_or(default.jsearch_api_host),
            jsearch_num_pages: env_parse("JSEARCH_NUM_PAGES").unwrap_or(default.jsearch_num_pages),
            job_log_file: std::env::var("JOB_LOG_FILE").unwrap_or(default.job_log_file),
            job_history_capacity: env_parse("JOB_HISTORY_CAPACITY").unwrap_or(default.job_history_capacity),
            job_log_buffer_capacity: env_parse("JOB_LOG_BUFFER_CAPACITY").unwrap_or(default.job_log_buffer_capacity),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
        }
    }

    /// 是否启用 LLM（未配置 API Key 时只使用规则兜底）
    pub fn llm_enabled(&self) -> bool {
        !self.llm_api_key.trim().is_empty()
    }

    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
