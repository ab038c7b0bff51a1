use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 浏览器相关错误
    Browser(BrowserError),
    /// 外部 API 调用错误
    Api(ApiError),
    /// 文件操作错误
    File(FileError),
    /// LLM 服务错误
    Llm(LlmError),
    /// 任务队列错误
    Job(JobError),
    /// 配置错误
    Config(ConfigError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Browser(e) => write!(f, "浏览器错误: {}", e),
            AppError::Api(e) => write!(f, "API错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Llm(e) => write!(f, "LLM错误: {}", e),
            AppError::Job(e) => write!(f, "任务错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Browser(e) => Some(e),
            AppError::Api(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Llm(e) => Some(e),
            AppError::Job(e) => Some(e),
            AppError::Config(e) => Some(e),
        }
    }
}

/// 浏览器相关错误
#[derive(Debug)]
pub enum BrowserError {
    /// 连接浏览器失败
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 启动浏览器失败
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 浏览器配置失败
    ConfigurationFailed { message: String },
    /// 未登录：页面停在登录墙上
    NotSignedIn { url: String },
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::ConnectionFailed { port, source } => {
                write!(f, "无法连接到浏览器 (端口: {}): {}", port, source)
            }
            BrowserError::LaunchFailed { source } => write!(f, "启动浏览器失败: {}", source),
            BrowserError::PageCreationFailed { source } => {
                write!(f, "创建页面失败: {}", source)
            }
            BrowserError::NavigationFailed { url, source } => {
                write!(f, "导航到 {} 失败: {}", url, source)
            }
            BrowserError::ScriptExecutionFailed { source } => {
                write!(f, "执行脚本失败: {}", source)
            }
            BrowserError::ConfigurationFailed { message } => {
                write!(f, "浏览器配置失败: {}", message)
            }
            BrowserError::NotSignedIn { url } => {
                write!(f, "未登录，页面跳转到了登录墙 ({})", url)
            }
        }
    }
}

impl std::error::Error for BrowserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowserError::ConnectionFailed { source, .. }
            | BrowserError::LaunchFailed { source }
            | BrowserError::PageCreationFailed { source }
            | BrowserError::NavigationFailed { source, .. }
            | BrowserError::ScriptExecutionFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            BrowserError::ConfigurationFailed { .. } | BrowserError::NotSignedIn { .. } => None,
        }
    }
}

/// 外部 API 调用错误
#[derive(Debug)]
pub enum ApiError {
    /// 网络请求失败
    RequestFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// API 返回错误响应
    BadResponse { endpoint: String, status: u16 },
    /// 请求频率限制
    RateLimited { endpoint: String },
    /// JSON 解析失败
    JsonParseFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::RequestFailed { endpoint, source } => {
                write!(f, "API请求失败 ({}): {}", endpoint, source)
            }
            ApiError::BadResponse { endpoint, status } => {
                write!(f, "API返回错误响应 ({}): status={}", endpoint, status)
            }
            ApiError::RateLimited { endpoint } => write!(f, "API请求频率限制 ({})", endpoint),
            ApiError::JsonParseFailed { source } => write!(f, "JSON解析失败: {}", source),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::RequestFailed { source, .. } | ApiError::JsonParseFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 文件不存在
    NotFound { path: String },
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::NotFound { path } => write!(f, "文件不存在: {}", path),
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            FileError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. }
            | FileError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            FileError::NotFound { .. } => None,
        }
    }
}

/// LLM 服务错误
#[derive(Debug)]
pub enum LlmError {
    /// 重试次数用尽
    AttemptsExhausted { attempts: u32, last_error: String },
    /// 返回内容无法解析
    UnparseableResponse { response: String },
    /// 未配置推理服务
    Disabled,
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::AttemptsExhausted {
                attempts,
                last_error,
            } => write!(f, "LLM 调用 {} 次均失败: {}", attempts, last_error),
            LlmError::UnparseableResponse { response } => {
                write!(f, "无法解析 LLM 返回内容: {}", response)
            }
            LlmError::Disabled => write!(f, "未配置 LLM 服务"),
        }
    }
}

impl std::error::Error for LlmError {}

/// 任务队列错误
#[derive(Debug)]
pub enum JobError {
    /// 缺少必填参数
    MissingParameter { name: &'static str },
    /// 未知的任务类型
    UnknownJobType { value: String },
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::MissingParameter { name } => write!(f, "缺少必填参数: {}", name),
            JobError::UnknownJobType { value } => write!(f, "未知的任务类型: {}", value),
        }
    }
}

impl std::error::Error for JobError {}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 必需的配置项为空
    MissingValue { var_name: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingValue { var_name } => write!(f, "配置项 {} 未设置", var_name),
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 从常见错误类型转换 ==========

impl From<JobError> for AppError {
    fn from(err: JobError) -> Self {
        AppError::Job(err)
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建API请求失败错误
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
