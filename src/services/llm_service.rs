//! LLM 服务 - 业务能力层
//!
//! 只负责"LLM 推理"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

/// 单次推理调用的错误
#[derive(Debug, Error)]
pub enum InferenceError {
    /// 被限流（HTTP 429 或 "rate limit"）
    #[error("推理服务限流: {0}")]
    RateLimited(String),
    /// 其他请求错误
    #[error("推理请求失败: {0}")]
    Request(String),
    /// 返回内容为空
    #[error("推理服务返回内容为空")]
    EmptyContent,
}

impl InferenceError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, InferenceError::RateLimited(_))
    }

    /// 根据错误信息判断是否为限流
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("429") || lower.contains("rate limit") || lower.contains("rate_limit") {
            InferenceError::RateLimited(message)
        } else {
            InferenceError::Request(message)
        }
    }
}

impl From<OpenAIError> for InferenceError {
    fn from(err: OpenAIError) -> Self {
        InferenceError::from_message(err.to_string())
    }
}

/// 托管推理服务的抽象
///
/// 答案解析器只依赖这个 trait，测试中可以替换为脚本化实现
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// 发送一次提示词并返回原始文本回复
    async fn complete(&self, system: &str, user: &str) -> Result<String, InferenceError>;
}

/// LLM 服务
///
/// 职责：
/// - 调用兼容 OpenAI 的 chat completion 接口
/// - 不做重试（重试策略属于答案解析器）
/// - 不解析回复内容
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（去掉首尾空白）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String, InferenceError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        // 表单答案需要稳定输出，温度压低
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.2)
            .max_tokens(2048u32)
            .build()?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            InferenceError::from(e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or(InferenceError::EmptyContent)?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl InferenceClient for LlmService {
    async fn complete(&self, system: &str, user: &str) -> Result<String, InferenceError> {
        self.send_to_llm(user, Some(system)).await
    }
}
