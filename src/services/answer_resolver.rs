//! 答案解析服务 - 业务能力层
//!
//! 两级策略：
//! - 第一级：把清单和申请人资料一起交给托管推理服务，要求返回结构化答案
//! - 第二级：确定性规则兜底，永不失败
//!
//! 每次迭代只使用其中一级的答案。第二级只在第一级重试用尽或回复无法解析时启用

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value as JsonValue};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::LlmError;
use crate::models::{
    Answer, AnswerSource, ApplicantProfile, FormAnswers, FormInventory, ResolvedAnswers,
};
use crate::services::fallback_rules::{fallback_answers, snap_to_option};
use crate::services::llm_service::{InferenceClient, LlmService};
use crate::utils::text::normalize;

const SYSTEM_PROMPT: &str = "You fill out job application forms on behalf of an applicant. \
Answer truthfully from the applicant profile. Reply with a single JSON object and nothing else.";

const INSTRUCTIONS: &str = "Answer every entry in formInventory. \
Return {\"fields\":[{\"label\":...,\"value\":...}],\"radioGroups\":[...],\"dropdowns\":[...]}. \
Use the exact label text. For radioGroups and dropdowns the value must be one of the listed options. \
Numeric questions take a bare number.";

/// 重试策略：第 n 次失败后等待 `base_delay * 2^(n-1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.llm_max_attempts.max(1),
            base_delay: Duration::from_secs(config.llm_backoff_base_secs),
        }
    }

    /// 第 `attempt` 次（从 1 开始）失败后的等待时间
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// 答案解析器
pub struct AnswerResolver {
    client: Option<Arc<dyn InferenceClient>>,
    policy: RetryPolicy,
}

impl AnswerResolver {
    pub fn new(client: Option<Arc<dyn InferenceClient>>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// 根据配置创建；未配置 API Key 时只使用规则兜底
    pub fn from_config(config: &Config) -> Self {
        let client: Option<Arc<dyn InferenceClient>> = if config.llm_enabled() {
            Some(Arc::new(LlmService::new(config)))
        } else {
            None
        };
        Self::new(client, RetryPolicy::from_config(config))
    }

    /// 为清单中的每一项生成答案
    pub async fn resolve(
        &self,
        inventory: &FormInventory,
        profile: &ApplicantProfile,
    ) -> ResolvedAnswers {
        if inventory.is_empty() {
            return ResolvedAnswers {
                answers: FormAnswers::default(),
                source: AnswerSource::Fallback,
            };
        }

        match self.infer(inventory, profile).await {
            Ok(answers) => {
                info!("🤖 推理服务给出 {} 个答案", answers.len());
                ResolvedAnswers {
                    answers,
                    source: AnswerSource::Inference,
                }
            }
            Err(e) => {
                warn!("⚠️ {}，改用规则兜底", e);
                ResolvedAnswers {
                    answers: fallback_answers(inventory, profile),
                    source: AnswerSource::Fallback,
                }
            }
        }
    }

    /// 第一级：调用推理服务（带退避重试）
    async fn infer(
        &self,
        inventory: &FormInventory,
        profile: &ApplicantProfile,
    ) -> Result<FormAnswers, LlmError> {
        let client = self.client.as_ref().ok_or(LlmError::Disabled)?;
        let prompt = build_prompt(inventory, profile);

        let mut attempt = 0;
        let reply = loop {
            attempt += 1;
            match client.complete(SYSTEM_PROMPT, &prompt).await {
                Ok(reply) => break reply,
                Err(e) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    if e.is_rate_limited() {
                        warn!("⏳ 推理服务限流（第 {} 次），{:?} 后重试", attempt, delay);
                    } else {
                        warn!("❌ 推理调用失败（第 {} 次）: {}，{:?} 后重试", attempt, e, delay);
                    }
                    sleep(delay).await;
                }
                Err(e) => {
                    return Err(LlmError::AttemptsExhausted {
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
            }
        };

        debug!("推理服务回复: {}", crate::utils::truncate_text(&reply, 200));

        let raw = extract_json_object(&reply)
            .map(|value| parse_answers(&value))
            .ok_or_else(|| LlmError::UnparseableResponse {
                response: crate::utils::truncate_text(&reply, 200),
            })?;

        let answers = validate_answers(raw, inventory);
        if answers.is_empty() {
            return Err(LlmError::UnparseableResponse {
                response: crate::utils::truncate_text(&reply, 200),
            });
        }
        Ok(answers)
    }
}

/// 构建发给推理服务的提示词：`{instructions, profile, formInventory}`
pub fn build_prompt(inventory: &FormInventory, profile: &ApplicantProfile) -> String {
    json!({
        "instructions": INSTRUCTIONS,
        "profile": profile,
        "formInventory": inventory,
    })
    .to_string()
}

/// 找到文本中第一个格式正确的 JSON 对象
///
/// 回复中可能夹杂说明文字或 markdown 代码块，按括号配对扫描，
/// 字符串内的括号和转义字符不参与计数
pub fn extract_json_object(text: &str) -> Option<JsonValue> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        let mut close = None;

        for (i, &b) in bytes.iter().enumerate().skip(open) {
            if in_string {
                match b {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        close = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }

        if let Some(close) = close {
            if let Ok(value) = serde_json::from_str::<JsonValue>(&text[open..=close]) {
                if value.is_object() {
                    return Some(value);
                }
            }
        }
        start = open + 1;
    }
    None
}

fn value_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(if *b { "Yes" } else { "No" }.to_string()),
        _ => None,
    }
}

/// 解析单个答案列表，同时接受 `[{label, value}]` 和 `{label: value}` 两种形状
fn parse_answer_list(value: Option<&JsonValue>) -> Vec<Answer> {
    match value {
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let label = item.get("label").and_then(|l| l.as_str())?;
                let value = item.get("value").and_then(value_to_string)?;
                Some(Answer::new(label, value))
            })
            .collect(),
        Some(JsonValue::Object(map)) => map
            .iter()
            .filter_map(|(label, v)| value_to_string(v).map(|v| Answer::new(label.as_str(), v)))
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_answers(value: &JsonValue) -> FormAnswers {
    FormAnswers {
        fields: parse_answer_list(value.get("fields")),
        radio_groups: parse_answer_list(value.get("radioGroups").or_else(|| value.get("radio_groups"))),
        dropdowns: parse_answer_list(value.get("dropdowns")),
    }
}

/// 把推理结果和已知清单重新对齐
///
/// - 未知标签丢弃
/// - 单选 / 下拉答案吸附到可选项，无法吸附的丢弃
/// - 同一标签只保留第一个答案
pub fn validate_answers(raw: FormAnswers, inventory: &FormInventory) -> FormAnswers {
    let mut answers = FormAnswers::default();

    for answer in raw.fields {
        let Some(field) = inventory
            .fields
            .iter()
            .find(|f| normalize(&f.label) == normalize(&answer.label))
        else {
            continue;
        };
        if answer.value.is_empty() || answers.fields.iter().any(|a| a.label == field.label) {
            continue;
        }
        answers.fields.push(Answer::new(&field.label, answer.value));
    }

    for answer in raw.radio_groups {
        let Some(group) = inventory
            .radio_groups
            .iter()
            .find(|g| normalize(&g.label) == normalize(&answer.label))
        else {
            continue;
        };
        if answers.radio_groups.iter().any(|a| a.label == group.label) {
            continue;
        }
        if let Some(option) = snap_to_option(&answer.value, &group.options) {
            answers.radio_groups.push(Answer::new(&group.label, option));
        }
    }

    for answer in raw.dropdowns {
        let Some(dropdown) = inventory
            .dropdowns
            .iter()
            .find(|d| normalize(&d.label) == normalize(&answer.label))
        else {
            continue;
        };
        if answers.dropdowns.iter().any(|a| a.label == dropdown.label) {
            continue;
        }
        if let Some(option) = snap_to_option(&answer.value, &dropdown.options) {
            answers.dropdowns.push(Answer::new(&dropdown.label, option));
        }
    }

    answers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dropdown, FieldKind, FormField, Language, RadioGroup};
    use crate::services::llm_service::InferenceError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// 按顺序返回预设结果的推理客户端
    struct ScriptedClient {
        replies: Mutex<Vec<Result<String, InferenceError>>>,
        calls: AtomicU32,
    }

    impl ScriptedClient {
        fn new(mut replies: Vec<Result<String, InferenceError>>) -> Arc<Self> {
            replies.reverse();
            Arc::new(Self {
                replies: Mutex::new(replies),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl InferenceClient for ScriptedClient {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(InferenceError::EmptyContent))
        }
    }

    fn instant() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        }
    }

    fn inventory() -> FormInventory {
        FormInventory {
            fields: vec![FormField {
                label: "Years of Rust experience".into(),
                kind: FieldKind::Number,
            }],
            radio_groups: vec![RadioGroup {
                label: "Do you require sponsorship?".into(),
                options: vec!["Yes".into(), "No".into()],
            }],
            dropdowns: vec![Dropdown {
                label: "English proficiency".into(),
                options: vec!["None".into(), "Professional".into(), "Native or bilingual".into()],
            }],
        }
    }

    fn profile() -> ApplicantProfile {
        ApplicantProfile {
            languages: vec![Language {
                name: "English".into(),
                level: "professional".into(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_retry_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(2), Duration::from_secs(10));
        assert_eq!(policy.delay_for(3), Duration::from_secs(20));
    }

    #[test]
    fn test_extract_first_well_formed_object() {
        let reply = r#"Sure! {not json} Here you go:
```json
{"fields":[{"label":"a","value":"x } y"}],"dropdowns":[]}
```
and also {"other": 1}"#;
        let value = extract_json_object(reply).unwrap();
        assert_eq!(value["fields"][0]["value"], "x } y");
        assert!(extract_json_object("no braces here").is_none());
        assert!(extract_json_object("{\"unterminated\": ").is_none());
    }

    #[test]
    fn test_validate_snaps_and_drops() {
        let raw = FormAnswers {
            fields: vec![
                Answer::new("years of rust experience", "4"),
                Answer::new("Unknown question", "x"),
            ],
            radio_groups: vec![Answer::new("Do you require sponsorship?", "no")],
            dropdowns: vec![Answer::new("English proficiency", "Fluent like a poet")],
        };
        let answers = validate_answers(raw, &inventory());
        assert_eq!(answers.fields, vec![Answer::new("Years of Rust experience", "4")]);
        assert_eq!(answers.radio_groups, vec![Answer::new("Do you require sponsorship?", "No")]);
        assert!(answers.dropdowns.is_empty());
    }

    #[tokio::test]
    async fn test_inference_answers_used_when_valid() {
        let client = ScriptedClient::new(vec![Ok(r#"{"fields":[{"label":"Years of Rust experience","value":3}],
            "radioGroups":[{"label":"Do you require sponsorship?","value":"No"}],
            "dropdowns":{"English proficiency":"professional"}}"#
            .to_string())]);
        let resolver = AnswerResolver::new(Some(client.clone()), instant());
        let resolved = resolver.resolve(&inventory(), &profile()).await;
        assert_eq!(resolved.source, AnswerSource::Inference);
        assert_eq!(resolved.answers.fields[0].value, "3");
        assert_eq!(resolved.answers.dropdowns[0].value, "Professional");
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let client = ScriptedClient::new(vec![
            Err(InferenceError::RateLimited("429".into())),
            Err(InferenceError::Request("timeout".into())),
            Ok(r#"{"radioGroups":[{"label":"Do you require sponsorship?","value":"No"}]}"#.into()),
        ]);
        let resolver = AnswerResolver::new(Some(client.clone()), instant());
        let resolved = resolver.resolve(&inventory(), &profile()).await;
        assert_eq!(resolved.source, AnswerSource::Inference);
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_falls_back_after_attempts_exhausted() {
        let client = ScriptedClient::new(vec![
            Err(InferenceError::RateLimited("429".into())),
            Err(InferenceError::RateLimited("429".into())),
            Err(InferenceError::RateLimited("429".into())),
            Ok("{}".into()),
        ]);
        let resolver = AnswerResolver::new(Some(client.clone()), instant());
        let resolved = resolver.resolve(&inventory(), &profile()).await;
        assert_eq!(resolved.source, AnswerSource::Fallback);
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
        assert_eq!(resolved.answers.dropdowns[0].value, "Professional");
        assert_eq!(resolved.answers.radio_groups[0].value, "No");
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_back_without_retry() {
        let client = ScriptedClient::new(vec![Ok("I cannot help with that.".into())]);
        let resolver = AnswerResolver::new(Some(client.clone()), instant());
        let resolved = resolver.resolve(&inventory(), &profile()).await;
        assert_eq!(resolved.source, AnswerSource::Fallback);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolved.answers.len(), 3);
    }

    #[tokio::test]
    async fn test_disabled_client_uses_fallback() {
        let resolver = AnswerResolver::new(None, instant());
        let resolved = resolver.resolve(&inventory(), &profile()).await;
        assert_eq!(resolved.source, AnswerSource::Fallback);
        assert_eq!(resolved.answers.len(), 3);
    }

    #[test]
    fn test_prompt_carries_inventory_and_profile() {
        let prompt: JsonValue = serde_json::from_str(&build_prompt(&inventory(), &profile())).unwrap();
        assert_eq!(prompt["formInventory"]["dropdowns"][0]["label"], "English proficiency");
        assert_eq!(prompt["profile"]["languages"][0]["name"], "English");
        assert!(prompt["instructions"].as_str().unwrap().contains("radioGroups"));
    }
}
