//! 表单清单与答案
//!
//! 每次页面状态变化都会重新枚举，不跨迭代缓存

use serde::{Deserialize, Serialize};

/// 文本类输入框的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    Textarea,
    Email,
    Tel,
    Url,
    #[serde(other)]
    Other,
}

/// 未填写的文本输入框
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub label: String,
    pub kind: FieldKind,
}

/// 未选择的单选组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadioGroup {
    pub label: String,
    pub options: Vec<String>,
}

/// 未选择的下拉框
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dropdown {
    pub label: String,
    pub options: Vec<String>,
}

/// 当前表单中所有待回答的问题
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInventory {
    pub fields: Vec<FormField>,
    pub radio_groups: Vec<RadioGroup>,
    pub dropdowns: Vec<Dropdown>,
}

impl FormInventory {
    pub fn len(&self) -> usize {
        self.fields.len() + self.radio_groups.len() + self.dropdowns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 单个问题的答案
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub label: String,
    pub value: String,
}

impl Answer {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// 一组答案，结构与 [`FormInventory`] 对应
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormAnswers {
    #[serde(default)]
    pub fields: Vec<Answer>,
    #[serde(default)]
    pub radio_groups: Vec<Answer>,
    #[serde(default)]
    pub dropdowns: Vec<Answer>,
}

impl FormAnswers {
    pub fn len(&self) -> usize {
        self.fields.len() + self.radio_groups.len() + self.dropdowns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 答案来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    /// LLM 推理
    Inference,
    /// 规则兜底
    Fallback,
}

/// 解析后的答案及其来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAnswers {
    pub answers: FormAnswers,
    pub source: AnswerSource,
}
