use std::fmt;

use serde::{Deserialize, Serialize};

use super::form::FormInventory;

/// 申请向导当前所处的阶段
///
/// 每次迭代重新计算，不做持久化。新的页面布局可能需要新增状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum PageState {
    ContactInfo,
    Resume,
    TopChoice,
    AdditionalQuestions,
    Review,
    Success,
    Unknown,
}

impl PageState {
    pub fn as_str(self) -> &'static str {
        match self {
            PageState::ContactInfo => "CONTACT_INFO",
            PageState::Resume => "RESUME",
            PageState::TopChoice => "TOP_CHOICE",
            PageState::AdditionalQuestions => "ADDITIONAL_QUESTIONS",
            PageState::Review => "REVIEW",
            PageState::Success => "SUCCESS",
            PageState::Unknown => "UNKNOWN",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PageState::Success)
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 表单容器的快照，分类器的唯一输入
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSnapshot {
    /// 容器内的可见文本
    pub text: String,
    /// 是否存在已预填的邮箱输入框
    pub has_prefilled_email: bool,
    /// 表单检查器给出的待回答问题
    pub inventory: FormInventory,
}
