//! 页面状态分类 - 业务能力层
//!
//! 纯函数：输入容器快照，输出唯一的 [`PageState`]，不访问浏览器。
//! 判定顺序固定：
//! 1. SUCCESS
//! 2. REVIEW
//! 3. CONTACT_INFO（联系方式标题 + 已预填邮箱）
//! 4. RESUME（简历标题且没有待回答问题）
//! 5. TOP_CHOICE
//! 6. ADDITIONAL_QUESTIONS（表单检查器报告了待回答问题）
//! 7. UNKNOWN

use crate::models::{ContainerSnapshot, PageState};
use crate::utils::text::normalize;

/// 各状态的标记短语（小写，子串匹配）
#[derive(Debug, Clone)]
pub struct ClassifierMarkers {
    pub success: Vec<String>,
    pub review: Vec<String>,
    pub contact_info: Vec<String>,
    pub resume: Vec<String>,
    pub top_choice: Vec<String>,
}

fn phrases(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassifierMarkers {
    fn default() -> Self {
        Self {
            success: phrases(&[
                "application was sent",
                "application submitted",
                "your application was submitted",
                "you applied",
                "application sent",
            ]),
            review: phrases(&[
                "review your application",
                "submit application",
            ]),
            contact_info: phrases(&["contact info", "contact information"]),
            resume: phrases(&[
                "upload resume",
                "select a resume",
                "choose a resume",
                "be sure to include an updated resume",
            ]),
            top_choice: phrases(&["top choice", "mark this job as a top choice"]),
        }
    }
}

impl ClassifierMarkers {
    /// 追加新的成功短语（新的页面布局）
    pub fn with_success_phrase(mut self, phrase: &str) -> Self {
        self.success.push(phrase.to_lowercase());
        self
    }
}

fn contains_any(text: &str, markers: &[String]) -> bool {
    markers.iter().any(|m| !m.is_empty() && text.contains(m.as_str()))
}

/// 简历页：标题以 "Resume" 开头，或出现简历选择 / 上传的短语
fn is_resume_step(text: &str, markers: &ClassifierMarkers) -> bool {
    text.starts_with("resume") || contains_any(text, &markers.resume)
}

/// 页面分类器
#[derive(Debug, Clone, Default)]
pub struct PageClassifier {
    markers: ClassifierMarkers,
}

impl PageClassifier {
    pub fn new(markers: ClassifierMarkers) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &ClassifierMarkers {
        &self.markers
    }

    /// 分类当前页面
    pub fn classify(&self, snapshot: &ContainerSnapshot) -> PageState {
        let text = normalize(&snapshot.text);
        let m = &self.markers;
        let has_questions = !snapshot.inventory.is_empty();

        if contains_any(&text, &m.success) {
            PageState::Success
        } else if contains_any(&text, &m.review) {
            PageState::Review
        } else if contains_any(&text, &m.contact_info) && snapshot.has_prefilled_email {
            PageState::ContactInfo
        } else if is_resume_step(&text, m) && !has_questions {
            PageState::Resume
        } else if contains_any(&text, &m.top_choice) {
            PageState::TopChoice
        } else if has_questions {
            PageState::AdditionalQuestions
        } else {
            PageState::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dropdown, FormInventory};

    fn snapshot(text: &str, email: bool, questions: usize) -> ContainerSnapshot {
        let dropdowns = (0..questions)
            .map(|i| Dropdown {
                label: format!("Q{}", i),
                options: vec!["Yes".into(), "No".into()],
            })
            .collect();
        ContainerSnapshot {
            text: text.to_string(),
            has_prefilled_email: email,
            inventory: FormInventory {
                dropdowns,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_unknown_when_nothing_matches() {
        let classifier = PageClassifier::default();
        assert_eq!(classifier.classify(&snapshot("", false, 0)), PageState::Unknown);
        assert_eq!(
            classifier.classify(&snapshot("<<< ??? >>> \u{0} garbage", false, 0)),
            PageState::Unknown
        );
    }

    #[test]
    fn test_priority_order() {
        let classifier = PageClassifier::default();
        // 成功优先于一切
        assert_eq!(
            classifier.classify(&snapshot("Review your application. Your application was sent", true, 2)),
            PageState::Success
        );
        assert_eq!(
            classifier.classify(&snapshot("Review your application", true, 2)),
            PageState::Review
        );
        assert_eq!(
            classifier.classify(&snapshot("Contact info  Email address", true, 0)),
            PageState::ContactInfo
        );
        // 没有预填邮箱时不算联系方式页
        assert_eq!(
            classifier.classify(&snapshot("Contact info", false, 1)),
            PageState::AdditionalQuestions
        );
        assert_eq!(
            classifier.classify(&snapshot("Resume  Upload resume", false, 0)),
            PageState::Resume
        );
        // 有待回答问题时简历页让位
        assert_eq!(
            classifier.classify(&snapshot("Resume", false, 1)),
            PageState::AdditionalQuestions
        );
        assert_eq!(
            classifier.classify(&snapshot("Mark this job as a top choice", false, 0)),
            PageState::TopChoice
        );
        assert_eq!(
            classifier.classify(&snapshot("Additional Questions", false, 3)),
            PageState::AdditionalQuestions
        );
    }

    #[test]
    fn test_resume_mentioned_in_body_is_not_resume_step() {
        let classifier = PageClassifier::default();
        assert_eq!(
            classifier.classify(&snapshot("Work experience  We will review your resume shortly", false, 0)),
            PageState::Unknown
        );
        assert_eq!(
            classifier.classify(&snapshot("Documents  Choose a resume to send", false, 0)),
            PageState::Resume
        );
    }

    #[test]
    fn test_markers_are_extendable() {
        let classifier =
            PageClassifier::new(ClassifierMarkers::default().with_success_phrase("Bewerbung gesendet"));
        assert_eq!(
            classifier.classify(&snapshot("Ihre Bewerbung gesendet", false, 0)),
            PageState::Success
        );
    }
}
