use serde::{Deserialize, Serialize};

/// 申请方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyType {
    /// 站内表单（Easy Apply）
    InternalForm,
    /// 跳转到外部网站
    ExternalRedirect,
}

/// 办公方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkplaceType {
    Remote,
    OnSite,
    Hybrid,
    #[default]
    Unknown,
}

impl WorkplaceType {
    /// 从页面文本中识别办公方式
    pub fn detect(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("hybrid") {
            WorkplaceType::Hybrid
        } else if lower.contains("on-site") || lower.contains("onsite") || lower.contains("on site") {
            WorkplaceType::OnSite
        } else if lower.contains("remote") {
            WorkplaceType::Remote
        } else {
            WorkplaceType::Unknown
        }
    }
}

/// 职位详情
///
/// 创建后不可变；同一个 external_id 重复抓取时直接跳过，不做更新
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub external_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub tags: Vec<String>,
    pub apply_url: String,
    pub apply_type: ApplyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<String>,
    pub workplace_type: WorkplaceType,
}

impl JobPosting {
    /// 去重键：优先使用 external_id，否则退化为 title + company + apply_url
    pub fn dedup_key(&self) -> String {
        if !self.external_id.trim().is_empty() {
            format!("id:{}", self.external_id.trim())
        } else {
            format!(
                "tca:{}|{}|{}",
                self.title.trim().to_lowercase(),
                self.company.trim().to_lowercase(),
                self.apply_url.trim()
            )
        }
    }
}

/// 搜索结果页中的职位候选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingCandidate {
    pub id: String,
    pub url: String,
    pub title: String,
}
