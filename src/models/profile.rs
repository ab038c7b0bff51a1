//! 申请人资料
//!
//! 由调用方提供的只读数据，一次申请流程内不会被修改

use phf::phf_map;
use serde::{Deserialize, Serialize};

/// 语言熟练程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProficiencyLevel {
    None,
    Elementary,
    Limited,
    Professional,
    Native,
}

static LEVEL_KEYWORDS: phf::Map<&'static str, ProficiencyLevel> = phf_map! {
    "native" => ProficiencyLevel::Native,
    "bilingual" => ProficiencyLevel::Native,
    "fluent" => ProficiencyLevel::Native,
    "professional" => ProficiencyLevel::Professional,
    "advanced" => ProficiencyLevel::Professional,
    "conversational" => ProficiencyLevel::Limited,
    "limited" => ProficiencyLevel::Limited,
    "intermediate" => ProficiencyLevel::Limited,
    "elementary" => ProficiencyLevel::Elementary,
    "basic" => ProficiencyLevel::Elementary,
    "beginner" => ProficiencyLevel::Elementary,
    "none" => ProficiencyLevel::None,
};

impl ProficiencyLevel {
    /// 从自由文本中识别熟练程度（按单词顺序，第一个命中的关键词生效）
    pub fn parse(text: &str) -> Option<Self> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .find_map(|word| LEVEL_KEYWORDS.get(word).copied())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Language {
    pub name: String,
    pub level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    pub title: String,
    pub company: String,
    /// 该段经历的年数
    pub years: Option<f32>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    pub school: String,
    pub degree: String,
    pub field: Option<String>,
}

/// 申请人资料
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicantProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    /// 所在城市 / 地区
    pub location: String,
    pub linkedin_url: Option<String>,
    pub website_url: Option<String>,
    pub github_url: Option<String>,
    pub skills: Vec<String>,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub languages: Vec<Language>,
    pub work_authorized: bool,
    pub needs_sponsorship: bool,
    pub willing_to_relocate: bool,
}

impl ApplicantProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// 工作经验总年数（向下取整）
    pub fn total_years_experience(&self) -> u32 {
        let total: f32 = self.experience.iter().filter_map(|e| e.years).sum();
        total.max(0.0).floor() as u32
    }

    /// 查找资料中声明的语言熟练程度
    pub fn language_level(&self, language: &str) -> Option<ProficiencyLevel> {
        self.languages
            .iter()
            .find(|l| l.name.trim().eq_ignore_ascii_case(language.trim()))
            .and_then(|l| ProficiencyLevel::parse(&l.level))
    }

    /// 资料中的所有外部链接（按优先级）
    pub fn links(&self) -> impl Iterator<Item = &str> {
        [&self.linkedin_url, &self.website_url, &self.github_url]
            .into_iter()
            .filter_map(|l| l.as_deref())
            .filter(|l| !l.trim().is_empty())
    }
}
