//! 规则兜底答案
//!
//! 确定性、全覆盖：任何问题都会得到一个答案；有选项时答案一定来自选项。
//! 规则按顺序匹配：
//! 1. 语言熟练程度
//! 2. 签证担保
//! 3. 工作许可
//! 4. 通勤 / 搬迁
//! 5. 工作年限
//! 6. 通用 Yes / No
//! 7. 资料字段（电话、邮箱、姓名、地点、链接）
//! 8. 第一个选项 / 留空

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{
    Answer, ApplicantProfile, FieldKind, FormAnswers, FormInventory, ProficiencyLevel,
};
use crate::utils::text::normalize;

const KNOWN_LANGUAGES: &[&str] = &[
    "english", "german", "french", "spanish", "italian", "portuguese", "dutch", "polish",
    "russian", "ukrainian", "chinese", "mandarin", "cantonese", "japanese", "korean", "arabic",
    "hindi", "turkish", "swedish", "norwegian", "danish", "finnish", "czech", "greek", "hebrew",
];

/// 与具体语言同时出现时才视为语言问题
const LANGUAGE_HINTS: &[&str] = &["proficien", "fluent", "fluency", "speak", "level", "language"];

/// 未提到具体语言时也能确定是语言问题的短语
const LANGUAGE_PHRASES: &[&str] = &[
    "language proficiency",
    "languages do you speak",
    "languages you speak",
    "spoken language",
];

const AUTHORIZATION_HINTS: &[&str] = &[
    "authorized",
    "authorised",
    "legally",
    "eligible to work",
    "right to work",
    "work permit",
];

const YES_NO_PREFIXES: &[&str] = &[
    "are you", "do you", "will you", "have you", "can you", "would you", "is your", "did you",
];

/// "without sponsorship" 出现在工作许可问题里，不是在问是否需要担保
fn without_sponsor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bwithout\s+(?:\w+\s+){0,3}sponsor").expect("without-sponsor regex")
    })
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("number regex"))
}

/// 在选项中查找与 `wanted` 对应的项
///
/// 依次尝试：完全相同 → 忽略大小写 → 子串包含（双向）
pub fn snap_to_option(wanted: &str, options: &[String]) -> Option<String> {
    let wanted_trimmed = wanted.trim();
    if wanted_trimmed.is_empty() {
        return None;
    }
    if let Some(exact) = options.iter().find(|o| o.trim() == wanted_trimmed) {
        return Some(exact.clone());
    }
    let wanted_norm = normalize(wanted_trimmed);
    if let Some(ci) = options.iter().find(|o| normalize(o) == wanted_norm) {
        return Some(ci.clone());
    }
    options
        .iter()
        .find(|o| {
            let option = normalize(o);
            !option.is_empty() && (option.contains(&wanted_norm) || wanted_norm.contains(&option))
        })
        .cloned()
}

/// 选择 Yes 或 No 选项；找不到时返回第一个选项
fn pick_yes_no(options: &[String], yes: bool) -> String {
    let prefix = if yes { "yes" } else { "no" };
    options
        .iter()
        .find(|o| {
            let n = normalize(o);
            n == prefix || n.starts_with(&format!("{} ", prefix)) || n.starts_with(&format!("{},", prefix))
        })
        .or_else(|| options.first())
        .cloned()
        .unwrap_or_default()
}

fn yes_no_text(yes: bool) -> String {
    let text = if yes { "Yes" } else { "No" };
    text.to_string()
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

fn is_binary(options: &[String]) -> bool {
    options.iter().any(|o| normalize(o).starts_with("yes"))
        && options.iter().any(|o| normalize(o).starts_with("no"))
}

/// 问题中提到的语言
fn mentioned_language(question: &str, profile: &ApplicantProfile) -> Option<String> {
    let words: Vec<&str> = question
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    profile
        .languages
        .iter()
        .map(|l| l.name.trim().to_lowercase())
        .chain(KNOWN_LANGUAGES.iter().map(|l| l.to_string()))
        .find(|lang| !lang.is_empty() && words.contains(&lang.as_str()))
}

fn is_language_question(question: &str, profile: &ApplicantProfile) -> bool {
    contains_any(question, LANGUAGE_PHRASES)
        || (mentioned_language(question, profile).is_some() && contains_any(question, LANGUAGE_HINTS))
}

fn is_sponsorship_question(question: &str) -> bool {
    question.contains("sponsor") && !without_sponsor_re().is_match(question)
}

/// 语言问题的目标熟练程度：母语 → 母语；英语 → 专业；其余 → 最低一档
fn target_level(language: &str, profile: &ApplicantProfile) -> ProficiencyLevel {
    match profile.language_level(language) {
        Some(ProficiencyLevel::Native) => ProficiencyLevel::Native,
        _ if language == "english" => ProficiencyLevel::Professional,
        _ => ProficiencyLevel::None,
    }
}

fn answer_language(question: &str, options: &[String], profile: &ApplicantProfile) -> String {
    let language = mentioned_language(question, profile).unwrap_or_else(|| "english".to_string());
    let target = target_level(&language, profile);

    if options.is_empty() {
        return match target {
            ProficiencyLevel::Native => "Native or bilingual",
            ProficiencyLevel::Professional => "Professional",
            ProficiencyLevel::Limited => "Limited working",
            ProficiencyLevel::Elementary => "Elementary",
            ProficiencyLevel::None => "None",
        }
        .to_string();
    }

    let leveled: Vec<(ProficiencyLevel, &String)> = options
        .iter()
        .filter_map(|o| ProficiencyLevel::parse(o).map(|level| (level, o)))
        .collect();

    if leveled.is_empty() {
        // "Are you fluent in X?" 这类是非题
        return pick_yes_no(options, target >= ProficiencyLevel::Professional);
    }

    if let Some((_, option)) = leveled.iter().find(|(level, _)| *level == target) {
        return (*option).clone();
    }
    // 没有完全匹配的等级时取最低一档
    leveled
        .iter()
        .min_by_key(|(level, _)| *level)
        .map(|(_, o)| (*o).clone())
        .unwrap_or_default()
}

/// 按工作年限从选项中选择：第一个数字不超过年限的选项中取最大的
fn answer_years(options: &[String], years: u32) -> String {
    if options.is_empty() {
        return years.to_string();
    }
    options
        .iter()
        .filter_map(|o| {
            number_re()
                .find(o)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .map(|n| (n, o))
        })
        .filter(|(n, _)| *n <= years)
        .max_by_key(|(n, _)| *n)
        .map(|(_, o)| o.clone())
        .or_else(|| options.first().cloned())
        .unwrap_or_default()
}

/// 按标签匹配资料字段
fn profile_attribute(question: &str, kind: FieldKind, profile: &ApplicantProfile) -> Option<String> {
    let value = if kind == FieldKind::Email || question.contains("email") {
        profile.email.clone()
    } else if kind == FieldKind::Tel || contains_any(question, &["phone", "mobile"]) {
        profile.phone.clone()
    } else if question.contains("first name") || question.contains("given name") {
        profile.first_name.clone()
    } else if question.contains("last name") || question.contains("surname") || question.contains("family name") {
        profile.last_name.clone()
    } else if question.contains("name") {
        profile.full_name()
    } else if question.contains("linkedin") {
        profile.linkedin_url.clone().unwrap_or_default()
    } else if question.contains("github") {
        profile.github_url.clone().unwrap_or_default()
    } else if contains_any(question, &["website", "portfolio", "url", "link"]) || kind == FieldKind::Url {
        profile.links().next().unwrap_or_default().to_string()
    } else if contains_any(question, &["city", "location", "address"]) {
        profile.location.clone()
    } else {
        return None;
    };
    Some(value.trim().to_string())
}

/// 单个问题的兜底答案
///
/// `options` 为空表示自由文本输入框
pub fn answer_question(
    label: &str,
    kind: FieldKind,
    options: &[String],
    profile: &ApplicantProfile,
) -> String {
    let question = normalize(label);

    if is_language_question(&question, profile) {
        return answer_language(&question, options, profile);
    }

    if is_sponsorship_question(&question) {
        return if options.is_empty() {
            yes_no_text(profile.needs_sponsorship)
        } else {
            pick_yes_no(options, profile.needs_sponsorship)
        };
    }

    if contains_any(&question, AUTHORIZATION_HINTS) {
        return if options.is_empty() { yes_no_text(true) } else { pick_yes_no(options, true) };
    }

    if contains_any(&question, &["commut", "relocat", "on-site", "onsite", "hybrid", "in the office", "in-person"]) {
        return if options.is_empty() { yes_no_text(true) } else { pick_yes_no(options, true) };
    }

    if question.contains("years") && (question.contains("experience") || question.contains("how many")) {
        let years = profile.total_years_experience();
        return if options.is_empty() || !is_binary(options) {
            answer_years(options, years)
        } else {
            pick_yes_no(options, years > 0)
        };
    }

    if !options.is_empty() {
        if is_binary(options) {
            return pick_yes_no(options, true);
        }
        return options.first().cloned().unwrap_or_default();
    }

    if let Some(value) = profile_attribute(&question, kind, profile) {
        return value;
    }

    if YES_NO_PREFIXES.iter().any(|p| question.starts_with(p)) {
        return yes_no_text(true);
    }

    String::new()
}

/// 为整份清单生成兜底答案，永不失败
pub fn fallback_answers(inventory: &FormInventory, profile: &ApplicantProfile) -> FormAnswers {
    FormAnswers {
        fields: inventory
            .fields
            .iter()
            .map(|f| Answer::new(&f.label, answer_question(&f.label, f.kind, &[], profile)))
            .collect(),
        radio_groups: inventory
            .radio_groups
            .iter()
            .map(|g| Answer::new(&g.label, answer_question(&g.label, FieldKind::Text, &g.options, profile)))
            .collect(),
        dropdowns: inventory
            .dropdowns
            .iter()
            .map(|d| Answer::new(&d.label, answer_question(&d.label, FieldKind::Text, &d.options, profile)))
            .collect(),
    }
}
