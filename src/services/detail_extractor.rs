//! 职位详情解析服务 - 业务能力层
//!
//! 把单个职位页面的 HTML 解析为 [`JobPosting`]。
//! 优先使用 DOM 选择器（按顺序，第一个非空结果生效），
//! 页面内嵌的 JSON-LD 结构化数据用于补全仍然缺失的字段。

use scraper::{ElementRef, Html, Selector};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::models::{ApplyType, JobPosting, ListingCandidate, WorkplaceType};
use crate::services::listing_extractor::external_id_from_url;
use crate::utils::text::{collapse_whitespace, truncate_chars};

const TITLE_SELECTORS: &[&str] = &[
    ".job-details-jobs-unified-top-card__job-title h1",
    "h1.top-card-layout__title",
    ".jobs-unified-top-card__job-title",
    "h1",
];

const COMPANY_SELECTORS: &[&str] = &[
    ".job-details-jobs-unified-top-card__company-name a",
    ".job-details-jobs-unified-top-card__company-name",
    "a.topcard__org-name-link",
    ".topcard__org-name-link",
    ".jobs-unified-top-card__company-name",
];

const LOCATION_SELECTORS: &[&str] = &[
    ".job-details-jobs-unified-top-card__primary-description-container .tvm__text",
    ".job-details-jobs-unified-top-card__bullet",
    ".topcard__flavor--bullet",
    ".jobs-unified-top-card__bullet",
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    "#job-details",
    ".jobs-description__content",
    ".show-more-less-html__markup",
    ".description__text",
    "article",
];

const POSTED_SELECTORS: &[&str] = &[
    ".posted-time-ago__text",
    ".jobs-unified-top-card__posted-date",
    ".job-details-jobs-unified-top-card__primary-description-container .tvm__text--positive",
];

const TAG_SELECTORS: &[&str] = &[
    ".job-details-jobs-unified-top-card__job-insight span",
    ".job-details-preferences-and-skills__pill",
    ".description__job-criteria-text",
    ".job-criteria__text",
];

const WORKPLACE_SELECTORS: &[&str] = &[
    ".job-details-jobs-unified-top-card__workplace-type",
    ".jobs-unified-top-card__workplace-type",
    ".job-details-preferences-and-skills",
    ".topcard__flavor--metadata",
];

/// 最多保留的标签数
const MAX_TAGS: usize = 20;

/// JSON-LD 中提取出的字段
#[derive(Debug, Default)]
struct StructuredPosting {
    title: Option<String>,
    company: Option<String>,
    location: Option<String>,
    description: Option<String>,
    posted_at: Option<String>,
    url: Option<String>,
    remote: bool,
    tags: Vec<String>,
}

/// 职位详情解析器
pub struct DetailExtractor {
    max_description_chars: usize,
}

impl DetailExtractor {
    pub fn new(max_description_chars: usize) -> Self {
        Self {
            max_description_chars,
        }
    }

    /// 解析职位详情
    ///
    /// `candidate` 提供 id、URL 以及搜索页上的标题（作为最后兜底）
    pub fn extract(&self, html: &str, candidate: &ListingCandidate) -> JobPosting {
        let document = Html::parse_document(html);
        let structured = structured_posting(&document);

        let title = first_text(&document, TITLE_SELECTORS)
            .or_else(|| structured.title.clone())
            .unwrap_or_else(|| collapse_whitespace(&candidate.title));
        let company = first_text(&document, COMPANY_SELECTORS)
            .or_else(|| structured.company.clone())
            .unwrap_or_default();
        let location = first_text(&document, LOCATION_SELECTORS)
            .or_else(|| structured.location.clone())
            .unwrap_or_default();
        let description = first_text(&document, DESCRIPTION_SELECTORS)
            .or_else(|| structured.description.clone())
            .unwrap_or_default();
        let posted_at = first_attr(&document, "time", "datetime")
            .or_else(|| first_text(&document, POSTED_SELECTORS))
            .or_else(|| structured.posted_at.clone());

        let mut tags = all_texts(&document, TAG_SELECTORS);
        for tag in &structured.tags {
            if !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                tags.push(tag.clone());
            }
        }
        tags.truncate(MAX_TAGS);

        let apply_type = if has_easy_apply(&document) {
            ApplyType::InternalForm
        } else {
            ApplyType::ExternalRedirect
        };
        let apply_url = match apply_type {
            ApplyType::InternalForm => candidate.url.clone(),
            ApplyType::ExternalRedirect => structured
                .url
                .clone()
                .unwrap_or_else(|| candidate.url.clone()),
        };

        let workplace_hint = format!(
            "{} {}",
            all_texts(&document, WORKPLACE_SELECTORS).join(" "),
            location
        );
        let workplace_type = match WorkplaceType::detect(&workplace_hint) {
            WorkplaceType::Unknown if structured.remote => WorkplaceType::Remote,
            detected => detected,
        };

        let external_id = if candidate.id.trim().is_empty() {
            external_id_from_url(&candidate.url).unwrap_or_default()
        } else {
            candidate.id.trim().to_string()
        };

        debug!(
            "解析职位 {}: {} @ {} ({:?})",
            external_id, title, company, apply_type
        );

        JobPosting {
            external_id,
            title,
            company,
            location,
            description: truncate_chars(&description, self.max_description_chars),
            tags,
            apply_url,
            apply_type,
            posted_at,
            workplace_type,
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// 依次尝试选择器，返回第一个非空文本
fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        let selector = Selector::parse(sel).ok()?;
        document
            .select(&selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// 收集所有选择器命中的文本（去重，保持顺序）
fn all_texts(document: &Html, selectors: &[&str]) -> Vec<String> {
    let mut texts: Vec<String> = Vec::new();
    for sel in selectors {
        let Ok(selector) = Selector::parse(sel) else {
            continue;
        };
        for text in document.select(&selector).map(element_text) {
            if !text.is_empty() && !texts.iter().any(|t| t.eq_ignore_ascii_case(&text)) {
                texts.push(text);
            }
        }
    }
    texts
}

/// 页面上是否存在 Easy Apply 按钮
fn has_easy_apply(document: &Html) -> bool {
    let Ok(selector) = Selector::parse("button, a") else {
        return false;
    };
    document.select(&selector).any(|el| {
        let label = el.value().attr("aria-label").unwrap_or_default();
        let text = element_text(el);
        format!("{} {}", label, text)
            .to_lowercase()
            .contains("easy apply")
    })
}

/// 从 `<script type="application/ld+json">` 中查找 JobPosting 对象
fn structured_posting(document: &Html) -> StructuredPosting {
    let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return StructuredPosting::default();
    };

    document
        .select(&selector)
        .filter_map(|script| serde_json::from_str::<JsonValue>(&script.inner_html()).ok())
        .find_map(|value| find_job_posting(&value).map(parse_structured))
        .unwrap_or_default()
}

fn find_job_posting(value: &JsonValue) -> Option<&JsonValue> {
    match value {
        JsonValue::Array(items) => items.iter().find_map(find_job_posting),
        JsonValue::Object(map) => {
            if map.get("@type").and_then(|t| t.as_str()) == Some("JobPosting") {
                Some(value)
            } else {
                map.get("@graph").and_then(find_job_posting)
            }
        }
        _ => None,
    }
}

fn parse_structured(value: &JsonValue) -> StructuredPosting {
    let text = |v: Option<&JsonValue>| {
        v.and_then(|v| v.as_str())
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty())
    };

    let location = {
        let first = match value.get("jobLocation") {
            Some(JsonValue::Array(items)) => items.first(),
            other => other,
        };
        first.and_then(|loc| loc.get("address")).and_then(|addr| {
            let parts: Vec<String> = ["addressLocality", "addressRegion", "addressCountry"]
                .iter()
                .filter_map(|k| text(addr.get(*k)))
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        })
    };

    // 描述字段通常是 HTML 片段
    let description = text(value.get("description")).map(|raw| {
        let fragment = Html::parse_fragment(&raw);
        collapse_whitespace(&fragment.root_element().text().collect::<Vec<_>>().join(" "))
    });

    let tags = match value.get("skills") {
        Some(JsonValue::Array(items)) => items.iter().filter_map(|v| text(Some(v))).collect(),
        Some(JsonValue::String(s)) => s
            .split(',')
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    };

    StructuredPosting {
        title: text(value.get("title")),
        company: text(value.get("hiringOrganization").and_then(|o| o.get("name"))),
        location,
        description,
        posted_at: text(value.get("datePosted")),
        url: text(value.get("url")),
        remote: value.get("jobLocationType").and_then(|v| v.as_str()) == Some("TELECOMMUTE"),
        tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str) -> ListingCandidate {
        ListingCandidate {
            id: id.to_string(),
            url: format!("https://www.linkedin.com/jobs/view/{}/", id),
            title: "Listing Title".to_string(),
        }
    }

    const DOM_PAGE: &str = r#"
        <html><body>
          <div class="job-details-jobs-unified-top-card__job-title"><h1> Senior  Rust Engineer </h1></div>
          <div class="job-details-jobs-unified-top-card__company-name"><a href="/company/acme">Acme Robotics</a></div>
          <div class="job-details-jobs-unified-top-card__primary-description-container">
            <span class="tvm__text">Berlin, Germany</span>
          </div>
          <span class="job-details-jobs-unified-top-card__workplace-type">Hybrid</span>
          <li class="job-details-jobs-unified-top-card__job-insight"><span>Full-time</span></li>
          <li class="job-details-jobs-unified-top-card__job-insight"><span>Mid-Senior level</span></li>
          <time datetime="2024-05-01">2 weeks ago</time>
          <button class="jobs-apply-button" aria-label="Easy Apply to Senior Rust Engineer at Acme">
            <span>Easy Apply</span>
          </button>
          <div id="job-details"><p>Build   tokio services.</p><ul><li>Rust</li></ul></div>
        </body></html>
    "#;

    #[test]
    fn test_dom_extraction_recovers_known_values() {
        let posting = DetailExtractor::new(5000).extract(DOM_PAGE, &candidate("3812345678"));
        assert_eq!(posting.external_id, "3812345678");
        assert_eq!(posting.title, "Senior Rust Engineer");
        assert_eq!(posting.company, "Acme Robotics");
        assert_eq!(posting.location, "Berlin, Germany");
        assert_eq!(posting.description, "Build tokio services. Rust");
        assert_eq!(posting.apply_type, ApplyType::InternalForm);
        assert_eq!(
            posting.apply_url,
            "https://www.linkedin.com/jobs/view/3812345678/"
        );
        assert_eq!(posting.workplace_type, WorkplaceType::Hybrid);
        assert_eq!(posting.posted_at.as_deref(), Some("2024-05-01"));
        assert_eq!(posting.tags, vec!["Full-time", "Mid-Senior level"]);
    }

    #[test]
    fn test_json_ld_fills_missing_fields() {
        let html = r#"
            <html><head>
            <script type="application/ld+json">
            {"@context":"https://schema.org","@type":"JobPosting",
             "title":"Platform Engineer",
             "hiringOrganization":{"@type":"Organization","name":"Globex"},
             "jobLocation":[{"@type":"Place","address":{"addressLocality":"Lisbon","addressCountry":"PT"}}],
             "jobLocationType":"TELECOMMUTE",
             "datePosted":"2024-04-02",
             "url":"https://careers.globex.example/jobs/17",
             "skills":"Kubernetes, Rust",
             "description":"<p>Own the <b>platform</b>.</p>"}
            </script></head>
            <body><button>Apply</button></body></html>
        "#;
        let posting = DetailExtractor::new(5000).extract(html, &candidate("17"));
        assert_eq!(posting.title, "Platform Engineer");
        assert_eq!(posting.company, "Globex");
        assert_eq!(posting.location, "Lisbon, PT");
        assert_eq!(posting.description, "Own the platform .");
        assert_eq!(posting.apply_type, ApplyType::ExternalRedirect);
        assert_eq!(posting.apply_url, "https://careers.globex.example/jobs/17");
        assert_eq!(posting.workplace_type, WorkplaceType::Remote);
        assert_eq!(posting.tags, vec!["Kubernetes", "Rust"]);
        assert_eq!(posting.posted_at.as_deref(), Some("2024-04-02"));
    }

    #[test]
    fn test_listing_title_is_last_resort() {
        let posting = DetailExtractor::new(100).extract("<html><body></body></html>", &candidate("5"));
        assert_eq!(posting.title, "Listing Title");
        assert_eq!(posting.company, "");
        assert_eq!(posting.workplace_type, WorkplaceType::Unknown);
    }

    #[test]
    fn test_id_recovered_from_url_when_missing() {
        let mut c = candidate("");
        c.url = "https://www.linkedin.com/jobs/view/backend-dev-at-x-246810/".to_string();
        let posting = DetailExtractor::new(100).extract("<html></html>", &c);
        assert_eq!(posting.external_id, "246810");
    }

    #[test]
    fn test_description_truncation_is_exact() {
        let html = |len: usize| {
            format!(
                r#"<html><body><div id="job-details">{}</div></body></html>"#,
                "x".repeat(len)
            )
        };
        let extractor = DetailExtractor::new(10);
        assert_eq!(extractor.extract(&html(9), &candidate("1")).description.len(), 9);
        assert_eq!(extractor.extract(&html(10), &candidate("1")).description.len(), 10);
        assert_eq!(extractor.extract(&html(11), &candidate("1")).description.len(), 10);
        assert_eq!(extractor.extract(&html(500), &candidate("1")).description, "x".repeat(10));
    }
}
