//! 搜索结果解析服务 - 业务能力层
//!
//! 从搜索结果页 HTML 中提取职位候选项并计算分页数，不做任何网络请求

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::models::ListingCandidate;
use crate::utils::text::collapse_whitespace;

/// 在结构化数据中查找标题的窗口大小（字节）
const STRUCTURED_WINDOW: usize = 1500;

/// 职位链接与职位卡片，按文档顺序遍历
const OCCURRENCE_SELECTOR: &str =
    "a[href], [data-occludable-job-id], [data-job-id], [data-entity-urn]";
/// 卡片内的标题元素
const CARD_TITLE_SELECTOR: &str = "[class*=\"title\"]";
/// 内嵌 JSON 所在的元素
const EMBEDDED_DATA_SELECTOR: &str = "code, script";

fn href_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:/jobs/view/(?:[\w%-]*-)?(\d+))|(?:currentJobId=(\d+))"#)
            .expect("href id regex")
    })
}

fn json_title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""title"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("json title regex")
    })
}

fn page_of_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)page\s+(\d+)\s+of\s+(\d+)").expect("page regex"))
}

fn results_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d[\d,.]*)\+?\s+results?\b").expect("results regex"))
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// 同一 id 在页面中收集到的标题
///
/// 链接自身的标题优先于卡片内标题元素
#[derive(Default)]
struct TitleEvidence {
    anchor: Option<String>,
    card: Option<String>,
}

impl TitleEvidence {
    fn best(self) -> Option<String> {
        self.anchor.or(self.card)
    }
}

/// 搜索结果解析器
pub struct ListingExtractor {
    origin: String,
}

impl ListingExtractor {
    /// `search_base_url` 用于推导职位详情页的站点根地址
    pub fn new(search_base_url: &str) -> Self {
        let origin = Url::parse(search_base_url)
            .map(|u| u.origin().ascii_serialization())
            .unwrap_or_else(|_| "https://www.linkedin.com".to_string());
        Self { origin }
    }

    /// 提取本页中尚未见过的职位候选项，按页面顺序返回
    ///
    /// `seen` 在页与页之间共享，用于跨页去重
    pub fn extract_candidates(
        &self,
        html: &str,
        seen: &mut HashSet<String>,
    ) -> Vec<ListingCandidate> {
        let (Some(occurrences), Some(card_title)) =
            (selector(OCCURRENCE_SELECTOR), selector(CARD_TITLE_SELECTOR))
        else {
            return Vec::new();
        };
        let document = Html::parse_document(html);

        // 按首次出现顺序收集 id
        let mut order: Vec<String> = Vec::new();
        let mut titles: HashMap<String, TitleEvidence> = HashMap::new();
        for element in document.select(&occurrences) {
            if let Some(id) = anchor_id(element) {
                let evidence = evidence_for(&mut order, &mut titles, id);
                if evidence.anchor.is_none() {
                    evidence.anchor = anchor_title(element);
                }
            }
            if let Some(id) = card_id(element) {
                let evidence = evidence_for(&mut order, &mut titles, id);
                if evidence.card.is_none() {
                    // 只看卡片自身的子树，不会读到相邻卡片
                    evidence.card = element
                        .select(&card_title)
                        .map(element_text)
                        .find(|t| !t.is_empty());
                }
            }
        }

        let mut candidates = Vec::new();
        for id in order {
            if !seen.insert(id.clone()) {
                continue;
            }
            let title = titles
                .remove(&id)
                .and_then(TitleEvidence::best)
                .or_else(|| structured_title(&document, &id))
                .unwrap_or_default();
            candidates.push(ListingCandidate {
                url: format!("{}/jobs/view/{}/", self.origin, id),
                id,
                title,
            });
        }

        debug!("本页提取到 {} 个新职位", candidates.len());
        candidates
    }
}

fn evidence_for<'a>(
    order: &mut Vec<String>,
    titles: &'a mut HashMap<String, TitleEvidence>,
    id: String,
) -> &'a mut TitleEvidence {
    if !titles.contains_key(&id) {
        order.push(id.clone());
    }
    titles.entry(id).or_default()
}

/// 职位链接中的 id
fn anchor_id(element: ElementRef) -> Option<String> {
    if element.value().name() != "a" {
        return None;
    }
    external_id_from_url(element.value().attr("href")?)
}

/// 职位卡片 data 属性中的 id
fn card_id(element: ElementRef) -> Option<String> {
    let attrs = element.value();
    attrs
        .attr("data-occludable-job-id")
        .or_else(|| attrs.attr("data-job-id"))
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .or_else(|| {
            attrs
                .attr("data-entity-urn")?
                .strip_prefix("urn:li:jobPosting:")
                .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
                .map(str::to_string)
        })
}

/// 链接标题：aria-label 优先，其次是链接文本
fn anchor_title(element: ElementRef) -> Option<String> {
    element
        .value()
        .attr("aria-label")
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty())
        .or_else(|| Some(element_text(element)).filter(|t| !t.is_empty()))
}

fn element_text(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// 在内嵌的结构化数据（JSON）中查找该 id 对应的标题
fn structured_title(document: &Html, id: &str) -> Option<String> {
    let embedded = selector(EMBEDDED_DATA_SELECTOR)?;
    let needles = [format!("jobPosting:{}", id), format!("\"jobPostingId\":{}", id)];
    for block in document.select(&embedded) {
        let text: String = block.text().collect();
        for needle in &needles {
            for (pos, _) in text.match_indices(needle.as_str()) {
                let window = window_after(&text, pos, STRUCTURED_WINDOW);
                if let Some(raw) = json_title_re().captures(window).and_then(|c| c.get(1)) {
                    let decoded = serde_json::from_str::<String>(&format!("\"{}\"", raw.as_str()))
                        .unwrap_or_else(|_| raw.as_str().to_string());
                    let title = collapse_whitespace(&decoded);
                    if !title.is_empty() {
                        return Some(title);
                    }
                }
            }
        }
    }
    None
}

/// 从职位 URL 中解析数字 id
pub fn external_id_from_url(url: &str) -> Option<String> {
    let cap = href_id_re().captures(url)?;
    cap.get(1).or_else(|| cap.get(2)).map(|m| m.as_str().to_string())
}

/// 根据 "Page X of Y" 或 "N results" 计算总页数，默认 1 页
pub fn page_count(html: &str, page_size: usize) -> usize {
    let document = Html::parse_document(html);
    let text = document.root_element().text().collect::<Vec<_>>().join(" ");

    if let Some(total) = page_of_re()
        .captures(&text)
        .and_then(|c| c.get(2))
        .and_then(|m| m.as_str().parse::<usize>().ok())
    {
        return total.max(1);
    }

    if page_size > 0 {
        if let Some(results) = results_re()
            .captures(&text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().replace([',', '.'], ""))
            .and_then(|digits| digits.parse::<usize>().ok())
        {
            return results.div_ceil(page_size).max(1);
        }
    }

    1
}

/// 构建第 `page_index` 页（从 0 开始）的搜索 URL
pub fn search_url(
    base_url: &str,
    query: &str,
    location: &str,
    page_index: usize,
    page_size: usize,
    easy_apply_only: bool,
) -> Result<String> {
    let start = (page_index * page_size).to_string();
    let mut params = vec![
        ("keywords", query),
        ("location", location),
        ("start", start.as_str()),
    ];
    if easy_apply_only {
        params.push(("f_AL", "true"));
    }
    let url = Url::parse_with_params(base_url, &params)
        .with_context(|| format!("无效的搜索地址: {}", base_url))?;
    Ok(url.to_string())
}

/// 截取 `start` 之后最多 `len` 字节，保证落在字符边界上
fn window_after(html: &str, start: usize, len: usize) -> &str {
    let mut end = (start + len).min(html.len());
    while !html.is_char_boundary(end) {
        end -= 1;
    }
    &html[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ListingExtractor {
        ListingExtractor::new("https://www.linkedin.com/jobs/search/")
    }

    #[test]
    fn test_three_ids_with_duplicate_anchor() {
        let html = r#"
            <ul>
              <li><a href="/jobs/view/1001/?refId=x" aria-label="Rust Engineer">Rust Engineer</a></li>
              <li><a href="/jobs/view/1002/">Backend Developer</a></li>
              <li><a href="/jobs/view/1001/">Rust Engineer</a></li>
              <li><a href="https://www.linkedin.com/jobs/view/platform-engineer-at-acme-1003?trk=x">
                    <span>Platform</span> <strong>Engineer</strong></a></li>
            </ul>"#;
        let mut seen = HashSet::new();
        let candidates = extractor().extract_candidates(html, &mut seen);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].id, "1001");
        assert_eq!(candidates[0].title, "Rust Engineer");
        assert_eq!(candidates[0].url, "https://www.linkedin.com/jobs/view/1001/");
        assert_eq!(candidates[1].title, "Backend Developer");
        assert_eq!(candidates[2].id, "1003");
        assert_eq!(candidates[2].title, "Platform Engineer");
    }

    #[test]
    fn test_seen_ids_are_skipped_across_pages() {
        let mut seen = HashSet::new();
        let page1 = r#"<a href="/jobs/view/1/">A</a><a href="/jobs/view/2/">B</a>"#;
        let page2 = r#"<a href="/jobs/view/2/">B</a><a href="/jobs/view/3/">C</a>"#;
        let ex = extractor();
        assert_eq!(ex.extract_candidates(page1, &mut seen).len(), 2);
        let second = ex.extract_candidates(page2, &mut seen);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, "3");
    }

    #[test]
    fn test_repeated_anchors_yield_distinct_count() {
        let mut html = String::new();
        for round in 0..4 {
            for id in 0..7 {
                html.push_str(&format!(
                    r#"<a href="/jobs/view/{}/">Job {} r{}</a>"#,
                    5000 + id,
                    id,
                    round
                ));
            }
        }
        let mut seen = HashSet::new();
        assert_eq!(extractor().extract_candidates(&html, &mut seen).len(), 7);
    }

    #[test]
    fn test_title_falls_back_to_structured_data() {
        let html = r#"
            <div data-job-id="4242"><a href="/jobs/view/4242/"><img src="logo.png"></a></div>
            <code style="display:none">{"entityUrn":"urn:li:fsd_jobPosting:4242","title":"Staff Engineer – Infra"}</code>
        "#;
        let mut seen = HashSet::new();
        let candidates = extractor().extract_candidates(html, &mut seen);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Staff Engineer – Infra");
    }

    #[test]
    fn test_data_attribute_title_nearby() {
        let html = r#"
            <li data-occludable-job-id="777">
              <div class="job-card-list__title--link">  Data   Engineer </div>
            </li>"#;
        let mut seen = HashSet::new();
        let candidates = extractor().extract_candidates(html, &mut seen);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Data Engineer");
    }

    #[test]
    fn test_card_title_does_not_leak_from_next_card() {
        let html = r#"
            <ul>
              <li data-occludable-job-id="1">
                <a href="/jobs/view/1/" aria-label="Alpha Engineer"></a>
              </li>
              <li data-occludable-job-id="2">
                <div class="job-card-list__title">Beta Designer</div>
              </li>
            </ul>"#;
        let mut seen = HashSet::new();
        let candidates = extractor().extract_candidates(html, &mut seen);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, "1");
        assert_eq!(candidates[0].title, "Alpha Engineer");
        assert_eq!(candidates[1].id, "2");
        assert_eq!(candidates[1].title, "Beta Designer");
    }

    #[test]
    fn test_anchor_title_preferred_over_card_title() {
        let html = r#"
            <li data-entity-urn="urn:li:jobPosting:55">
              <span class="artdeco-entity-lockup__title">Promoted</span>
              <a href="/jobs/view/55/">Senior Rust Engineer</a>
            </li>"#;
        let mut seen = HashSet::new();
        let candidates = extractor().extract_candidates(html, &mut seen);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "55");
        assert_eq!(candidates[0].title, "Senior Rust Engineer");
    }

    #[test]
    fn test_entities_in_titles_are_decoded() {
        let html = r#"<a href="/jobs/view/8/" aria-label="R&amp;D Engineer &amp;lt;C++&amp;gt;">x</a>"#;
        let mut seen = HashSet::new();
        let candidates = extractor().extract_candidates(html, &mut seen);
        assert_eq!(candidates[0].title, "R&D Engineer &lt;C++&gt;");
    }

    #[test]
    fn test_empty_page_yields_nothing() {
        let mut seen = HashSet::new();
        assert!(extractor()
            .extract_candidates("<html><body>No matching jobs found.</body></html>", &mut seen)
            .is_empty());
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count("<div>Page 1 of 40</div>", 25), 40);
        assert_eq!(page_count("<span>1,234 results</span>", 25), 50);
        assert_eq!(page_count("<span>25 results</span>", 25), 1);
        assert_eq!(page_count("<span>26 results</span>", 25), 2);
        assert_eq!(page_count("<p>nothing here</p>", 25), 1);
        assert_eq!(page_count("<span>300 results</span>", 0), 1);
    }

    #[test]
    fn test_external_id_from_url() {
        assert_eq!(
            external_id_from_url("https://www.linkedin.com/jobs/view/3812345678/").as_deref(),
            Some("3812345678")
        );
        assert_eq!(
            external_id_from_url("https://www.linkedin.com/jobs/search/?currentJobId=99&keywords=x")
                .as_deref(),
            Some("99")
        );
        assert_eq!(external_id_from_url("https://example.com/careers"), None);
    }

    #[test]
    fn test_search_url() {
        let url = search_url(
            "https://www.linkedin.com/jobs/search/",
            "rust developer",
            "Berlin",
            2,
            25,
            true,
        )
        .unwrap();
        assert!(url.starts_with("https://www.linkedin.com/jobs/search/?"));
        assert!(url.contains("keywords=rust+developer"));
        assert!(url.contains("location=Berlin"));
        assert!(url.contains("start=50"));
        assert!(url.contains("f_AL=true"));
    }
}
