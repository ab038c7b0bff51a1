//! JSearch API 客户端
//!
//! 通过 RapidAPI 上的 JSearch 接口导入职位，不需要浏览器

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ApiError, AppError, ConfigError};
use crate::models::{ApplyType, JobPosting, WorkplaceType};
use crate::utils::text::{collapse_whitespace, truncate_chars};

/// JSearch 客户端
pub struct JSearchClient {
    http: Client,
    api_key: String,
    api_host: String,
    num_pages: u32,
    max_description_chars: usize,
}

impl JSearchClient {
    pub fn new(config: &Config) -> Result<Self> {
        if config.jsearch_api_key.trim().is_empty() {
            return Err(AppError::Config(ConfigError::MissingValue {
                var_name: "JSEARCH_API_KEY".to_string(),
            })
            .into());
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("创建 HTTP 客户端失败")?;

        Ok(Self {
            http,
            api_key: config.jsearch_api_key.clone(),
            api_host: config.jsearch_api_host.clone(),
            num_pages: config.jsearch_num_pages.max(1),
            max_description_chars: config.description_max_chars,
        })
    }

    /// 搜索职位并映射为 [`JobPosting`]
    pub async fn search(&self, query: &str, location: &str) -> Result<Vec<JobPosting>> {
        let endpoint = format!("https://{}/search", self.api_host);
        let search_text = format!("{} in {}", query.trim(), location.trim());
        info!("🔎 JSearch 查询: {}", search_text);

        let response = self
            .http
            .get(&endpoint)
            .query(&[
                ("query", search_text.as_str()),
                ("page", "1"),
                ("num_pages", self.num_pages.to_string().as_str()),
            ])
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.api_host)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AppError::Api(ApiError::RateLimited { endpoint }).into());
        }
        if !status.is_success() {
            return Err(AppError::Api(ApiError::BadResponse {
                endpoint,
                status: status.as_u16(),
            })
            .into());
        }

        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| AppError::Api(ApiError::JsonParseFailed { source: Box::new(e) }))?;
        let postings: Vec<JobPosting> = body
            .get("data")
            .and_then(|d| d.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| map_jsearch_job(item, self.max_description_chars))
                    .collect()
            })
            .unwrap_or_default();

        debug!("JSearch 返回 {} 个职位", postings.len());
        Ok(postings)
    }
}

fn str_field(item: &JsonValue, key: &str) -> Option<String> {
    item.get(key)
        .and_then(|v| v.as_str())
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

/// 把 JSearch 的单个职位对象映射为 [`JobPosting`]；缺少标题时返回 None
pub fn map_jsearch_job(item: &JsonValue, max_description_chars: usize) -> Option<JobPosting> {
    let title = str_field(item, "job_title")?;

    let location = ["job_city", "job_state", "job_country"]
        .iter()
        .filter_map(|k| str_field(item, k))
        .collect::<Vec<_>>()
        .join(", ");

    let mut tags: Vec<String> = Vec::new();
    if let Some(kind) = str_field(item, "job_employment_type") {
        tags.push(kind);
    }
    if let Some(skills) = item.get("job_required_skills").and_then(|v| v.as_array()) {
        tags.extend(skills.iter().filter_map(|s| s.as_str()).map(collapse_whitespace));
    }

    let apply_url = str_field(item, "job_apply_link").unwrap_or_default();
    let apply_type = if apply_url.contains("linkedin.com/jobs/view") {
        ApplyType::InternalForm
    } else {
        ApplyType::ExternalRedirect
    };

    let workplace_type = if item.get("job_is_remote").and_then(|v| v.as_bool()) == Some(true) {
        WorkplaceType::Remote
    } else {
        WorkplaceType::detect(&title)
    };

    Some(JobPosting {
        external_id: str_field(item, "job_id").unwrap_or_default(),
        title,
        company: str_field(item, "employer_name").unwrap_or_default(),
        location,
        description: truncate_chars(
            &str_field(item, "job_description").unwrap_or_default(),
            max_description_chars,
        ),
        tags,
        apply_url,
        apply_type,
        posted_at: str_field(item, "job_posted_at_datetime_utc"),
        workplace_type,
    })
}
