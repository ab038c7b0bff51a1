use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use job_apply_agent::clients::{JobStore, MemoryJobStore};
use job_apply_agent::config::Config;
use job_apply_agent::models::{
    ApplyType, JobParams, JobPosting, JobRecord, JobStatus, JobType, ScrapeSummary, WorkplaceType,
};
use job_apply_agent::orchestrator::{JobQueue, ListingSession, ScrapeCoordinator};
use job_apply_agent::services::listing_extractor::external_id_from_url;
use job_apply_agent::services::{EventLog, RenderedPage};

/// 脚本化的站点：搜索页按 `start` 偏移取，详情页按职位 id 取
#[derive(Default)]
struct Site {
    search_pages: HashMap<usize, String>,
    details: HashMap<String, String>,
    /// 所有请求都被重定向到登录墙
    signed_out: bool,

    fetched: Vec<String>,
    starts: usize,
    closes: usize,
}

impl Site {
    fn fetched_search_offsets(&self) -> Vec<usize> {
        self.fetched.iter().filter_map(|u| start_offset(u)).collect()
    }

    fn fetched_detail(&self, id: &str) -> bool {
        self.fetched
            .iter()
            .any(|u| u.contains(&format!("/jobs/view/{}/", id)))
    }
}

fn start_offset(url: &str) -> Option<usize> {
    let url = reqwest::Url::parse(url).ok()?;
    if !url.path().starts_with("/jobs/search") {
        return None;
    }
    url.query_pairs()
        .find(|(k, _)| k == "start")
        .and_then(|(_, v)| v.parse().ok())
}

struct ScriptedListingSession {
    site: Arc<Mutex<Site>>,
}

#[async_trait]
impl ListingSession for ScriptedListingSession {
    async fn start(&mut self) -> Result<()> {
        self.site.lock().unwrap().starts += 1;
        Ok(())
    }

    async fn fetch(&mut self, url: &str) -> Result<RenderedPage> {
        let mut site = self.site.lock().unwrap();
        site.fetched.push(url.to_string());

        if site.signed_out {
            return Ok(RenderedPage {
                url: "https://www.linkedin.com/authwall?trk=guest".to_string(),
                html: "<html><body>Join now</body></html>".to_string(),
            });
        }

        if let Some(offset) = start_offset(url) {
            let html = site
                .search_pages
                .get(&offset)
                .cloned()
                .unwrap_or_else(|| "<html><body>No matching jobs found.</body></html>".to_string());
            return Ok(RenderedPage {
                url: url.to_string(),
                html,
            });
        }

        let id = external_id_from_url(url).ok_or_else(|| anyhow!("未知地址 {}", url))?;
        match site.details.get(&id) {
            Some(html) => Ok(RenderedPage {
                url: url.to_string(),
                html: html.clone(),
            }),
            None => Err(anyhow!("职位 {} 页面加载超时", id)),
        }
    }

    async fn close(&mut self) {
        self.site.lock().unwrap().closes += 1;
    }
}

fn search_page(total_results: usize, ids: &[u32]) -> String {
    let cards: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<li data-occludable-job-id="{id}"><a href="/jobs/view/{id}/" aria-label="Engineer {id}">Engineer {id}</a></li>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="jobs-search-results-list__subtitle"><span>{total_results} results</span></div><ul>{cards}</ul></body></html>"#
    )
}

fn detail_page(title: &str, easy_apply: bool) -> String {
    let button = if easy_apply { "Easy Apply" } else { "Apply" };
    format!(
        r#"<html><body>
          <h1 class="top-card-layout__title">{title}</h1>
          <a class="topcard__org-name-link">Acme</a>
          <button class="jobs-apply-button"><span>{button}</span></button>
          <div class="description__text">Build things.</div>
        </body></html>"#
    )
}

fn config() -> Config {
    Config {
        step_delay_ms: 0,
        page_settle_ms: 0,
        max_search_pages: 3,
        listing_page_size: 25,
        ..Config::default()
    }
}

struct Harness {
    site: Arc<Mutex<Site>>,
    store: Arc<MemoryJobStore>,
    queue: JobQueue,
    _dir: tempfile::TempDir,
}

fn harness(site: Site) -> Harness {
    let site = Arc::new(Mutex::new(site));
    let store = Arc::new(MemoryJobStore::new());
    let factory_site = Arc::clone(&site);
    let coordinator = ScrapeCoordinator::with_sessions(
        &config(),
        store.clone(),
        Arc::new(move |_: &Config| -> Box<dyn ListingSession> {
            Box::new(ScriptedListingSession {
                site: Arc::clone(&factory_site),
            })
        }),
    );
    let dir = tempfile::tempdir().unwrap();
    let queue = JobQueue::with_capacities(
        EventLog::new(dir.path().join("jobs.log")),
        25,
        200,
        Arc::new(coordinator),
    );
    Harness {
        site,
        store,
        queue,
        _dir: dir,
    }
}

async fn run(harness: &Harness, job_type: JobType) -> JobRecord {
    let handle = harness
        .queue
        .start_job(
            job_type,
            JobParams {
                query: "rust".into(),
                location: "Berlin".into(),
            },
        )
        .unwrap();
    for _ in 0..200 {
        if !harness.queue.is_running(&handle.id) {
            return harness.queue.job(&handle.id).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("scrape job did not finish");
}

fn summary(record: &JobRecord) -> ScrapeSummary {
    assert_eq!(record.status, JobStatus::Completed, "{:?}", record.error);
    serde_json::from_value(record.result.clone().unwrap()).unwrap()
}

fn easy_details(ids: &[u32]) -> HashMap<String, String> {
    ids.iter()
        .map(|id| (id.to_string(), detail_page(&format!("Engineer {}", id), true)))
        .collect()
}

#[tokio::test]
async fn test_paginates_by_page_count_and_stores_new_postings() {
    let h = harness(Site {
        search_pages: HashMap::from([(0, search_page(40, &[1, 2])), (25, search_page(40, &[3]))]),
        details: easy_details(&[1, 2, 3]),
        ..Default::default()
    });

    let record = run(&h, JobType::ListingScrape).await;

    let summary = summary(&record);
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.candidates, 3);
    assert_eq!(summary.inserted, 3);
    assert_eq!(h.store.len(), 3);
    assert_eq!(h.store.postings()[2].title, "Engineer 3");

    let site = h.site.lock().unwrap();
    assert_eq!(site.fetched_search_offsets(), vec![0, 25]);
    assert_eq!(site.starts, 1);
    assert_eq!(site.closes, 1);
}

#[tokio::test]
async fn test_page_cap_limits_search_pages() {
    let h = harness(Site {
        search_pages: HashMap::from([
            (0, search_page(1000, &[1])),
            (25, search_page(1000, &[2])),
            (50, search_page(1000, &[3])),
            (75, search_page(1000, &[4])),
        ]),
        details: easy_details(&[1, 2, 3, 4]),
        ..Default::default()
    });

    let summary = summary(&run(&h, JobType::ListingScrape).await);

    assert_eq!(summary.pages, 3);
    assert_eq!(summary.inserted, 3);
    assert_eq!(h.site.lock().unwrap().fetched_search_offsets(), vec![0, 25, 50]);
}

#[tokio::test]
async fn test_empty_page_stops_pagination() {
    let h = harness(Site {
        search_pages: HashMap::from([(0, search_page(100, &[1, 2]))]),
        details: easy_details(&[1, 2]),
        ..Default::default()
    });

    let summary = summary(&run(&h, JobType::ListingScrape).await);

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.inserted, 2);
    assert_eq!(h.site.lock().unwrap().fetched_search_offsets(), vec![0, 25]);
}

#[tokio::test]
async fn test_known_ids_skip_detail_fetch() {
    let h = harness(Site {
        search_pages: HashMap::from([(0, search_page(2, &[1, 2]))]),
        details: easy_details(&[1, 2]),
        ..Default::default()
    });
    h.store
        .insert_if_absent(JobPosting {
            external_id: "1".into(),
            title: "Engineer 1".into(),
            company: "Acme".into(),
            location: String::new(),
            description: String::new(),
            tags: vec![],
            apply_url: "https://www.linkedin.com/jobs/view/1/".into(),
            apply_type: ApplyType::InternalForm,
            posted_at: None,
            workplace_type: WorkplaceType::Unknown,
        })
        .await
        .unwrap();

    let summary = summary(&run(&h, JobType::ListingScrape).await);

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.inserted, 1);
    let site = h.site.lock().unwrap();
    assert!(!site.fetched_detail("1"));
    assert!(site.fetched_detail("2"));
}

#[tokio::test]
async fn test_detail_failure_skips_only_that_posting() {
    let h = harness(Site {
        search_pages: HashMap::from([(0, search_page(3, &[1, 2, 3]))]),
        details: easy_details(&[1, 3]),
        ..Default::default()
    });

    let record = run(&h, JobType::ListingScrape).await;

    let summary = summary(&record);
    assert_eq!(summary.candidates, 3);
    assert_eq!(summary.inserted, 2);
    assert!(!h.store.contains("2").await.unwrap());
}

#[tokio::test]
async fn test_easy_apply_only_filters_external_postings() {
    let mut details = easy_details(&[1]);
    details.insert("2".into(), detail_page("Engineer 2", false));
    let h = harness(Site {
        search_pages: HashMap::from([(0, search_page(2, &[1, 2]))]),
        details,
        ..Default::default()
    });

    let summary = summary(&run(&h, JobType::ListingScrapeEasyApplyOnly).await);

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.filtered, 1);
    assert_eq!(h.store.postings()[0].external_id, "1");
    let site = h.site.lock().unwrap();
    assert!(site.fetched[0].contains("f_AL=true"));
}

#[tokio::test]
async fn test_sign_in_wall_fails_the_job() {
    let h = harness(Site {
        signed_out: true,
        ..Default::default()
    });

    let record = run(&h, JobType::ListingScrape).await;

    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.error.as_deref().unwrap().contains("未登录"));
    assert!(h.store.is_empty());
    let site = h.site.lock().unwrap();
    assert_eq!(site.fetched.len(), 1);
    assert_eq!(site.closes, 1);
}
