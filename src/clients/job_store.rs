//! 职位存储契约
//!
//! 持久化属于外部 CRUD 服务，这里只定义"存在则跳过"的写入契约，
//! 并提供一个内存实现供命令行和测试使用

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::JobPosting;

/// 职位存储
///
/// 去重键为 external_id；缺失时退化为 title + company + apply_url
#[async_trait]
pub trait JobStore: Send + Sync {
    /// 该 external_id 是否已存在
    async fn contains(&self, external_id: &str) -> Result<bool>;

    /// 不存在时写入，返回是否真正写入；已存在的职位从不更新
    async fn insert_if_absent(&self, posting: JobPosting) -> Result<bool>;
}

#[derive(Default)]
struct MemoryInner {
    keys: HashSet<String>,
    postings: Vec<JobPosting>,
}

/// 内存中的职位存储
#[derive(Default)]
pub struct MemoryJobStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已写入职位的快照（按写入顺序）
    pub fn postings(&self) -> Vec<JobPosting> {
        self.inner
            .lock()
            .map(|inner| inner.postings.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.postings.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn contains(&self, external_id: &str) -> Result<bool> {
        let inner = self.inner.lock().map_err(|_| anyhow!("职位存储锁已损坏"))?;
        Ok(inner.keys.contains(&format!("id:{}", external_id.trim())))
    }

    async fn insert_if_absent(&self, posting: JobPosting) -> Result<bool> {
        let mut inner = self.inner.lock().map_err(|_| anyhow!("职位存储锁已损坏"))?;
        if !inner.keys.insert(posting.dedup_key()) {
            return Ok(false);
        }
        inner.postings.push(posting);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApplyType, WorkplaceType};

    fn posting(id: &str, title: &str) -> JobPosting {
        JobPosting {
            external_id: id.to_string(),
            title: title.to_string(),
            company: "Acme".to_string(),
            location: String::new(),
            description: String::new(),
            tags: vec![],
            apply_url: "https://example.com/a".to_string(),
            apply_type: ApplyType::ExternalRedirect,
            posted_at: None,
            workplace_type: WorkplaceType::Unknown,
        }
    }

    #[tokio::test]
    async fn test_insert_if_absent_never_updates() {
        let store = MemoryJobStore::new();
        assert!(store.insert_if_absent(posting("42", "First")).await.unwrap());
        assert!(!store.insert_if_absent(posting("42", "Second")).await.unwrap());
        assert!(store.contains("42").await.unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(store.postings()[0].title, "First");
    }

    #[test]
    fn test_dedup_falls_back_to_title_company_url() {
        let store = MemoryJobStore::new();
        tokio_test::block_on(async {
            assert!(store.insert_if_absent(posting("", "Rust Dev")).await.unwrap());
            assert!(!store.insert_if_absent(posting("", "rust dev")).await.unwrap());
            assert!(store.insert_if_absent(posting("", "Go Dev")).await.unwrap());
        });
        assert_eq!(store.len(), 2);
    }
}
