//! In-memory storage implementation
//!
//! Used by tests and dry runs; nothing survives the process.

use crate::state::PageStatus;
use crate::storage::search::rank_pages;
use crate::storage::traits::{ContentStore, StorageResult};
use crate::storage::CrawledPage;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Content store backed by an ordered map keyed by URL
#[derive(Debug, Default)]
pub struct MemoryStorage {
    pages: BTreeMap<String, CrawledPage>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentStore for MemoryStorage {
    fn get(&self, url: &str) -> StorageResult<Option<CrawledPage>> {
        Ok(self.pages.get(url).cloned())
    }

    fn upsert(&mut self, page: &CrawledPage) -> StorageResult<()> {
        self.pages.insert(page.url.clone(), page.clone());
        Ok(())
    }

    fn touch(&mut self, url: &str, at: DateTime<Utc>) -> StorageResult<bool> {
        match self.pages.get_mut(url) {
            Some(page) => {
                page.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn ensure_pending(&mut self, url: &str, at: DateTime<Utc>) -> StorageResult<bool> {
        if self.pages.contains_key(url) {
            return Ok(false);
        }
        self.pages
            .insert(url.to_string(), CrawledPage::pending(url, at));
        Ok(true)
    }

    fn mark_error(
        &mut self,
        url: &str,
        message: &str,
        kind: &str,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.pages
            .entry(url.to_string())
            .or_insert_with(|| CrawledPage::pending(url, at))
            .apply_error(message, kind, at);
        Ok(())
    }

    fn list_by_status(&self, status: PageStatus) -> StorageResult<Vec<CrawledPage>> {
        Ok(self
            .pages
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect())
    }

    fn search(&self, query: &str, limit: usize) -> StorageResult<Vec<CrawledPage>> {
        let candidates = self.list_by_status(PageStatus::Crawled)?;
        Ok(rank_pages(query, candidates, limit))
    }

    fn list(&self, limit: usize, offset: usize) -> StorageResult<Vec<CrawledPage>> {
        let mut pages: Vec<&CrawledPage> = self.pages.values().collect();
        // BTreeMap iteration is already URL-ordered, so a stable sort keeps ties by URL
        pages.sort_by_key(|p| Reverse(p.updated_at));
        Ok(pages
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn count_by_status(&self, status: PageStatus) -> StorageResult<u64> {
        Ok(self.pages.values().filter(|p| p.status == status).count() as u64)
    }

    fn count_total(&self) -> StorageResult<u64> {
        Ok(self.pages.len() as u64)
    }

    fn last_crawled_at(&self) -> StorageResult<Option<DateTime<Utc>>> {
        Ok(self.pages.values().filter_map(|p| p.crawled_at).max())
    }

    fn delete(&mut self, url: &str) -> StorageResult<bool> {
        Ok(self.pages.remove(url).is_some())
    }

    fn clear(&mut self) -> StorageResult<u64> {
        let removed = self.pages.len() as u64;
        self.pages.clear();
        Ok(removed)
    }
}
