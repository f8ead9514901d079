//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ContentStore trait.

use crate::state::PageStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::search::{fallback_phrase, rank_pages, search_terms};
use crate::storage::traits::{ContentStore, StorageError, StorageResult};
use crate::storage::{CrawledPage, PageMetadata};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;

const PAGE_COLUMNS: &str =
    "url, title, content, metadata, content_hash, status, crawled_at, updated_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        register_functions(&conn)?;
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        register_functions(&conn)?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn query_pages(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StorageResult<Vec<CrawledPage>> {
        let mut stmt = self.conn.prepare(sql)?;
        let pages = stmt
            .query_map(params, row_to_page)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }
}

/// Timestamps are stored as fixed-width RFC 3339 so they sort lexically
fn format_ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_page(row: &Row<'_>) -> rusqlite::Result<CrawledPage> {
    let metadata_json: String = row.get(3)?;
    let metadata: PageMetadata = serde_json::from_str(&metadata_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    let status_raw: String = row.get(5)?;
    let status = PageStatus::from_db_string(&status_raw).unwrap_or(PageStatus::Error);

    let crawled_at = match row.get::<_, Option<String>>(6)? {
        Some(raw) => Some(parse_ts(6, &raw)?),
        None => None,
    };
    let updated_raw: String = row.get(7)?;

    Ok(CrawledPage {
        url: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        metadata,
        content_hash: row.get(4)?,
        status,
        crawled_at,
        updated_at: parse_ts(7, &updated_raw)?,
    })
}

/// Registers `fold_case`, a Unicode-aware `lower()` matching `str::to_lowercase`
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text = ctx.get::<Option<String>>(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

impl ContentStore for SqliteStorage {
    fn get(&self, url: &str) -> StorageResult<Option<CrawledPage>> {
        let page = self
            .conn
            .query_row(
                &format!("SELECT {} FROM crawled_pages WHERE url = ?1", PAGE_COLUMNS),
                params![url],
                row_to_page,
            )
            .optional()?;
        Ok(page)
    }

    fn upsert(&mut self, page: &CrawledPage) -> StorageResult<()> {
        let metadata = serde_json::to_string(&page.metadata)?;
        let updated_at = format_ts(&page.updated_at);
        self.conn.execute(
            "INSERT INTO crawled_pages
                (url, title, content, metadata, content_hash, status, crawled_at, updated_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                metadata = excluded.metadata,
                content_hash = excluded.content_hash,
                status = excluded.status,
                crawled_at = excluded.crawled_at,
                updated_at = excluded.updated_at",
            params![
                page.url,
                page.title,
                page.content,
                metadata,
                page.content_hash,
                page.status.to_db_string(),
                page.crawled_at.as_ref().map(format_ts),
                updated_at,
            ],
        )?;
        Ok(())
    }

    fn touch(&mut self, url: &str, at: DateTime<Utc>) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE crawled_pages SET updated_at = ?1 WHERE url = ?2",
            params![format_ts(&at), url],
        )?;
        Ok(changed > 0)
    }

    fn ensure_pending(&mut self, url: &str, at: DateTime<Utc>) -> StorageResult<bool> {
        let now = format_ts(&at);
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO crawled_pages (url, status, updated_at, created_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![url, PageStatus::Pending.to_db_string(), now],
        )?;
        Ok(changed > 0)
    }

    fn mark_error(
        &mut self,
        url: &str,
        message: &str,
        kind: &str,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        let existing = tx
            .query_row(
                &format!("SELECT {} FROM crawled_pages WHERE url = ?1", PAGE_COLUMNS),
                params![url],
                row_to_page,
            )
            .optional()?;

        let mut page = existing.unwrap_or_else(|| CrawledPage::pending(url, at));
        page.apply_error(message, kind, at);

        let metadata = serde_json::to_string(&page.metadata)?;
        let now = format_ts(&at);
        tx.execute(
            "INSERT INTO crawled_pages (url, metadata, status, updated_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(url) DO UPDATE SET
                metadata = excluded.metadata,
                status = excluded.status,
                updated_at = excluded.updated_at",
            params![url, metadata, PageStatus::Error.to_db_string(), now],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn list_by_status(&self, status: PageStatus) -> StorageResult<Vec<CrawledPage>> {
        self.query_pages(
            &format!(
                "SELECT {} FROM crawled_pages WHERE status = ?1 ORDER BY url",
                PAGE_COLUMNS
            ),
            params![status.to_db_string()],
        )
    }

    fn search(&self, query: &str, limit: usize) -> StorageResult<Vec<CrawledPage>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        // Narrow to rows containing any term or the whole phrase, then rank in Rust
        let mut needles = search_terms(query);
        let phrase = fallback_phrase(query);
        if !phrase.is_empty() && !needles.contains(&phrase) {
            needles.push(phrase);
        }
        if needles.is_empty() {
            return Ok(Vec::new());
        }

        let clauses = (1..=needles.len())
            .map(|i| {
                format!("instr(fold_case(title), ?{i}) > 0 OR instr(fold_case(content), ?{i}) > 0")
            })
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!(
            "SELECT {} FROM crawled_pages WHERE status = '{}' AND ({})",
            PAGE_COLUMNS,
            PageStatus::Crawled.to_db_string(),
            clauses
        );

        let candidates = self.query_pages(&sql, params_from_iter(needles.iter()))?;
        Ok(rank_pages(query, candidates, limit))
    }

    fn list(&self, limit: usize, offset: usize) -> StorageResult<Vec<CrawledPage>> {
        self.query_pages(
            &format!(
                "SELECT {} FROM crawled_pages ORDER BY updated_at DESC, url ASC LIMIT ?1 OFFSET ?2",
                PAGE_COLUMNS
            ),
            params![limit as i64, offset as i64],
        )
    }

    fn count_by_status(&self, status: PageStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM crawled_pages WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_total(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM crawled_pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn last_crawled_at(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let raw: Option<String> =
            self.conn
                .query_row("SELECT MAX(crawled_at) FROM crawled_pages", [], |row| {
                    row.get(0)
                })?;
        match raw {
            Some(raw) => Ok(Some(parse_ts(0, &raw)?)),
            None => Ok(None),
        }
    }

    fn delete(&mut self, url: &str) -> StorageResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM crawled_pages WHERE url = ?1", params![url])?;
        Ok(changed > 0)
    }

    fn clear(&mut self) -> StorageResult<u64> {
        let changed = self.conn.execute("DELETE FROM crawled_pages", [])?;
        Ok(changed as u64)
    }
}
