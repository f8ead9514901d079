//! Relevance ranking shared by the store backends
//!
//! Both backends hand their candidate rows to `rank_pages`, so search results
//! are identical whichever store is in use.

use crate::storage::CrawledPage;
use std::cmp::Reverse;

/// Terms shorter than this are ignored when scoring
const MIN_TERM_LEN: usize = 3;

/// Title hits count this many times more than content hits
const TITLE_WEIGHT: usize = 3;

/// Splits a query into lowercase search terms
pub(crate) fn search_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_TERM_LEN)
    {
        let word = word.to_lowercase();
        if !terms.contains(&word) {
            terms.push(word);
        }
    }
    terms
}

/// Lowercased, trimmed whole query used by the substring fallback
pub(crate) fn fallback_phrase(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Scores a page by how often the terms appear in its title and content
pub(crate) fn relevance(terms: &[String], page: &CrawledPage) -> usize {
    let title = page.title.to_lowercase();
    let content = page.content.to_lowercase();
    terms
        .iter()
        .map(|term| {
            title.matches(term.as_str()).count() * TITLE_WEIGHT
                + content.matches(term.as_str()).count()
        })
        .sum()
}

/// Ranks candidate pages for a query
///
/// Candidates scoring above zero are ordered by score, ties broken by the most
/// recent crawl. When nothing scores, pages containing the whole query are
/// returned most recent first.
pub(crate) fn rank_pages(
    query: &str,
    candidates: Vec<CrawledPage>,
    limit: usize,
) -> Vec<CrawledPage> {
    if limit == 0 {
        return Vec::new();
    }

    let terms = search_terms(query);
    let mut scored: Vec<(usize, CrawledPage)> = candidates
        .iter()
        .map(|page| (relevance(&terms, page), page))
        .filter(|(score, _)| *score > 0)
        .map(|(score, page)| (score, page.clone()))
        .collect();

    if !scored.is_empty() {
        scored.sort_by_key(|(score, page)| (Reverse(*score), Reverse(page.crawled_at)));
        return scored.into_iter().take(limit).map(|(_, page)| page).collect();
    }

    let phrase = fallback_phrase(query);
    if phrase.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<CrawledPage> = candidates
        .into_iter()
        .filter(|page| {
            page.title.to_lowercase().contains(&phrase)
                || page.content.to_lowercase().contains(&phrase)
        })
        .collect();
    matches.sort_by_key(|page| Reverse(page.crawled_at));
    matches.truncate(limit);
    matches
}
