//! Accumulate-until-no-continuation-token paging.
//!
//! Every list operation against CloudWatch returns a page of items plus an
//! optional `NextToken`. [`collect_pages`] drives a page-fetch closure until
//! the backend stops handing out tokens.
//!
//! Guarantees:
//! - N non-final pages take exactly N + 1 fetches (the last one has no token).
//! - Items are appended in page order and never deduplicated.
//! - The first fetch error is returned as-is and the items gathered so far are
//!   dropped; there is no partial result.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::Result;
use std::future::Future;

/// One page returned by a list call
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self { items, next_token }
    }

    /// A page with no continuation token
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// Call `fetch` with the previous page's token until no token comes back.
///
/// The first call receives `None`. An empty-string token is treated as "no
/// more pages", matching how some CloudWatch APIs terminate.
pub async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(token.take()).await?;
        pages += 1;
        items.extend(page.items);

        match page.next_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => break,
        }
    }

    tracing::trace!("Collected {} items across {} page(s)", items.len(), pages);
    Ok(items)
}

/// Like [`collect_pages`], but stop fetching at the first item matching
/// `predicate`. `None` means every page was read without a match.
pub async fn find_in_pages<T, F, Fut, P>(mut fetch: F, mut predicate: P) -> Result<Option<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
    P: FnMut(&T) -> bool,
{
    let mut token: Option<String> = None;

    loop {
        let page = fetch(token.take()).await?;
        if let Some(found) = page.items.into_iter().find(|item| predicate(item)) {
            return Ok(Some(found));
        }

        match page.next_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => return Ok(None),
        }
    }
}
