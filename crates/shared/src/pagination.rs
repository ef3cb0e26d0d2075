//! Pagination utilities.
//!
//! Catalog listings use page numbers; comment threads use an opaque keyset
//! cursor over `(created_at, id)` so new replies do not shift pages.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Default number of items per page.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Upper bound on items per page.
pub const MAX_PER_PAGE: u32 = 100;

/// Error type for cursor operations.
#[derive(Debug, Error)]
pub enum CursorError {
    #[error("Invalid cursor format")]
    InvalidFormat,
    #[error("Invalid cursor encoding")]
    InvalidEncoding,
    #[error("Invalid timestamp in cursor")]
    InvalidTimestamp,
    #[error("Invalid ID in cursor")]
    InvalidId,
}

/// A normalized page request (1-based page, clamped page size).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Normalizes raw query values. Page 0 becomes 1; page size is clamped to `1..=max`.
    pub fn new(page: Option<u32>, per_page: Option<u32>, max_per_page: u32) -> Self {
        let max = max_per_page.max(1);
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE.min(max)).clamp(1, max),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None, MAX_PER_PAGE)
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        let total = total.max(0);
        let per_page = i64::from(request.per_page);
        let total_pages = ((total + per_page - 1) / per_page) as u32;
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Converts the items while keeping the page metadata.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

/// Encodes a keyset cursor: base64(RFC3339_timestamp|uuid).
pub fn encode_cursor(created_at: DateTime<Utc>, id: Uuid) -> String {
    let raw = format!(
        "{}|{}",
        created_at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
        id
    );
    URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

/// Decodes a keyset cursor into `(created_at, id)`.
pub fn decode_cursor(cursor: &str) -> Result<(DateTime<Utc>, Uuid), CursorError> {
    let decoded = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| CursorError::InvalidEncoding)?;
    let s = String::from_utf8(decoded).map_err(|_| CursorError::InvalidFormat)?;

    let (timestamp_str, id_str) = s.split_once('|').ok_or(CursorError::InvalidFormat)?;

    let id = Uuid::parse_str(id_str).map_err(|_| CursorError::InvalidId)?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp_str)
        .map_err(|_| CursorError::InvalidTimestamp)?
        .with_timezone(&Utc);

    Ok((timestamp, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_page_request_defaults() {
        let req = PageRequest::new(None, None, MAX_PER_PAGE);
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 20);
        assert_eq!(req.offset(), 0);
        assert_eq!(req.limit(), 20);
    }

    #[test]
    fn test_page_request_clamps() {
        let req = PageRequest::new(Some(0), Some(1000), 50);
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 50);

        let req = PageRequest::new(Some(3), Some(0), 50);
        assert_eq!(req.per_page, 1);
        assert_eq!(req.offset(), 2);
    }

    #[test]
    fn test_page_request_offset() {
        let req = PageRequest::new(Some(4), Some(20), MAX_PER_PAGE);
        assert_eq!(req.offset(), 60);
    }

    #[test]
    fn test_page_total_pages() {
        let req = PageRequest::new(Some(1), Some(20), MAX_PER_PAGE);
        assert_eq!(Page::<u8>::new(vec![], req, 0).total_pages, 0);
        assert_eq!(Page::<u8>::new(vec![], req, 20).total_pages, 1);
        assert_eq!(Page::<u8>::new(vec![], req, 21).total_pages, 2);
    }

    #[test]
    fn test_page_has_next_and_map() {
        let req = PageRequest::new(Some(1), Some(2), MAX_PER_PAGE);
        let page = Page::new(vec![1, 2], req, 5);
        assert!(page.has_next());

        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.total, 5);
    }

    #[test]
    fn test_cursor_decodes_to_same_key() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 15).unwrap();
        let id = Uuid::new_v4();

        let (decoded_ts, decoded_id) = decode_cursor(&encode_cursor(ts, id)).unwrap();
        assert_eq!(decoded_ts, ts);
        assert_eq!(decoded_id, id);
    }

    #[test]
    fn test_cursor_rejects_garbage() {
        assert!(matches!(
            decode_cursor("%%%"),
            Err(CursorError::InvalidEncoding)
        ));
        let no_sep = URL_SAFE_NO_PAD.encode("2024-01-01T00:00:00Z");
        assert!(matches!(
            decode_cursor(&no_sep),
            Err(CursorError::InvalidFormat)
        ));
        let bad_id = URL_SAFE_NO_PAD.encode("2024-01-01T00:00:00Z|nope");
        assert!(matches!(decode_cursor(&bad_id), Err(CursorError::InvalidId)));
        let bad_ts = URL_SAFE_NO_PAD.encode(format!("yesterday|{}", Uuid::nil()));
        assert!(matches!(
            decode_cursor(&bad_ts),
            Err(CursorError::InvalidTimestamp)
        ));
    }
}
