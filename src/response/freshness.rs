//! Conditional-request evaluation.
//!
//! A 200 response carrying `Last-Modified` or `ETag` is downgraded to 304 with
//! an empty body when the request's `If-Modified-Since` / `If-None-Match`
//! shows the client already has it. Either signal alone is enough. Malformed
//! conditional headers never match; they are not errors.

use super::record::{find_header, HeaderVec, ResponseRecord};
use super::reply::Body;
use tracing::debug;

/// Which conditional header produced a 304.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The response stands as-is
    Stale,
    /// `Last-Modified` is not after `If-Modified-Since`
    NotModifiedSince,
    /// `ETag` equals `If-None-Match`
    EtagMatch,
}

/// Evaluate and apply freshness to `record`.
///
/// Only 200 responses are considered. `Last-Modified` is rewritten in
/// canonical HTTP-date form when it parses.
pub fn check(record: &mut ResponseRecord, request_headers: &HeaderVec) -> Freshness {
    if record.code != 200 {
        return Freshness::Stale;
    }

    let mut outcome = Freshness::Stale;

    if let Some(modified) = record
        .get_header("last-modified")
        .and_then(|v| httpdate::parse_http_date(v).ok())
    {
        record.set_header("Last-Modified", httpdate::fmt_http_date(modified));
        let since = find_header(request_headers, "if-modified-since")
            .and_then(|v| httpdate::parse_http_date(v).ok());
        if since.is_some_and(|since| modified <= since) {
            outcome = Freshness::NotModifiedSince;
        }
    }

    if outcome == Freshness::Stale {
        if let (Some(etag), Some(candidate)) = (
            record.get_header("etag"),
            find_header(request_headers, "if-none-match"),
        ) {
            if etag == candidate {
                outcome = Freshness::EtagMatch;
            }
        }
    }

    if outcome != Freshness::Stale {
        debug!(outcome = ?outcome, "Response not modified");
        record.code = 304;
        record.body = Body::Empty;
    }
    outcome
}
