//! Content negotiation between raw bytes and rendered pages
//!
//! The router offers two media ranges, `application/*` and `text/html`, in that
//! order. Anything other than a `text/html` win is served by the raw fast path,
//! so clients that send no `Accept` header (or `*/*`) get raw bytes.

use http::header::ACCEPT;
use http::HeaderMap;
use tracing::debug;

/// Media ranges offered to the client, in preference order
pub const OFFERED_TYPES: [&str; 2] = ["application/*", "text/html"];

/// How a request should be served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Literal file bytes through the raw fast path
    Raw,
    /// A rendered page through the resolver
    Rendered,
}

/// One parsed entry of an `Accept` header
#[derive(Debug, Clone, PartialEq)]
struct MediaRange {
    main: String,
    sub: String,
    q: f32,
    order: usize,
}

fn parse_media_range(entry: &str, order: usize) -> Option<MediaRange> {
    let mut parts = entry.split(';');
    let media = parts.next()?.trim();
    let (main, sub) = media.split_once('/')?;
    if main.is_empty() || sub.is_empty() {
        return None;
    }

    let mut q = 1.0;
    for param in parts {
        if let Some((key, value)) = param.split_once('=') {
            if key.trim().eq_ignore_ascii_case("q") {
                q = value.trim().parse::<f32>().ok()?.clamp(0.0, 1.0);
            }
        }
    }

    Some(MediaRange {
        main: main.trim().to_ascii_lowercase(),
        sub: sub.trim().to_ascii_lowercase(),
        q,
        order,
    })
}

fn parse_accept(header: &str) -> Vec<MediaRange> {
    header
        .split(',')
        .enumerate()
        .filter_map(|(order, entry)| parse_media_range(entry, order))
        .collect()
}

/// Priority of an offered type against the accepted ranges
#[derive(Debug, Clone, Copy)]
struct Priority {
    offer: usize,
    q: f32,
    specificity: u8,
    order: usize,
}

/// How specifically `range` names `offer`, or `None` when it does not match
///
/// An offer's own wildcard only matches a wildcard range, so `application/*`
/// is accepted by `application/*` or `*/*` but not by `application/json`.
fn specificity(offer: &str, range: &MediaRange) -> Option<u8> {
    let (main, sub) = offer.split_once('/')?;
    let mut score = 0;

    if range.main == main {
        score |= 4;
    } else if range.main != "*" {
        return None;
    }

    if range.sub == sub {
        score |= 2;
    } else if range.sub != "*" {
        return None;
    }

    Some(score)
}

fn priority_for(offer_index: usize, offer: &str, ranges: &[MediaRange]) -> Option<Priority> {
    ranges
        .iter()
        .filter_map(|range| {
            specificity(offer, range).map(|s| Priority {
                offer: offer_index,
                q: range.q,
                specificity: s,
                order: range.order,
            })
        })
        .max_by(|a, b| {
            a.specificity
                .cmp(&b.specificity)
                .then(a.q.total_cmp(&b.q))
                .then(b.order.cmp(&a.order))
        })
}

/// Pick the preferred offered type for an `Accept` header value
///
/// Returns `None` when nothing offered is acceptable.
pub fn preferred_type(accept: Option<&str>) -> Option<&'static str> {
    let accept = accept.map(str::trim).filter(|v| !v.is_empty()).unwrap_or("*/*");
    let ranges = parse_accept(accept);

    let mut priorities: Vec<Priority> = OFFERED_TYPES
        .iter()
        .enumerate()
        .filter_map(|(i, offer)| priority_for(i, offer, &ranges))
        .filter(|p| p.q > 0.0)
        .collect();

    priorities.sort_by(|a, b| {
        b.q.total_cmp(&a.q)
            .then(b.specificity.cmp(&a.specificity))
            .then(a.order.cmp(&b.order))
            .then(a.offer.cmp(&b.offer))
    });

    priorities.first().map(|p| OFFERED_TYPES[p.offer])
}

/// Decide once, before any upstream call, how the request is served
pub fn negotiate(headers: &HeaderMap) -> ResponseMode {
    let accept = headers.get(ACCEPT).and_then(|v| v.to_str().ok());
    let preferred = preferred_type(accept);

    let mode = match preferred {
        Some("text/html") => ResponseMode::Rendered,
        _ => ResponseMode::Raw,
    };

    debug!(
        "Negotiated response mode: accept={:?}, preferred={:?}, mode={:?}",
        accept, preferred, mode
    );
    mode
}
