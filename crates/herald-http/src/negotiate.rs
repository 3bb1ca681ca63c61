//! `Accept` header negotiation

use http::HeaderMap;
use http::header::ACCEPT;
use mime::Mime;

pub const APPLICATION_JSON: &str = "application/json";
pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";

/// Media types the negotiating handler can produce, in preference order
pub const OFFERS: [&str; 3] = [TEXT_HTML, TEXT_PLAIN, APPLICATION_JSON];

/// One entry of an `Accept` header
#[derive(Debug, Clone, PartialEq, Eq)]
struct MediaRange {
    mime: Mime,
    /// Quality in thousandths
    quality: u16,
}

impl MediaRange {
    /// Parse one range; malformed ranges and out-of-range qualities are dropped
    fn parse(raw: &str) -> Option<Self> {
        let mime: Mime = raw.trim().parse().ok()?;
        let quality = match mime.get_param("q") {
            Some(value) => parse_quality(value.as_str())?,
            None => 1000,
        };

        Some(Self { mime, quality })
    }

    /// How specifically this range names `offer`, if it matches at all
    fn specificity(&self, offer: &str) -> Option<u8> {
        let (kind, subtype) = offer.split_once('/')?;
        let range_kind = self.mime.type_();
        let range_subtype = self.mime.subtype();

        if range_kind == mime::STAR && range_subtype == mime::STAR {
            return Some(0);
        }
        if !range_kind.as_str().eq_ignore_ascii_case(kind) {
            return None;
        }
        if range_subtype == mime::STAR {
            return Some(1);
        }
        range_subtype.as_str().eq_ignore_ascii_case(subtype).then_some(2)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_quality(value: &str) -> Option<u16> {
    let q: f32 = value.parse().ok()?;
    if !(0.0..=1.0).contains(&q) {
        return None;
    }
    Some((q * 1000.0).round() as u16)
}

/// Split an `Accept` value on the commas that separate ranges
///
/// Commas inside quoted parameter values belong to the parameter.
fn split_ranges(value: &str) -> Vec<&str> {
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ',' if !quoted => {
                ranges.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    ranges.push(&value[start..]);

    ranges
}

/// Pick the offer that best satisfies the request's `Accept` header
///
/// Each offer takes the quality of the most specific range that names it;
/// a quality of zero rules it out. Higher quality wins, then the more
/// specific match, then `default`, then the earlier offer. Without an
/// `Accept` header, or when nothing is acceptable, `default` is returned.
pub fn negotiate_content_type<'a>(headers: &HeaderMap, offers: &[&'a str], default: &'a str) -> &'a str {
    let ranges: Vec<MediaRange> = headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(split_ranges)
        .filter_map(MediaRange::parse)
        .collect();

    if ranges.is_empty() {
        return default;
    }

    let mut best: Option<(&'a str, (u16, u8, bool))> = None;
    for &offer in offers {
        let Some((quality, specificity)) = ranges
            .iter()
            .filter_map(|range| range.specificity(offer).map(|s| (range.quality, s)))
            .max_by_key(|&(_, specificity)| specificity)
        else {
            continue;
        };

        if quality == 0 {
            continue;
        }

        let score = (quality, specificity, offer == default);
        if best.is_none_or(|(_, current)| score > current) {
            best = Some((offer, score));
        }
    }

    best.map_or(default, |(offer, _)| offer)
}
