//! Network-free extraction of the few values the client scrapes from HTML
//! pages: hidden login form fields, the profile identifier and the activity
//! subtitle timestamp.
//!
//! These helpers are deliberately narrow. They depend on the current page
//! layout of the site and are the first thing to revisit when it changes.

use regex::Regex;
use std::sync::LazyLock;

static INPUT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b([^>]*)>").expect("valid input regex"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .expect("valid attribute regex")
});

static ANCHOR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>").expect("valid anchor regex"));

static PROFILE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z][a-z0-9+.-]*://[^/]*)?/user/([^/?#\s]+)/profile(?:[/?#].*)?$")
        .expect("valid profile regex")
});

static SUBTITLE_DIV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<div\b[^>]*\bclass\s*=\s*["']\s*micro-text\s+activitySubTitle\s*["'][^>]*>(.*?)</div>"#,
    )
    .expect("valid subtitle regex")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

/// Name/value pairs of every `<input type="hidden">` in document order.
///
/// Inputs without a `name` are skipped; a missing `value` is the empty string.
pub fn extract_hidden_fields(html: &str) -> Vec<(String, String)> {
    INPUT_TAG
        .captures_iter(html)
        .filter_map(|cap| {
            let attrs = parse_attributes(&cap[1]);
            let is_hidden = attrs
                .iter()
                .any(|(k, v)| k.eq_ignore_ascii_case("type") && v.eq_ignore_ascii_case("hidden"));
            if !is_hidden {
                return None;
            }
            let name = attr_value(&attrs, "name")?;
            let value = attr_value(&attrs, "value").unwrap_or_default();
            Some((name, value))
        })
        .collect()
}

/// Profile identifier from the first `/user/<id>/profile` link.
pub fn extract_profile_id(html: &str) -> Option<String> {
    ANCHOR_TAG.captures_iter(html).find_map(|cap| {
        let href = attr_value(&parse_attributes(&cap[1]), "href")?;
        let id = PROFILE_PATH.captures(href.trim())?[1].to_string();
        (!id.is_empty()).then_some(id)
    })
}

/// Date/time text of the activity subtitle element.
///
/// Each text fragment inside the element keeps only what precedes its first
/// `-` (the rest is distance and similar trailing details), and the kept
/// pieces are concatenated.
pub fn extract_timestamp(html: &str) -> Option<String> {
    let inner = SUBTITLE_DIV.captures(html)?.get(1)?.as_str();
    let joined: String = TAG
        .split(inner)
        .map(|fragment| {
            let text = decode_entities(fragment);
            text.split('-').next().unwrap_or("").trim_end().to_string()
        })
        .collect();
    Some(joined.trim().to_string())
}

fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(raw)
        .map(|cap| {
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .or_else(|| cap.get(4))
                .map(|m| decode_entities(m.as_str()))
                .unwrap_or_default();
            (cap[1].to_string(), value)
        })
        .collect()
}

fn attr_value(attrs: &[(String, String)], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.clone())
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
