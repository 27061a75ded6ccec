use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use unicode_normalization::UnicodeNormalization;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Clean one reported value. Narrative disclosures occasionally embed markup
/// fragments inside the fact text; those are reduced to their text content.
/// Plain values pass through unchanged apart from trimming.
pub fn sanitize_value(raw: &str) -> String {
    let mut value = raw.trim().to_string();

    if value.contains('<') {
        let fragment = Html::parse_fragment(&value);
        value = fragment
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ");
    }

    let value = WHITESPACE_RE.replace_all(&value, " ");
    value.trim().nfkc().collect()
}
