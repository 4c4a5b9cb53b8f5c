//! Order- and case-preserving header storage, plus a `Cache-Control`
//! tokenizer.
//!
//! The teacher crate's `HttpHeaders` type normalizes names to lowercase on
//! insert, which is fine for a client-side cache key but loses the original
//! casing a stored response must replay byte-for-byte. `RawHeaders` keeps the
//! name as received and only lowercases for comparison, never for storage.

use std::collections::HashMap;

/// A header block as received: insertion order and original name casing are
/// preserved; lookups are case-insensitive per RFC 7230.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawHeaders {
    entries: Vec<(String, String)>,
}

impl RawHeaders {
    /// Creates an empty header block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header, preserving any existing header with the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Returns the value of the first header matching `name`
    /// (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value for headers matching `name` (case-insensitive),
    /// in the order they appear.
    pub fn get_all<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Removes every header matching `name` (case-insensitive).
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Iterates the header block in original wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of header fields (counting repeated names separately).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no header fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the block as a CRLF-terminated header section, without the
    /// final blank-line separator (the caller appends that).
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, value) in &self.entries {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out
    }

    /// Byte length of the serialized header block (see [`Self::to_wire_bytes`]).
    pub fn wire_len(&self) -> usize {
        self.entries
            .iter()
            .map(|(k, v)| k.len() + 2 + v.len() + 2)
            .sum()
    }
}

impl FromIterator<(String, String)> for RawHeaders {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

/// A parsed `Cache-Control` header: bare tokens (`no-store`) and
/// `token=value` directives (`max-age=60`), both case-insensitive on the
/// directive name.
///
/// Matching is by comma-separated token, never by substring — the original
/// implementation's `string::find("no-store")` would also match a
/// (hypothetical) directive named `x-no-storeback`; this tokenizer only
/// matches whole directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    tokens: HashMap<String, Option<String>>,
}

impl CacheControl {
    /// Parses a raw `Cache-Control` header value into directive tokens.
    pub fn parse(raw: &str) -> Self {
        let mut tokens = HashMap::new();
        for part in raw.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once('=') {
                Some((name, value)) => {
                    let name = name.trim().to_ascii_lowercase();
                    let value = value.trim().trim_matches('"').to_string();
                    tokens.insert(name, Some(value));
                }
                None => {
                    tokens.insert(part.to_ascii_lowercase(), None);
                }
            }
        }
        Self { tokens }
    }

    /// Parses the first `Cache-Control` header out of a header block,
    /// returning an empty (no directives) value if there isn't one.
    pub fn from_headers(headers: &RawHeaders) -> Self {
        match headers.get("Cache-Control") {
            Some(raw) => Self::parse(raw),
            None => Self::default(),
        }
    }

    /// True if the bare directive (no `=value`) is present. A directive that
    /// does carry a value for this name still counts as present for
    /// `contains`-style checks (e.g. `max-stale` vs `max-stale=10`).
    pub fn contains(&self, directive: &str) -> bool {
        self.tokens.contains_key(directive)
    }

    /// Returns the value half of a `token=value` directive, if present and
    /// carrying a value.
    pub fn value_of(&self, directive: &str) -> Option<&str> {
        self.tokens.get(directive).and_then(|v| v.as_deref())
    }

    /// Parses a directive's value as a non-negative integer number of
    /// seconds. Returns `None` if the directive is absent, has no value, or
    /// the value is not a non-negative integer.
    pub fn seconds_of(&self, directive: &str) -> Option<u64> {
        self.value_of(directive)?.parse::<u64>().ok()
    }

    /// True if the directive is present at all (with or without a value).
    pub fn has(&self, directive: &str) -> bool {
        self.tokens.contains_key(directive)
    }

    /// True if no directives were parsed at all.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_headers_preserve_order_and_casing() {
        let mut h = RawHeaders::new();
        h.push("ETag", "\"v1\"");
        h.push("X-Custom", "a");
        h.push("x-custom", "b");
        let collected: Vec<_> = h.iter().collect();
        assert_eq!(
            collected,
            vec![("ETag", "\"v1\""), ("X-Custom", "a"), ("x-custom", "b")]
        );
        assert_eq!(h.get("etag"), Some("\"v1\""));
        assert_eq!(h.get_all("x-custom").collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn cache_control_tokenizes_bare_and_valued_directives() {
        let cc = CacheControl::parse("no-cache, max-age=60, max-stale");
        assert!(cc.contains("no-cache"));
        assert_eq!(cc.seconds_of("max-age"), Some(60));
        assert!(cc.contains("max-stale"));
        assert_eq!(cc.value_of("max-stale"), None);
    }

    #[test]
    fn cache_control_does_not_substring_match() {
        let cc = CacheControl::parse("x-no-storeback=1");
        assert!(!cc.contains("no-store"));
    }

    #[test]
    fn cache_control_negative_or_nonnumeric_max_age_is_skipped() {
        let cc = CacheControl::parse("max-age=-5");
        assert_eq!(cc.seconds_of("max-age"), None);
        let cc2 = CacheControl::parse("max-age=banana");
        assert_eq!(cc2.seconds_of("max-age"), None);
    }

    #[test]
    fn cache_control_is_case_insensitive_on_directive_name() {
        let cc = CacheControl::parse("No-Store, MAX-AGE=30");
        assert!(cc.contains("no-store"));
        assert_eq!(cc.seconds_of("max-age"), Some(30));
    }

    #[test]
    fn empty_cache_control_has_no_directives() {
        let headers = RawHeaders::new();
        let cc = CacheControl::from_headers(&headers);
        assert!(!cc.contains("no-store"));
        assert_eq!(cc.seconds_of("max-age"), None);
    }
}
