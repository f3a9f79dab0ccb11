//! Structured API queries and page planning.
//!
//! An [`ApiQuery`] keeps the endpoint path and its parameters apart and only
//! percent-encodes when rendered, so adding `page=` or `predictions=` never
//! needs to look for `?` in a string or re-encode an already encoded value.

use url::form_urlencoded;
use url::Url;

use crate::error::RetrieveError;

/// Endpoint path plus ordered query parameters (stored decoded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiQuery {
    path: String,
    params: Vec<(String, String)>,
}

impl ApiQuery {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    /// Path from raw segments, each percent-encoded so it stays one segment
    /// (`/`, `?`, `#` and `%` inside a term are escaped).
    pub fn from_segments<I, S>(segments: I) -> Result<Self, RetrieveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut scratch = Url::parse("http://segments.invalid/")
            .map_err(|e| RetrieveError::Query(format!("cannot build path: {e}")))?;
        scratch
            .path_segments_mut()
            .map_err(|()| RetrieveError::Query("cannot build path".to_string()))?
            .clear()
            .extend(segments);
        Ok(Self::new(scratch.path().trim_start_matches('/')))
    }

    /// Parse `path?k=v&...`, decoding the query part.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('?') {
            Some((path, query)) => Self {
                path: path.to_string(),
                params: form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect(),
            },
            None => Self::new(raw),
        }
    }

    /// Append a parameter (builder style).
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Replace the first `key` in place, or append it.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.params.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Add `predictions=1` unless already present.
    pub fn with_predictions(mut self, on: bool) -> Self {
        if on && !self.has("predictions") {
            self.set("predictions", "1");
        }
        self
    }

    /// Same query for one page.
    pub fn with_page(&self, page: u64) -> Self {
        let mut q = self.clone();
        q.set("page", page.to_string());
        q
    }

    /// Render as a relative reference (`path` or `path?k=v&...`).
    pub fn to_relative(&self) -> String {
        if self.params.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish();
        format!("{}?{}", self.path, query)
    }

    /// Absolute URL against an API base (which must end with `/`).
    pub fn resolve(&self, base: &Url) -> Result<Url, RetrieveError> {
        base.join(&self.to_relative())
            .map_err(|e| RetrieveError::Query(format!("cannot build URL for {}: {e}", self.path)))
    }
}

impl std::fmt::Display for ApiQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_relative())
    }
}

/// One planned page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTask {
    pub query: ApiQuery,
    /// `None` for a single-page result (no `page` parameter sent)
    pub page_index: Option<u64>,
}

/// Number of pages needed for `count` results.
pub fn page_count(count: u64, page_size: u64) -> u64 {
    if count == 0 {
        return 0;
    }
    (count - 1) / page_size.max(1) + 1
}

/// Enumerate the page requests for a search with `count` results.
///
/// Zero results plan nothing; a single page is requested without a `page`
/// parameter; otherwise pages `0..=last` are requested.
pub fn plan(count: u64, page_size: u64, base: &ApiQuery, predictions: bool) -> Vec<PageTask> {
    let pages = page_count(count, page_size);
    let base = base.clone().with_predictions(predictions);
    match pages {
        0 => Vec::new(),
        1 => vec![PageTask {
            query: base,
            page_index: None,
        }],
        n => (0..n)
            .map(|i| PageTask {
                query: base.with_page(i),
                page_index: Some(i),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_are_escaped_individually() {
        let q = ApiQuery::from_segments(["culturecollectionno", "DSM 1"]).unwrap();
        assert_eq!(q.path(), "culturecollectionno/DSM%201");

        let q = ApiQuery::from_segments(["taxon", "a/b?c#d%"]).unwrap();
        assert_eq!(q.path(), "taxon/a%2Fb%3Fc%23d%25");

        let base = Url::parse("https://api.bacdive.dsmz.de/").unwrap();
        assert_eq!(
            q.resolve(&base).unwrap().as_str(),
            "https://api.bacdive.dsmz.de/taxon/a%2Fb%3Fc%23d%25"
        );
    }

    fn urls(tasks: &[PageTask]) -> Vec<String> {
        tasks.iter().map(|t| t.query.to_relative()).collect()
    }

    #[test]
    fn plan_sizes() {
        let base = ApiQuery::new("taxon/Bacillus");
        for (count, expected) in [(0, 0), (1, 1), (100, 1), (101, 2), (250, 3)] {
            assert_eq!(plan(count, 100, &base, false).len(), expected, "count={count}");
        }
    }

    #[test]
    fn zero_count_is_empty() {
        assert!(plan(0, 100, &ApiQuery::new("x"), true).is_empty());
    }

    #[test]
    fn single_page_has_no_page_param() {
        let tasks = plan(42, 100, &ApiQuery::new("taxon/Bacillus"), false);
        assert_eq!(urls(&tasks), vec!["taxon/Bacillus"]);
        assert_eq!(tasks[0].page_index, None);
    }

    #[test]
    fn multi_page_without_existing_query() {
        let tasks = plan(150, 100, &ApiQuery::new("taxon/Bacillus"), false);
        assert_eq!(
            urls(&tasks),
            vec!["taxon/Bacillus?page=0", "taxon/Bacillus?page=1"]
        );
        let indices: Vec<_> = tasks.iter().map(|t| t.page_index).collect();
        assert_eq!(indices, vec![Some(0), Some(1)]);
    }

    #[test]
    fn multi_page_with_existing_query() {
        let base = ApiQuery::parse("advanced_search?taxon-name=Bacillus&is-legit=yes");
        let tasks = plan(201, 100, &base, false);
        assert_eq!(
            urls(&tasks),
            vec![
                "advanced_search?taxon-name=Bacillus&is-legit=yes&page=0",
                "advanced_search?taxon-name=Bacillus&is-legit=yes&page=1",
                "advanced_search?taxon-name=Bacillus&is-legit=yes&page=2",
            ]
        );
    }

    #[test]
    fn predictions_flag_added_once() {
        let base = ApiQuery::new("sequence_16s/AB1").with_predictions(true);
        let tasks = plan(101, 100, &base, true);
        assert_eq!(
            urls(&tasks),
            vec![
                "sequence_16s/AB1?predictions=1&page=0",
                "sequence_16s/AB1?predictions=1&page=1",
            ]
        );
    }

    #[test]
    fn negated_flexible_search_encodes_json_and_keeps_flag_order() {
        let base = ApiQuery::new("flexible_search")
            .param("search", r#"{"taxon_name": ["Bacillus", "Ba"]}"#)
            .param("not", "yes");
        let tasks = plan(120, 100, &base, false);
        assert_eq!(
            tasks[1].query.to_relative(),
            "flexible_search?search=%7B%22taxon_name%22%3A+%5B%22Bacillus%22%2C+%22Ba%22%5D%7D&not=yes&page=1"
        );
    }

    #[test]
    fn parse_decodes_then_reencodes_identically() {
        let raw = "flexible_search?search=%7B%22a%22%3A1%7D&not=yes";
        let q = ApiQuery::parse(raw);
        assert_eq!(q.get("search"), Some(r#"{"a":1}"#));
        assert_eq!(q.to_relative(), raw);
    }

    #[test]
    fn set_replaces_existing() {
        let mut q = ApiQuery::parse("x?page=3&a=b");
        q.set("page", "4");
        assert_eq!(q.to_relative(), "x?page=4&a=b");
    }

    #[test]
    fn resolve_against_base() {
        let base = Url::parse("https://api.bacdive.dsmz.de/").unwrap();
        let url = ApiQuery::new("culturecollectionno/DSM 1").resolve(&base).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.bacdive.dsmz.de/culturecollectionno/DSM%201"
        );
    }

    #[test]
    fn page_count_edges() {
        assert_eq!(page_count(0, 100), 0);
        assert_eq!(page_count(1, 100), 1);
        assert_eq!(page_count(100, 100), 1);
        assert_eq!(page_count(101, 100), 2);
        assert_eq!(page_count(5, 0), 5);
    }
}
