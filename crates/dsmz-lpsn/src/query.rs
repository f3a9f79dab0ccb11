//! LPSN search endpoints: `advanced_search` and `flexible_search`

use dsmz_core::{ApiQuery, RetrieveError};
use serde_json::Value;

/// Field-based search. Keys use `-` upstream, so `taxon_name` is sent as
/// `taxon-name`; boolean values are sent as `yes`/`no`.
pub fn advanced_query<I, K, V>(params: I) -> Result<ApiQuery, RetrieveError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut query = ApiQuery::new("advanced_search");
    for (key, value) in params {
        let key = key.as_ref().trim();
        if key.is_empty() {
            return Err(RetrieveError::Query("search parameter without a name".into()));
        }
        query = query.param(key.replace('_', "-"), upstream_value(value.as_ref().trim()));
    }
    if query.params().is_empty() {
        return Err(RetrieveError::Query("no search parameters given".into()));
    }
    Ok(query)
}

fn upstream_value(value: &str) -> &str {
    match value {
        "true" => "yes",
        "false" => "no",
        other => other,
    }
}

/// Search with a JSON expression; `negate` returns everything it does not match.
pub fn flexible_query(search: &Value, negate: bool) -> Result<ApiQuery, RetrieveError> {
    let empty = match search {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    };
    if empty {
        return Err(RetrieveError::Query("flexible search expression is empty".into()));
    }
    let mut query = ApiQuery::new("flexible_search").param("search", search.to_string());
    if negate {
        query = query.param("not", "yes");
    }
    Ok(query)
}
