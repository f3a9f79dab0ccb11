//! Batch resolver: page of identifiers -> one `fetch/` call -> records.

use serde::Serialize;
use serde_json::Value;

use crate::auth::AuthProvider;
use crate::context::ClientContext;
use crate::error::RetrieveError;
use crate::gate::Connector;
use crate::pagination::{ApiQuery, PageTask};

/// One record as returned by the API's fetch endpoint. Read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    id: Option<String>,
    data: Value,
}

impl Record {
    pub fn new(id: Option<String>, data: Value) -> Self {
        Self { id, data }
    }

    /// Source identifier (mapping key, or the record's `id` field)
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }
}

/// Records resolved for one page. `degraded` marks a page whose failure was suppressed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRecords {
    pub records: Vec<Record>,
    pub degraded: bool,
}

impl PageRecords {
    fn degraded() -> Self {
        Self {
            records: Vec::new(),
            degraded: true,
        }
    }
}

/// Identifier list from a search page's `results`.
///
/// Identifiers may be numbers, strings, or objects carrying an `id`.
pub fn extract_ids(page: &Value) -> Option<Vec<String>> {
    let results = page.get("results")?.as_array()?;
    Some(results.iter().filter_map(id_of).collect())
}

/// Records from a fetch response; mapping- or sequence-shaped `results`.
/// Anything else yields no records.
pub fn extract_records(fetch: &Value) -> Vec<Record> {
    match fetch.get("results") {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, data)| Record::new(Some(key.clone()), data.clone()))
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|data| Record::new(data.get("id").and_then(id_of), data.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

fn id_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(obj) => obj.get("id").and_then(id_of),
        _ => None,
    }
}

/// `fetch/<id1>;<id2>;...`
pub fn fetch_query(ids: &[String]) -> ApiQuery {
    ApiQuery::new(format!("fetch/{}", ids.join(";")))
}

pub struct BatchResolver<'a, C: Connector, A> {
    ctx: &'a ClientContext<C, A>,
}

impl<'a, C: Connector, A: AuthProvider> BatchResolver<'a, C, A> {
    pub fn new(ctx: &'a ClientContext<C, A>) -> Self {
        Self { ctx }
    }

    /// Resolve one planned page. Only fatal errors escape; anything else
    /// is logged and the page counts as empty.
    pub async fn resolve(&self, page: &PageTask) -> Result<PageRecords, RetrieveError> {
        contain(self.try_resolve(&page.query).await)
    }

    /// Resolve identifiers known up front (no search page).
    pub async fn resolve_ids(&self, ids: &[String]) -> Result<PageRecords, RetrieveError> {
        contain(self.try_fetch(ids).await)
    }

    /// Page -> ids -> fetch, surfacing every error.
    pub async fn try_resolve(&self, page: &ApiQuery) -> Result<Vec<Record>, RetrieveError> {
        let page_json = self.get_json(page).await?;
        let Some(ids) = extract_ids(&page_json) else {
            let url = self.ctx.url_for(page)?;
            return Err(RetrieveError::malformed(
                url.as_str(),
                describe_missing_results(&page_json),
            ));
        };
        self.try_fetch(&ids).await
    }

    async fn try_fetch(&self, ids: &[String]) -> Result<Vec<Record>, RetrieveError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let fetch = self.get_json(&fetch_query(ids)).await?;
        let records = extract_records(&fetch);
        if records.is_empty() {
            log::warn!(
                "fetch of {} ids returned no records: {}",
                ids.len(),
                describe_missing_results(&fetch)
            );
        }
        Ok(records)
    }

    async fn get_json(&self, query: &ApiQuery) -> Result<Value, RetrieveError> {
        let url = self.ctx.url_for(query)?;
        let resp = self.ctx.executor().execute(url.as_str()).await?;
        serde_json::from_str(&resp.body).map_err(|e| {
            RetrieveError::malformed(url.as_str(), format!("HTTP {}: {e}", resp.status))
        })
    }
}

fn contain(result: Result<Vec<Record>, RetrieveError>) -> Result<PageRecords, RetrieveError> {
    match result {
        Ok(records) => Ok(PageRecords {
            records,
            degraded: false,
        }),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            log::warn!("{e}; page skipped");
            Ok(PageRecords::degraded())
        }
    }
}

/// Short diagnostic for a body without a usable `results` field.
fn describe_missing_results(body: &Value) -> String {
    let title = body.get("title").and_then(Value::as_str);
    let message = body.get("message").and_then(Value::as_str);
    match (title, message) {
        (Some(t), Some(m)) => format!("{t}: {m}"),
        (Some(s), None) | (None, Some(s)) => s.to_string(),
        (None, None) if body.get("results").is_some() => "unexpected results shape".to_string(),
        (None, None) => "no results field".to_string(),
    }
}
