//! Orchestrator: plan pages, resolve them concurrently, flatten, always close.
//!
//! ```text
//! Idle -> SessionAcquired -> Planning -> Dispatching -> Gathering -> Flattened -> Closed
//!                               |                                       ^
//!                               +-- count absent / zero ----------------+
//! ```
//!
//! All page futures are joined on the calling task; the admission gate is the
//! only limit on how many of them talk to the network at once.

use std::time::Instant;

use futures_util::future::join_all;
use indicatif::ProgressBar;

use crate::auth::AuthProvider;
use crate::context::ClientContext;
use crate::error::RetrieveError;
use crate::gate::Connector;
use crate::pagination::{page_count, plan, PageTask};
use crate::resolver::{PageRecords, Record};
use crate::runtime;
use crate::search::Search;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    SessionAcquired,
    Planning,
    Dispatching,
    Gathering,
    Flattened,
    Closed,
}

/// Records of one run plus what it took to get them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Retrieval {
    pub records: Vec<Record>,
    /// Pages (or id chunks) dispatched
    pub pages: usize,
    /// Pages whose failure was suppressed
    pub failed_pages: usize,
}

/// Unit of concurrent work.
enum Job {
    Page(PageTask),
    Ids(Vec<String>),
}

struct Tracker {
    phase: Phase,
}

impl Tracker {
    fn advance(&mut self, next: Phase) {
        log::debug!("retrieve: {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }
}

impl<C: Connector, A: AuthProvider> ClientContext<C, A> {
    /// Fetch every record of `search`.
    pub async fn retrieve(&self, search: &Search) -> Result<Vec<Record>, RetrieveError> {
        self.retrieve_with_summary(search, &ProgressBar::hidden())
            .await
            .map(|r| r.records)
    }

    /// Blocking variant of [`retrieve`](Self::retrieve) on the shared runtime.
    ///
    /// Must not be called from inside an async context.
    pub fn retrieve_blocking(&self, search: &Search) -> Result<Vec<Record>, RetrieveError> {
        runtime::block_on(self.retrieve(search))
    }

    /// Fetch every record, ticking `pb` once per resolved page.
    ///
    /// The session is closed before returning, on success and on error.
    pub async fn retrieve_with_summary(
        &self,
        search: &Search,
        pb: &ProgressBar,
    ) -> Result<Retrieval, RetrieveError> {
        let start = Instant::now();
        let mut tracker = Tracker { phase: Phase::Idle };
        let result = self.run(search, pb, &mut tracker).await;

        self.close().await;
        tracker.advance(Phase::Closed);

        match &result {
            Ok(r) => log::info!(
                "retrieved {} records from {} pages ({} failed) in {:.1}s",
                r.records.len(),
                r.pages,
                r.failed_pages,
                start.elapsed().as_secs_f64()
            ),
            Err(e) => log::error!("retrieval aborted: {e}"),
        }
        result
    }

    async fn run(
        &self,
        search: &Search,
        pb: &ProgressBar,
        tracker: &mut Tracker,
    ) -> Result<Retrieval, RetrieveError> {
        self.gate().acquire_session().await?;
        tracker.advance(Phase::SessionAcquired);

        tracker.advance(Phase::Planning);
        let jobs = match self.plan_jobs(search) {
            Some(jobs) if !jobs.is_empty() => jobs,
            Some(_) => {
                log::info!("nothing to retrieve");
                tracker.advance(Phase::Flattened);
                return Ok(Retrieval::default());
            }
            None => {
                log::warn!("search has no usable result count, nothing to retrieve");
                tracker.advance(Phase::Flattened);
                return Ok(Retrieval::default());
            }
        };

        tracker.advance(Phase::Dispatching);
        pb.set_length(jobs.len() as u64);
        let resolver = self.resolver();
        let outcomes = join_all(jobs.iter().map(|job| async {
            let out = match job {
                Job::Page(task) => resolver.resolve(task).await,
                Job::Ids(ids) => resolver.resolve_ids(ids).await,
            };
            pb.inc(1);
            out
        }))
        .await;

        tracker.advance(Phase::Gathering);
        let pages = outcomes.len();
        let mut failed_pages = 0;
        let mut fatal = None;
        let mut per_page: Vec<PageRecords> = Vec::with_capacity(pages);
        for outcome in outcomes {
            match outcome {
                Ok(page) => {
                    failed_pages += usize::from(page.degraded);
                    per_page.push(page);
                }
                Err(e) => fatal = Some(e),
            }
        }
        if let Some(e) = fatal {
            return Err(e);
        }

        let records = per_page.into_iter().flat_map(|p| p.records).collect();
        tracker.advance(Phase::Flattened);
        Ok(Retrieval {
            records,
            pages,
            failed_pages,
        })
    }

    fn plan_jobs(&self, search: &Search) -> Option<Vec<Job>> {
        let count = search.count()?;
        let page_size = self.config().page_size.max(1);
        let jobs = match search {
            Search::Query { query, .. } => plan(count, page_size, query, self.predictions())
                .into_iter()
                .map(Job::Page)
                .collect(),
            Search::Ids(ids) => ids
                .chunks(page_size as usize)
                .map(|chunk| Job::Ids(chunk.to_vec()))
                .collect(),
        };
        log::debug!(
            "planned {} pages for {count} results",
            page_count(count, page_size)
        );
        Some(jobs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use serde_json::{json, Value};

    use super::*;
    use crate::config::HttpConfig;
    use crate::pagination::ApiQuery;
    use crate::testing::{context, context_with, MockUpstream, Reply};

    fn page_no(url: &str) -> Option<u64> {
        url::Url::parse(url)
            .ok()?
            .query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
    }

    /// Page `p` holds ids `p*10 .. p*10+3`; fetch echoes ids as a mapping.
    fn paged_upstream(url: &str) -> Reply {
        if let Some(ids) = url.split("/fetch/").nth(1) {
            let results: serde_json::Map<String, Value> = ids
                .split(';')
                .map(|id| (id.to_string(), json!({ "id": id })))
                .collect();
            return Reply::Status(200, json!({ "results": results }).to_string());
        }
        let p = page_no(url).unwrap_or(0);
        let ids: Vec<u64> = (p * 10..p * 10 + 3).collect();
        Reply::Status(200, json!({"count": 999, "results": ids}).to_string())
    }

    fn query_search(count: u64) -> Search {
        Search::Query {
            query: ApiQuery::new("taxon/Bacillus"),
            result: json!({"count": count, "results": []}),
        }
    }

    fn ids_of(records: &[Record]) -> BTreeSet<String> {
        records.iter().filter_map(|r| r.id().map(String::from)).collect()
    }

    #[tokio::test]
    async fn end_to_end_two_pages() {
        let upstream = MockUpstream::new(|url, _, _| paged_upstream(url));
        let ctx = context(upstream.clone(), 3);

        let out = ctx
            .retrieve_with_summary(&query_search(150), &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(out.pages, 2);
        assert_eq!(out.failed_pages, 0);
        let expected: BTreeSet<String> =
            ["0", "1", "2", "10", "11", "12"].map(String::from).into();
        assert_eq!(ids_of(&out.records), expected);

        let urls = upstream.urls();
        let pages: BTreeSet<Option<u64>> = urls
            .iter()
            .filter(|u| !u.contains("/fetch/"))
            .map(|u| page_no(u))
            .collect();
        assert_eq!(pages, BTreeSet::from([Some(0), Some(1)]));
        assert_eq!(urls.iter().filter(|u| u.contains("/fetch/")).count(), 2);
    }

    #[tokio::test]
    async fn zero_count_issues_no_requests() {
        let upstream = MockUpstream::new(|url, _, _| paged_upstream(url));
        let ctx = context(upstream.clone(), 3);

        let records = ctx.retrieve(&query_search(0)).await.unwrap();

        assert!(records.is_empty());
        assert_eq!(upstream.calls(), 0);
        assert!(!ctx.gate().is_open().await);
    }

    #[tokio::test]
    async fn missing_count_degrades_to_empty() {
        let upstream = MockUpstream::new(|url, _, _| paged_upstream(url));
        let ctx = context(upstream.clone(), 3);
        let search = Search::Query {
            query: ApiQuery::new("taxon/x"),
            result: json!({"title": "Error", "message": "boom"}),
        };

        let records = ctx.retrieve(&search).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn one_bad_page_of_five_is_contained() {
        let upstream = MockUpstream::new(|url, _, _| {
            if page_no(url) == Some(3) {
                Reply::Status(503, String::new())
            } else {
                paged_upstream(url)
            }
        });
        let ctx = context(upstream, 3);

        let out = ctx
            .retrieve_with_summary(&query_search(450), &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(out.pages, 5);
        assert_eq!(out.failed_pages, 1);
        assert_eq!(out.records.len(), 12);
        assert!(!ids_of(&out.records).contains("30"));
    }

    #[tokio::test]
    async fn admission_gate_bounds_concurrency() {
        let upstream =
            MockUpstream::with_latency(Duration::from_millis(5), |url, _, _| paged_upstream(url));
        let config = HttpConfig {
            max_in_flight: 3,
            ..crate::testing::config(3)
        };
        let ctx = context_with(upstream.clone(), config);

        let out = ctx.retrieve(&query_search(2000)).await.unwrap();

        assert_eq!(out.len(), 20 * 3);
        assert!(upstream.peak() <= 3, "peak {}", upstream.peak());
        assert!(upstream.peak() > 1, "pages should overlap");
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_aborts_and_still_closes() {
        let upstream = MockUpstream::new(|_, _, _| Reply::Status(401, "{}".into()));
        let ctx = context(upstream, 3);
        ctx.tokens().provider().set_failing(true);

        let err = ctx.retrieve(&query_search(250)).await.unwrap_err();

        assert!(matches!(err, RetrieveError::Auth(_)));
        // three pages hit the revoked token, one provider call between them
        assert_eq!(ctx.tokens().provider().refreshes(), 1);
        assert!(!ctx.gate().is_open().await);
        assert_eq!(ctx.gate().sessions_opened(), 1);
    }

    #[tokio::test]
    async fn ids_are_chunked_into_fetches() {
        let upstream = MockUpstream::new(|url, _, _| paged_upstream(url));
        let config = HttpConfig {
            page_size: 2,
            ..crate::testing::config(3)
        };
        let ctx = context_with(upstream.clone(), config);
        let search = Search::ids(["1;2;3;4;5"]).unwrap();

        let out = ctx
            .retrieve_with_summary(&search, &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(out.pages, 3);
        assert_eq!(out.records.len(), 5);
        assert!(upstream.urls().iter().all(|u| u.contains("/fetch/")));
    }

    #[tokio::test]
    async fn session_reused_across_pages_and_closed_once() {
        let upstream = MockUpstream::new(|url, _, _| paged_upstream(url));
        let ctx = context(upstream, 3);

        ctx.retrieve(&query_search(300)).await.unwrap();
        assert_eq!(ctx.gate().sessions_opened(), 1);
        assert!(!ctx.gate().is_open().await);

        // Explicit close after a run is a no-op
        ctx.close().await;
        assert!(!ctx.gate().close().await);
    }

    #[test]
    fn blocking_retrieve_drives_shared_runtime() {
        let upstream = MockUpstream::new(|url, _, _| paged_upstream(url));
        let ctx = context(upstream, 3);
        let records = ctx.retrieve_blocking(&query_search(50)).unwrap();
        assert_eq!(records.len(), 3);
    }
}
