//! Live overlay fetcher
//!
//! Pulls in-progress results for one district from the live election source
//! and returns an explicit [`OverlayOutcome`]. The fetch:
//!
//! - is skipped when no target-year election in the district is still open
//!   to change (none exist, or all are certified)
//! - is served from the [`OverlayCache`] when a fresh entry exists
//! - otherwise issues exactly one batched query for every seat of the
//!   district, bounded by a timeout, with no retry
//!
//! Any failure yields [`OverlayOutcome::Degraded`] and the caller keeps the
//! static snapshot.

use crate::config::{LiveConfig, SeatwatchConfig};
use crate::errors::{Result, SeatwatchError};
use crate::merge::{merge_live, order_candidates};
use crate::model::{
    CandidacyResult, CandidateView, DistrictSnapshot, ElectionType, ElectionView, ResultStatus,
    SeatId,
};
use crate::overlay_cache::{CacheRead, OverlayCache, SqliteOverlayStore};
use crate::store::distinct_caucus;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Live elections grouped by seat, target year only
pub type LivePayload = BTreeMap<SeatId, Vec<ElectionView>>;

// ─────────────────────────────────────────────────────────────────────────────
// Wire rows
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LiveCandidateName {
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveCandidacyRow {
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub caucus: Option<String>,
    #[serde(default)]
    pub votes_received: Option<i64>,
    #[serde(default)]
    pub vote_percentage: Option<f64>,
    #[serde(default)]
    pub result: Option<CandidacyResult>,
    #[serde(default)]
    pub is_incumbent: Option<bool>,
    #[serde(default)]
    pub is_write_in: Option<bool>,
    #[serde(default)]
    pub candidates: Option<LiveCandidateName>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveElectionRow {
    pub id: i64,
    pub seat_id: SeatId,
    pub election_type: ElectionType,
    #[serde(default)]
    pub election_date: Option<NaiveDate>,
    pub election_year: i32,
    #[serde(default)]
    pub result_status: Option<ResultStatus>,
    #[serde(default)]
    pub total_votes_cast: Option<i64>,
    #[serde(default)]
    pub is_open_seat: Option<bool>,
    #[serde(default)]
    pub filing_deadline: Option<NaiveDate>,
    #[serde(default)]
    pub forecast_rating: Option<String>,
    #[serde(default)]
    pub candidacies: Vec<LiveCandidacyRow>,
}

impl LiveCandidacyRow {
    fn into_view(self) -> Option<CandidateView> {
        let name = self.candidates.and_then(|c| c.full_name)?;
        Some(CandidateView {
            name,
            caucus: distinct_caucus(self.party.as_deref(), self.caucus),
            party: self.party,
            votes: self.votes_received,
            pct: self.vote_percentage,
            result: self.result,
            is_incumbent: self.is_incumbent.unwrap_or(false),
            is_write_in: self.is_write_in.unwrap_or(false),
        })
    }
}

impl LiveElectionRow {
    fn into_view(self) -> ElectionView {
        let mut candidates: Vec<CandidateView> = self
            .candidacies
            .into_iter()
            .filter_map(LiveCandidacyRow::into_view)
            .collect();
        order_candidates(&mut candidates);

        ElectionView {
            year: self.election_year,
            election_type: self.election_type,
            date: self.election_date,
            total_votes: self.total_votes_cast,
            is_open_seat: self.is_open_seat.unwrap_or(false),
            result_status: self.result_status,
            filing_deadline: self.filing_deadline,
            forecast_rating: self.forecast_rating,
            candidates,
        }
    }
}

/// Group live rows by seat, dropping rows of any other year. Within a seat
/// elections follow the static export order (type, then id).
pub fn group_live_rows(mut rows: Vec<LiveElectionRow>, year: i32) -> LivePayload {
    rows.retain(|r| r.election_year == year);
    rows.sort_by(|a, b| {
        a.seat_id
            .cmp(&b.seat_id)
            .then_with(|| a.election_type.as_str().cmp(b.election_type.as_str()))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut payload = LivePayload::new();
    for row in rows {
        payload.entry(row.seat_id).or_default().push(row.into_view());
    }
    payload
}

// ─────────────────────────────────────────────────────────────────────────────
// Outcomes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    NoSeats,
    NoTargetYearElections,
    AllCertified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradeReason {
    Timeout { after_ms: u64 },
    Transport(String),
    HttpStatus(u16),
    Decode(String),
    NotConfigured(String),
}

impl DegradeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Transport(_) => "transport",
            Self::HttpStatus(_) => "http_status",
            Self::Decode(_) => "decode",
            Self::NotConfigured(_) => "not_configured",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayOutcome {
    Skipped(SkipReason),
    Cached(LivePayload),
    Fetched(LivePayload),
    Degraded(DegradeReason),
}

impl OverlayOutcome {
    pub fn payload(&self) -> Option<&LivePayload> {
        match self {
            Self::Cached(p) | Self::Fetched(p) => Some(p),
            Self::Skipped(_) | Self::Degraded(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped(_) => "skipped",
            Self::Cached(_) => "cached",
            Self::Fetched(_) => "fetched",
            Self::Degraded(_) => "degraded",
        }
    }
}

/// `Some(reason)` when the district needs no live query for `year`
pub fn needs_live_fetch(snapshot: &DistrictSnapshot, year: i32) -> Option<SkipReason> {
    if snapshot.seats.is_empty() {
        return Some(SkipReason::NoSeats);
    }

    let mut target = snapshot
        .seats
        .iter()
        .flat_map(|s| s.elections.iter())
        .filter(|e| e.year == year)
        .peekable();

    if target.peek().is_none() {
        return Some(SkipReason::NoTargetYearElections);
    }

    if target.all(|e| e.result_status.is_some_and(|s| s.is_terminal())) {
        return Some(SkipReason::AllCertified);
    }

    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Source seam
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum LiveSourceError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("server error: HTTP {status} - {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode live rows: {0}")]
    Decode(String),

    #[error("live source not configured: {0}")]
    NotConfigured(String),
}

impl From<LiveSourceError> for DegradeReason {
    fn from(err: LiveSourceError) -> Self {
        match err {
            LiveSourceError::Transport(msg) => Self::Transport(msg),
            LiveSourceError::Status { status, .. } => Self::HttpStatus(status),
            LiveSourceError::Decode(msg) => Self::Decode(msg),
            LiveSourceError::NotConfigured(msg) => Self::NotConfigured(msg),
        }
    }
}

/// One batched query for all `seat_ids`, restricted to `year`
#[async_trait]
pub trait LiveElectionSource: Send + Sync {
    async fn fetch_elections(
        &self,
        seat_ids: &[SeatId],
        year: i32,
    ) -> std::result::Result<Vec<LiveElectionRow>, LiveSourceError>;
}

/// PostgREST-style REST source (`/rest/v1/elections`)
pub struct RestLiveSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestLiveSource {
    /// Columns plus nested candidacies and candidate names
    pub const SELECT: &'static str = "id,seat_id,election_type,election_date,election_year,\
result_status,total_votes_cast,is_open_seat,filing_deadline,forecast_rating,\
candidacies(party,caucus,votes_received,vote_percentage,result,is_incumbent,is_write_in,\
candidates(full_name))";

    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| SeatwatchError::live_fetch_with_source("failed to build HTTP client", e))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(cfg: &LiveConfig) -> Result<Self> {
        Self::new(cfg.base_url.clone(), cfg.resolved_api_key())
    }

    pub fn elections_url(&self) -> String {
        format!("{}/rest/v1/elections", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LiveElectionSource for RestLiveSource {
    async fn fetch_elections(
        &self,
        seat_ids: &[SeatId],
        year: i32,
    ) -> std::result::Result<Vec<LiveElectionRow>, LiveSourceError> {
        if self.base_url.is_empty() {
            return Err(LiveSourceError::NotConfigured("live.base_url is empty".to_string()));
        }

        let ids = seat_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .client
            .get(self.elections_url())
            .query(&[
                ("select", Self::SELECT.to_string()),
                ("election_year", format!("eq.{year}")),
                ("seat_id", format!("in.({ids})")),
            ])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| LiveSourceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LiveSourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Vec<LiveElectionRow>>()
            .await
            .map_err(|e| LiveSourceError::Decode(e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fetcher
// ─────────────────────────────────────────────────────────────────────────────

/// Static snapshot with the overlay applied (or not), plus what happened
#[derive(Debug, Clone)]
pub struct ReconciledDistrict {
    pub snapshot: DistrictSnapshot,
    pub outcome: OverlayOutcome,
}

pub struct LiveOverlayFetcher {
    source: Arc<dyn LiveElectionSource>,
    cache: OverlayCache,
    year: i32,
    timeout: Duration,
    enabled: bool,
}

impl LiveOverlayFetcher {
    pub fn new(
        source: Arc<dyn LiveElectionSource>,
        cache: OverlayCache,
        year: i32,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            cache,
            year,
            timeout,
            enabled: true,
        }
    }

    /// REST source plus an in-memory or file-backed cache, per config
    pub fn from_config(cfg: &SeatwatchConfig) -> Result<Self> {
        let source = Arc::new(RestLiveSource::from_config(&cfg.live)?);
        let cache = match cfg.resolved_cache_path() {
            Some(path) => {
                OverlayCache::new(Arc::new(SqliteOverlayStore::open(&path)?), cfg.cache.ttl())
            }
            None => OverlayCache::in_memory(cfg.cache.ttl()),
        };

        Ok(
            Self::new(source, cache, cfg.live.cycle_year, cfg.live.timeout())
                .with_enabled(cfg.live.enabled),
        )
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Decide, consult the cache, and fetch if needed. `now_ms` is the
    /// caller's epoch-millisecond clock, used for TTL checks and as the
    /// stored fetch time.
    pub async fn fetch(&self, snapshot: &DistrictSnapshot, now_ms: i64) -> OverlayOutcome {
        if !self.enabled {
            return OverlayOutcome::Skipped(SkipReason::Disabled);
        }

        if let Some(reason) = needs_live_fetch(snapshot, self.year) {
            tracing::debug!(
                district_id = snapshot.district_id,
                reason = ?reason,
                "Live overlay not needed"
            );
            return OverlayOutcome::Skipped(reason);
        }

        let seat_ids = snapshot.seat_ids();

        match self.cache.read(&seat_ids, self.year, now_ms) {
            CacheRead::Hit(payload) => return OverlayOutcome::Cached(payload),
            CacheRead::Miss | CacheRead::Expired { .. } | CacheRead::Unavailable => {}
        }

        let request = self.source.fetch_elections(&seat_ids, self.year);
        let rows = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                tracing::warn!(
                    district_id = snapshot.district_id,
                    error = %e,
                    "Live overlay fetch failed, using static data"
                );
                return OverlayOutcome::Degraded(e.into());
            }
            Err(_) => {
                let after_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(
                    district_id = snapshot.district_id,
                    after_ms,
                    "Live overlay fetch timed out, using static data"
                );
                return OverlayOutcome::Degraded(DegradeReason::Timeout { after_ms });
            }
        };

        let row_count = rows.len();
        let payload = group_live_rows(rows, self.year);
        self.cache.write(&seat_ids, self.year, &payload, now_ms);

        tracing::debug!(
            district_id = snapshot.district_id,
            rows = row_count,
            seats = payload.len(),
            "Live overlay fetched"
        );

        OverlayOutcome::Fetched(payload)
    }

    /// Fetch and merge. Without a payload the static snapshot is returned
    /// as is.
    pub async fn reconcile(&self, snapshot: DistrictSnapshot, now_ms: i64) -> ReconciledDistrict {
        let outcome = self.fetch(&snapshot, now_ms).await;
        let snapshot = match outcome.payload() {
            Some(payload) => merge_live(&snapshot, payload, self.year),
            None => snapshot,
        };
        ReconciledDistrict { snapshot, outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SeatView;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        rows: Vec<LiveElectionRow>,
    }

    #[async_trait]
    impl LiveElectionSource for CountingSource {
        async fn fetch_elections(
            &self,
            _seat_ids: &[SeatId],
            _year: i32,
        ) -> std::result::Result<Vec<LiveElectionRow>, LiveSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl LiveElectionSource for FailingSource {
        async fn fetch_elections(
            &self,
            _seat_ids: &[SeatId],
            _year: i32,
        ) -> std::result::Result<Vec<LiveElectionRow>, LiveSourceError> {
            Err(LiveSourceError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    fn row(seat_id: SeatId, year: i32, status: Option<ResultStatus>) -> LiveElectionRow {
        LiveElectionRow {
            id: seat_id * 100 + i64::from(year % 100),
            seat_id,
            election_type: ElectionType::General,
            election_date: None,
            election_year: year,
            result_status: status,
            total_votes_cast: Some(1_000),
            is_open_seat: None,
            filing_deadline: None,
            forecast_rating: None,
            candidacies: Vec::new(),
        }
    }

    fn static_election(year: i32, status: Option<ResultStatus>) -> ElectionView {
        ElectionView {
            year,
            election_type: ElectionType::General,
            date: None,
            total_votes: None,
            is_open_seat: true,
            result_status: status,
            filing_deadline: None,
            forecast_rating: None,
            candidates: Vec::new(),
        }
    }

    fn snapshot(statuses: &[Option<ResultStatus>]) -> DistrictSnapshot {
        DistrictSnapshot {
            district_id: 3,
            chamber: "Senate".to_string(),
            district_number: "4".to_string(),
            district_name: None,
            seats: statuses
                .iter()
                .enumerate()
                .map(|(i, status)| SeatView {
                    seat_id: i as i64 + 1,
                    seat_label: "Seat".to_string(),
                    current_holder: None,
                    current_holder_party: None,
                    current_holder_caucus: None,
                    elections: vec![static_election(2026, *status)],
                })
                .collect(),
        }
    }

    fn fetcher(source: Arc<dyn LiveElectionSource>) -> LiveOverlayFetcher {
        LiveOverlayFetcher::new(
            source,
            OverlayCache::in_memory(Duration::from_secs(60)),
            2026,
            Duration::from_secs(8),
        )
    }

    #[test]
    fn test_needs_live_fetch() {
        let certified = snapshot(&[Some(ResultStatus::Certified), Some(ResultStatus::Certified)]);
        assert_eq!(needs_live_fetch(&certified, 2026), Some(SkipReason::AllCertified));
        assert_eq!(needs_live_fetch(&certified, 2028), Some(SkipReason::NoTargetYearElections));

        let mixed = snapshot(&[Some(ResultStatus::Certified), Some(ResultStatus::Called)]);
        assert_eq!(needs_live_fetch(&mixed, 2026), None);
    }

    #[test]
    fn test_group_live_rows_drops_other_years() {
        let payload = group_live_rows(
            vec![row(2, 2026, None), row(1, 2024, None), row(1, 2026, None)],
            2026,
        );
        assert_eq!(payload.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!(payload.values().flatten().all(|e| e.year == 2026));
    }

    #[test]
    fn test_nameless_candidacies_are_dropped() {
        let json = r#"[{
            "id": 9, "seat_id": 1, "election_type": "General", "election_year": 2026,
            "candidacies": [
                {"party": "D", "votes_received": 10, "candidates": {"full_name": "Named"}},
                {"party": "R", "votes_received": 20, "candidates": null}
            ]
        }]"#;
        let rows: Vec<LiveElectionRow> = serde_json::from_str(json).expect("parse");
        let payload = group_live_rows(rows, 2026);
        assert_eq!(payload[&1][0].candidates.len(), 1);
        assert_eq!(payload[&1][0].candidates[0].name, "Named");
    }

    #[tokio::test]
    async fn test_all_certified_makes_no_call() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            rows: Vec::new(),
        });
        let f = fetcher(source.clone());
        let outcome = f.fetch(&snapshot(&[Some(ResultStatus::Certified)]), 0).await;
        assert_eq!(outcome, OverlayOutcome::Skipped(SkipReason::AllCertified));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_fetch_within_ttl_uses_cache() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            rows: vec![row(1, 2026, Some(ResultStatus::Counting))],
        });
        let f = fetcher(source.clone());
        let snap = snapshot(&[None]);

        let first = f.fetch(&snap, 1_000).await;
        assert_eq!(first.label(), "fetched");
        let second = f.fetch(&snap, 30_000).await;
        assert_eq!(second.label(), "cached");
        let third = f.fetch(&snap, 61_000).await;
        assert_eq!(third.label(), "fetched");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shared_cache_does_not_cross_cycles() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            rows: vec![row(1, 2026, None), row(1, 2024, Some(ResultStatus::Called))],
        });
        let cache = OverlayCache::in_memory(Duration::from_secs(60));
        let current = LiveOverlayFetcher::new(
            source.clone(),
            cache.clone(),
            2026,
            Duration::from_secs(8),
        );
        let previous = LiveOverlayFetcher::new(
            source.clone(),
            cache,
            2024,
            Duration::from_secs(8),
        );
        assert_eq!(previous.year(), 2024);

        let mut snap = snapshot(&[None]);
        snap.seats[0].elections.push(static_election(2024, Some(ResultStatus::Counting)));

        assert_eq!(current.fetch(&snap, 1_000).await.label(), "fetched");
        let outcome = previous.fetch(&snap, 2_000).await;
        assert_eq!(outcome.label(), "fetched");
        let payload = outcome.payload().expect("payload");
        assert!(payload.values().flatten().all(|e| e.year == 2024));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disabled_skips() {
        let f = fetcher(Arc::new(FailingSource)).with_enabled(false);
        let outcome = f.fetch(&snapshot(&[None]), 0).await;
        assert_eq!(outcome, OverlayOutcome::Skipped(SkipReason::Disabled));
    }

    #[tokio::test]
    async fn test_failure_degrades_to_static() {
        let f = fetcher(Arc::new(FailingSource));
        let snap = snapshot(&[None]);
        let reconciled = f.reconcile(snap.clone(), 0).await;
        assert_eq!(
            reconciled.outcome,
            OverlayOutcome::Degraded(DegradeReason::HttpStatus(503))
        );
        assert_eq!(reconciled.snapshot, snap);
    }

    #[tokio::test]
    async fn test_reconcile_applies_payload() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            rows: vec![row(1, 2026, Some(ResultStatus::Called))],
        });
        let f = fetcher(source);
        let reconciled = f.reconcile(snapshot(&[Some(ResultStatus::Counting)]), 0).await;
        let election = &reconciled.snapshot.seats[0].elections[0];
        assert_eq!(election.result_status, Some(ResultStatus::Called));
        assert_eq!(election.total_votes, Some(1_000));
    }
}
