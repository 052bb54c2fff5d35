//! Seatwatch engine
//!
//! Keeps seat officeholder data consistent and reconciles a static
//! per-district snapshot with live, in-progress election results.
//!
//! - `store`: SQLite officeholder store; seat-term writes synchronize the seat
//!   holder cache and open-seat flags in the same transaction
//! - `overlay_cache`: 60-second, order-independent per-district cache
//! - `live`: bounded, non-retrying live fetch with explicit outcomes
//! - `merge`: full replacement by year plus the canonical candidate order

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod config;
pub mod errors;
pub mod live;
pub mod merge;
pub mod model;
pub mod overlay_cache;
pub mod store;
pub mod sync;

pub use config::{CacheConfig, LiveConfig, RenderConfig, SeatwatchConfig};
pub use errors::{ErrorCategory, Result, SeatwatchError};
pub use live::{
    DegradeReason, LiveElectionRow, LiveElectionSource, LiveOverlayFetcher, LivePayload,
    LiveSourceError, OverlayOutcome, ReconciledDistrict, RestLiveSource, SkipReason,
    group_live_rows, needs_live_fetch,
};
pub use merge::{merge_live, order_candidates, seat_is_settled};
pub use model::{
    CandidacyResult, CandidateView, DistrictId, DistrictSnapshot, ElectionType, ElectionView,
    EndReason, NewCandidacy, NewDistrict, NewElection, NewSeat, NewSeatTerm, ResultStatus, Seat,
    SeatId, SeatTerm, SeatTermPatch, SeatView, StartReason,
};
pub use overlay_cache::{
    CacheRead, MemoryOverlayStore, OverlayCache, OverlayStore, SqliteOverlayStore,
    overlay_cache_key,
};
pub use store::OfficeholderStore;
pub use sync::{SyncEffects, compute_sync_effects};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Store plus live overlay, wired from one configuration
pub struct SeatwatchEngine {
    cfg: SeatwatchConfig,
    store: OfficeholderStore,
    fetcher: LiveOverlayFetcher,
}

impl SeatwatchEngine {
    pub fn with_config(cfg: SeatwatchConfig) -> Result<Self> {
        let store = OfficeholderStore::open(&cfg)?;
        let fetcher = LiveOverlayFetcher::from_config(&cfg)?;

        tracing::info!(
            version = VERSION,
            db_path = %cfg.resolved_db_path().display(),
            live_enabled = cfg.live.enabled,
            cycle_year = cfg.live.cycle_year,
            "Seatwatch engine initialized"
        );

        Ok(Self {
            cfg,
            store,
            fetcher,
        })
    }

    /// Assemble from prebuilt parts (tests, alternate sources)
    pub fn with_parts(
        cfg: SeatwatchConfig,
        store: OfficeholderStore,
        fetcher: LiveOverlayFetcher,
    ) -> Self {
        Self {
            cfg,
            store,
            fetcher,
        }
    }

    pub fn config(&self) -> &SeatwatchConfig {
        &self.cfg
    }

    pub fn store(&self) -> &OfficeholderStore {
        &self.store
    }

    pub fn fetcher(&self) -> &LiveOverlayFetcher {
        &self.fetcher
    }

    /// Static export of a district with the live overlay applied when
    /// available. `None` if the district does not exist.
    pub async fn district_view(
        &self,
        district_id: DistrictId,
        now_ms: i64,
    ) -> Result<Option<ReconciledDistrict>> {
        let Some(snapshot) = self.store.export_district(district_id)? else {
            return Ok(None);
        };

        let reconciled = self.fetcher.reconcile(snapshot, now_ms).await;

        tracing::info!(
            district_id,
            outcome = reconciled.outcome.label(),
            "District view reconciled"
        );

        Ok(Some(reconciled))
    }
}
