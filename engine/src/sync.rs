//! Officeholder consistency trigger, decision half
//!
//! Whenever a seat-term row is inserted or updated and ends up current
//! (no end date), two side effects follow:
//!
//! - the owning seat's cached holder name/party/caucus is overwritten with
//!   the term's values
//! - every future-dated, still-open `General` election of that seat gets its
//!   open-seat flag cleared
//!
//! [`compute_sync_effects`] decides those effects without touching storage;
//! `OfficeholderStore` applies them inside the transaction of the triggering
//! write.

use crate::model::{ElectionId, ElectionType, SeatId, SeatTerm};
use chrono::NaiveDate;

/// New values for a seat's cached holder columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatCacheUpdate {
    pub seat_id: SeatId,
    pub holder_name: Option<String>,
    pub party: Option<String>,
    pub caucus: Option<String>,
}

/// Open-seat state of one election, as seen by the trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionFlag {
    pub id: ElectionId,
    pub seat_id: SeatId,
    pub election_type: ElectionType,
    pub election_date: Option<NaiveDate>,
    pub is_open_seat: bool,
}

/// Everything a seat-term write must change alongside the row itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncEffects {
    pub seat_update: Option<SeatCacheUpdate>,
    /// Elections whose `is_open_seat` flag must be cleared
    pub election_updates: Vec<ElectionId>,
}

impl SyncEffects {
    pub fn is_empty(&self) -> bool {
        self.seat_update.is_none() && self.election_updates.is_empty()
    }
}

/// Decide the trigger's side effects for a freshly written seat term.
///
/// A closed term (end date set) produces no effects. `elections` may contain
/// rows of other seats; they are ignored. Only elections dated strictly after
/// `today` qualify, and an election without a date never does.
pub fn compute_sync_effects(
    term: &SeatTerm,
    holder_name: Option<&str>,
    elections: &[ElectionFlag],
    today: NaiveDate,
) -> SyncEffects {
    if !term.is_current() {
        return SyncEffects::default();
    }

    let seat_update = SeatCacheUpdate {
        seat_id: term.seat_id,
        holder_name: holder_name.map(str::to_string),
        party: term.party.clone(),
        caucus: term.caucus.clone(),
    };

    let election_updates = elections
        .iter()
        .filter(|e| e.seat_id == term.seat_id)
        .filter(|e| e.election_type == ElectionType::General)
        .filter(|e| e.is_open_seat)
        .filter(|e| e.election_date.is_some_and(|d| d > today))
        .map(|e| e.id)
        .collect();

    SyncEffects {
        seat_update: Some(seat_update),
        election_updates,
    }
}
