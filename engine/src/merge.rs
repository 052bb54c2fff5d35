//! Reconciliation merger
//!
//! Applies a live payload to a static district snapshot. Replacement is by
//! year and per seat: every target-year election of a seat that has live data
//! is dropped and the live elections take their place. Nothing is patched
//! field by field.

use crate::live::LivePayload;
use crate::model::{CandidacyResult, CandidateView, DistrictSnapshot, ElectionView, SeatView};
use std::cmp::Ordering;

fn result_rank(result: Option<CandidacyResult>) -> u8 {
    match result {
        Some(CandidacyResult::Won) => 0,
        Some(CandidacyResult::Advanced) => 1,
        _ => 2,
    }
}

/// Descending, with missing vote counts last
fn compare_votes(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Canonical candidate order: Won, then Advanced, then the rest; ties by
/// votes descending. The sort is stable, so remaining ties keep insertion
/// order.
pub fn order_candidates(candidates: &mut [CandidateView]) {
    candidates.sort_by(|a, b| {
        result_rank(a.result)
            .cmp(&result_rank(b.result))
            .then_with(|| compare_votes(a.votes, b.votes))
    });
}

/// True when the seat has target-year elections and all of them are
/// certified. Such seats are never overlaid.
pub fn seat_is_settled(seat: &SeatView, year: i32) -> bool {
    let mut target = seat.elections.iter().filter(|e| e.year == year).peekable();
    target.peek().is_some()
        && target.all(|e| e.result_status.is_some_and(|s| s.is_terminal()))
}

/// Merge `payload` into a copy of `snapshot` for election year `year`.
pub fn merge_live(
    snapshot: &DistrictSnapshot,
    payload: &LivePayload,
    year: i32,
) -> DistrictSnapshot {
    let mut merged = snapshot.clone();

    for seat in &mut merged.seats {
        let Some(live) = payload.get(&seat.seat_id) else {
            continue;
        };

        let incoming: Vec<ElectionView> = live.iter().filter(|e| e.year == year).cloned().collect();
        if incoming.is_empty() {
            continue;
        }

        if seat_is_settled(seat, year) {
            tracing::debug!(
                seat_id = seat.seat_id,
                year,
                "Seat certified, keeping static elections"
            );
            continue;
        }

        warn_on_status_regression(seat, &incoming);
        replace_year(&mut seat.elections, incoming, year);
    }

    merged
}

fn replace_year(elections: &mut Vec<ElectionView>, mut incoming: Vec<ElectionView>, year: i32) {
    // Where the removed elections sat, else ahead of the first older year
    let position = elections
        .iter()
        .position(|e| e.year == year)
        .or_else(|| elections.iter().position(|e| e.year < year))
        .unwrap_or(elections.len());

    elections.retain(|e| e.year != year);

    for election in &mut incoming {
        order_candidates(&mut election.candidates);
    }
    elections.splice(position..position, incoming);
}

fn warn_on_status_regression(seat: &SeatView, incoming: &[ElectionView]) {
    for live in incoming {
        let stale = seat.elections.iter().find(|s| {
            s.year == live.year
                && s.election_type == live.election_type
                && match (s.result_status, live.result_status) {
                    (Some(before), Some(after)) => after < before,
                    (Some(_), None) => true,
                    _ => false,
                }
        });
        if let Some(previous) = stale {
            tracing::warn!(
                seat_id = seat.seat_id,
                election_type = live.election_type.as_str(),
                static_status = ?previous.result_status,
                live_status = ?live.result_status,
                "Live result status is behind the static export"
            );
        }
    }
}
