//! Officeholder store
//!
//! SQLite-backed source of truth for seats, elections, candidacies and
//! seat terms. Every seat-term write runs the consistency trigger
//! ([`crate::sync`]) inside the same transaction, so a reader never sees a
//! term without its matching seat cache and open-seat flags. Any failure
//! while applying the trigger rolls back the whole write.

use crate::config::SeatwatchConfig;
use crate::errors::{Result, SeatwatchError};
use crate::merge::order_candidates;
use crate::model::{
    CandidacyResult, CandidateId, CandidateView, DistrictId, DistrictSnapshot, Election,
    ElectionId, ElectionType, ElectionView, EndReason, NewCandidacy, NewDistrict, NewElection,
    NewSeat, NewSeatTerm, ResultStatus, Seat, SeatId, SeatTerm, SeatTermId, SeatTermPatch,
    SeatView, StartReason, StateId,
};
use crate::sync::{ElectionFlag, SyncEffects, compute_sync_effects};
use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashMap;
use std::path::Path;

/// Embedded schema
const SCHEMA_SQL: &str = include_str!("../SCHEMA.sql");

macro_rules! sql_text_enum {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    let s = value.as_str()?;
                    <$ty>::parse(s).ok_or_else(|| {
                        let message = format!("unknown {} value: {s}", stringify!($ty));
                        FromSqlError::Other(message.into())
                    })
                }
            }
        )*
    };
}

sql_text_enum!(ElectionType, ResultStatus, CandidacyResult, StartReason, EndReason);

const TERM_COLUMNS: &str = "id, seat_id, candidate_id, party, caucus, start_date, start_reason, \
                            end_date, end_reason, election_id";

const ELECTION_COLUMNS: &str = "id, seat_id, election_type, election_date, election_year, \
                                result_status, is_open_seat, total_votes_cast, filing_deadline, \
                                forecast_rating";

fn term_from_row(row: &Row<'_>) -> rusqlite::Result<SeatTerm> {
    Ok(SeatTerm {
        id: row.get(0)?,
        seat_id: row.get(1)?,
        candidate_id: row.get(2)?,
        party: row.get(3)?,
        caucus: row.get(4)?,
        start_date: row.get(5)?,
        start_reason: row.get(6)?,
        end_date: row.get(7)?,
        end_reason: row.get(8)?,
        election_id: row.get(9)?,
    })
}

fn election_from_row(row: &Row<'_>) -> rusqlite::Result<Election> {
    Ok(Election {
        id: row.get(0)?,
        seat_id: row.get(1)?,
        election_type: row.get(2)?,
        election_date: row.get(3)?,
        election_year: row.get(4)?,
        result_status: row.get(5)?,
        is_open_seat: row.get(6)?,
        total_votes_cast: row.get(7)?,
        filing_deadline: row.get(8)?,
        forecast_rating: row.get(9)?,
    })
}

/// Officeholder store wrapper
pub struct OfficeholderStore {
    conn: Connection,
}

impl OfficeholderStore {
    /// Open the configured database, creating it if needed
    pub fn open(cfg: &SeatwatchConfig) -> Result<Self> {
        Self::open_at_path(&cfg.resolved_db_path())
    }

    /// Open a specific database path
    pub fn open_at_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| SeatwatchError::Store {
                message: format!("failed to create db directory: {}", parent.display()),
                source: Some(Box::new(e)),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            SeatwatchError::from_sqlite(format!("failed to open db at {}", path.display()), e)
        })?;

        Self::apply_schema(&conn)?;

        tracing::debug!(path = %path.display(), "Officeholder store initialized");

        Ok(Self { conn })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SeatwatchError::from_sqlite("failed to open in-memory db", e))?;

        Self::apply_schema(&conn)?;

        Ok(Self { conn })
    }

    fn apply_schema(conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(|e| SeatwatchError::from_sqlite("failed to enable foreign keys", e))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| SeatwatchError::from_sqlite("failed to apply schema", e))?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Reference data inserts
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn insert_state(&self, abbreviation: &str, state_name: &str) -> Result<StateId> {
        self.conn
            .execute(
                "INSERT INTO states (abbreviation, state_name) VALUES (?1, ?2)",
                params![abbreviation, state_name],
            )
            .map_err(|e| SeatwatchError::from_sqlite("failed to insert state", e))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_district(&self, district: &NewDistrict) -> Result<DistrictId> {
        self.conn
            .execute(
                r#"
                INSERT INTO districts (state_id, chamber, district_number, district_name, num_seats)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    district.state_id,
                    district.chamber,
                    district.district_number,
                    district.district_name,
                    district.num_seats
                ],
            )
            .map_err(|e| SeatwatchError::from_sqlite("failed to insert district", e))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert a seat. Holder cache columns start empty; only seat-term
    /// writes fill them.
    pub fn insert_seat(&self, seat: &NewSeat) -> Result<SeatId> {
        self.conn
            .execute(
                r#"
                INSERT INTO seats (district_id, office_level, seat_label, seat_designator)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    seat.district_id,
                    seat.office_level,
                    seat.seat_label,
                    seat.seat_designator
                ],
            )
            .map_err(|e| SeatwatchError::from_sqlite("failed to insert seat", e))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_candidate(&self, full_name: &str) -> Result<CandidateId> {
        if full_name.trim().is_empty() {
            return Err(SeatwatchError::constraint("candidate name must not be empty"));
        }
        self.conn
            .execute(
                "INSERT INTO candidates (full_name) VALUES (?1)",
                params![full_name],
            )
            .map_err(|e| SeatwatchError::from_sqlite("failed to insert candidate", e))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_election(&self, election: &NewElection) -> Result<ElectionId> {
        self.conn
            .execute(
                r#"
                INSERT INTO elections
                    (seat_id, election_type, election_date, election_year, result_status,
                     is_open_seat, total_votes_cast, filing_deadline, forecast_rating)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    election.seat_id,
                    election.election_type,
                    election.election_date,
                    election.election_year,
                    election.result_status,
                    election.is_open_seat,
                    election.total_votes_cast,
                    election.filing_deadline,
                    election.forecast_rating
                ],
            )
            .map_err(|e| SeatwatchError::from_sqlite("failed to insert election", e))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_candidacy(&self, candidacy: &NewCandidacy) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO candidacies
                    (election_id, candidate_id, party, caucus, votes_received, vote_percentage,
                     result, is_incumbent, is_write_in)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    candidacy.election_id,
                    candidacy.candidate_id,
                    candidacy.party,
                    candidacy.caucus,
                    candidacy.votes_received,
                    candidacy.vote_percentage,
                    candidacy.result,
                    candidacy.is_incumbent,
                    candidacy.is_write_in
                ],
            )
            .map_err(|e| SeatwatchError::from_sqlite("failed to insert candidacy", e))?;
        Ok(self.conn.last_insert_rowid())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn seat(&self, seat_id: SeatId) -> Result<Option<Seat>> {
        self.conn
            .query_row(
                r#"
                SELECT id, district_id, seat_label, seat_designator,
                       current_holder, current_holder_party, current_holder_caucus
                FROM seats
                WHERE id = ?1
                "#,
                params![seat_id],
                |row| {
                    Ok(Seat {
                        id: row.get(0)?,
                        district_id: row.get(1)?,
                        seat_label: row.get(2)?,
                        seat_designator: row.get(3)?,
                        current_holder: row.get(4)?,
                        current_holder_party: row.get(5)?,
                        current_holder_caucus: row.get(6)?,
                    })
                },
            )
            .optional()
            .map_err(|e| SeatwatchError::from_sqlite("failed to get seat", e))
    }

    pub fn election(&self, election_id: ElectionId) -> Result<Option<Election>> {
        self.conn
            .query_row(
                &format!("SELECT {ELECTION_COLUMNS} FROM elections WHERE id = ?1"),
                params![election_id],
                election_from_row,
            )
            .optional()
            .map_err(|e| SeatwatchError::from_sqlite("failed to get election", e))
    }

    /// All elections of a seat, newest year first
    pub fn elections_for_seat(&self, seat_id: SeatId) -> Result<Vec<Election>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {ELECTION_COLUMNS} FROM elections WHERE seat_id = ?1 \
                 ORDER BY election_year DESC, election_type, id"
            ))
            .map_err(|e| SeatwatchError::from_sqlite("failed to prepare query", e))?;

        let rows = stmt
            .query_map(params![seat_id], election_from_row)
            .map_err(|e| SeatwatchError::from_sqlite("failed to query elections", e))?;

        let mut elections = Vec::new();
        for row in rows {
            elections
                .push(row.map_err(|e| SeatwatchError::from_sqlite("failed to read election", e))?);
        }
        Ok(elections)
    }

    pub fn term(&self, term_id: SeatTermId) -> Result<Option<SeatTerm>> {
        read_term(&self.conn, term_id)
    }

    /// The term with no end date, if the seat is occupied
    pub fn current_term(&self, seat_id: SeatId) -> Result<Option<SeatTerm>> {
        read_current_term(&self.conn, seat_id)
    }

    pub fn district_seat_ids(&self, district_id: DistrictId) -> Result<Vec<SeatId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM seats WHERE district_id = ?1 ORDER BY seat_designator, id")
            .map_err(|e| SeatwatchError::from_sqlite("failed to prepare query", e))?;

        let rows = stmt
            .query_map(params![district_id], |row| row.get(0))
            .map_err(|e| SeatwatchError::from_sqlite("failed to query seats", e))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.map_err(|e| SeatwatchError::from_sqlite("failed to read seat id", e))?);
        }
        Ok(ids)
    }

    /// Every seat of one chamber in a state, with its cached holder
    pub fn chamber_seats(&self, state_abbreviation: &str, chamber: &str) -> Result<Vec<Seat>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT s.id, s.district_id, s.seat_label, s.seat_designator,
                       s.current_holder, s.current_holder_party, s.current_holder_caucus
                FROM seats s
                JOIN districts d ON d.id = s.district_id
                JOIN states st ON st.id = d.state_id
                WHERE st.abbreviation = ?1 AND d.chamber = ?2
                ORDER BY d.district_number, s.seat_designator, s.id
                "#,
            )
            .map_err(|e| SeatwatchError::from_sqlite("failed to prepare query", e))?;

        let rows = stmt
            .query_map(params![state_abbreviation, chamber], |row| {
                Ok(Seat {
                    id: row.get(0)?,
                    district_id: row.get(1)?,
                    seat_label: row.get(2)?,
                    seat_designator: row.get(3)?,
                    current_holder: row.get(4)?,
                    current_holder_party: row.get(5)?,
                    current_holder_caucus: row.get(6)?,
                })
            })
            .map_err(|e| SeatwatchError::from_sqlite("failed to query chamber seats", e))?;

        let mut seats = Vec::new();
        for row in rows {
            seats.push(row.map_err(|e| SeatwatchError::from_sqlite("failed to read seat", e))?);
        }
        Ok(seats)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Seat-term writes (trigger-bearing)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Insert a seat term. If it is current, the seat cache and open-seat
    /// flags are synchronized in the same transaction.
    pub fn record_term(&mut self, term: &NewSeatTerm, today: NaiveDate) -> Result<SeatTerm> {
        validate_new_term(term)?;

        let tx = self
            .conn
            .transaction()
            .map_err(|e| SeatwatchError::from_sqlite("failed to begin transaction", e))?;

        let term_id = insert_term_row(&tx, term)?;
        let stored = read_term(&tx, term_id)?
            .ok_or_else(|| SeatwatchError::internal("inserted seat term vanished"))?;
        let effects = fire_term_trigger(&tx, &stored, today)?;

        tx.commit()
            .map_err(|e| SeatwatchError::from_sqlite("failed to commit seat term", e))?;

        tracing::debug!(
            term_id,
            seat_id = stored.seat_id,
            current = stored.is_current(),
            cleared_open_flags = effects.election_updates.len(),
            "Recorded seat term"
        );

        Ok(stored)
    }

    /// Update a seat term. The trigger fires when the row ends up current.
    pub fn update_term(
        &mut self,
        term_id: SeatTermId,
        patch: &SeatTermPatch,
        today: NaiveDate,
    ) -> Result<SeatTerm> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| SeatwatchError::from_sqlite("failed to begin transaction", e))?;

        let existing = read_term(&tx, term_id)?
            .ok_or_else(|| SeatwatchError::constraint(format!("seat term {term_id} not found")))?;

        let updated = SeatTerm {
            party: patch.party.clone().unwrap_or(existing.party),
            caucus: patch.caucus.clone().unwrap_or(existing.caucus),
            end_date: patch.end_date.unwrap_or(existing.end_date),
            end_reason: patch.end_reason.unwrap_or(existing.end_reason),
            ..existing
        };

        if updated.end_reason.is_some() && updated.end_date.is_none() {
            return Err(SeatwatchError::constraint("end_reason requires an end_date"));
        }

        tx.execute(
            r#"
            UPDATE seat_terms
            SET party = ?2, caucus = ?3, end_date = ?4, end_reason = ?5
            WHERE id = ?1
            "#,
            params![
                term_id,
                updated.party,
                updated.caucus,
                updated.end_date,
                updated.end_reason
            ],
        )
        .map_err(|e| SeatwatchError::from_sqlite("failed to update seat term", e))?;

        let stored = read_term(&tx, term_id)?
            .ok_or_else(|| SeatwatchError::internal("updated seat term vanished"))?;
        fire_term_trigger(&tx, &stored, today)?;

        tx.commit()
            .map_err(|e| SeatwatchError::from_sqlite("failed to commit seat term", e))?;

        Ok(stored)
    }

    /// Close the seat's current term (if any) and open `successor` in one
    /// transaction.
    pub fn supersede_term(
        &mut self,
        successor: &NewSeatTerm,
        end_date: NaiveDate,
        end_reason: EndReason,
        today: NaiveDate,
    ) -> Result<SeatTerm> {
        validate_new_term(successor)?;
        if successor.end_date.is_some() {
            return Err(SeatwatchError::constraint(
                "a superseding term must be current (no end date)",
            ));
        }

        let tx = self
            .conn
            .transaction()
            .map_err(|e| SeatwatchError::from_sqlite("failed to begin transaction", e))?;

        if let Some(previous) = read_current_term(&tx, successor.seat_id)? {
            tx.execute(
                "UPDATE seat_terms SET end_date = ?2, end_reason = ?3 WHERE id = ?1",
                params![previous.id, end_date, end_reason],
            )
            .map_err(|e| SeatwatchError::from_sqlite("failed to close previous term", e))?;

            tracing::debug!(
                term_id = previous.id,
                seat_id = previous.seat_id,
                end_reason = end_reason.as_str(),
                "Closed superseded seat term"
            );
        }

        let term_id = insert_term_row(&tx, successor)?;
        let stored = read_term(&tx, term_id)?
            .ok_or_else(|| SeatwatchError::internal("inserted seat term vanished"))?;
        fire_term_trigger(&tx, &stored, today)?;

        tx.commit()
            .map_err(|e| SeatwatchError::from_sqlite("failed to commit seat term", e))?;

        Ok(stored)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Elections
    // ─────────────────────────────────────────────────────────────────────────────

    /// Advance an election's result status. Regressions are rejected;
    /// re-applying the current status is a no-op.
    pub fn set_result_status(&self, election_id: ElectionId, status: ResultStatus) -> Result<()> {
        let current = self.election(election_id)?.ok_or_else(|| {
            SeatwatchError::constraint(format!("election {election_id} not found"))
        })?;

        if let Some(previous) = current.result_status
            && status < previous
        {
            return Err(SeatwatchError::constraint(format!(
                "result status cannot regress from {} to {}",
                previous.as_str(),
                status.as_str()
            )));
        }

        if current.result_status == Some(status) {
            return Ok(());
        }

        self.conn
            .execute(
                "UPDATE elections SET result_status = ?2 WHERE id = ?1",
                params![election_id, status],
            )
            .map_err(|e| SeatwatchError::from_sqlite("failed to update result status", e))?;

        tracing::debug!(election_id, status = status.as_str(), "Result status advanced");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Static export
    // ─────────────────────────────────────────────────────────────────────────────

    /// Build the static per-district snapshot. Candidates are emitted in the
    /// canonical order shared with the live merger.
    pub fn export_district(&self, district_id: DistrictId) -> Result<Option<DistrictSnapshot>> {
        let header = self
            .conn
            .query_row(
                "SELECT chamber, district_number, district_name FROM districts WHERE id = ?1",
                params![district_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| SeatwatchError::from_sqlite("failed to get district", e))?;

        let Some((chamber, district_number, district_name)) = header else {
            return Ok(None);
        };

        let mut candidates_by_election = self.candidates_for_district(district_id)?;

        let mut seats = Vec::new();
        for seat_id in self.district_seat_ids(district_id)? {
            let Some(seat) = self.seat(seat_id)? else {
                continue;
            };

            let elections = self
                .elections_for_seat(seat_id)?
                .into_iter()
                .map(|e| {
                    let mut candidates = candidates_by_election.remove(&e.id).unwrap_or_default();
                    order_candidates(&mut candidates);
                    ElectionView {
                        year: e.election_year,
                        election_type: e.election_type,
                        date: e.election_date,
                        total_votes: e.total_votes_cast,
                        is_open_seat: e.is_open_seat,
                        result_status: e.result_status,
                        filing_deadline: e.filing_deadline,
                        forecast_rating: e.forecast_rating,
                        candidates,
                    }
                })
                .collect();

            let caucus = distinct_caucus(
                seat.current_holder_party.as_deref(),
                seat.current_holder_caucus.clone(),
            );

            seats.push(SeatView {
                seat_id,
                seat_label: seat.seat_label,
                current_holder: seat.current_holder,
                current_holder_party: seat.current_holder_party,
                current_holder_caucus: caucus,
                elections,
            });
        }

        Ok(Some(DistrictSnapshot {
            district_id,
            chamber,
            district_number,
            district_name,
            seats,
        }))
    }

    /// Candidates of every election in the district, in insertion order
    fn candidates_for_district(
        &self,
        district_id: DistrictId,
    ) -> Result<HashMap<ElectionId, Vec<CandidateView>>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT cy.election_id, c.full_name, cy.party, cy.caucus, cy.votes_received,
                       cy.vote_percentage, cy.result, cy.is_incumbent, cy.is_write_in
                FROM candidacies cy
                JOIN elections e ON e.id = cy.election_id
                JOIN seats s ON s.id = e.seat_id
                JOIN candidates c ON c.id = cy.candidate_id
                WHERE s.district_id = ?1
                ORDER BY cy.election_id, cy.id
                "#,
            )
            .map_err(|e| SeatwatchError::from_sqlite("failed to prepare query", e))?;

        let rows = stmt
            .query_map(params![district_id], |row| {
                let party: Option<String> = row.get(2)?;
                let caucus: Option<String> = row.get(3)?;
                Ok((
                    row.get::<_, ElectionId>(0)?,
                    CandidateView {
                        name: row.get(1)?,
                        caucus: distinct_caucus(party.as_deref(), caucus),
                        party,
                        votes: row.get(4)?,
                        pct: row.get(5)?,
                        result: row.get(6)?,
                        is_incumbent: row.get(7)?,
                        is_write_in: row.get(8)?,
                    },
                ))
            })
            .map_err(|e| SeatwatchError::from_sqlite("failed to query candidacies", e))?;

        let mut by_election: HashMap<ElectionId, Vec<CandidateView>> = HashMap::new();
        for row in rows {
            let (election_id, candidate) =
                row.map_err(|e| SeatwatchError::from_sqlite("failed to read candidacy", e))?;
            by_election.entry(election_id).or_default().push(candidate);
        }
        Ok(by_election)
    }

    /// Number of terms recorded for a seat (for tests/diagnostics)
    pub fn term_count(&self, seat_id: SeatId) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM seat_terms WHERE seat_id = ?1",
                params![seat_id],
                |row| row.get(0),
            )
            .map_err(|e| SeatwatchError::from_sqlite("failed to count seat terms", e))
    }
}

/// Caucus is only worth carrying when it says something the party does not
pub(crate) fn distinct_caucus(party: Option<&str>, caucus: Option<String>) -> Option<String> {
    caucus.filter(|c| Some(c.as_str()) != party)
}

fn validate_new_term(term: &NewSeatTerm) -> Result<()> {
    if term.end_reason.is_some() && term.end_date.is_none() {
        return Err(SeatwatchError::constraint("end_reason requires an end_date"));
    }
    if let Some(end) = term.end_date
        && end < term.start_date
    {
        return Err(SeatwatchError::constraint(format!(
            "term ends ({end}) before it starts ({})",
            term.start_date
        )));
    }
    Ok(())
}

fn insert_term_row(conn: &Connection, term: &NewSeatTerm) -> Result<SeatTermId> {
    conn.execute(
        r#"
        INSERT INTO seat_terms
            (seat_id, candidate_id, party, caucus, start_date, start_reason,
             end_date, end_reason, election_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            term.seat_id,
            term.candidate_id,
            term.party,
            term.caucus,
            term.start_date,
            term.start_reason,
            term.end_date,
            term.end_reason,
            term.election_id
        ],
    )
    .map_err(|e| SeatwatchError::from_sqlite("failed to insert seat term", e))?;
    Ok(conn.last_insert_rowid())
}

fn read_term(conn: &Connection, term_id: SeatTermId) -> Result<Option<SeatTerm>> {
    conn.query_row(
        &format!("SELECT {TERM_COLUMNS} FROM seat_terms WHERE id = ?1"),
        params![term_id],
        term_from_row,
    )
    .optional()
    .map_err(|e| SeatwatchError::from_sqlite("failed to get seat term", e))
}

fn read_current_term(conn: &Connection, seat_id: SeatId) -> Result<Option<SeatTerm>> {
    conn.query_row(
        &format!("SELECT {TERM_COLUMNS} FROM seat_terms WHERE seat_id = ?1 AND end_date IS NULL"),
        params![seat_id],
        term_from_row,
    )
    .optional()
    .map_err(|e| SeatwatchError::from_sqlite("failed to get current seat term", e))
}

fn load_election_flags(conn: &Connection, seat_id: SeatId) -> Result<Vec<ElectionFlag>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT id, seat_id, election_type, election_date, is_open_seat
            FROM elections
            WHERE seat_id = ?1
            "#,
        )
        .map_err(|e| SeatwatchError::from_sqlite("failed to prepare query", e))?;

    let rows = stmt
        .query_map(params![seat_id], |row| {
            Ok(ElectionFlag {
                id: row.get(0)?,
                seat_id: row.get(1)?,
                election_type: row.get(2)?,
                election_date: row.get(3)?,
                is_open_seat: row.get(4)?,
            })
        })
        .map_err(|e| SeatwatchError::from_sqlite("failed to query election flags", e))?;

    let mut flags = Vec::new();
    for row in rows {
        flags.push(
            row.map_err(|e| SeatwatchError::from_sqlite("failed to read election flag", e))?,
        );
    }
    Ok(flags)
}

/// Decide and apply the trigger's effects for a stored term
fn fire_term_trigger(conn: &Connection, term: &SeatTerm, today: NaiveDate) -> Result<SyncEffects> {
    if !term.is_current() {
        return Ok(SyncEffects::default());
    }

    let holder_name: Option<String> = conn
        .query_row(
            "SELECT full_name FROM candidates WHERE id = ?1",
            params![term.candidate_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| SeatwatchError::from_sqlite("failed to get holder name", e))?;

    let flags = load_election_flags(conn, term.seat_id)?;
    let effects = compute_sync_effects(term, holder_name.as_deref(), &flags, today);
    apply_sync_effects(conn, &effects)?;
    Ok(effects)
}

/// Apply decided effects. Must run inside the triggering write's
/// transaction; an error here aborts that transaction.
pub(crate) fn apply_sync_effects(conn: &Connection, effects: &SyncEffects) -> Result<()> {
    if let Some(update) = &effects.seat_update {
        let changed = conn
            .execute(
                r#"
                UPDATE seats
                SET current_holder = ?2,
                    current_holder_party = ?3,
                    current_holder_caucus = ?4
                WHERE id = ?1
                "#,
                params![update.seat_id, update.holder_name, update.party, update.caucus],
            )
            .map_err(|e| SeatwatchError::from_sqlite("failed to update seat cache", e))?;

        if changed != 1 {
            return Err(SeatwatchError::internal(format!(
                "seat {} missing while syncing holder cache",
                update.seat_id
            )));
        }
    }

    for election_id in &effects.election_updates {
        conn.execute(
            "UPDATE elections SET is_open_seat = 0 WHERE id = ?1 AND is_open_seat = 1",
            params![election_id],
        )
        .map_err(|e| SeatwatchError::from_sqlite("failed to clear open-seat flag", e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCategory;
    use crate::model::ElectionType;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    struct Fixture {
        store: OfficeholderStore,
        district: DistrictId,
        seat: SeatId,
        other_seat: SeatId,
    }

    fn fixture() -> Fixture {
        let store = OfficeholderStore::open_in_memory().expect("open");
        let state = store.insert_state("NH", "New Hampshire").expect("state");
        let district = store
            .insert_district(&NewDistrict {
                state_id: state,
                chamber: "House".to_string(),
                district_number: "Hillsborough 12".to_string(),
                district_name: None,
                num_seats: 2,
            })
            .expect("district");
        let seat = store
            .insert_seat(&NewSeat::legislative(district, "Seat A"))
            .expect("seat");
        let other_seat = store
            .insert_seat(&NewSeat::legislative(district, "Seat B"))
            .expect("seat");
        Fixture {
            store,
            district,
            seat,
            other_seat,
        }
    }

    #[test]
    fn test_schema_applies() {
        let f = fixture();
        assert_eq!(f.store.term_count(f.seat).expect("count"), 0);
        let seat = f.store.seat(f.seat).expect("get").expect("exists");
        assert!(seat.current_holder_party.is_none());
    }

    #[test]
    fn test_record_current_term_syncs_cache_and_flags() {
        let mut f = fixture();
        let today = date(2025, 3, 1);
        let future_general = f
            .store
            .insert_election(&NewElection::general(f.seat, date(2026, 11, 3)).open_seat())
            .expect("election");
        let past_general = f
            .store
            .insert_election(&NewElection::general(f.seat, date(2024, 11, 5)).open_seat())
            .expect("election");
        let future_primary = f
            .store
            .insert_election(
                &NewElection::general(f.seat, date(2026, 9, 8))
                    .with_type(ElectionType::PrimaryD)
                    .open_seat(),
            )
            .expect("election");
        let other_seat_general = f
            .store
            .insert_election(&NewElection::general(f.other_seat, date(2026, 11, 3)).open_seat())
            .expect("election");

        let holder = f.store.insert_candidate("Jordan Fields").expect("candidate");
        let term =
            NewSeatTerm::current(f.seat, holder, "D", date(2025, 1, 1), StartReason::Elected);
        let stored = f.store.record_term(&term, today).expect("record");
        assert!(stored.is_current());

        let seat = f.store.seat(f.seat).expect("get").expect("exists");
        assert_eq!(seat.current_holder.as_deref(), Some("Jordan Fields"));
        assert_eq!(seat.current_holder_party.as_deref(), Some("D"));
        assert_eq!(seat.current_holder_caucus, None);

        let open = |id| f.store.election(id).expect("get").expect("exists").is_open_seat;
        assert!(!open(future_general));
        assert!(open(past_general));
        assert!(open(future_primary));
        assert!(open(other_seat_general));
    }

    #[test]
    fn test_reapplying_trigger_is_idempotent() {
        let mut f = fixture();
        let today = date(2025, 3, 1);
        let mut elections = Vec::new();
        for (seat, day, open) in [
            (f.seat, date(2026, 11, 3), true),
            (f.seat, date(2024, 11, 5), true),
            (f.seat, date(2028, 11, 7), false),
            (f.other_seat, date(2026, 11, 3), true),
        ] {
            let mut election = NewElection::general(seat, day);
            if open {
                election = election.open_seat();
            }
            elections.push(f.store.insert_election(&election).expect("election"));
        }

        let holder = f.store.insert_candidate("Jordan Fields").expect("candidate");
        let term = f
            .store
            .record_term(
                &NewSeatTerm::current(f.seat, holder, "D", date(2025, 1, 1), StartReason::Elected)
                    .with_caucus("Progressive"),
                today,
            )
            .expect("record");

        let snapshot = |store: &OfficeholderStore| {
            let seat = store.seat(f.seat).expect("get").expect("exists");
            let flags: Vec<bool> = elections
                .iter()
                .map(|id| store.election(*id).expect("get").expect("exists").is_open_seat)
                .collect();
            (seat, flags)
        };
        let once = snapshot(&f.store);
        assert_eq!(once.1, vec![false, true, false, true]);

        for _ in 0..2 {
            f.store
                .update_term(term.id, &SeatTermPatch::default(), today)
                .expect("reapply");
            assert_eq!(snapshot(&f.store), once);
        }
        assert_eq!(f.store.term_count(f.seat).expect("count"), 1);
    }

    #[test]
    fn test_closed_term_leaves_cache_alone() {
        let mut f = fixture();
        let holder = f.store.insert_candidate("Former Member").expect("candidate");
        let mut term =
            NewSeatTerm::current(f.seat, holder, "R", date(2019, 1, 1), StartReason::Elected);
        term.end_date = Some(date(2021, 1, 1));
        term.end_reason = Some(EndReason::TermExpired);

        f.store.record_term(&term, date(2025, 3, 1)).expect("record");
        let seat = f.store.seat(f.seat).expect("get").expect("exists");
        assert_eq!(seat.current_holder_party, None);
    }

    #[test]
    fn test_second_current_term_is_rejected_and_rolled_back() {
        let mut f = fixture();
        let today = date(2025, 3, 1);
        let a = f.store.insert_candidate("A").expect("candidate");
        let b = f.store.insert_candidate("B").expect("candidate");
        f.store
            .record_term(
                &NewSeatTerm::current(f.seat, a, "D", date(2025, 1, 1), StartReason::Elected),
                today,
            )
            .expect("first");

        let err = f
            .store
            .record_term(
                &NewSeatTerm::current(f.seat, b, "R", date(2025, 2, 1), StartReason::Appointed),
                today,
            )
            .expect_err("duplicate current term");
        assert_eq!(err.category(), ErrorCategory::ConstraintError);

        assert_eq!(f.store.term_count(f.seat).expect("count"), 1);
        let seat = f.store.seat(f.seat).expect("get").expect("exists");
        assert_eq!(seat.current_holder_party.as_deref(), Some("D"));
    }

    #[test]
    fn test_supersede_closes_previous_and_syncs() {
        let mut f = fixture();
        let today = date(2025, 6, 1);
        let a = f.store.insert_candidate("A").expect("candidate");
        let b = f.store.insert_candidate("B").expect("candidate");
        let first = f
            .store
            .record_term(
                &NewSeatTerm::current(f.seat, a, "D", date(2023, 1, 1), StartReason::Elected),
                today,
            )
            .expect("first");

        let successor =
            NewSeatTerm::current(f.seat, b, "R", date(2025, 5, 1), StartReason::Appointed)
                .with_caucus("C");
        let second = f
            .store
            .supersede_term(&successor, date(2025, 4, 30), EndReason::Resigned, today)
            .expect("supersede");

        let closed = f.store.term(first.id).expect("get").expect("exists");
        assert_eq!(closed.end_date, Some(date(2025, 4, 30)));
        assert_eq!(closed.end_reason, Some(EndReason::Resigned));

        let current = f.store.current_term(f.seat).expect("get").expect("exists");
        assert_eq!(current.id, second.id);

        let seat = f.store.seat(f.seat).expect("get").expect("exists");
        assert_eq!(seat.current_holder.as_deref(), Some("B"));
        assert_eq!(seat.current_holder_party.as_deref(), Some("R"));
        assert_eq!(seat.current_holder_caucus.as_deref(), Some("C"));
    }

    #[test]
    fn test_export_caucus_only_when_distinct_from_party() {
        let mut f = fixture();
        let today = date(2025, 6, 1);
        let a = f.store.insert_candidate("A").expect("candidate");
        let b = f.store.insert_candidate("B").expect("candidate");
        f.store
            .record_term(
                &NewSeatTerm::current(f.seat, a, "R", date(2025, 1, 1), StartReason::Elected)
                    .with_caucus("C"),
                today,
            )
            .expect("seat a");
        f.store
            .record_term(
                &NewSeatTerm::current(f.other_seat, b, "D", date(2025, 1, 1), StartReason::Elected)
                    .with_caucus("D"),
                today,
            )
            .expect("seat b");

        let snapshot = f.store.export_district(f.district).expect("export").expect("exists");
        assert_eq!(snapshot.seats[0].current_holder_caucus.as_deref(), Some("C"));
        assert_eq!(snapshot.seats[1].current_holder_party.as_deref(), Some("D"));
        assert_eq!(snapshot.seats[1].current_holder_caucus, None);
    }

    #[test]
    fn test_update_term_fires_trigger_on_party_switch() {
        let mut f = fixture();
        let today = date(2025, 6, 1);
        let a = f.store.insert_candidate("A").expect("candidate");
        let term = f
            .store
            .record_term(
                &NewSeatTerm::current(f.seat, a, "D", date(2023, 1, 1), StartReason::Elected),
                today,
            )
            .expect("record");

        f.store
            .update_term(term.id, &SeatTermPatch::party("I"), today)
            .expect("update");
        let seat = f.store.seat(f.seat).expect("get").expect("exists");
        assert_eq!(seat.current_holder_party.as_deref(), Some("I"));
    }

    #[test]
    fn test_invalid_enum_is_rejected_at_write_boundary() {
        let f = fixture();
        let err = f
            .store
            .conn
            .execute(
                "INSERT INTO elections (seat_id, election_year, election_type) \
                 VALUES (?1, 2026, 'Jungle')",
                params![f.seat],
            )
            .map_err(|e| SeatwatchError::from_sqlite("insert", e))
            .expect_err("bad enum");
        assert_eq!(err.category(), ErrorCategory::ConstraintError);
    }

    #[test]
    fn test_unknown_seat_is_a_constraint_violation() {
        let mut f = fixture();
        let a = f.store.insert_candidate("A").expect("candidate");
        let err = f
            .store
            .record_term(
                &NewSeatTerm::current(9_999, a, "D", date(2025, 1, 1), StartReason::Elected),
                date(2025, 3, 1),
            )
            .expect_err("fk");
        assert_eq!(err.category(), ErrorCategory::ConstraintError);
    }

    #[test]
    fn test_result_status_cannot_regress() {
        let f = fixture();
        let id = f
            .store
            .insert_election(&NewElection::general(f.seat, date(2024, 11, 5)))
            .expect("election");

        f.store.set_result_status(id, ResultStatus::Counting).expect("counting");
        f.store.set_result_status(id, ResultStatus::Certified).expect("certified");
        f.store
            .set_result_status(id, ResultStatus::Certified)
            .expect("same status is a no-op");

        let err = f
            .store
            .set_result_status(id, ResultStatus::Called)
            .expect_err("regression");
        assert_eq!(err.category(), ErrorCategory::ConstraintError);
        let election = f.store.election(id).expect("get").expect("exists");
        assert_eq!(election.result_status, Some(ResultStatus::Certified));
    }

    #[test]
    fn test_export_orders_candidates_canonically() {
        let f = fixture();
        let election = f
            .store
            .insert_election(
                &NewElection::general(f.seat, date(2024, 11, 5))
                    .with_status(ResultStatus::Certified),
            )
            .expect("election");

        for (name, result, votes) in [
            ("Lost Hundred", CandidacyResult::Lost, 100),
            ("Winner", CandidacyResult::Won, 50),
            ("Advancer", CandidacyResult::Advanced, 80),
            ("Lost Big", CandidacyResult::Lost, 120),
        ] {
            let candidate = f.store.insert_candidate(name).expect("candidate");
            f.store
                .insert_candidacy(&NewCandidacy {
                    election_id: election,
                    candidate_id: candidate,
                    party: Some("D".to_string()),
                    caucus: Some("D".to_string()),
                    votes_received: Some(votes),
                    vote_percentage: None,
                    result,
                    is_incumbent: false,
                    is_write_in: false,
                })
                .expect("candidacy");
        }

        let snapshot = f
            .store
            .export_district(f.district)
            .expect("export")
            .expect("district exists");
        assert_eq!(snapshot.seats.len(), 2);
        let names: Vec<&str> = snapshot.seats[0].elections[0]
            .candidates
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Winner", "Advancer", "Lost Big", "Lost Hundred"]);
        // Caucus equal to party is not repeated
        assert!(snapshot.seats[0].elections[0].candidates[0].caucus.is_none());
    }

    #[test]
    fn test_chamber_seats_reflect_trigger() {
        let mut f = fixture();
        let a = f.store.insert_candidate("A").expect("candidate");
        f.store
            .record_term(
                &NewSeatTerm::current(f.seat, a, "R", date(2025, 1, 1), StartReason::Elected),
                date(2025, 3, 1),
            )
            .expect("record");

        let seats = f.store.chamber_seats("NH", "House").expect("seats");
        assert_eq!(seats.len(), 2);
        assert_eq!(seats[0].current_holder.as_deref(), Some("A"));
        assert!(seats[1].current_holder.is_none());
        assert!(f.store.chamber_seats("NH", "Senate").expect("seats").is_empty());
    }

    #[test]
    fn test_export_missing_district() {
        let f = fixture();
        assert!(f.store.export_district(404).expect("export").is_none());
    }
}
