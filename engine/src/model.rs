//! Domain types shared by the store, the live source and the merger
//!
//! Enumerations mirror the `CHECK` constraints in `SCHEMA.sql`; the string
//! forms are the database/wire values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type StateId = i64;
pub type DistrictId = i64;
pub type SeatId = i64;
pub type CandidateId = i64;
pub type ElectionId = i64;
pub type SeatTermId = i64;

// ─────────────────────────────────────────────────────────────────────────────
// Enumerations
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElectionType {
    General,
    Primary,
    #[serde(rename = "Primary_D")]
    PrimaryD,
    #[serde(rename = "Primary_R")]
    PrimaryR,
    #[serde(rename = "Primary_Nonpartisan")]
    PrimaryNonpartisan,
    #[serde(rename = "Primary_Runoff")]
    PrimaryRunoff,
    #[serde(rename = "General_Runoff")]
    GeneralRunoff,
    Special,
    #[serde(rename = "Special_Primary")]
    SpecialPrimary,
    #[serde(rename = "Special_Runoff")]
    SpecialRunoff,
}

impl ElectionType {
    pub const ALL: [ElectionType; 10] = [
        Self::General,
        Self::Primary,
        Self::PrimaryD,
        Self::PrimaryR,
        Self::PrimaryNonpartisan,
        Self::PrimaryRunoff,
        Self::GeneralRunoff,
        Self::Special,
        Self::SpecialPrimary,
        Self::SpecialRunoff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Primary => "Primary",
            Self::PrimaryD => "Primary_D",
            Self::PrimaryR => "Primary_R",
            Self::PrimaryNonpartisan => "Primary_Nonpartisan",
            Self::PrimaryRunoff => "Primary_Runoff",
            Self::GeneralRunoff => "General_Runoff",
            Self::Special => "Special",
            Self::SpecialPrimary => "Special_Primary",
            Self::SpecialRunoff => "Special_Runoff",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for ElectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counting progress of an election. Ordered: a status never moves left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResultStatus {
    Counting,
    Called,
    Certified,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counting => "Counting",
            Self::Called => "Called",
            Self::Certified => "Certified",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Counting" => Some(Self::Counting),
            "Called" => Some(Self::Called),
            "Certified" => Some(Self::Certified),
            _ => None,
        }
    }

    /// Static export is authoritative once an election reaches this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Certified)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidacyResult {
    Won,
    Lost,
    Runoff,
    Advanced,
    Withdrawn,
    Disqualified,
    Pending,
}

impl CandidacyResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Won => "Won",
            Self::Lost => "Lost",
            Self::Runoff => "Runoff",
            Self::Advanced => "Advanced",
            Self::Withdrawn => "Withdrawn",
            Self::Disqualified => "Disqualified",
            Self::Pending => "Pending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Won" => Some(Self::Won),
            "Lost" => Some(Self::Lost),
            "Runoff" => Some(Self::Runoff),
            "Advanced" => Some(Self::Advanced),
            "Withdrawn" => Some(Self::Withdrawn),
            "Disqualified" => Some(Self::Disqualified),
            "Pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartReason {
    Elected,
    Appointed,
    Succeeded,
}

impl StartReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elected => "elected",
            Self::Appointed => "appointed",
            Self::Succeeded => "succeeded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "elected" => Some(Self::Elected),
            "appointed" => Some(Self::Appointed),
            "succeeded" => Some(Self::Succeeded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    AppointedElsewhere,
    Died,
    LostElection,
    Removed,
    Resigned,
    TermExpired,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppointedElsewhere => "appointed_elsewhere",
            Self::Died => "died",
            Self::LostElection => "lost_election",
            Self::Removed => "removed",
            Self::Resigned => "resigned",
            Self::TermExpired => "term_expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "appointed_elsewhere" => Some(Self::AppointedElsewhere),
            "died" => Some(Self::Died),
            "lost_election" => Some(Self::LostElection),
            "removed" => Some(Self::Removed),
            "resigned" => Some(Self::Resigned),
            "term_expired" => Some(Self::TermExpired),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store records
// ─────────────────────────────────────────────────────────────────────────────

/// A row from `seats`. The holder fields are a cache maintained by the
/// seat-term trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct Seat {
    pub id: SeatId,
    pub district_id: DistrictId,
    pub seat_label: String,
    pub seat_designator: Option<String>,
    pub current_holder: Option<String>,
    pub current_holder_party: Option<String>,
    pub current_holder_caucus: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSeat {
    pub district_id: DistrictId,
    pub seat_label: String,
    pub seat_designator: Option<String>,
    pub office_level: String,
}

impl NewSeat {
    pub fn legislative(district_id: DistrictId, seat_label: impl Into<String>) -> Self {
        Self {
            district_id,
            seat_label: seat_label.into(),
            seat_designator: None,
            office_level: "Legislative".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewDistrict {
    pub state_id: StateId,
    pub chamber: String,
    pub district_number: String,
    pub district_name: Option<String>,
    pub num_seats: i64,
}

/// A row from `elections`
#[derive(Debug, Clone, PartialEq)]
pub struct Election {
    pub id: ElectionId,
    pub seat_id: SeatId,
    pub election_type: ElectionType,
    pub election_date: Option<NaiveDate>,
    pub election_year: i32,
    pub result_status: Option<ResultStatus>,
    pub is_open_seat: bool,
    pub total_votes_cast: Option<i64>,
    pub filing_deadline: Option<NaiveDate>,
    pub forecast_rating: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewElection {
    pub seat_id: SeatId,
    pub election_type: ElectionType,
    pub election_date: Option<NaiveDate>,
    pub election_year: i32,
    pub result_status: Option<ResultStatus>,
    pub is_open_seat: bool,
    pub total_votes_cast: Option<i64>,
    pub filing_deadline: Option<NaiveDate>,
    pub forecast_rating: Option<String>,
}

impl NewElection {
    /// A general election on `date`, no results yet
    pub fn general(seat_id: SeatId, date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self {
            seat_id,
            election_type: ElectionType::General,
            election_date: Some(date),
            election_year: date.year(),
            result_status: None,
            is_open_seat: false,
            total_votes_cast: None,
            filing_deadline: None,
            forecast_rating: None,
        }
    }

    pub fn with_type(mut self, election_type: ElectionType) -> Self {
        self.election_type = election_type;
        self
    }

    pub fn open_seat(mut self) -> Self {
        self.is_open_seat = true;
        self
    }

    pub fn with_status(mut self, status: ResultStatus) -> Self {
        self.result_status = Some(status);
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewCandidacy {
    pub election_id: ElectionId,
    pub candidate_id: CandidateId,
    pub party: Option<String>,
    pub caucus: Option<String>,
    pub votes_received: Option<i64>,
    pub vote_percentage: Option<f64>,
    pub result: CandidacyResult,
    pub is_incumbent: bool,
    pub is_write_in: bool,
}

/// A row from `seat_terms`
#[derive(Debug, Clone, PartialEq)]
pub struct SeatTerm {
    pub id: SeatTermId,
    pub seat_id: SeatId,
    pub candidate_id: CandidateId,
    pub party: Option<String>,
    pub caucus: Option<String>,
    pub start_date: NaiveDate,
    pub start_reason: StartReason,
    pub end_date: Option<NaiveDate>,
    pub end_reason: Option<EndReason>,
    pub election_id: Option<ElectionId>,
}

impl SeatTerm {
    pub fn is_current(&self) -> bool {
        self.end_date.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewSeatTerm {
    pub seat_id: SeatId,
    pub candidate_id: CandidateId,
    pub party: Option<String>,
    pub caucus: Option<String>,
    pub start_date: NaiveDate,
    pub start_reason: StartReason,
    pub end_date: Option<NaiveDate>,
    pub end_reason: Option<EndReason>,
    pub election_id: Option<ElectionId>,
}

impl NewSeatTerm {
    /// An open-ended term starting on `start_date`
    pub fn current(
        seat_id: SeatId,
        candidate_id: CandidateId,
        party: impl Into<String>,
        start_date: NaiveDate,
        start_reason: StartReason,
    ) -> Self {
        Self {
            seat_id,
            candidate_id,
            party: Some(party.into()),
            caucus: None,
            start_date,
            start_reason,
            end_date: None,
            end_reason: None,
            election_id: None,
        }
    }

    pub fn with_caucus(mut self, caucus: impl Into<String>) -> Self {
        self.caucus = Some(caucus.into());
        self
    }

    pub fn from_election(mut self, election_id: ElectionId) -> Self {
        self.election_id = Some(election_id);
        self
    }
}

/// Partial update of a seat term. `None` leaves the column unchanged;
/// `end_date: Some(None)` reopens the term.
#[derive(Debug, Clone, Default)]
pub struct SeatTermPatch {
    pub party: Option<Option<String>>,
    pub caucus: Option<Option<String>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub end_reason: Option<Option<EndReason>>,
}

impl SeatTermPatch {
    pub fn close(end_date: NaiveDate, end_reason: EndReason) -> Self {
        Self {
            end_date: Some(Some(end_date)),
            end_reason: Some(Some(end_reason)),
            ..Default::default()
        }
    }

    pub fn party(party: impl Into<String>) -> Self {
        Self {
            party: Some(Some(party.into())),
            ..Default::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reconciled per-district view (static export and merged overlay share it)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictSnapshot {
    pub district_id: DistrictId,
    pub chamber: String,
    pub district_number: String,
    #[serde(default)]
    pub district_name: Option<String>,
    pub seats: Vec<SeatView>,
}

impl DistrictSnapshot {
    pub fn seat_ids(&self) -> Vec<SeatId> {
        self.seats.iter().map(|s| s.seat_id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatView {
    pub seat_id: SeatId,
    pub seat_label: String,
    #[serde(default)]
    pub current_holder: Option<String>,
    #[serde(default)]
    pub current_holder_party: Option<String>,
    #[serde(default)]
    pub current_holder_caucus: Option<String>,
    pub elections: Vec<ElectionView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionView {
    pub year: i32,
    #[serde(rename = "type")]
    pub election_type: ElectionType,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub total_votes: Option<i64>,
    #[serde(default)]
    pub is_open_seat: bool,
    #[serde(default)]
    pub result_status: Option<ResultStatus>,
    #[serde(default)]
    pub filing_deadline: Option<NaiveDate>,
    #[serde(default)]
    pub forecast_rating: Option<String>,
    pub candidates: Vec<CandidateView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateView {
    pub name: String,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub votes: Option<i64>,
    #[serde(default)]
    pub pct: Option<f64>,
    #[serde(default)]
    pub result: Option<CandidacyResult>,
    #[serde(default)]
    pub is_incumbent: bool,
    #[serde(default)]
    pub is_write_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caucus: Option<String>,
}
