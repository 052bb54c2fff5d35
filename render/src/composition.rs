//! Chamber composition inputs and seat thresholds

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("chamber has no seats")]
    EmptyChamber,

    #[error("{assigned} seats assigned but chamber has {total}")]
    Overfilled { assigned: u64, total: u32 },

    #[error("bar width must be positive")]
    InvalidWidth,
}

/// Display label and fill color of one party (or the other/vacant buckets)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyStyle {
    pub label: String,
    pub color: String,
}

impl PartyStyle {
    pub fn new(label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: color.into(),
        }
    }
}

/// Two-party chamber composition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChamberComposition {
    pub total: u32,
    pub party_a: u32,
    pub party_b: u32,
    pub other: u32,
    pub vacant: u32,
    /// Seats on the ballot this cycle (informational)
    #[serde(default)]
    pub seats_up: Option<u32>,
    /// Supermajority seat count when known; two thirds otherwise
    #[serde(default)]
    pub supermajority: Option<u32>,
}

impl ChamberComposition {
    pub fn majority(&self) -> u32 {
        majority_threshold(self.total)
    }

    pub fn supermajority_threshold(&self) -> u32 {
        self.supermajority
            .unwrap_or_else(|| two_thirds_threshold(self.total))
    }

    pub fn assigned(&self) -> u64 {
        [self.party_a, self.party_b, self.other, self.vacant]
            .into_iter()
            .map(u64::from)
            .sum()
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.total == 0 {
            return Err(RenderError::EmptyChamber);
        }
        if self.assigned() > u64::from(self.total) {
            return Err(RenderError::Overfilled {
                assigned: self.assigned(),
                total: self.total,
            });
        }
        Ok(())
    }
}

/// One party inside a coalition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoalitionMember {
    pub party: PartyStyle,
    pub seats: u32,
}

/// Chamber governed by a multi-party majority coalition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoalitionComposition {
    pub total: u32,
    pub majority: Vec<CoalitionMember>,
    pub minority: Vec<CoalitionMember>,
    #[serde(default)]
    pub vacant: u32,
    #[serde(default)]
    pub supermajority: Option<u32>,
    /// Caption for the majority bracket
    #[serde(default)]
    pub label: Option<String>,
}

impl CoalitionComposition {
    pub fn majority_seats(&self) -> u64 {
        self.majority.iter().map(|m| u64::from(m.seats)).sum()
    }

    pub fn minority_seats(&self) -> u64 {
        self.minority.iter().map(|m| u64::from(m.seats)).sum()
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.total == 0 {
            return Err(RenderError::EmptyChamber);
        }
        let assigned = self.majority_seats() + self.minority_seats() + u64::from(self.vacant);
        if assigned > u64::from(self.total) {
            return Err(RenderError::Overfilled {
                assigned,
                total: self.total,
            });
        }
        Ok(())
    }
}

/// floor(total / 2) + 1
pub fn majority_threshold(total: u32) -> u32 {
    total / 2 + 1
}

/// ceil(total * 2 / 3)
pub fn two_thirds_threshold(total: u32) -> u32 {
    fraction_of(total, 2, 3)
}

/// ceil(total * num / den), in u64 so large chambers cannot overflow
fn fraction_of(total: u32, num: u64, den: u64) -> u32 {
    let seats = (u64::from(total) * num).div_ceil(den);
    u32::try_from(seats).unwrap_or(total)
}

/// Seats needed to override a veto, from the chamber's textual rule.
///
/// Recognizes "majority elected"/"50%", "3/5"/"60%" and "2/3"/"66"
/// (case-insensitive). Anything else, or an empty chamber, gives `None`.
pub fn parse_veto_threshold(rule: &str, total: u32) -> Option<u32> {
    if rule.trim().is_empty() || total == 0 {
        return None;
    }
    let rule = rule.to_lowercase();
    if rule.contains("majority elected") || rule.contains("50%") {
        return Some(majority_threshold(total));
    }
    if rule.contains("3/5") || rule.contains("60%") {
        return Some(fraction_of(total, 3, 5));
    }
    if rule.contains("2/3") || rule.contains("66") {
        return Some(two_thirds_threshold(total));
    }
    None
}

/// Who controls the chamber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChamberControl {
    PartyA,
    PartyB,
    Coalition,
    Tied,
}

/// Seats the controlling party holds above the majority line. Zero for
/// coalition and tied chambers.
pub fn seat_margin(comp: &ChamberComposition, control: ChamberControl) -> i64 {
    let majority = i64::from(comp.majority());
    match control {
        ChamberControl::PartyA => i64::from(comp.party_a) - majority,
        ChamberControl::PartyB => i64::from(comp.party_b) - majority,
        ChamberControl::Coalition | ChamberControl::Tied => 0,
    }
}

/// Whether the controlling party alone meets `veto_threshold`
pub fn holds_veto_supermajority(
    comp: &ChamberComposition,
    control: ChamberControl,
    veto_threshold: Option<u32>,
) -> bool {
    let Some(threshold) = veto_threshold else {
        return false;
    };
    match control {
        ChamberControl::PartyA => comp.party_a >= threshold,
        ChamberControl::PartyB => comp.party_b >= threshold,
        ChamberControl::Coalition | ChamberControl::Tied => false,
    }
}
