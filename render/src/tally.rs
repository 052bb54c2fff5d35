//! Chamber tallies from seat holder lists

use crate::composition::ChamberComposition;

/// Caucus value meaning "part of a coalition"; alignment falls back to party
pub const COALITION_CAUCUS: &str = "C";

/// One seat's holder as seen by the tally
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberSeat {
    pub holder: Option<String>,
    pub party: Option<String>,
    pub caucus: Option<String>,
}

/// Caucus when present, except the coalition marker, which falls back to
/// party
pub fn effective_alignment<'a>(party: Option<&'a str>, caucus: Option<&'a str>) -> Option<&'a str> {
    match caucus {
        Some(c) if !c.is_empty() && c != COALITION_CAUCUS => Some(c),
        _ => party,
    }
}

/// Count seats by effective alignment. Seats without a holder are vacant;
/// aligned seats that are neither `party_a` nor `party_b` count as other.
pub fn tally_members(members: &[MemberSeat], party_a: &str, party_b: &str) -> ChamberComposition {
    let mut comp = ChamberComposition {
        total: u32::try_from(members.len()).unwrap_or(u32::MAX),
        ..Default::default()
    };

    for member in members {
        if member.holder.as_deref().is_none_or(str::is_empty) {
            comp.vacant += 1;
            continue;
        }
        match effective_alignment(member.party.as_deref(), member.caucus.as_deref()) {
            Some(a) if a == party_a => comp.party_a += 1,
            Some(b) if b == party_b => comp.party_b += 1,
            _ => comp.other += 1,
        }
    }

    comp
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seat(holder: Option<&str>, party: Option<&str>, caucus: Option<&str>) -> MemberSeat {
        MemberSeat {
            holder: holder.map(str::to_string),
            party: party.map(str::to_string),
            caucus: caucus.map(str::to_string),
        }
    }

    #[test]
    fn test_effective_alignment() {
        assert_eq!(effective_alignment(Some("R"), Some("D")), Some("D"));
        assert_eq!(effective_alignment(Some("R"), Some("C")), Some("R"));
        assert_eq!(effective_alignment(Some("I"), None), Some("I"));
        assert_eq!(effective_alignment(None, None), None);
    }

    #[test]
    fn test_tally() {
        let members = vec![
            seat(Some("A"), Some("D"), None),
            seat(Some("B"), Some("R"), Some("C")),
            seat(Some("C"), Some("I"), Some("D")),
            seat(Some("D"), Some("L"), None),
            seat(None, None, None),
            seat(Some(""), Some("R"), None),
        ];
        let comp = tally_members(&members, "D", "R");
        assert_eq!(
            comp,
            ChamberComposition {
                total: 6,
                party_a: 2,
                party_b: 1,
                other: 1,
                vacant: 2,
                seats_up: None,
                supermajority: None,
            }
        );
    }
}
