//! Bar geometry
//!
//! Widths are `count * scale` with `scale = bar_width / total`; marker
//! positions are `threshold * scale` computed directly, never accumulated
//! from segment widths.

use crate::composition::{
    ChamberComposition, CoalitionComposition, CoalitionMember, PartyStyle, RenderError,
    majority_threshold, two_thirds_threshold,
};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub bar_width: f64,
    pub bar_height: f64,
    /// Segments at or below this width are drawn without a label
    pub label_min_width: f64,
    pub party_a: PartyStyle,
    pub party_b: PartyStyle,
    pub other: PartyStyle,
    pub vacant: PartyStyle,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            bar_width: 600.0,
            bar_height: 32.0,
            label_min_width: 28.0,
            party_a: PartyStyle::new("D", "#2b6cb0"),
            party_b: PartyStyle::new("R", "#c53030"),
            other: PartyStyle::new("Other", "#718096"),
            vacant: PartyStyle::new("Vacant", "#e2e8f0"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    Majority,
    Supermajority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub label: String,
    pub color: String,
    pub seats: u32,
    pub x: f64,
    pub width: f64,
    pub show_label: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub seats: u32,
    pub x: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub x: f64,
    pub width: f64,
    pub label: Option<String>,
}

/// Everything needed to draw one composition bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionLayout {
    pub width: f64,
    pub height: f64,
    pub total: u32,
    pub scale: f64,
    pub segments: Vec<Segment>,
    pub markers: Vec<Marker>,
    pub bracket: Option<Bracket>,
}

struct SegmentCursor<'a> {
    opts: &'a RenderOptions,
    scale: f64,
    seats_so_far: u32,
    segments: Vec<Segment>,
}

impl<'a> SegmentCursor<'a> {
    fn new(opts: &'a RenderOptions, scale: f64) -> Self {
        Self {
            opts,
            scale,
            seats_so_far: 0,
            segments: Vec::new(),
        }
    }

    fn push(&mut self, style: &PartyStyle, seats: u32) {
        if seats == 0 {
            return;
        }
        let width = f64::from(seats) * self.scale;
        self.segments.push(Segment {
            label: style.label.clone(),
            color: style.color.clone(),
            seats,
            x: f64::from(self.seats_so_far) * self.scale,
            width,
            show_label: width > self.opts.label_min_width,
        });
        self.seats_so_far += seats;
    }

    fn x(&self) -> f64 {
        f64::from(self.seats_so_far) * self.scale
    }
}

fn markers(total: u32, supermajority: Option<u32>, scale: f64) -> Vec<Marker> {
    let majority = majority_threshold(total);
    let super_seats = supermajority.unwrap_or_else(|| two_thirds_threshold(total));
    vec![
        Marker {
            kind: MarkerKind::Majority,
            seats: majority,
            x: f64::from(majority) * scale,
        },
        Marker {
            kind: MarkerKind::Supermajority,
            seats: super_seats,
            x: f64::from(super_seats) * scale,
        },
    ]
}

fn check_width(opts: &RenderOptions) -> Result<(), RenderError> {
    if opts.bar_width > 0.0 && opts.bar_width.is_finite() {
        Ok(())
    } else {
        Err(RenderError::InvalidWidth)
    }
}

/// Two-party bar: leading party, other, vacant, trailing party. Party A
/// leads on ties.
pub fn layout_simple(
    comp: &ChamberComposition,
    opts: &RenderOptions,
) -> Result<CompositionLayout, RenderError> {
    comp.validate()?;
    check_width(opts)?;

    let scale = opts.bar_width / f64::from(comp.total);
    let ((lead_style, lead), (trail_style, trail)) = if comp.party_a >= comp.party_b {
        ((&opts.party_a, comp.party_a), (&opts.party_b, comp.party_b))
    } else {
        ((&opts.party_b, comp.party_b), (&opts.party_a, comp.party_a))
    };

    let mut cursor = SegmentCursor::new(opts, scale);
    cursor.push(lead_style, lead);
    cursor.push(&opts.other, comp.other);
    cursor.push(&opts.vacant, comp.vacant);
    cursor.push(trail_style, trail);

    Ok(CompositionLayout {
        width: opts.bar_width,
        height: opts.bar_height,
        total: comp.total,
        scale,
        segments: cursor.segments,
        markers: markers(comp.total, comp.supermajority, scale),
        bracket: None,
    })
}

/// Majority side: parties not in the minority by descending seats, then the
/// shared parties (also by descending seats) against the boundary. Returns
/// the ordered majority and the shared labels in majority order.
fn order_majority(
    majority: &[CoalitionMember],
    minority: &[CoalitionMember],
) -> (Vec<CoalitionMember>, Vec<String>) {
    let is_shared =
        |m: &CoalitionMember| minority.iter().any(|o| o.party.label == m.party.label);

    let (mut shared, mut own): (Vec<CoalitionMember>, Vec<CoalitionMember>) =
        majority.iter().cloned().partition(is_shared);
    own.sort_by_key(|m| Reverse(m.seats));
    shared.sort_by_key(|m| Reverse(m.seats));

    let shared_labels = shared.iter().map(|m| m.party.label.clone()).collect();
    own.extend(shared);
    (own, shared_labels)
}

/// Minority side mirrors the majority: shared parties first, in reverse of
/// their majority order so each sits opposite its counterpart, then the
/// rest by descending seats.
fn order_minority(minority: &[CoalitionMember], shared_labels: &[String]) -> Vec<CoalitionMember> {
    let mut ordered: Vec<CoalitionMember> = shared_labels
        .iter()
        .rev()
        .filter_map(|label| minority.iter().find(|m| &m.party.label == label).cloned())
        .collect();

    let mut rest: Vec<CoalitionMember> = minority
        .iter()
        .filter(|m| !shared_labels.contains(&m.party.label))
        .cloned()
        .collect();
    rest.sort_by_key(|m| Reverse(m.seats));

    ordered.extend(rest);
    ordered
}

/// Coalition bar: majority coalition, minority coalition, vacant. A bracket
/// spans the majority coalition.
pub fn layout_coalition(
    comp: &CoalitionComposition,
    opts: &RenderOptions,
) -> Result<CompositionLayout, RenderError> {
    comp.validate()?;
    check_width(opts)?;

    let scale = opts.bar_width / f64::from(comp.total);
    let (majority, shared_labels) = order_majority(&comp.majority, &comp.minority);
    let minority = order_minority(&comp.minority, &shared_labels);

    let mut cursor = SegmentCursor::new(opts, scale);
    for member in &majority {
        cursor.push(&member.party, member.seats);
    }
    let bracket_width = cursor.x();
    for member in &minority {
        cursor.push(&member.party, member.seats);
    }
    cursor.push(&opts.vacant, comp.vacant);

    if comp.majority_seats() < u64::from(majority_threshold(comp.total)) {
        tracing::debug!(
            seats = comp.majority_seats(),
            total = comp.total,
            "Majority coalition is below the majority line"
        );
    }

    Ok(CompositionLayout {
        width: opts.bar_width,
        height: opts.bar_height,
        total: comp.total,
        scale,
        segments: cursor.segments,
        markers: markers(comp.total, comp.supermajority, scale),
        bracket: Some(Bracket {
            x: 0.0,
            width: bracket_width,
            label: comp.label.clone(),
        }),
    })
}
