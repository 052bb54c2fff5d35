//! Chamber composition bars
//!
//! Pure, synchronous rendering of a chamber's party breakdown into a
//! horizontal bar with majority and supermajority markers, as a
//! [`CompositionLayout`] value and as a self-contained SVG document.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod composition;
pub mod layout;
pub mod svg;
pub mod tally;

pub use composition::{
    ChamberComposition, ChamberControl, CoalitionComposition, CoalitionMember, PartyStyle,
    RenderError, holds_veto_supermajority, majority_threshold, parse_veto_threshold, seat_margin,
    two_thirds_threshold,
};
pub use layout::{
    Bracket, CompositionLayout, Marker, MarkerKind, RenderOptions, Segment, layout_coalition,
    layout_simple,
};
pub use svg::render_svg;
pub use tally::{MemberSeat, effective_alignment, tally_members};
