//! Composition bar rendering

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use seatwatch_engine::{OfficeholderStore, SeatwatchConfig};
use seatwatch_render::{
    ChamberComposition, CompositionLayout, MemberSeat, PartyStyle, RenderOptions, layout_simple,
    parse_veto_threshold, render_svg, tally_members,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
pub struct RenderCli {
    #[command(subcommand)]
    pub command: RenderSubcommand,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Subcommand)]
pub enum RenderSubcommand {
    /// Render from explicit seat counts
    Counts(CountsArgs),

    /// Tally a chamber from the officeholder store and render it
    Chamber(ChamberArgs),
}

#[derive(Debug, Parser)]
pub struct OutputArgs {
    /// Write to a file instead of stdout
    #[arg(long, global = true, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Emit the layout as JSON instead of SVG
    #[arg(long, global = true)]
    pub layout_json: bool,

    #[arg(long, global = true, default_value = "D")]
    pub party_a: String,

    #[arg(long, global = true, default_value = "R")]
    pub party_b: String,

    /// Textual veto-override rule, e.g. "2/3" or "3/5"
    #[arg(long, global = true)]
    pub veto: Option<String>,
}

#[derive(Debug, Parser)]
pub struct CountsArgs {
    #[arg(long)]
    pub total: u32,

    #[arg(long = "a")]
    pub party_a_seats: u32,

    #[arg(long = "b")]
    pub party_b_seats: u32,

    #[arg(long, default_value_t = 0)]
    pub other: u32,

    #[arg(long, default_value_t = 0)]
    pub vacant: u32,

    /// Explicit supermajority seat count
    #[arg(long)]
    pub supermajority: Option<u32>,
}

#[derive(Debug, Parser)]
pub struct ChamberArgs {
    /// State abbreviation
    #[arg(long)]
    pub state: String,

    #[arg(long)]
    pub chamber: String,
}

fn render_options(cfg: &SeatwatchConfig, output: &OutputArgs) -> RenderOptions {
    let defaults = RenderOptions::default();
    let color_a = if output.party_a == "R" {
        defaults.party_b.color.clone()
    } else {
        defaults.party_a.color.clone()
    };
    let color_b = if output.party_b == "D" {
        defaults.party_a.color.clone()
    } else {
        defaults.party_b.color.clone()
    };

    RenderOptions {
        bar_width: cfg.render.bar_width,
        bar_height: cfg.render.bar_height,
        label_min_width: cfg.render.label_min_width,
        party_a: PartyStyle::new(output.party_a.clone(), color_a),
        party_b: PartyStyle::new(output.party_b.clone(), color_b),
        ..defaults
    }
}

fn chamber_composition(
    cfg: &SeatwatchConfig,
    args: &ChamberArgs,
    output: &OutputArgs,
) -> anyhow::Result<ChamberComposition> {
    let store = OfficeholderStore::open(cfg)
        .with_context(|| format!("opening {}", cfg.resolved_db_path().display()))?;
    let seats = store.chamber_seats(&args.state, &args.chamber)?;
    if seats.is_empty() {
        bail!("no seats found for {} {}", args.state, args.chamber);
    }

    let members: Vec<MemberSeat> = seats
        .into_iter()
        .map(|seat| MemberSeat {
            holder: seat.current_holder,
            party: seat.current_holder_party,
            caucus: seat.current_holder_caucus,
        })
        .collect();

    Ok(tally_members(&members, &output.party_a, &output.party_b))
}

fn write_output(output: &OutputArgs, layout: &CompositionLayout) -> anyhow::Result<()> {
    let rendered = if output.layout_json {
        serde_json::to_string_pretty(layout)?
    } else {
        render_svg(layout)
    };

    match &output.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

pub fn run_render(cfg: &SeatwatchConfig, cli: RenderCli) -> anyhow::Result<()> {
    let mut comp = match &cli.command {
        RenderSubcommand::Counts(args) => ChamberComposition {
            total: args.total,
            party_a: args.party_a_seats,
            party_b: args.party_b_seats,
            other: args.other,
            vacant: args.vacant,
            seats_up: None,
            supermajority: args.supermajority,
        },
        RenderSubcommand::Chamber(args) => chamber_composition(cfg, args, &cli.output)?,
    };

    if comp.supermajority.is_none()
        && let Some(rule) = &cli.output.veto
    {
        comp.supermajority = parse_veto_threshold(rule, comp.total);
        if comp.supermajority.is_none() {
            tracing::warn!(rule = %rule, "Unrecognized veto rule, using two thirds");
        }
    }

    let layout = layout_simple(&comp, &render_options(cfg, &cli.output))?;
    write_output(&cli.output, &layout)
}
