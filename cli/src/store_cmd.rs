//! Officeholder store commands

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use seatwatch_engine::model::{EndReason, NewSeatTerm, ResultStatus, SeatTermPatch, StartReason};
use seatwatch_engine::{OfficeholderStore, SeatwatchConfig};

fn parse_start_reason(s: &str) -> Result<StartReason, String> {
    StartReason::parse(s).ok_or_else(|| format!("unknown start reason: {s}"))
}

fn parse_end_reason(s: &str) -> Result<EndReason, String> {
    EndReason::parse(s).ok_or_else(|| format!("unknown end reason: {s}"))
}

fn parse_result_status(s: &str) -> Result<ResultStatus, String> {
    ResultStatus::parse(s).ok_or_else(|| format!("unknown result status: {s}"))
}

fn today_or(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| chrono::Local::now().date_naive())
}

fn open_store(cfg: &SeatwatchConfig) -> anyhow::Result<OfficeholderStore> {
    OfficeholderStore::open(cfg)
        .with_context(|| format!("opening {}", cfg.resolved_db_path().display()))
}

pub fn run_init(cfg: &SeatwatchConfig) -> anyhow::Result<()> {
    open_store(cfg)?;
    println!("{}", cfg.resolved_db_path().display());
    Ok(())
}

#[derive(Debug, Parser)]
pub struct ExportArgs {
    /// District id
    #[arg(long)]
    pub district: i64,

    /// Pretty-print the JSON
    #[arg(long)]
    pub pretty: bool,
}

pub fn run_export(cfg: &SeatwatchConfig, args: ExportArgs) -> anyhow::Result<()> {
    let store = open_store(cfg)?;
    let Some(snapshot) = store.export_district(args.district)? else {
        bail!("district {} not found", args.district);
    };

    let json = if args.pretty {
        serde_json::to_string_pretty(&snapshot)?
    } else {
        serde_json::to_string(&snapshot)?
    };
    println!("{json}");
    Ok(())
}

#[derive(Debug, Parser)]
pub struct TermCli {
    #[command(subcommand)]
    pub command: TermSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum TermSubcommand {
    /// Record a new seat term
    Record(RecordTermArgs),

    /// Close the seat's current term and open a successor
    Supersede(SupersedeTermArgs),

    /// Close an existing term
    Close(CloseTermArgs),
}

#[derive(Debug, Parser)]
pub struct TermFields {
    #[arg(long)]
    pub seat: i64,

    #[arg(long)]
    pub candidate: i64,

    #[arg(long)]
    pub party: String,

    #[arg(long)]
    pub caucus: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// elected, appointed or succeeded
    #[arg(long, value_parser = parse_start_reason)]
    pub reason: StartReason,

    /// Election that produced the term
    #[arg(long)]
    pub election: Option<i64>,

    /// Date used for the open-seat check (default: local today)
    #[arg(long)]
    pub today: Option<NaiveDate>,
}

impl TermFields {
    fn to_new_term(&self) -> NewSeatTerm {
        let mut term = NewSeatTerm::current(
            self.seat,
            self.candidate,
            self.party.clone(),
            self.start,
            self.reason,
        );
        if let Some(caucus) = &self.caucus {
            term = term.with_caucus(caucus.clone());
        }
        if let Some(election) = self.election {
            term = term.from_election(election);
        }
        term
    }
}

#[derive(Debug, Parser)]
pub struct RecordTermArgs {
    #[command(flatten)]
    pub term: TermFields,
}

#[derive(Debug, Parser)]
pub struct SupersedeTermArgs {
    #[command(flatten)]
    pub term: TermFields,

    /// End date of the outgoing term
    #[arg(long)]
    pub end_date: NaiveDate,

    #[arg(long, value_parser = parse_end_reason)]
    pub end_reason: EndReason,
}

#[derive(Debug, Parser)]
pub struct CloseTermArgs {
    #[arg(long)]
    pub term_id: i64,

    #[arg(long)]
    pub end_date: NaiveDate,

    #[arg(long, value_parser = parse_end_reason)]
    pub end_reason: EndReason,

    #[arg(long)]
    pub today: Option<NaiveDate>,
}

pub fn run_term(cfg: &SeatwatchConfig, cli: TermCli) -> anyhow::Result<()> {
    let mut store = open_store(cfg)?;

    let term = match cli.command {
        TermSubcommand::Record(args) => {
            store.record_term(&args.term.to_new_term(), today_or(args.term.today))?
        }
        TermSubcommand::Supersede(args) => store.supersede_term(
            &args.term.to_new_term(),
            args.end_date,
            args.end_reason,
            today_or(args.term.today),
        )?,
        TermSubcommand::Close(args) => store.update_term(
            args.term_id,
            &SeatTermPatch::close(args.end_date, args.end_reason),
            today_or(args.today),
        )?,
    };

    tracing::info!(
        term_id = term.id,
        seat_id = term.seat_id,
        current = term.is_current(),
        "Seat term written"
    );
    println!("{}", term.id);
    Ok(())
}

#[derive(Debug, Parser)]
pub struct StatusArgs {
    #[arg(long)]
    pub election: i64,

    /// Counting, Called or Certified
    #[arg(long, value_parser = parse_result_status)]
    pub status: ResultStatus,
}

pub fn run_status(cfg: &SeatwatchConfig, args: StatusArgs) -> anyhow::Result<()> {
    let store = open_store(cfg)?;
    store.set_result_status(args.election, args.status)?;
    println!("{}", args.status.as_str());
    Ok(())
}
