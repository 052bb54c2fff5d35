//! seatwatch command line
//!
//! ## Commands
//!
//! - `seatwatch init` - create the officeholder database
//! - `seatwatch export --district N` - static district snapshot as JSON
//! - `seatwatch overlay --district N` - snapshot reconciled with live results
//! - `seatwatch render ...` - chamber composition bar as SVG
//! - `seatwatch term ...` - record, supersede or close seat terms
//! - `seatwatch status ...` - advance an election's result status

pub mod overlay_cmd;
pub mod render_cmd;
pub mod store_cmd;

use anyhow::Context;
use clap::{Parser, Subcommand};
use seatwatch_engine::SeatwatchConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "seatwatch", version, about = "Seat officeholder store and live election overlay")]
pub struct Cli {
    /// Config file (default: $SEATWATCH_CONFIG or ~/.config/seatwatch/seatwatch.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Officeholder database, overriding `db_path` from the config
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the officeholder database and apply the schema
    Init,

    /// Print the static snapshot of one district
    Export(store_cmd::ExportArgs),

    /// Print a district snapshot with the live overlay applied
    Overlay(overlay_cmd::OverlayArgs),

    /// Render a chamber composition bar
    Render(render_cmd::RenderCli),

    /// Seat term maintenance
    Term(store_cmd::TermCli),

    /// Advance an election's result status
    Status(store_cmd::StatusArgs),
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let cfg = self.load_config()?;

        match self.command {
            Command::Init => store_cmd::run_init(&cfg),
            Command::Export(args) => store_cmd::run_export(&cfg, args),
            Command::Overlay(args) => overlay_cmd::run_overlay(cfg, args).await,
            Command::Render(cli) => render_cmd::run_render(&cfg, cli),
            Command::Term(cli) => store_cmd::run_term(&cfg, cli),
            Command::Status(args) => store_cmd::run_status(&cfg, args),
        }
    }

    fn load_config(&self) -> anyhow::Result<SeatwatchConfig> {
        let mut cfg = match &self.config {
            Some(path) => SeatwatchConfig::load_from_path(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => SeatwatchConfig::load().context("loading config")?,
        };

        if let Some(db) = &self.db {
            cfg.db_path = db.to_string_lossy().into_owned();
        }

        Ok(cfg)
    }
}
