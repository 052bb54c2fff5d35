//! Live overlay command

use anyhow::bail;
use clap::Parser;
use seatwatch_engine::{OverlayOutcome, SeatwatchConfig, SeatwatchEngine};

#[derive(Debug, Parser)]
pub struct OverlayArgs {
    /// District id
    #[arg(long)]
    pub district: i64,

    /// Pretty-print the JSON
    #[arg(long)]
    pub pretty: bool,
}

fn outcome_json(outcome: &OverlayOutcome) -> serde_json::Value {
    let detail = match outcome {
        OverlayOutcome::Skipped(reason) => Some(format!("{reason:?}")),
        OverlayOutcome::Degraded(reason) => Some(reason.as_str().to_string()),
        OverlayOutcome::Cached(_) | OverlayOutcome::Fetched(_) => None,
    };
    serde_json::json!({
        "outcome": outcome.label(),
        "detail": detail,
    })
}

/// The overlay cycle is always `live.cycle_year` from config.
pub async fn run_overlay(cfg: SeatwatchConfig, args: OverlayArgs) -> anyhow::Result<()> {
    let engine = SeatwatchEngine::with_config(cfg)?;
    let now_ms = chrono::Utc::now().timestamp_millis();

    let Some(reconciled) = engine.district_view(args.district, now_ms).await? else {
        bail!("district {} not found", args.district);
    };

    let mut body = outcome_json(&reconciled.outcome);
    body["cycle_year"] = engine.fetcher().year().into();
    body["district"] = serde_json::to_value(&reconciled.snapshot)?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&body)?
    } else {
        serde_json::to_string(&body)?
    };
    println!("{json}");
    Ok(())
}
