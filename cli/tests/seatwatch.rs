//! seatwatch binary integration tests
//!
//! Every test runs against a temp database and a config path inside the
//! temp dir, so the user's real config is never read.

use anyhow::Result;
use chrono::NaiveDate;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use seatwatch_engine::NewDistrict;
use seatwatch_engine::NewElection;
use seatwatch_engine::NewSeat;
use seatwatch_engine::OfficeholderStore;
use serde_json::Value as JsonValue;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;

struct TestContext {
    dir: TempDir,
}

impl TestContext {
    fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    fn db_path(&self) -> PathBuf {
        self.dir.path().join("officeholders.db")
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("seatwatch.toml")
    }

    fn write_config(&self, contents: &str) -> Result<()> {
        std::fs::write(self.config_path(), contents)?;
        Ok(())
    }

    fn command(&self) -> Result<assert_cmd::Command> {
        let mut cmd = assert_cmd::Command::cargo_bin("seatwatch")?;
        cmd.env("SEATWATCH_CONFIG", self.config_path());
        cmd.env_remove("SEATWATCH_LIVE_API_KEY");
        cmd.env("RUST_LOG", "warn");
        cmd.arg("--db").arg(self.db_path());
        Ok(cmd)
    }

    /// One state, one two-seat district with 2026 general elections
    fn seed(&self) -> Result<(i64, i64)> {
        let store = OfficeholderStore::open_at_path(&self.db_path())?;
        let state = store.insert_state("NH", "New Hampshire")?;
        let district = store.insert_district(&NewDistrict {
            state_id: state,
            chamber: "House".to_string(),
            district_number: "Coos 1".to_string(),
            district_name: None,
            num_seats: 2,
        })?;
        let seat = store.insert_seat(&NewSeat::legislative(district, "Seat A"))?;
        let other = store.insert_seat(&NewSeat::legislative(district, "Seat B"))?;
        let general = NaiveDate::from_ymd_opt(2026, 11, 3).expect("date");
        store.insert_election(&NewElection::general(seat, general).open_seat())?;
        store.insert_election(&NewElection::general(other, general).open_seat())?;
        store.insert_candidate("Alex Rivera")?;
        Ok((district, seat))
    }
}

fn stdout_json(output: &std::process::Output) -> Result<JsonValue> {
    Ok(serde_json::from_slice(&output.stdout)?)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn init_creates_database() -> Result<()> {
    let ctx = TestContext::new()?;
    ctx.command()?
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("officeholders.db"));
    assert!(ctx.db_path().exists());
    Ok(())
}

#[test]
fn term_record_updates_export() -> Result<()> {
    let ctx = TestContext::new()?;
    let (district, seat) = ctx.seed()?;

    ctx.command()?
        .args(["term", "record"])
        .args(["--seat", &seat.to_string()])
        .args(["--candidate", "1", "--party", "D"])
        .args(["--start", "2025-01-08", "--reason", "elected"])
        .args(["--today", "2025-02-01"])
        .assert()
        .success();

    let output = ctx
        .command()?
        .args(["export", "--district", &district.to_string()])
        .output()?;
    assert!(output.status.success());

    let json = stdout_json(&output)?;
    assert_eq!(json["seats"][0]["current_holder"], "Alex Rivera");
    assert_eq!(json["seats"][0]["current_holder_party"], "D");
    assert_eq!(json["seats"][0]["elections"][0]["is_open_seat"], false);
    assert_eq!(json["seats"][1]["elections"][0]["is_open_seat"], true);
    Ok(())
}

#[test]
fn duplicate_current_term_fails() -> Result<()> {
    let ctx = TestContext::new()?;
    let (_, seat) = ctx.seed()?;
    let record = |ctx: &TestContext| -> Result<assert_cmd::assert::Assert> {
        Ok(ctx
            .command()?
            .args(["term", "record", "--seat", &seat.to_string()])
            .args(["--candidate", "1", "--party", "R"])
            .args(["--start", "2025-01-08", "--reason", "appointed"])
            .assert())
    };

    record(&ctx)?.success();
    record(&ctx)?
        .failure()
        .stderr(predicate::str::contains("constraint violation"));
    Ok(())
}

#[test]
fn status_cannot_regress() -> Result<()> {
    let ctx = TestContext::new()?;
    ctx.seed()?;

    ctx.command()?
        .args(["status", "--election", "1", "--status", "Certified"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Certified"));
    ctx.command()?
        .args(["status", "--election", "1", "--status", "Counting"])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn overlay_disabled_is_skipped() -> Result<()> {
    let ctx = TestContext::new()?;
    let (district, _) = ctx.seed()?;
    ctx.write_config("[live]\nenabled = false\ncycle_year = 2026\n")?;

    let output = ctx
        .command()?
        .args(["overlay", "--district", &district.to_string()])
        .output()?;
    assert!(output.status.success());

    let json = stdout_json(&output)?;
    assert_eq!(json["outcome"], "skipped");
    assert_eq!(json["cycle_year"], 2026);
    assert_eq!(json["district"]["seats"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn overlay_cycle_comes_only_from_config() -> Result<()> {
    let ctx = TestContext::new()?;
    let (district, _) = ctx.seed()?;
    ctx.command()?
        .args(["overlay", "--district", &district.to_string(), "--year", "2024"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--year"));
    Ok(())
}

#[test]
fn overlay_without_source_degrades_to_static() -> Result<()> {
    let ctx = TestContext::new()?;
    let (district, _) = ctx.seed()?;
    ctx.write_config("[live]\nbase_url = \"\"\n")?;

    let output = ctx
        .command()?
        .args(["overlay", "--district", &district.to_string()])
        .output()?;
    assert!(output.status.success());

    let json = stdout_json(&output)?;
    assert_eq!(json["outcome"], "degraded");
    assert_eq!(json["detail"], "not_configured");
    assert_eq!(json["district"]["seats"][0]["elections"][0]["year"], 2026);
    Ok(())
}

#[test]
fn render_counts_emits_svg() -> Result<()> {
    let ctx = TestContext::new()?;
    ctx.command()?
        .args(["render", "counts", "--total", "40", "--a", "22", "--b", "18"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<svg"))
        .stdout(predicate::str::contains("x1=\"315.00\""));
    Ok(())
}

#[test]
fn render_counts_handles_huge_chamber() -> Result<()> {
    let ctx = TestContext::new()?;
    ctx.command()?
        .args(["render", "counts", "--total", "3000000000", "--a", "1", "--b", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2000000000"));
    Ok(())
}

#[test]
fn render_chamber_writes_layout_json() -> Result<()> {
    let ctx = TestContext::new()?;
    ctx.seed()?;
    let out = ctx.dir.path().join("layout.json");

    ctx.command()?
        .args(["render", "chamber", "--state", "NH", "--chamber", "House"])
        .args(["--layout-json", "--output", &path_arg(&out)])
        .assert()
        .success();

    let layout: JsonValue = serde_json::from_str(&std::fs::read_to_string(&out)?)?;
    assert_eq!(layout["total"], 2);
    // Both seats are vacant until a term is recorded
    assert_eq!(layout["segments"][0]["label"], "Vacant");
    Ok(())
}
