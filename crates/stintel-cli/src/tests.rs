use std::collections::BTreeMap;

use chrono::Utc;
use clap::Parser;
use stintel_core::{
    RecordKind, RunOutcome, RunReport, RunType, Stage, StageReport, StageStatus, StoreCounts,
    TriggerSource,
};

use super::*;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["stintel-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["stintel-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["stintel-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
    assert!(!cli.memory);
}

#[test]
fn run_accepts_days_back_and_global_memory_flag() {
    let cli = Cli::try_parse_from(["stintel-cli", "run", "--days-back", "3", "--memory"])
        .expect("expected valid cli args");
    assert!(cli.memory);
    assert!(matches!(
        cli.command,
        Some(Commands::Run { days_back: Some(3) })
    ));
}

#[test]
fn collect_defaults_days_back() {
    let cli = Cli::try_parse_from(["stintel-cli", "collect"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Collect { days_back: None })
    ));
}

#[test]
fn briefing_parses_date() {
    let cli = Cli::try_parse_from(["stintel-cli", "briefing", "--date", "2026-03-01"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Briefing { date: Some(d) }) if d.to_string() == "2026-03-01"
    ));
}

#[test]
fn briefing_rejects_bad_date() {
    assert!(Cli::try_parse_from(["stintel-cli", "briefing", "--date", "03/01/2026"]).is_err());
}

#[test]
fn extract_requires_a_file() {
    assert!(Cli::try_parse_from(["stintel-cli", "extract"]).is_err());
    let cli = Cli::try_parse_from(["stintel-cli", "extract", "reply.txt"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Extract { ref file }) if file.as_os_str() == "reply.txt"
    ));
}

#[test]
fn report_lists_stages_sources_and_errors() {
    let now = Utc::now();
    let report = RunReport {
        run_id: uuid::Uuid::nil(),
        trigger: TriggerSource::Manual,
        run_type: RunType::Full,
        days_back: 7,
        started_at: now,
        finished_at: now,
        duration_ms: 42,
        outcome: RunOutcome::Success,
        stages: vec![StageReport::new(
            Stage::Collect,
            StageStatus::Degraded,
            Some("failed sources: github".into()),
        )],
        collected: BTreeMap::from([("github".to_string(), 0), ("news".to_string(), 5)]),
        source_errors: BTreeMap::from([(
            "github".to_string(),
            "source unavailable: 503".to_string(),
        )]),
        stored: BTreeMap::from([(
            RecordKind::Article,
            StoreCounts {
                inserted: 4,
                duplicates: 1,
            },
        )]),
        enriched: 4,
        briefing_date: Some(now.date_naive()),
        error: None,
    };

    let text = pipeline::format_report(&report);
    assert!(text.contains("in 42 ms"));
    assert!(text.contains("Degraded - failed sources: github"));
    assert!(text.contains("source github: 0 records (source unavailable: 503)"));
    assert!(text.contains("stored article: 4 new, 1 duplicates"));
    assert!(text.contains("enriched: 4"));
}
