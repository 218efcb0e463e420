// ABOUTME: Integration tests for the normalize -> filter -> dedup -> merge pipeline.
// ABOUTME: Exercises the data layer end to end on realistic raw rows.

use std::collections::HashSet;

use pretty_assertions::assert_eq;

use berthline_schedule::{
    dedupe, merge_schedules, normalize_row, FieldMap, FieldSource, IdentityKey, RawRow,
    SourceOutcome, SourceReport, Terminal, ValidityRule, VesselSchedule,
};

fn row(cells: &[&str]) -> RawRow {
    cells.iter().map(|c| c.to_string()).collect()
}

fn simple_map() -> FieldMap {
    FieldMap {
        vessel_name: FieldSource::Index(0),
        route_code: None,
        carrier: FieldSource::Index(1),
        port_info: FieldSource::Index(4),
        arrival_time: FieldSource::Index(2),
        departure_time: FieldSource::Index(3),
    }
}

#[test]
fn garbage_rows_are_discarded_not_repaired() {
    let rows = vec![
        row(&["MSC CAMEROON", "MSC", "2025-05-09 22:00", "2025-05-11 17:00"]),
        row(&["123", "BAD", "", " "]),
    ];
    let rule = ValidityRule::default();

    let kept: Vec<VesselSchedule> = rows
        .iter()
        .map(|r| normalize_row(Terminal::Pnc, r, &simple_map()))
        .filter(|v| rule.keeps(v))
        .collect();

    assert_eq!(kept.len(), 1);
    assert_eq!(
        kept[0],
        VesselSchedule {
            terminal: Terminal::Pnc,
            vessel_name: "MSC CAMEROON".into(),
            route_code: None,
            carrier: "MSC".into(),
            port_info: String::new(),
            arrival_time: "2025-05-09 22:00".into(),
            departure_time: "2025-05-11 17:00".into(),
        }
    );
}

#[test]
fn merged_output_never_contains_invalid_names() {
    // Rows covering the adversarial name shapes: numerals, empty,
    // punctuation-only-valid, mixed alphanumerics.
    let candidates = [
        "MSC123", "", "M.S.C.", "MAERSK EDMONTON", "A1", "123", "EVER-GIVEN", "  ",
    ];
    let rule = ValidityRule::default();

    let vessels: Vec<VesselSchedule> = candidates
        .iter()
        .map(|name| {
            normalize_row(
                Terminal::Ict,
                &row(&[name, "CARRIER", "2025-05-09 01:00", "2025-05-10 01:00"]),
                &simple_map(),
            )
        })
        .filter(|v| rule.keeps(v))
        .collect();

    let reports = vec![SourceReport {
        terminal: Terminal::Ict,
        outcome: SourceOutcome::Loaded { vessels },
    }];
    let included: HashSet<Terminal> = Terminal::ALL.into_iter().collect();

    let merged = merge_schedules(&reports, &included);
    let names: Vec<&str> = merged.vessels.iter().map(|v| v.vessel_name.as_str()).collect();
    assert_eq!(names, vec!["M.S.C.", "MAERSK EDMONTON", "EVER-GIVEN"]);
}

#[test]
fn rerendered_grid_rows_collapse_to_one_entry() {
    // A browser-rendered grid that re-emitted its rows once.
    let map = FieldMap {
        vessel_name: FieldSource::Index(2),
        route_code: Some(FieldSource::Join {
            join: (0, 1, "/".to_string()),
        }),
        carrier: FieldSource::Index(3),
        port_info: FieldSource::Index(4),
        arrival_time: FieldSource::Index(5),
        departure_time: FieldSource::Index(6),
    };
    let raw = vec![
        row(&["QM516A", "QM516A", "MSC CAMEROON", "MSC", "MEXICA", "2025-05-09 22:00", ""]),
        row(&["QM516A", "QM516A", "MSC CAMEROON", "MSC", "MEXICA", "2025-05-09 22:00", ""]),
        row(&["ME001", "ME001", "MAERSK EDMONTON", "MAE", "ASIA", "2025-05-10 04:00", ""]),
    ];
    let rule = ValidityRule::default();

    let vessels: Vec<VesselSchedule> = raw
        .iter()
        .map(|r| normalize_row(Terminal::Bct, r, &map))
        .filter(|v| rule.keeps(v))
        .collect();
    let deduped = dedupe(vessels, IdentityKey::NameRoute);

    assert_eq!(deduped.len(), 2);
    assert_eq!(deduped[0].route_code.as_deref(), Some("QM516A/QM516A"));

    // Idempotent: a second pass changes nothing.
    let again = dedupe(deduped.clone(), IdentityKey::NameRoute);
    assert_eq!(again, deduped);
}

#[test]
fn single_source_failure_leaves_other_sources_untouched() {
    let healthy = vec![
        VesselSchedule {
            terminal: Terminal::Gwct,
            vessel_name: "HANNE".into(),
            arrival_time: "2025-05-09 10:00".into(),
            ..Default::default()
        },
        VesselSchedule {
            terminal: Terminal::Gwct,
            vessel_name: "SUNNY DAISY".into(),
            arrival_time: "2025-05-09 12:00".into(),
            ..Default::default()
        },
    ];
    let with_failure = vec![
        SourceReport {
            terminal: Terminal::Gwct,
            outcome: SourceOutcome::Loaded {
                vessels: healthy.clone(),
            },
        },
        SourceReport {
            terminal: Terminal::Pnit,
            outcome: SourceOutcome::Failed {
                error: "connection refused".into(),
                status: None,
            },
        },
    ];
    let without_failure = vec![with_failure[0].clone()];
    let included: HashSet<Terminal> = Terminal::ALL.into_iter().collect();

    let a = merge_schedules(&with_failure, &included);
    let b = merge_schedules(&without_failure, &included);
    assert_eq!(a.vessels, b.vessels);
}
