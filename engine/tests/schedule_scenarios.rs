//! End-to-end scheduling scenarios against the default config:
//! 332 vials/min, clean 24h, window 120h, changeover same 4h / diff 8h,
//! one line, start at epoch.

use domain::config::ScheduleConfig;
use domain::event::{Event, EventKind};
use domain::lot::{Lot, LotSet};
use domain::schedule::{Schedule, StrategyTag};
use engine::validator::validate_schedule;

// -----------------------
// helpers
// -----------------------

fn lot(id: &str, product_type: &str, vials: u64) -> Lot {
    Lot::new(id, product_type, vials)
}

fn lots(raw: Vec<Lot>) -> LotSet {
    LotSet::new(raw).expect("valid lot set")
}

fn fill_order(schedule: &Schedule) -> Vec<&str> {
    schedule
        .lines
        .iter()
        .flat_map(|line| line.events.iter())
        .filter(|event| event.kind == EventKind::Fill)
        .filter_map(|event| event.lot_id.as_deref())
        .collect()
}

fn assert_clean(schedule: &Schedule, input: &LotSet) {
    let config = ScheduleConfig::default();
    let found = validate_schedule(schedule, input, &config);
    assert!(found.is_empty(), "validator found: {found:?}");
}

// -----------------------
// concrete scenarios
// -----------------------

#[test]
fn single_small_lot() {
    let input = lots(vec![lot("A", "VialE", 10_000)]);
    let schedule = engine::schedule(&input, &ScheduleConfig::default(), StrategyTag::Lpt).unwrap();

    assert_eq!(schedule.lines.len(), 1);
    assert_eq!(
        schedule.lines[0].events,
        vec![
            Event::clean(0, 86_400),
            Event::fill(86_400, 88_208, "A".into()),
        ]
    );
    assert_eq!(schedule.makespan, 88_208);
    assert!((schedule.metrics.utilization - 1_808.0 / 88_208.0).abs() < 1e-12);
    assert_eq!(schedule.metrics.lots_placed, 1);
    assert_eq!(schedule.metrics.changeovers, 0);
    assert_clean(&schedule, &input);
}

#[test]
fn two_same_type_lots_share_one_window() {
    let input = lots(vec![
        lot("A", "VialE", 600_000),
        lot("B", "VialE", 600_000),
    ]);
    let schedule = engine::schedule(&input, &ScheduleConfig::default(), StrategyTag::Lpt).unwrap();

    // One clean, one same-type changeover: 30.12h + 4h + 30.12h fits 120h.
    let kinds: Vec<EventKind> = schedule.lines[0].events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Clean,
            EventKind::Fill,
            EventKind::Changeover,
            EventKind::Fill
        ]
    );
    let changeover = &schedule.lines[0].events[2];
    assert_eq!(changeover.duration(), 14_400);
    assert_eq!(schedule.makespan, 86_400 + 108_434 + 14_400 + 108_434);
    assert_clean(&schedule, &input);
}

#[test]
fn two_diff_type_lots_still_fit_one_window() {
    let input = lots(vec![
        lot("A", "VialE", 1_100_000),
        lot("B", "VialH", 1_100_000),
    ]);
    let schedule = engine::schedule(&input, &ScheduleConfig::default(), StrategyTag::Lpt).unwrap();

    // 55.22h + 8h + 55.22h = 118.4h <= 120h: one window, one diff changeover.
    let cleans = schedule.lines[0]
        .events
        .iter()
        .filter(|e| e.kind == EventKind::Clean)
        .count();
    assert_eq!(cleans, 1);
    let changeovers: Vec<&Event> = schedule.lines[0]
        .events
        .iter()
        .filter(|e| e.kind == EventKind::Changeover)
        .collect();
    assert_eq!(changeovers.len(), 1);
    assert_eq!(changeovers[0].duration(), 28_800);
    assert_eq!(changeovers[0].from_type.as_deref(), Some("VialE"));
    assert_eq!(changeovers[0].to_type.as_deref(), Some("VialH"));
    assert_clean(&schedule, &input);
}

#[test]
fn two_diff_type_lots_exceeding_window_force_a_second_clean() {
    let input = lots(vec![
        lot("A", "VialE", 1_200_000),
        lot("B", "VialH", 1_200_000),
    ]);
    let schedule = engine::schedule(&input, &ScheduleConfig::default(), StrategyTag::Lpt).unwrap();

    // 60.24h + 8h + 60.24h = 128.5h > 120h: the second lot opens a new
    // window. No changeover survives; the clean replaces it.
    let kinds: Vec<EventKind> = schedule.lines[0].events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Clean,
            EventKind::Fill,
            EventKind::Clean,
            EventKind::Fill
        ]
    );
    assert_eq!(schedule.makespan, 606_536);
    assert_eq!(schedule.metrics.changeovers, 0);
    assert_clean(&schedule, &input);
}

#[test]
fn lpt_and_spt_order_the_same_lots_oppositely() {
    let input = lots(vec![
        lot("S", "X", 10_000),
        lot("M", "X", 500_000),
        lot("L", "X", 1_000_000),
    ]);
    let config = ScheduleConfig::default();

    let lpt = engine::schedule(&input, &config, StrategyTag::Lpt).unwrap();
    let spt = engine::schedule(&input, &config, StrategyTag::Spt).unwrap();

    assert_eq!(fill_order(&lpt), vec!["L", "M", "S"]);
    assert_eq!(fill_order(&spt), vec!["S", "M", "L"]);

    // Single line, single type: same makespan and changeover count,
    // only the order differs.
    assert_eq!(lpt.makespan, spt.makespan);
    assert_eq!(lpt.metrics.changeovers, spt.metrics.changeovers);
    assert_clean(&lpt, &input);
    assert_clean(&spt, &input);
}

// -----------------------
// boundary behaviors
// -----------------------

#[test]
fn lot_filling_the_whole_window_schedules_with_one_clean() {
    // 2_390_400 vials fill for exactly the 432_000s window ceiling.
    let input = lots(vec![lot("A", "VialE", 2_390_400)]);
    let schedule = engine::schedule(&input, &ScheduleConfig::default(), StrategyTag::Smart).unwrap();

    assert_eq!(
        schedule.lines[0].events,
        vec![
            Event::clean(0, 86_400),
            Event::fill(86_400, 518_400, "A".into()),
        ]
    );
    assert_clean(&schedule, &input);
}

#[test]
fn oversized_lot_is_rejected_before_any_strategy_runs() {
    let input = lots(vec![lot("A", "VialE", 2_390_401)]);
    for tag in StrategyTag::ALL {
        let err = engine::schedule(&input, &ScheduleConfig::default(), tag).unwrap_err();
        match err {
            domain::error::EngineError::Validation(v) => assert_eq!(v.field, "vials"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}

#[test]
fn empty_lot_set_is_rejected_at_construction() {
    assert!(LotSet::new(vec![]).is_err());
}

#[test]
fn single_type_input_emits_no_diff_changeovers() {
    let input = lots(vec![
        lot("A", "VialE", 400_000),
        lot("B", "VialE", 300_000),
        lot("C", "VialE", 200_000),
        lot("D", "VialE", 100_000),
    ]);

    for tag in [
        StrategyTag::Lpt,
        StrategyTag::Spt,
        StrategyTag::Cfs,
        StrategyTag::Smart,
        StrategyTag::Hybrid,
    ] {
        let schedule = engine::schedule(&input, &ScheduleConfig::default(), tag).unwrap();
        for line in &schedule.lines {
            for event in &line.events {
                if event.kind == EventKind::Changeover {
                    assert_eq!(event.from_type, event.to_type, "{tag}: {event:?}");
                    assert_eq!(event.duration(), 14_400);
                }
            }
        }
        assert_clean(&schedule, &input);
    }
}

#[test]
fn milp_matches_greedy_on_a_trivially_optimal_instance() {
    let input = lots(vec![
        lot("A", "VialE", 600_000),
        lot("B", "VialE", 600_000),
    ]);
    let config = ScheduleConfig::default();

    let milp = engine::schedule(&input, &config, StrategyTag::Milp).unwrap();
    let lpt = engine::schedule(&input, &config, StrategyTag::Lpt).unwrap();

    assert_eq!(milp.makespan, lpt.makespan);
    assert_clean(&milp, &input);
}

#[test]
fn identical_runs_serialize_identically() {
    let input = lots(vec![
        lot("A", "VialE", 250_000),
        lot("B", "VialH", 500_000),
        lot("C", "VialE", 750_000),
    ]);
    let config = ScheduleConfig {
        num_lines: 2,
        ..ScheduleConfig::default()
    };

    for tag in [StrategyTag::Lpt, StrategyTag::Cfs, StrategyTag::Hybrid] {
        let first = engine::schedule(&input, &config, tag).unwrap();
        let second = engine::schedule(&input, &config, tag).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap(),
            "{tag} must be deterministic"
        );
    }
}

#[test]
fn schedule_serialization_matches_contract() {
    let input = lots(vec![lot("A", "VialE", 10_000)]);
    let schedule = engine::schedule(&input, &ScheduleConfig::default(), StrategyTag::Lpt).unwrap();
    let json = serde_json::to_value(&schedule).unwrap();

    assert_eq!(json["strategy"], "lpt");
    assert_eq!(json["makespan_seconds"], 88_208);
    assert_eq!(json["lines"][0]["line_id"], 0);
    assert_eq!(json["lines"][0]["events"][0]["kind"], "clean");
    assert_eq!(json["lines"][0]["events"][1]["start_seconds"], 86_400);
    assert_eq!(json["metrics"]["lots_placed"], 1);
    assert_eq!(json["metrics"]["window_violations"], 0);
    assert_eq!(json["violations"].as_array().unwrap().len(), 0);
    assert!(json.get("created_at").is_none());
}
