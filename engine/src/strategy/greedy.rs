//! Greedy dispatchers: LPT, SPT, and CFS.
//!
//! One shared skeleton: sort pending lots by the rule's key, then send
//! each lot to the line that finishes it earliest. The rules differ only
//! in sort key and tie-breaks, so their schedules stay comparable.

use std::cmp::Ordering;
use std::collections::HashMap;

use domain::config::ScheduleConfig;
use domain::lot::{Lot, LotSet};
use domain::schedule::UnscheduledLot;

use crate::feasibility::InsertionDecision;
use crate::line::LineState;

use super::{BuiltSchedule, Deadline, fresh_lines};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rule {
    /// Longest processing time first: big lots early, short ones fill
    /// the tail. Classic load-balancing order for parallel lines.
    Lpt,
    /// Shortest processing time first.
    Spt,
    /// Critical first: scarce-type large lots early, so later windows
    /// can still group the remaining lots of that type without an extra
    /// clean.
    Cfs,
}

pub(crate) fn run(
    rule: Rule,
    lots: &LotSet,
    config: &ScheduleConfig,
    deadline: Deadline,
) -> BuiltSchedule {
    let mut type_counts: HashMap<&str, u64> = HashMap::new();
    for lot in lots.iter() {
        *type_counts.entry(lot.product_type.as_str()).or_insert(0) += 1;
    }

    let mut pending: Vec<&Lot> = lots.iter().collect();
    pending.sort_by(|a, b| key_cmp(rule, a, b, &type_counts));

    let mut lines = fresh_lines(config);
    let mut unscheduled = Vec::new();
    let mut timed_out = false;

    for lot in pending {
        if deadline.expired() {
            timed_out = true;
            unscheduled.push(UnscheduledLot {
                lot_id: lot.id.clone(),
                reason: "strategy deadline expired".into(),
            });
            continue;
        }

        let target = select_line(&lines, lot, config);
        if let InsertionDecision::Reject { reason } = lines[target].place(lot, config) {
            unscheduled.push(UnscheduledLot {
                lot_id: lot.id.clone(),
                reason,
            });
        }
    }

    BuiltSchedule {
        lines,
        unscheduled,
        timed_out,
    }
}

/// The line that finishes the lot earliest, insertion cost included.
/// Ties go to the lowest line id via iteration order.
fn select_line(lines: &[LineState], lot: &Lot, config: &ScheduleConfig) -> usize {
    let mut best = 0;
    let mut best_end = u64::MAX;
    for (index, line) in lines.iter().enumerate() {
        if let Some(end) = line.projected_end(lot, config) {
            if end < best_end {
                best = index;
                best_end = end;
            }
        }
    }
    best
}

fn key_cmp(rule: Rule, a: &Lot, b: &Lot, type_counts: &HashMap<&str, u64>) -> Ordering {
    let primary = match rule {
        Rule::Lpt => b.vials.cmp(&a.vials),
        Rule::Spt => a.vials.cmp(&b.vials),
        Rule::Cfs => criticality_cmp(a, b, type_counts),
    };
    primary
        .then_with(|| a.product_type.cmp(&b.product_type))
        .then_with(|| a.id.cmp(&b.id))
}

/// Descending criticality `vials * (1 / count_of_same_type)`, compared
/// exactly by cross-multiplication so the order is total without float
/// keys: score(a) > score(b)  <=>  a.vials * count(b) > b.vials * count(a).
fn criticality_cmp(a: &Lot, b: &Lot, type_counts: &HashMap<&str, u64>) -> Ordering {
    let count_a = u128::from(type_counts[a.product_type.as_str()]);
    let count_b = u128::from(type_counts[b.product_type.as_str()]);
    let score_a = u128::from(a.vials) * count_b;
    let score_b = u128::from(b.vials) * count_a;
    score_b.cmp(&score_a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::event::EventKind;
    use std::time::Duration;

    fn cfg() -> ScheduleConfig {
        ScheduleConfig::default()
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(30))
    }

    fn lot(id: &str, product_type: &str, vials: u64) -> Lot {
        Lot::new(id, product_type, vials)
    }

    fn fill_order(built: &BuiltSchedule) -> Vec<String> {
        built
            .lines
            .iter()
            .flat_map(|line| line.events().iter())
            .filter(|event| event.kind == EventKind::Fill)
            .filter_map(|event| event.lot_id.clone())
            .collect()
    }

    #[test]
    fn lpt_schedules_longest_first() {
        let lots = LotSet::new(vec![
            lot("S", "X", 10_000),
            lot("M", "X", 500_000),
            lot("L", "X", 1_000_000),
        ])
        .unwrap();
        let built = run(Rule::Lpt, &lots, &cfg(), deadline());
        assert_eq!(fill_order(&built), vec!["L", "M", "S"]);
    }

    #[test]
    fn spt_schedules_shortest_first() {
        let lots = LotSet::new(vec![
            lot("S", "X", 10_000),
            lot("M", "X", 500_000),
            lot("L", "X", 1_000_000),
        ])
        .unwrap();
        let built = run(Rule::Spt, &lots, &cfg(), deadline());
        assert_eq!(fill_order(&built), vec!["S", "M", "L"]);
    }

    #[test]
    fn equal_vials_tie_break_by_type_then_id() {
        let lots = LotSet::new(vec![
            lot("B", "VialH", 10_000),
            lot("A", "VialH", 10_000),
            lot("C", "VialE", 10_000),
        ])
        .unwrap();
        let built = run(Rule::Lpt, &lots, &cfg(), deadline());
        assert_eq!(fill_order(&built), vec!["C", "A", "B"]);
    }

    #[test]
    fn cfs_prefers_scarce_types() {
        // R is the only lot of its type (rarity 1); the E lots share a
        // type (rarity 1/2). Equal vials, so R's criticality is double.
        let lots = LotSet::new(vec![
            lot("E1", "VialE", 100_000),
            lot("E2", "VialE", 100_000),
            lot("R", "VialR", 100_000),
        ])
        .unwrap();
        let built = run(Rule::Cfs, &lots, &cfg(), deadline());
        assert_eq!(fill_order(&built), vec!["R", "E1", "E2"]);
    }

    #[test]
    fn cfs_weighs_vials_against_rarity() {
        // score(BIG) = 400k * 1/2 = 200k beats score(R) = 150k * 1 = 150k.
        let lots = LotSet::new(vec![
            lot("BIG", "VialE", 400_000),
            lot("E2", "VialE", 10_000),
            lot("R", "VialR", 150_000),
        ])
        .unwrap();
        let built = run(Rule::Cfs, &lots, &cfg(), deadline());
        assert_eq!(fill_order(&built), vec!["BIG", "R", "E2"]);
    }

    #[test]
    fn two_lines_balance_load() {
        let lots = LotSet::new(vec![
            lot("A", "VialE", 600_000),
            lot("B", "VialE", 600_000),
        ])
        .unwrap();
        let config = ScheduleConfig {
            num_lines: 2,
            ..cfg()
        };
        let built = run(Rule::Lpt, &lots, &config, deadline());

        // Each line gets one lot: a fresh line (clean + fill) beats
        // appending behind the first lot.
        let per_line: Vec<usize> = built
            .lines
            .iter()
            .map(|line| {
                line.events()
                    .iter()
                    .filter(|e| e.kind == EventKind::Fill)
                    .count()
            })
            .collect();
        assert_eq!(per_line, vec![1, 1]);
    }

    #[test]
    fn expired_deadline_reports_remaining_lots() {
        let lots = LotSet::new(vec![lot("A", "VialE", 10_000), lot("B", "VialE", 10_000)])
            .unwrap();
        let built = run(Rule::Lpt, &lots, &cfg(), Deadline::after(Duration::ZERO));

        assert!(built.timed_out);
        assert_eq!(built.unscheduled.len(), 2);
        assert!(built.lines.iter().all(|line| line.events().is_empty()));
    }
}
