//! SmartPack: type-grouped best-fit packing over clean windows.
//!
//! Treats each open window as a bin of `clean_window` capacity. Lots are
//! released type by type (heaviest group first) so same-type runs stay
//! contiguous and pay the cheap changeover; each lot then lands in the
//! open window with the tightest remaining fit, opening a new window on
//! the least-loaded line only when nothing accepts it.

use std::collections::BTreeMap;

use domain::config::ScheduleConfig;
use domain::lot::{Lot, LotSet};
use domain::schedule::UnscheduledLot;

use crate::feasibility::InsertionDecision;
use crate::line::LineState;

use super::{BuiltSchedule, Deadline, fresh_lines};

pub(crate) fn run(lots: &LotSet, config: &ScheduleConfig, deadline: Deadline) -> BuiltSchedule {
    let mut lines = fresh_lines(config);
    let mut unscheduled = Vec::new();
    let mut timed_out = false;

    for lot in release_order(lots, config) {
        if deadline.expired() {
            timed_out = true;
            unscheduled.push(UnscheduledLot {
                lot_id: lot.id.clone(),
                reason: "strategy deadline expired".into(),
            });
            continue;
        }

        let target = match best_fit(&lines, lot, config) {
            Some(index) => index,
            None => least_loaded(&lines),
        };
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

/// Groups by product type ordered by total processing time descending
/// (ties by type name), lots inside a group by vials descending (ties
/// by id). The BTreeMap keeps group discovery order-independent.
fn release_order<'a>(lots: &'a LotSet, config: &ScheduleConfig) -> Vec<&'a Lot> {
    let mut groups: BTreeMap<&str, Vec<&'a Lot>> = BTreeMap::new();
    for lot in lots.iter() {
        groups.entry(lot.product_type.as_str()).or_default().push(lot);
    }

    let mut ordered: Vec<(u64, &str, Vec<&'a Lot>)> = groups
        .into_iter()
        .map(|(product_type, mut members)| {
            members.sort_by(|a, b| b.vials.cmp(&a.vials).then_with(|| a.id.cmp(&b.id)));
            let total: u64 = members
                .iter()
                .map(|lot| crate::feasibility::processing_secs(lot, config))
                .sum();
            (total, product_type, members)
        })
        .collect();
    ordered.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

    ordered
        .into_iter()
        .flat_map(|(_, _, members)| members)
        .collect()
}

/// The open window that accepts the lot with the smallest non-negative
/// residual, changeover included. Strict `<` keeps the lowest line id
/// on ties. `None` when no open window can hold the lot.
fn best_fit(lines: &[LineState], lot: &Lot, config: &ScheduleConfig) -> Option<usize> {
    let mut best: Option<(u64, usize)> = None;
    for (index, line) in lines.iter().enumerate() {
        let Some(window) = line.window() else { continue };
        let Some(residual) = window.residual_after(lot, config) else {
            continue;
        };
        if best.is_none_or(|(best_residual, _)| residual < best_residual) {
            best = Some((residual, index));
        }
    }
    best.map(|(_, index)| index)
}

/// Earliest current end; ties go to the lowest line id.
fn least_loaded(lines: &[LineState]) -> usize {
    lines
        .iter()
        .enumerate()
        .min_by_key(|(index, line)| (line.current_end(), *index))
        .map(|(index, _)| index)
        .expect("at least one line is configured")
}
