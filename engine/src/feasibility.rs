//! Pure feasibility predicates shared by every strategy.
//
//  This module is deliberately policy-free: no dispatch decisions,
//  no logging, no IO.

use domain::config::ScheduleConfig;
use domain::error::ValidationError;
use domain::lot::{Lot, LotSet};

/// Exact fill duration for a lot, in whole seconds.
///
/// `ceil(vials / fill_rate_per_hour * 3600)`, computed in integer
/// arithmetic as `ceil(60 * vials / fill_rate_per_min)` so two runs can
/// never disagree on rounding.
pub fn processing_secs(lot: &Lot, config: &ScheduleConfig) -> u64 {
    (60 * lot.vials).div_ceil(config.fill_rate_vials_per_min)
}

/// Unproductive time between two consecutive fills inside a window.
/// The first lot of a fresh window pays nothing.
pub fn changeover_secs(
    prev_type: Option<&str>,
    next_type: &str,
    config: &ScheduleConfig,
) -> u64 {
    match prev_type {
        None => 0,
        Some(prev) if prev == next_type => config.changeover_same_secs(),
        Some(_) => config.changeover_diff_secs(),
    }
}

/// Occupancy of the currently open clean window on one line.
///
/// Carried incrementally while a strategy builds its schedule; never
/// recomputed by re-scanning the event list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowState {
    /// End of the opening clean.
    pub start: u64,
    /// Cumulative fill + changeover seconds consumed so far.
    pub used: u64,
    /// Product type of the last fill, for changeover pricing.
    pub last_type: Option<String>,
}

impl WindowState {
    pub fn opened_at(start: u64) -> Self {
        Self {
            start,
            used: 0,
            last_type: None,
        }
    }

    /// Residual window capacity after inserting `lot`, including the
    /// changeover it would incur, or `None` if the lot does not fit.
    pub fn residual_after(&self, lot: &Lot, config: &ScheduleConfig) -> Option<u64> {
        let cost = changeover_secs(self.last_type.as_deref(), &lot.product_type, config)
            + processing_secs(lot, config);
        config.window_secs().checked_sub(self.used.checked_add(cost)?)
    }
}

/// True iff `lot` fits in the open window, changeover included.
pub fn fits_in_window(window: &WindowState, lot: &Lot, config: &ScheduleConfig) -> bool {
    window.residual_after(lot, config).is_some()
}

/// How a lot lands on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertionDecision {
    /// Fits in the currently open window after the listed changeover.
    AppendInWindow { changeover_secs: u64 },
    /// The open window (or fresh line) cannot hold the lot: run a clean
    /// and start a new window with this lot. No changeover inside a
    /// fresh window.
    CloseAndReopen { clean_secs: u64 },
    /// The lot alone exceeds the clean window. Caught by
    /// [`validate_input`] before any strategy runs; unreachable at
    /// runtime for validated input.
    Reject { reason: String },
}

/// Decide how `lot` lands on a line whose open window is `window`
/// (`None` for a line with no events yet).
pub fn admit(
    window: Option<&WindowState>,
    lot: &Lot,
    config: &ScheduleConfig,
) -> InsertionDecision {
    let processing = processing_secs(lot, config);
    if processing > config.window_secs() {
        return InsertionDecision::Reject {
            reason: format!(
                "lot {} needs {processing}s of fill time but an empty window holds {}s",
                lot.id,
                config.window_secs()
            ),
        };
    }

    match window {
        Some(open) if fits_in_window(open, lot, config) => InsertionDecision::AppendInWindow {
            changeover_secs: changeover_secs(
                open.last_type.as_deref(),
                &lot.product_type,
                config,
            ),
        },
        _ => InsertionDecision::CloseAndReopen {
            clean_secs: config.clean_secs(),
        },
    }
}

/// Fatal pre-pass run before any strategy: the config must be sane and
/// every lot must fit inside an empty clean window on its own.
pub fn validate_input(lots: &LotSet, config: &ScheduleConfig) -> Result<(), ValidationError> {
    config.validate()?;

    for lot in lots.iter() {
        let processing = processing_secs(lot, config);
        if processing > config.window_secs() {
            return Err(ValidationError::new(
                "vials",
                format!(
                    "lot {} requires {processing}s of fill time, exceeding the {}s clean window",
                    lot.id,
                    config.window_secs()
                ),
                lot.vials.to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ScheduleConfig {
        ScheduleConfig::default()
    }

    fn lot(id: &str, product_type: &str, vials: u64) -> Lot {
        Lot::new(id, product_type, vials)
    }

    #[test]
    fn processing_time_rounds_up_to_whole_seconds() {
        // 10_000 vials at 332/min = 1807.2s of fill -> 1808
        assert_eq!(processing_secs(&lot("A", "VialE", 10_000), &cfg()), 1_808);
    }

    #[test]
    fn processing_time_exact_division_does_not_round() {
        // 332 vials take exactly one minute
        assert_eq!(processing_secs(&lot("A", "VialE", 332), &cfg()), 60);
    }

    #[test]
    fn processing_time_known_values() {
        let config = cfg();
        assert_eq!(processing_secs(&lot("A", "VialE", 600_000), &config), 108_434);
        assert_eq!(processing_secs(&lot("A", "VialE", 1_100_000), &config), 198_796);
        assert_eq!(processing_secs(&lot("A", "VialE", 1_200_000), &config), 216_868);
    }

    #[test]
    fn changeover_is_free_in_fresh_window() {
        assert_eq!(changeover_secs(None, "VialE", &cfg()), 0);
    }

    #[test]
    fn changeover_same_and_diff_type() {
        let config = cfg();
        assert_eq!(changeover_secs(Some("VialE"), "VialE", &config), 14_400);
        assert_eq!(changeover_secs(Some("VialE"), "VialH", &config), 28_800);
    }

    #[test]
    fn lot_filling_window_exactly_fits() {
        // 2_390_400 vials fill for exactly 432_000s, the whole window.
        let config = cfg();
        let big = lot("A", "VialE", 2_390_400);
        assert_eq!(processing_secs(&big, &config), config.window_secs());

        let window = WindowState::opened_at(config.clean_secs());
        assert!(fits_in_window(&window, &big, &config));
        assert_eq!(window.residual_after(&big, &config), Some(0));
    }

    #[test]
    fn full_window_rejects_another_lot() {
        let config = cfg();
        let mut window = WindowState::opened_at(config.clean_secs());
        window.used = config.window_secs() - 10_000;
        window.last_type = Some("VialE".into());

        // 10_000s left but a same-type changeover alone costs 14_400s.
        assert!(!fits_in_window(&window, &lot("B", "VialE", 100), &config));
    }

    #[test]
    fn admit_on_fresh_line_opens_a_window() {
        let decision = admit(None, &lot("A", "VialE", 10_000), &cfg());
        assert_eq!(
            decision,
            InsertionDecision::CloseAndReopen { clean_secs: 86_400 }
        );
    }

    #[test]
    fn admit_appends_when_lot_fits() {
        let config = cfg();
        let mut window = WindowState::opened_at(config.clean_secs());
        window.used = 1_808;
        window.last_type = Some("VialE".into());

        let decision = admit(Some(&window), &lot("B", "VialH", 10_000), &config);
        assert_eq!(
            decision,
            InsertionDecision::AppendInWindow {
                changeover_secs: 28_800
            }
        );
    }

    #[test]
    fn admit_closes_window_when_lot_does_not_fit() {
        let config = cfg();
        let mut window = WindowState::opened_at(config.clean_secs());
        window.used = 400_000;
        window.last_type = Some("VialE".into());

        let decision = admit(Some(&window), &lot("B", "VialE", 600_000), &config);
        assert_eq!(
            decision,
            InsertionDecision::CloseAndReopen { clean_secs: 86_400 }
        );
    }

    #[test]
    fn admit_rejects_oversized_lot() {
        let decision = admit(None, &lot("A", "VialE", 3_000_000), &cfg());
        assert!(matches!(decision, InsertionDecision::Reject { .. }));
    }

    #[test]
    fn validate_input_rejects_oversized_lot() {
        let lots = LotSet::new(vec![lot("A", "VialE", 3_000_000)]).unwrap();
        let err = validate_input(&lots, &cfg()).unwrap_err();
        assert_eq!(err.field, "vials");
    }

    #[test]
    fn validate_input_accepts_boundary_lot() {
        let lots = LotSet::new(vec![lot("A", "VialE", 2_390_400)]).unwrap();
        assert!(validate_input(&lots, &cfg()).is_ok());
    }

    #[test]
    fn validate_input_surfaces_config_errors() {
        let lots = LotSet::new(vec![lot("A", "VialE", 100)]).unwrap();
        let bad = ScheduleConfig {
            num_lines: 0,
            ..ScheduleConfig::default()
        };
        assert_eq!(validate_input(&lots, &bad).unwrap_err().field, "num_lines");
    }
}
