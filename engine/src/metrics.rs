//! Aggregate schedule quality metrics.

use std::collections::BTreeSet;

use domain::event::{EventKind, LineSchedule};
use domain::schedule::ScheduleMetrics;

/// Latest event end across all lines, measured from `start_time`.
/// Empty lines contribute nothing.
pub fn makespan(lines: &[LineSchedule]) -> u64 {
    lines
        .iter()
        .filter_map(|line| line.events.last())
        .map(|event| event.end)
        .max()
        .unwrap_or(0)
}

/// Compute the reported metrics for a frozen set of line schedules.
///
/// Utilization is the mean over all configured lines of
/// (fill seconds on the line / makespan); idle lines pull the average
/// down, which is the point of adding them.
pub fn compute(lines: &[LineSchedule], num_lines: u32, window_violations: u32) -> ScheduleMetrics {
    let makespan = makespan(lines);

    let mut changeovers = 0u32;
    let mut placed: BTreeSet<&str> = BTreeSet::new();
    let mut utilization_sum = 0.0f64;

    for line in lines {
        let mut fill_secs = 0u64;
        for event in &line.events {
            match event.kind {
                EventKind::Fill => {
                    fill_secs += event.duration();
                    if let Some(id) = event.lot_id.as_deref() {
                        placed.insert(id);
                    }
                }
                EventKind::Changeover => changeovers += 1,
                EventKind::Clean => {}
            }
        }
        if makespan > 0 {
            utilization_sum += fill_secs as f64 / makespan as f64;
        }
    }

    let utilization = if num_lines == 0 {
        0.0
    } else {
        utilization_sum / f64::from(num_lines)
    };

    ScheduleMetrics {
        utilization,
        changeovers,
        window_violations,
        lots_placed: placed.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::event::Event;

    fn single_lot_line() -> LineSchedule {
        LineSchedule {
            line_id: 0,
            events: vec![
                Event::clean(0, 86_400),
                Event::fill(86_400, 88_208, "A".into()),
            ],
        }
    }

    #[test]
    fn makespan_is_latest_event_end() {
        assert_eq!(makespan(&[single_lot_line()]), 88_208);
        assert_eq!(makespan(&[]), 0);
    }

    #[test]
    fn utilization_is_fill_share_of_makespan() {
        let metrics = compute(&[single_lot_line()], 1, 0);
        assert!((metrics.utilization - 1_808.0 / 88_208.0).abs() < 1e-12);
        assert_eq!(metrics.changeovers, 0);
        assert_eq!(metrics.lots_placed, 1);
    }

    #[test]
    fn idle_line_halves_utilization() {
        let lines = vec![
            single_lot_line(),
            LineSchedule {
                line_id: 1,
                events: vec![],
            },
        ];
        let metrics = compute(&lines, 2, 0);
        assert!((metrics.utilization - 1_808.0 / 88_208.0 / 2.0).abs() < 1e-12);
    }

    #[test]
    fn counts_changeovers_across_lines() {
        let line = LineSchedule {
            line_id: 0,
            events: vec![
                Event::clean(0, 86_400),
                Event::fill(86_400, 100_000, "A".into()),
                Event::changeover(100_000, 114_400, "VialE".into(), "VialE".into()),
                Event::fill(114_400, 130_000, "B".into()),
            ],
        };
        let metrics = compute(&[line], 1, 0);
        assert_eq!(metrics.changeovers, 1);
        assert_eq!(metrics.lots_placed, 2);
    }

    #[test]
    fn empty_schedule_has_zero_utilization() {
        let metrics = compute(&[], 1, 0);
        assert_eq!(metrics.utilization, 0.0);
        assert_eq!(metrics.lots_placed, 0);
    }
}
