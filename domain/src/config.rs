use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Engine configuration.
///
/// All durations are expressed in hours the way process engineers quote
/// them; the engine converts to whole seconds once and does all further
/// arithmetic in integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Line throughput, vials per minute.
    pub fill_rate_vials_per_min: u64,

    /// Duration of the mandatory clean-before-use that opens every
    /// window, in hours.
    pub clean_duration_hours: f64,

    /// Hard ceiling on cumulative fill + changeover time inside one open
    /// window, in hours. A window that would exceed this must be closed
    /// with a clean first.
    pub clean_window_hours: f64,

    /// Changeover between two fills of the same product type, in hours.
    pub changeover_same_type_hours: f64,

    /// Changeover between two fills of different product types, in hours.
    pub changeover_diff_type_hours: f64,

    /// Number of filling lines available.
    pub num_lines: u32,

    /// Absolute anchor all event times are measured from. The engine
    /// never formats wall-clock time; that is the façade's job.
    pub start_time: DateTime<Utc>,

    /// Per-strategy wallclock budget for a single run.
    pub strategy_timeout_secs: u64,

    /// Advisory cap for parallel heuristics. Recognized and validated
    /// but not consumed by any current strategy.
    pub max_concurrent_lots: Option<u32>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            fill_rate_vials_per_min: 332,
            clean_duration_hours: 24.0,
            clean_window_hours: 120.0,
            changeover_same_type_hours: 4.0,
            changeover_diff_type_hours: 8.0,
            num_lines: 1,
            start_time: DateTime::UNIX_EPOCH,
            strategy_timeout_secs: 30,
            max_concurrent_lots: None,
        }
    }
}

impl ScheduleConfig {
    /// Rejects configs no strategy could satisfy.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.fill_rate_vials_per_min == 0 {
            return Err(ValidationError::new(
                "fill_rate_vials_per_min",
                "fill rate must be positive",
                "0",
            ));
        }
        if !self.clean_window_hours.is_finite() || self.clean_window_hours <= 0.0 {
            return Err(ValidationError::new(
                "clean_window_hours",
                "clean window must be a positive number of hours",
                self.clean_window_hours.to_string(),
            ));
        }
        if !self.clean_duration_hours.is_finite() || self.clean_duration_hours <= 0.0 {
            return Err(ValidationError::new(
                "clean_duration_hours",
                "clean duration must be a positive number of hours",
                self.clean_duration_hours.to_string(),
            ));
        }
        for (field, value) in [
            ("changeover_same_type_hours", self.changeover_same_type_hours),
            ("changeover_diff_type_hours", self.changeover_diff_type_hours),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::new(
                    field,
                    "changeover must be a non-negative number of hours",
                    value.to_string(),
                ));
            }
        }
        if self.num_lines == 0 {
            return Err(ValidationError::new(
                "num_lines",
                "at least one line is required",
                "0",
            ));
        }
        if self.strategy_timeout_secs == 0 {
            return Err(ValidationError::new(
                "strategy_timeout_secs",
                "strategy timeout must be positive",
                "0",
            ));
        }
        if let Some(0) = self.max_concurrent_lots {
            return Err(ValidationError::new(
                "max_concurrent_lots",
                "advisory concurrency cap must be positive when set",
                "0",
            ));
        }
        Ok(())
    }

    pub fn clean_secs(&self) -> u64 {
        hours_to_secs(self.clean_duration_hours)
    }

    pub fn window_secs(&self) -> u64 {
        hours_to_secs(self.clean_window_hours)
    }

    pub fn changeover_same_secs(&self) -> u64 {
        hours_to_secs(self.changeover_same_type_hours)
    }

    pub fn changeover_diff_secs(&self) -> u64 {
        hours_to_secs(self.changeover_diff_type_hours)
    }
}

fn hours_to_secs(hours: f64) -> u64 {
    (hours * 3600.0).round() as u64
}
