//! Append-only per-line schedule construction.
//!
//! A [`LineState`] is owned exclusively by a single strategy run; events
//! are appended back-to-back and never reordered or removed.

use domain::config::ScheduleConfig;
use domain::event::{Event, LineSchedule};
use domain::lot::Lot;

use crate::feasibility::{InsertionDecision, WindowState, admit, processing_secs};

/// Mutable build state for one filling line.
#[derive(Debug, Clone)]
pub struct LineState {
    pub line_id: u32,
    events: Vec<Event>,
    current_end: u64,
    window: Option<WindowState>,
}

impl LineState {
    /// A fresh line has no events; the opening clean is only emitted
    /// when the first lot is placed, so unused lines stay empty.
    pub fn new(line_id: u32) -> Self {
        Self {
            line_id,
            events: Vec::new(),
            current_end: 0,
            window: None,
        }
    }

    pub fn current_end(&self) -> u64 {
        self.current_end
    }

    pub fn window(&self) -> Option<&WindowState> {
        self.window.as_ref()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// End time of the line if `lot` were appended now, or `None` when
    /// the lot cannot be placed at all. Used for line selection.
    pub fn projected_end(&self, lot: &Lot, config: &ScheduleConfig) -> Option<u64> {
        let processing = processing_secs(lot, config);
        match admit(self.window.as_ref(), lot, config) {
            InsertionDecision::AppendInWindow { changeover_secs } => {
                Some(self.current_end + changeover_secs + processing)
            }
            InsertionDecision::CloseAndReopen { clean_secs } => {
                Some(self.current_end + clean_secs + processing)
            }
            InsertionDecision::Reject { .. } => None,
        }
    }

    /// Place `lot` at the end of the line, inserting whatever the
    /// admission decision calls for. Returns the decision taken.
    pub fn place(&mut self, lot: &Lot, config: &ScheduleConfig) -> InsertionDecision {
        let decision = admit(self.window.as_ref(), lot, config);
        self.apply(lot, &decision, config);
        decision
    }

    /// Apply an already-made insertion decision. The MILP decoder uses
    /// this to honor the solver's window-break choices, which may close
    /// a window the greedy admission would have kept open.
    pub fn apply(&mut self, lot: &Lot, decision: &InsertionDecision, config: &ScheduleConfig) {
        let processing = processing_secs(lot, config);

        match decision {
            InsertionDecision::AppendInWindow { changeover_secs } => {
                let window = self
                    .window
                    .as_mut()
                    .expect("append requires an open window");

                if *changeover_secs > 0 {
                    let from = window
                        .last_type
                        .clone()
                        .expect("changeover requires a previous fill");
                    self.events.push(Event::changeover(
                        self.current_end,
                        self.current_end + changeover_secs,
                        from,
                        lot.product_type.clone(),
                    ));
                    self.current_end += changeover_secs;
                }

                self.events.push(Event::fill(
                    self.current_end,
                    self.current_end + processing,
                    lot.id.clone(),
                ));
                self.current_end += processing;
                window.used += changeover_secs + processing;
                window.last_type = Some(lot.product_type.clone());
            }
            InsertionDecision::CloseAndReopen { clean_secs } => {
                self.events
                    .push(Event::clean(self.current_end, self.current_end + clean_secs));
                self.current_end += clean_secs;

                let mut window = WindowState::opened_at(self.current_end);
                self.events.push(Event::fill(
                    self.current_end,
                    self.current_end + processing,
                    lot.id.clone(),
                ));
                self.current_end += processing;
                window.used = processing;
                window.last_type = Some(lot.product_type.clone());
                self.window = Some(window);
            }
            InsertionDecision::Reject { .. } => {}
        }
    }

    pub fn into_schedule(self) -> LineSchedule {
        LineSchedule {
            line_id: self.line_id,
            events: self.events,
        }
    }
}
