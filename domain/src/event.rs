use serde::Serialize;

/// What occupies a span of line time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Clean,
    Changeover,
    Fill,
}

/// One contiguous span on a filling line.
///
/// `start` and `end` are whole seconds from `config.start_time`, with
/// `start < end` always. A `Fill` references exactly one lot, a
/// `Changeover` carries the type transition, a `Clean` has neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    #[serde(rename = "start_seconds")]
    pub start: u64,
    #[serde(rename = "end_seconds")]
    pub end: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_type: Option<String>,
}

impl Event {
    pub fn clean(start: u64, end: u64) -> Self {
        Self {
            kind: EventKind::Clean,
            start,
            end,
            lot_id: None,
            from_type: None,
            to_type: None,
        }
    }

    pub fn changeover(start: u64, end: u64, from_type: String, to_type: String) -> Self {
        Self {
            kind: EventKind::Changeover,
            start,
            end,
            lot_id: None,
            from_type: Some(from_type),
            to_type: Some(to_type),
        }
    }

    pub fn fill(start: u64, end: u64, lot_id: String) -> Self {
        Self {
            kind: EventKind::Fill,
            start,
            end,
            lot_id: Some(lot_id),
            from_type: None,
            to_type: None,
        }
    }

    pub fn duration(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// Ordered, non-overlapping events on one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineSchedule {
    pub line_id: u32,
    pub events: Vec<Event>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_contract_field_names() {
        let event = Event::fill(86_400, 88_208, "A".into());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "fill");
        assert_eq!(json["start_seconds"], 86_400);
        assert_eq!(json["end_seconds"], 88_208);
        assert_eq!(json["lot_id"], "A");
        assert!(json.get("from_type").is_none());
    }

    #[test]
    fn changeover_carries_type_transition() {
        let event = Event::changeover(0, 14_400, "VialE".into(), "VialH".into());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "changeover");
        assert_eq!(json["from_type"], "VialE");
        assert_eq!(json["to_type"], "VialH");
        assert!(json.get("lot_id").is_none());
    }
}
