//! Event copies and event export.

use crate::calendar::ExportedEvent;
use crate::directory::Event;
use crate::error::{Result, RosterError};
use crate::plan::Action;
use chrono::{DateTime, Duration, FixedOffset};
use serde_json::Value;

/// Events offered for copying: the newest few, oldest first.
pub const PICKABLE: usize = 5;

/// Fields the directory assigns itself; never sent back on create.
const SERVER_FIELDS: &[&str] = &[
    "id",
    "created_at",
    "category_id",
    "image_url",
    "public",
    "public_url",
];

const STAMP: &str = "%Y-%m-%dT%H:%M:%S%z";

pub fn newest(events: &[Event]) -> &[Event] {
    &events[events.len().saturating_sub(PICKABLE)..]
}

fn parse(raw: &str, field: &str, event: &Event) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw, STAMP)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map_err(|e| {
            RosterError::Validation(format!("event {} has an unreadable {field}: {e}", event.id))
        })
}

/// `count` copies of `event`, the n-th shifted by `n * every_days`.
pub fn plan_repeats(event: &Event, every_days: i64, count: u32) -> Result<Vec<Action>> {
    if every_days < 1 || count < 1 {
        return Err(RosterError::Validation(
            "repeat interval and count must both be at least 1".into(),
        ));
    }
    let start = parse(&event.start_at, "start_at", event)?;
    let end = match &event.end_at {
        Some(raw) => parse(raw, "end_at", event)?,
        None => start,
    };

    let mut template = serde_json::to_value(event)?;
    if let Value::Object(map) = &mut template {
        for key in SERVER_FIELDS {
            map.remove(*key);
        }
    }

    let mut actions = Vec::new();
    for n in 1..=i64::from(count) {
        let shift = Duration::days(every_days * n);
        let start_at = (start + shift).format(STAMP).to_string();
        let end_at = (end + shift).format(STAMP).to_string();
        let mut details = template.clone();
        details["start_at"] = Value::String(start_at.clone());
        details["end_at"] = Value::String(end_at);
        actions.push(Action::CreateEvent {
            name: event.name.clone(),
            start_at,
            details,
        });
    }
    Ok(actions)
}

pub fn export_directory(events: Vec<Event>) -> Vec<ExportedEvent> {
    events.into_iter().map(ExportedEvent::from).collect()
}
