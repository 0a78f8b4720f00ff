use crate::directory::Membership;
use crate::error::RosterError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

/// Membership counts on one date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub date: String,
    pub by_level: BTreeMap<String, u64>,
    pub total: u64,
}

/// Local wall-clock time of a directory timestamp. Bare dates are midnight.
fn parse_stamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Count memberships whose start..=end span covers midnight on `date`.
/// Memberships with unreadable dates are logged and skipped.
pub fn take(memberships: &[Membership], date: NaiveDate) -> Snapshot {
    let mut snap = Snapshot {
        date: date.format("%Y-%m-%d").to_string(),
        ..Default::default()
    };
    let Some(at) = date.and_hms_opt(0, 0, 0) else {
        return snap;
    };
    for m in memberships {
        let span = m
            .start_date
            .as_deref()
            .and_then(parse_stamp)
            .zip(m.end_date.as_deref().and_then(parse_stamp));
        let Some((start, end)) = span else {
            tracing::warn!("{}", RosterError::partial(m.label(), "unreadable start or end date"));
            continue;
        };
        if start <= at && at <= end {
            let level = m
                .membership_level
                .as_ref()
                .map(|l| l.name.clone())
                .unwrap_or_else(|| "Unknown".to_string());
            *snap.by_level.entry(level).or_default() += 1;
            snap.total += 1;
        }
    }
    snap
}
