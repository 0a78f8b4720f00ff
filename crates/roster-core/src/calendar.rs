use crate::config::CalendarConfig;
use crate::directory::Event;
use crate::error::Result;
use crate::http;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SYSTEM: &str = "calendar";

/// Offset appended to all-day dates so every entry has a time component.
const ALL_DAY_SUFFIX: &str = "T00:00:00+08:00";

/// Event shape shared by calendar and directory exports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedEvent {
    pub start: String,
    pub end: String,
    pub summary: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CalendarItem {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    description: Option<String>,
    start: When,
    end: When,
}

#[derive(Debug, Deserialize)]
struct When {
    #[serde(rename = "dateTime", default)]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl When {
    fn normalized(&self) -> String {
        let raw = self
            .date_time
            .as_deref()
            .or(self.date.as_deref())
            .unwrap_or_default();
        if raw.len() == 10 {
            format!("{raw}{ALL_DAY_SUFFIX}")
        } else {
            raw.to_string()
        }
    }
}

pub struct CalendarClient {
    http: Client,
    cfg: CalendarConfig,
}

impl CalendarClient {
    pub fn new(cfg: &CalendarConfig) -> Self {
        Self {
            http: http::client(),
            cfg: cfg.clone(),
        }
    }

    /// Upcoming single events ordered by start time.
    pub fn upcoming(&self, now: DateTime<Utc>) -> Result<Vec<ExportedEvent>> {
        let url = format!(
            "{}/calendars/{}/events",
            self.cfg.base_url.trim_end_matches('/'),
            self.cfg.calendar_id
        );
        let req = self.http.get(url).query(&[
            ("key", self.cfg.api_key.clone()),
            ("timeMin", now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            ("maxResults", self.cfg.max_results.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ]);
        let body: Value = http::json(SYSTEM, http::send(SYSTEM, req)?)?;
        let items = match body.get("items") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Ok(http::decode_records::<CalendarItem>("calendar event", items)
            .into_iter()
            .map(|item| ExportedEvent {
                start: item.start.normalized(),
                end: item.end.normalized(),
                summary: item.summary,
                description: item.description.unwrap_or_default(),
                location: None,
                url: None,
                id: None,
            })
            .collect())
    }
}

impl From<Event> for ExportedEvent {
    fn from(e: Event) -> Self {
        ExportedEvent {
            start: e.start_at,
            end: e.end_at.unwrap_or_default(),
            summary: e.name,
            description: e.body.unwrap_or_default(),
            location: e.location,
            url: e.public_url,
            id: Some(e.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn all_day_events_get_a_time() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/calendars/main/events")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("key".into(), "k".into()),
                Matcher::UrlEncoded("orderBy".into(), "startTime".into()),
            ]))
            .with_body(
                r#"{"items": [
                {"summary": "Open day", "start": {"date": "2024-05-01"}, "end": {"date": "2024-05-02"}},
                {"summary": "Talk", "description": "Rust", "start": {"dateTime": "2024-05-03T18:00:00+08:00"}, "end": {"dateTime": "2024-05-03T19:00:00+08:00"}}
            ]}"#,
            )
            .create();
        let client = CalendarClient::new(&CalendarConfig {
            base_url: server.url(),
            calendar_id: "main".into(),
            api_key: "k".into(),
            max_results: 30,
        });
        let events = client.upcoming(Utc::now()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].start, "2024-05-01T00:00:00+08:00");
        assert_eq!(events[0].description, "");
        assert_eq!(events[1].start, "2024-05-03T18:00:00+08:00");
    }
}
