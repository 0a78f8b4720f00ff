use crate::config::{ContactId, DirectoryConfig, GroupId};
use crate::error::{Result, RosterError};
use crate::http;
use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

const SYSTEM: &str = "directory";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub nick_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    #[serde(default)]
    pub groups: Vec<GroupRef>,
}

fn default_kind() -> String {
    "person".to_string()
}

impl Contact {
    /// Non-empty text value of a custom field.
    pub fn custom_field(&self, field_id: &str) -> Option<&str> {
        self.custom_fields
            .iter()
            .filter(|f| f.id == field_id)
            .find_map(|f| f.text())
    }

    pub fn group_ids(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.groups.iter().map(|g| g.id)
    }

    pub fn in_any(&self, groups: &[GroupId]) -> bool {
        self.group_ids().any(|g| groups.contains(&g))
    }

    pub fn name(&self) -> String {
        if let Some(d) = self.display_name.as_deref().filter(|d| !d.is_empty()) {
            return d.to_string();
        }
        self.full_name()
    }

    pub fn full_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{first} {last}").trim().to_string()
    }

    pub fn is_person(&self) -> bool {
        self.kind == "person"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    pub id: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl CustomField {
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: GroupId,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    #[serde(default)]
    pub id: Option<u64>,
    pub contact_id: ContactId,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub membership_level_id: Option<u64>,
    #[serde(default)]
    pub membership_level: Option<LevelRef>,
}

impl Membership {
    pub fn is_expired(&self) -> bool {
        self.state.as_deref() == Some("expired")
    }

    pub fn label(&self) -> String {
        match self.id {
            Some(id) => format!("membership {id}"),
            None => format!("membership of contact {}", self.contact_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub name: String,
    pub start_at: String,
    #[serde(default)]
    pub end_at: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub public_url: Option<String>,
    /// Everything else the directory sends, kept so events can be copied.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub name: String,
    #[serde(default)]
    pub quantity_sold: u64,
    #[serde(deserialize_with = "amount_from_any")]
    pub amount: f64,
}

/// Ticket prices arrive as strings ("12.50") or numbers.
fn amount_from_any<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("amount out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("amount '{s}': {e}"))),
        Value::Null => Ok(0.0),
        other => Err(serde::de::Error::custom(format!("amount {other}"))),
    }
}

/// Filter for the upcoming-events listing.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub limit: Option<u32>,
    pub start_at: Option<String>,
    pub public_only: bool,
}

// ---------------------------------------------------------------------------
// DirectoryClient
// ---------------------------------------------------------------------------

/// Blocking client for the membership directory. The token travels as the
/// `access_token` query parameter on every call.
pub struct DirectoryClient {
    http: Client,
    base_url: String,
    token: String,
}

impl DirectoryClient {
    pub fn new(cfg: &DirectoryConfig) -> Self {
        Self {
            http: http::client(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get_value(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let req = self
            .http
            .get(self.url(path))
            .query(&[("access_token", self.token.as_str())])
            .query(query);
        http::json(SYSTEM, http::send(SYSTEM, req)?)
    }

    fn get_one<T: serde::de::DeserializeOwned>(&self, kind: &str, path: &str) -> Result<T> {
        let value = self.get_value(path, &[])?;
        serde_json::from_value(value).map_err(|e| RosterError::partial(kind, e))
    }

    fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        kind: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        match self.get_value(path, query)? {
            Value::Array(values) => Ok(http::decode_records(kind, values)),
            other => Err(RosterError::unreachable(
                SYSTEM,
                format!("expected a list from {path}, got {}", type_name(&other)),
            )),
        }
    }

    pub fn contacts(&self) -> Result<Vec<Contact>> {
        tracing::debug!("fetching contact dump from directory");
        self.get_list("contact", "contacts", &[])
    }

    pub fn contact(&self, id: ContactId) -> Result<Contact> {
        self.get_one("contact", &format!("contacts/{id}"))
    }

    /// Partial update; `fields` is merged into the contact.
    pub fn update_contact(&self, id: ContactId, fields: &Value) -> Result<()> {
        let req = self
            .http
            .put(self.url(&format!("contacts/{id}")))
            .query(&[("access_token", self.token.as_str())])
            .json(fields);
        http::send(SYSTEM, req)?;
        Ok(())
    }

    pub fn groups(&self) -> Result<Vec<Group>> {
        self.get_list("group", "groups", &[])
    }

    pub fn group(&self, id: GroupId) -> Result<Group> {
        self.get_one("group", &format!("groups/{id}"))
    }

    pub fn create_group(&self, label: &str) -> Result<Group> {
        let req = self
            .http
            .post(self.url("groups"))
            .query(&[("access_token", self.token.as_str())])
            .json(&serde_json::json!({ "label": label }));
        http::json(SYSTEM, http::send(SYSTEM, req)?)
    }

    pub fn add_to_group(&self, group: GroupId, contact: ContactId) -> Result<()> {
        let req = self
            .http
            .put(self.url(&format!("groups/{group}/contacts/{contact}")))
            .query(&[("access_token", self.token.as_str())]);
        http::send(SYSTEM, req)?;
        Ok(())
    }

    pub fn memberships(&self) -> Result<Vec<Membership>> {
        self.get_list("membership", "memberships", &[])
    }

    pub fn contact_memberships(&self, contact: ContactId) -> Result<Vec<Membership>> {
        self.get_list(
            "membership",
            &format!("contacts/{contact}/memberships"),
            &[],
        )
    }

    pub fn level_memberships(&self, level: u64) -> Result<Vec<Membership>> {
        self.get_list(
            "membership",
            &format!("membership_levels/{level}/memberships"),
            &[],
        )
    }

    pub fn events(&self, q: &EventQuery) -> Result<Vec<Event>> {
        let mut query = Vec::new();
        if let Some(limit) = q.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(start) = &q.start_at {
            query.push(("start_at", start.clone()));
        }
        if q.public_only {
            query.push(("public", "true".to_string()));
        }
        self.get_list("event", "events", &query)
    }

    pub fn event(&self, id: u64) -> Result<Event> {
        self.get_one("event", &format!("events/{id}"))
    }

    pub fn create_event(&self, details: &Value) -> Result<Event> {
        let req = self
            .http
            .post(self.url("events"))
            .query(&[("access_token", self.token.as_str())])
            .json(details);
        http::json(SYSTEM, http::send(SYSTEM, req)?)
    }

    pub fn tickets(&self, event: u64) -> Result<Vec<Ticket>> {
        self.get_list("ticket", &format!("events/{event}/tickets"), &[])
    }

    /// Organisation subdomain, used to build contact links.
    pub fn organization_domain(&self) -> Result<String> {
        let org = self.get_value("organization", &[])?;
        org.get("domain_prefix")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| RosterError::unreachable(SYSTEM, "organization has no domain_prefix"))
    }
}

/// Resolve the organisation subdomain from config, falling back to the API.
pub fn resolve_domain(client: &DirectoryClient, cfg: &DirectoryConfig) -> Result<String> {
    match &cfg.domain {
        Some(d) => Ok(d.clone()),
        None => client.organization_domain(),
    }
}

pub fn contact_url(domain: &str, contact: ContactId) -> String {
    format!("https://{domain}.tidyhq.com/contacts/{contact}")
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
