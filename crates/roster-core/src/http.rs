//! Shared blocking HTTP plumbing for the API clients.
//!
//! Every client funnels its calls through [`send`] so that transport errors
//! and non-2xx statuses surface uniformly as `SystemUnreachable`, and list
//! payloads go through [`decode_records`] so one malformed record is skipped
//! instead of failing the whole fetch.

use crate::error::{Result, RosterError};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub(crate) fn client() -> Client {
    Client::builder()
        .user_agent(concat!("roster/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Send a request, mapping transport failures and non-2xx statuses to
/// `SystemUnreachable`.
pub(crate) fn send(system: &str, req: RequestBuilder) -> Result<Response> {
    let resp = req
        .send()
        .map_err(|e| RosterError::unreachable(system, e))?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        let detail = body.chars().take(200).collect::<String>();
        return Err(RosterError::unreachable(
            system,
            format!("status {status}: {detail}"),
        ));
    }
    Ok(resp)
}

pub(crate) fn json<T: DeserializeOwned>(system: &str, resp: Response) -> Result<T> {
    resp.json::<T>()
        .map_err(|e| RosterError::unreachable(system, format!("unreadable response: {e}")))
}

/// Decode a list payload record by record. Records that do not match `T`
/// are logged and dropped.
pub(crate) fn decode_records<T: DeserializeOwned>(kind: &str, values: Vec<Value>) -> Vec<T> {
    let mut out = Vec::with_capacity(values.len());
    for (i, value) in values.into_iter().enumerate() {
        let label = match value.get("id") {
            Some(id) => format!("{kind} {id}"),
            None => format!("{kind} #{i}"),
        };
        match serde_json::from_value::<T>(value) {
            Ok(record) => out.push(record),
            Err(e) => {
                let err = RosterError::partial(label, e);
                tracing::warn!("{err}");
            }
        }
    }
    out
}
