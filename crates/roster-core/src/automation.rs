use crate::config::AutomationConfig;
use crate::error::{Result, RosterError};
use crate::http;
use reqwest::blocking::Client;
use serde_json::Value;

const SYSTEM: &str = "automation";

/// Home-automation hub: read an entity's state, call a service.
pub struct AutomationClient {
    http: Client,
    base_url: String,
    token: String,
}

impl AutomationClient {
    pub fn new(cfg: &AutomationConfig) -> Self {
        Self {
            http: http::client(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
        }
    }

    /// Current state string of an entity.
    pub fn state(&self, entity: &str) -> Result<String> {
        let req = self
            .http
            .get(format!("{}/states/{entity}", self.base_url))
            .bearer_auth(&self.token);
        let body: Value = http::json(SYSTEM, http::send(SYSTEM, req)?)?;
        match body.get("state") {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(RosterError::unreachable(
                SYSTEM,
                format!("{entity} has no state"),
            )),
        }
    }

    /// Call `domain.service` with a JSON payload.
    pub fn call_service(&self, domain: &str, service: &str, payload: &Value) -> Result<()> {
        let req = self
            .http
            .post(format!("{}/services/{domain}/{service}", self.base_url))
            .bearer_auth(&self.token)
            .json(payload);
        http::send(SYSTEM, req)?;
        Ok(())
    }
}
