use crate::config::TrackerConfig;
use crate::error::{Result, RosterError};
use crate::http;
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SYSTEM: &str = "tracker";

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
}

/// Tags arrive as `[name, colour]` pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct Tag(pub String, pub Option<String>);

#[derive(Debug, Clone, Deserialize)]
pub struct Story {
    pub id: u64,
    pub subject: String,
    pub status: u64,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Story {
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.0 == name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub subject: String,
    pub status: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTask {
    pub project: u64,
    pub user_story: u64,
    pub status: u64,
    pub subject: String,
}

/// Blocking client for the task tracker. Listings are requested unpaginated.
pub struct TrackerClient {
    http: Client,
    base_url: String,
    auth_token: String,
}

impl TrackerClient {
    /// Log in with the configured credentials.
    pub fn login(cfg: &TrackerConfig) -> Result<Self> {
        let http = http::client();
        let base_url = cfg.base_url.trim_end_matches('/').to_string();
        let req = http.post(format!("{base_url}/api/v1/auth")).json(&serde_json::json!({
            "type": "normal",
            "username": cfg.username,
            "password": cfg.password,
        }));
        let body: Value = http::json(SYSTEM, http::send(SYSTEM, req)?)?;
        let auth_token = body
            .get("auth_token")
            .and_then(Value::as_str)
            .ok_or_else(|| RosterError::unreachable(SYSTEM, "login returned no auth_token"))?
            .to_string();
        tracing::debug!("logged in to tracker as {}", cfg.username);
        Ok(Self {
            http,
            base_url,
            auth_token,
        })
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.auth_token)
            .header("x-disable-pagination", "True")
    }

    fn list<T: serde::de::DeserializeOwned>(
        &self,
        kind: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let req = self.authed(self.http.get(format!("{}{}", self.base_url, path)).query(query));
        let values: Vec<Value> = http::json(SYSTEM, http::send(SYSTEM, req)?)?;
        Ok(http::decode_records(kind, values))
    }

    pub fn projects(&self) -> Result<Vec<Project>> {
        self.list("project", "/api/v1/projects", &[])
    }

    pub fn stories(&self, project: u64) -> Result<Vec<Story>> {
        self.list(
            "story",
            "/api/v1/userstories",
            &[("project", project.to_string())],
        )
    }

    pub fn tasks(&self, story: u64) -> Result<Vec<Task>> {
        self.list("task", "/api/v1/tasks", &[("user_story", story.to_string())])
    }

    pub fn create_task(&self, task: &NewTask) -> Result<()> {
        let req = self.authed(
            self.http
                .post(format!("{}/api/v1/tasks", self.base_url))
                .json(task),
        );
        http::send(SYSTEM, req)?;
        Ok(())
    }
}
