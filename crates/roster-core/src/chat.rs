use crate::config::ChatConfig;
use crate::error::{Result, RosterError};
use crate::http;
use crate::paging::{fetch_all, Page};
use reqwest::blocking::{multipart, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SYSTEM: &str = "chat";
const PAGE_LIMIT: &str = "200";
const FILES_PER_PAGE: &str = "100";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AuthInfo {
    pub user: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub profile: Profile,
}

/// Slackbot is reported as a regular user.
pub const SLACKBOT: &str = "USLACKBOT";

impl ChatUser {
    pub fn is_person(&self) -> bool {
        !self.is_bot && self.id != SLACKBOT
    }

    pub fn email(&self) -> Option<&str> {
        self.profile.email.as_deref().filter(|e| !e.is_empty())
    }

    pub fn display(&self) -> &str {
        [
            self.profile.display_name.as_deref(),
            self.profile.real_name_normalized.as_deref(),
            self.profile.real_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or(self.name.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub real_name_normalized: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub status_text: Option<String>,
    #[serde(default)]
    pub status_emoji: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Profile {
    pub fn status_text(&self) -> &str {
        self.status_text.as_deref().unwrap_or("")
    }

    pub fn status_emoji(&self) -> &str {
        self.status_emoji.as_deref().unwrap_or("")
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub ts: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub files: Vec<ChatFile>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl ChatMessage {
    pub fn reacted_by(&self, name: &str, user: &str) -> bool {
        self.reactions
            .iter()
            .any(|r| r.name == name && r.users.iter().any(|u| u == user))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatFile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub mimetype: String,
    #[serde(default)]
    pub url_private_download: Option<String>,
    /// Present on email files: the email's own attachments.
    #[serde(default)]
    pub attachments: Vec<EmailAttachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAttachment {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub mimetype: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub name: String,
    #[serde(default)]
    pub users: Vec<String>,
}

/// An outgoing chat message.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub channel: String,
    pub text: String,
    pub blocks: Option<Value>,
    pub username: Option<String>,
    pub icon_emoji: Option<String>,
}

impl OutgoingMessage {
    pub fn new(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_blocks(mut self, blocks: Value) -> Self {
        self.blocks = Some(blocks);
        self
    }

    pub fn as_bot(mut self, username: &str, icon_emoji: &str) -> Self {
        self.username = Some(username.to_string());
        self.icon_emoji = Some(icon_emoji.to_string());
        self
    }
}

/// A file to upload through the two-phase external upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub title: String,
    pub alt_text: String,
    pub data: Vec<u8>,
}

/// Build a section block followed by a plain-text context line.
pub fn section_with_context(text: &str, context: &str) -> Value {
    serde_json::json!([
        { "type": "section", "text": { "type": "mrkdwn", "text": text } },
        { "type": "context", "elements": [
            { "type": "plain_text", "text": context, "emoji": true }
        ] }
    ])
}

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// Blocking Web-API client. Methods are form-encoded POSTs to
/// `{base_url}/{method}` with a bearer token; the response's `ok` flag
/// decides between success and `Rejected`.
pub struct ChatClient {
    http: Client,
    base_url: String,
    token: String,
}

impl ChatClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: http::client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Client acting as the configured person (profile edits, invites).
    pub fn user(cfg: &ChatConfig) -> Result<Self> {
        if cfg.user_token.is_empty() {
            return Err(RosterError::Validation("chat.user_token is not set".into()));
        }
        Ok(Self::new(&cfg.base_url, &cfg.user_token))
    }

    pub fn bot(cfg: &ChatConfig) -> Self {
        Self::new(&cfg.base_url, &cfg.bot_token)
    }

    pub fn app(cfg: &ChatConfig) -> Result<Self> {
        match cfg.app_token.as_deref() {
            Some(t) if !t.is_empty() => Ok(Self::new(&cfg.base_url, t)),
            _ => Err(RosterError::Validation("chat.app_token is not set".into())),
        }
    }

    pub fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value> {
        let req = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .bearer_auth(&self.token)
            .form(params);
        let body: Value = http::json(SYSTEM, http::send(SYSTEM, req)?)?;
        if body.get("ok").and_then(Value::as_bool) == Some(true) {
            Ok(body)
        } else {
            let reason = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            Err(RosterError::rejected(SYSTEM, format!("{method}: {reason}")))
        }
    }

    fn field<T: serde::de::DeserializeOwned>(body: &Value, key: &str) -> Result<T> {
        let v = body.get(key).cloned().unwrap_or(Value::Null);
        serde_json::from_value(v)
            .map_err(|e| RosterError::unreachable(SYSTEM, format!("unexpected '{key}': {e}")))
    }

    fn next_cursor(body: &Value) -> Option<String> {
        body.pointer("/response_metadata/next_cursor")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }

    pub fn auth_test(&self) -> Result<AuthInfo> {
        let body = self.call("auth.test", &[])?;
        serde_json::from_value(body)
            .map_err(|e| RosterError::unreachable(SYSTEM, format!("auth.test: {e}")))
    }

    /// Every workspace user, across all pages.
    pub fn users(&self) -> Result<Vec<ChatUser>> {
        let users = fetch_all(|cursor| {
            let mut params = vec![("limit", PAGE_LIMIT.to_string())];
            if let Some(c) = cursor {
                params.push(("cursor", c.to_string()));
            }
            let body = self.call("users.list", &params)?;
            let members: Vec<Value> = Self::field(&body, "members")?;
            Ok(Page::new(
                http::decode_records("chat user", members),
                Self::next_cursor(&body),
            ))
        })?;
        tracing::debug!("got {} chat users", users.len());
        Ok(users)
    }

    pub fn conversation_members(&self, channel: &str) -> Result<Vec<String>> {
        fetch_all(|cursor| {
            let mut params = vec![
                ("channel", channel.to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            if let Some(c) = cursor {
                params.push(("cursor", c.to_string()));
            }
            let body = self.call("conversations.members", &params)?;
            Ok(Page::new(
                Self::field(&body, "members")?,
                Self::next_cursor(&body),
            ))
        })
    }

    pub fn invite(&self, channel: &str, users: &[String]) -> Result<()> {
        self.call(
            "conversations.invite",
            &[("channel", channel.to_string()), ("users", users.join(","))],
        )?;
        Ok(())
    }

    /// Recent channel history, newest first.
    pub fn history(&self, channel: &str, limit: u32) -> Result<Vec<ChatMessage>> {
        let body = self.call(
            "conversations.history",
            &[("channel", channel.to_string()), ("limit", limit.to_string())],
        )?;
        let messages: Vec<Value> = Self::field(&body, "messages")?;
        Ok(http::decode_records("message", messages))
    }

    /// A thread: the root message followed by its replies.
    pub fn replies(&self, channel: &str, ts: &str) -> Result<Vec<ChatMessage>> {
        let body = self.call(
            "conversations.replies",
            &[("channel", channel.to_string()), ("ts", ts.to_string())],
        )?;
        let messages: Vec<Value> = Self::field(&body, "messages")?;
        Ok(http::decode_records("reply", messages))
    }

    /// Every file visible to this token, as returned by the API. Unlike the
    /// cursor listings this one pages by number.
    pub fn files(&self) -> Result<Vec<Value>> {
        fetch_all(|page| {
            let mut params = vec![("count", FILES_PER_PAGE.to_string())];
            if let Some(p) = page {
                params.push(("page", p.to_string()));
            }
            let body = self.call("files.list", &params)?;
            let files: Vec<Value> = Self::field(&body, "files")?;
            let at = body.pointer("/paging/page").and_then(Value::as_u64).unwrap_or(1);
            let pages = body.pointer("/paging/pages").and_then(Value::as_u64).unwrap_or(1);
            tracing::debug!("files.list page {at} of {pages}");
            Ok(Page::new(files, (pages > at).then(|| (at + 1).to_string())))
        })
    }

    /// Open (or reuse) a direct-message channel with `user`.
    pub fn open_dm(&self, user: &str) -> Result<String> {
        let body = self.call("conversations.open", &[("users", user.to_string())])?;
        body.pointer("/channel/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| RosterError::unreachable(SYSTEM, "conversations.open: no channel id"))
    }

    /// Post a message and return its timestamp.
    pub fn post_message(&self, msg: &OutgoingMessage) -> Result<String> {
        let mut params = vec![
            ("channel", msg.channel.clone()),
            ("text", msg.text.clone()),
        ];
        if let Some(blocks) = &msg.blocks {
            params.push(("blocks", blocks.to_string()));
        }
        if let Some(u) = &msg.username {
            params.push(("username", u.clone()));
        }
        if let Some(i) = &msg.icon_emoji {
            params.push(("icon_emoji", i.clone()));
        }
        let body = self.call("chat.postMessage", &params)?;
        Ok(body
            .get("ts")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    pub fn delete_message(&self, channel: &str, ts: &str) -> Result<()> {
        self.call(
            "chat.delete",
            &[("channel", channel.to_string()), ("ts", ts.to_string())],
        )?;
        Ok(())
    }

    pub fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> Result<()> {
        self.call(
            "reactions.add",
            &[
                ("channel", channel.to_string()),
                ("timestamp", ts.to_string()),
                ("name", name.to_string()),
            ],
        )?;
        Ok(())
    }

    /// Set (or with empty strings, clear) a user's status badge.
    pub fn set_status(&self, user: &str, text: &str, emoji: &str) -> Result<()> {
        let profile = serde_json::json!({
            "status_text": text,
            "status_emoji": emoji,
            "status_expiration": 0,
        });
        self.call(
            "users.profile.set",
            &[("user", user.to_string()), ("profile", profile.to_string())],
        )?;
        Ok(())
    }

    pub fn set_profile_field(&self, user: &str, name: &str, value: &str) -> Result<()> {
        self.call(
            "users.profile.set",
            &[
                ("user", user.to_string()),
                ("name", name.to_string()),
                ("value", value.to_string()),
            ],
        )?;
        Ok(())
    }

    /// Fetch a private file URL with this client's credentials.
    pub fn download(&self, url: &str) -> Result<Vec<u8>> {
        let req = self.http.get(url).bearer_auth(&self.token);
        let resp = http::send(SYSTEM, req)?;
        let bytes = resp
            .bytes()
            .map_err(|e| RosterError::unreachable(SYSTEM, e))?;
        Ok(bytes.to_vec())
    }

    /// Two-phase upload: reserve an upload URL, POST the bytes to it, then
    /// complete the upload into `channel` (optionally inside a thread).
    pub fn upload_file(&self, channel: &str, upload: Upload, thread_ts: Option<&str>) -> Result<String> {
        let body = self.call(
            "files.getUploadURLExternal",
            &[
                ("filename", upload.filename.clone()),
                ("length", upload.data.len().to_string()),
                ("alt_text", upload.alt_text.clone()),
            ],
        )?;
        let upload_url: String = Self::field(&body, "upload_url")?;
        let file_id: String = Self::field(&body, "file_id")?;

        let mime = mime_guess::from_path(&upload.filename).first_or_octet_stream();
        let part = multipart::Part::bytes(upload.data)
            .file_name(upload.filename.clone())
            .mime_str(mime.essence_str())
            .map_err(|e| RosterError::unreachable(SYSTEM, e))?;
        let form = multipart::Form::new().part("file", part);
        http::send(SYSTEM, self.http.post(&upload_url).multipart(form))?;

        let files = serde_json::json!([{ "id": file_id, "title": upload.title }]);
        let mut params = vec![
            ("files", files.to_string()),
            ("channel_id", channel.to_string()),
        ];
        if let Some(ts) = thread_ts {
            params.push(("thread_ts", ts.to_string()));
        }
        self.call("files.completeUploadExternal", &params)?;
        Ok(file_id)
    }

    /// Request a websocket URL for the event stream (app token required).
    pub fn open_connection(&self) -> Result<String> {
        let body = self.call("apps.connections.open", &[])?;
        Self::field(&body, "url")
    }
}

/// Post plain text to an incoming webhook.
pub fn post_webhook(url: &str, text: &str) -> Result<()> {
    let req = http::client()
        .post(url)
        .json(&serde_json::json!({ "text": text }));
    http::send(SYSTEM, req)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
