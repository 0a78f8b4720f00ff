//! Event-stream listener: new-channel notices and trigger-channel patterns.
//!
//! Events arrive as envelopes over a websocket. Each envelope is
//! acknowledged and then handled before the next one is read.

use crate::automation::AutomationClient;
use crate::chat::{ChatClient, OutgoingMessage};
use crate::config::{AutomationEntities, Config};
use crate::error::{Result, RosterError};
use crate::trigger;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::TcpStream;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

const SYSTEM: &str = "event stream";

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub envelope_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// The inner event of an `events_api` envelope.
    pub fn event(&self) -> Option<ChatEvent> {
        if self.kind != "events_api" {
            return None;
        }
        self.payload.get("event").map(ChatEvent::from_value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    ChannelCreated {
        id: String,
        name: String,
        creator: String,
    },
    Message {
        channel: String,
        subtype: Option<String>,
        raw: Value,
    },
    Other(String),
}

impl ChatEvent {
    pub fn from_value(event: &Value) -> Self {
        let text = |v: &Value, key: &str| {
            v.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        match event.get("type").and_then(Value::as_str) {
            Some("channel_created") => {
                let channel = event.get("channel").cloned().unwrap_or(Value::Null);
                ChatEvent::ChannelCreated {
                    id: text(&channel, "id"),
                    name: text(&channel, "name"),
                    creator: text(&channel, "creator"),
                }
            }
            Some("message") => ChatEvent::Message {
                channel: text(event, "channel"),
                subtype: event
                    .get("subtype")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                raw: event.clone(),
            },
            other => ChatEvent::Other(other.unwrap_or("unknown").to_string()),
        }
    }
}

/// Source of event envelopes. `None` means the connection ended.
pub trait EventSource {
    fn next_envelope(&mut self) -> Result<Option<Envelope>>;
    fn ack(&mut self, envelope_id: &str) -> Result<()>;
}

/// Websocket connection opened from an `apps.connections.open` URL.
pub struct SocketSource {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl SocketSource {
    pub fn connect(url: &str) -> Result<Self> {
        let (socket, _) =
            tungstenite::connect(url).map_err(|e| RosterError::unreachable(SYSTEM, e))?;
        tracing::info!("connected to event stream");
        Ok(Self { socket })
    }

    /// Open a fresh connection with the app-level client.
    pub fn open(app: &ChatClient) -> Result<Self> {
        Self::connect(&app.open_connection()?)
    }
}

impl EventSource for SocketSource {
    fn next_envelope(&mut self) -> Result<Option<Envelope>> {
        loop {
            let msg = self
                .socket
                .read()
                .map_err(|e| RosterError::unreachable(SYSTEM, e))?;
            match msg {
                Message::Text(text) => {
                    let envelope: Envelope = match serde_json::from_str(&text) {
                        Ok(e) => e,
                        Err(e) => {
                            tracing::warn!("unreadable envelope: {e}");
                            continue;
                        }
                    };
                    if envelope.kind == "disconnect" {
                        tracing::info!("event stream asked us to reconnect");
                        return Ok(None);
                    }
                    return Ok(Some(envelope));
                }
                Message::Close(_) => return Ok(None),
                _ => continue,
            }
        }
    }

    fn ack(&mut self, envelope_id: &str) -> Result<()> {
        let body = json!({ "envelope_id": envelope_id }).to_string();
        self.socket
            .send(Message::Text(body))
            .map_err(|e| RosterError::unreachable(SYSTEM, e))
    }
}

pub struct Listener<'a> {
    chat: &'a ChatClient,
    cfg: &'a Config,
    hub: Option<AutomationClient>,
    entities: AutomationEntities,
}

impl<'a> Listener<'a> {
    pub fn new(chat: &'a ChatClient, cfg: &'a Config) -> Self {
        let hub = cfg.automation.as_ref().map(AutomationClient::new);
        let entities = cfg
            .automation
            .as_ref()
            .map(|a| a.entities.clone())
            .unwrap_or_default();
        Self {
            chat,
            cfg,
            hub,
            entities,
        }
    }

    /// Handle envelopes until the source ends. Returns the number handled.
    pub fn run(&self, source: &mut dyn EventSource) -> Result<usize> {
        let mut handled = 0;
        while let Some(envelope) = source.next_envelope()? {
            if let Some(id) = &envelope.envelope_id {
                source.ack(id)?;
            }
            let Some(event) = envelope.event() else {
                tracing::debug!("ignoring {} envelope", envelope.kind);
                continue;
            };
            match self.handle(&event) {
                Ok(()) => handled += 1,
                Err(e) if !e.is_fatal() => tracing::error!("could not handle event: {e}"),
                Err(e) => return Err(e),
            }
        }
        Ok(handled)
    }

    pub fn handle(&self, event: &ChatEvent) -> Result<()> {
        match event {
            ChatEvent::ChannelCreated { id, name, creator } => {
                tracing::info!("channel {name} created");
                let text = format!("New channel created: <#{id}|{name}> by <@{creator}>");
                self.chat.post_message(&OutgoingMessage::new(
                    &self.cfg.chat.notification_channel,
                    text,
                ))?;
                Ok(())
            }
            ChatEvent::Message {
                channel,
                subtype: None,
                raw,
            } if Some(channel) == self.cfg.chat.trigger_channel.as_ref() => {
                self.on_trigger_message(channel, raw)
            }
            ChatEvent::Message { .. } => Ok(()),
            ChatEvent::Other(kind) => {
                tracing::debug!("ignoring {kind} event");
                Ok(())
            }
        }
    }

    /// Match patterns anywhere in the serialised message, so text inside
    /// blocks and attachments counts too.
    fn on_trigger_message(&self, channel: &str, raw: &Value) -> Result<()> {
        let body = raw.to_string();
        for (pattern, rule) in trigger::matching(&self.cfg.triggers, &body) {
            tracing::info!("trigger pattern '{pattern}' detected");
            for action in &rule.functions {
                // A failing hub must not stop the notifications.
                if let Err(e) = action.run(self.hub.as_ref(), &self.entities) {
                    tracing::error!("trigger {} failed: {e}", action.name());
                }
            }
            for user in &rule.notify {
                let dm = self.chat.open_dm(user)?;
                let text = format!("{pattern} was detected in <#{channel}>.");
                self.chat.post_message(&OutgoingMessage::new(dm, text))?;
            }
        }
        Ok(())
    }
}
