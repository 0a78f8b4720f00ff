//! Relay phone-system email notifications as readable chat messages.

use crate::chat::{section_with_context, ChatClient, ChatMessage, OutgoingMessage, Upload};
use crate::config::CallsConfig;
use crate::error::{Result, RosterError};
use chrono::{Local, TimeZone};
use regex::Regex;
use std::sync::OnceLock;

const HISTORY_LIMIT: u32 = 999;

static NUMBER_RE: OnceLock<Regex> = OnceLock::new();

fn number_re() -> &'static Regex {
    NUMBER_RE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Voicemail,
    Missed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub kind: CallKind,
    pub number: String,
}

impl Call {
    /// Read the call type and the first number from an email subject.
    pub fn from_subject(subject: &str) -> Option<Self> {
        let number = number_re().find(subject)?.as_str().to_string();
        let lower = subject.to_lowercase();
        let kind = if lower.contains("voicemail") {
            CallKind::Voicemail
        } else if lower.contains("missed call") {
            CallKind::Missed
        } else {
            return None;
        };
        Some(Self { kind, number })
    }

    pub fn linked_number(&self) -> String {
        format!("<tel:{0}|{0}>", self.number)
    }

    pub fn summary(&self) -> String {
        match self.kind {
            CallKind::Voicemail => format!("Voicemail from {}", self.number),
            CallKind::Missed => format!("Missed call from {}", self.number),
        }
    }

    fn headline(&self) -> String {
        match self.kind {
            CallKind::Voicemail => format!("New voicemail from {}", self.linked_number()),
            CallKind::Missed => format!("Missed call from {}", self.linked_number()),
        }
    }
}

/// Local `YYYY-MM-DD HH:MM` for a chat timestamp such as `1714550400.000200`.
pub fn local_time(ts: &str) -> String {
    let secs: i64 = ts.split('.').next().and_then(|s| s.parse().ok()).unwrap_or(0);
    match Local.timestamp_opt(secs, 0).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M").to_string(),
        None => ts.to_string(),
    }
}

pub struct CallRelay<'a> {
    /// Reads and deletes the original emails.
    pub reader: &'a ChatClient,
    /// Posts the replacement messages.
    pub poster: &'a ChatClient,
    pub cfg: &'a CallsConfig,
}

impl CallRelay<'_> {
    /// Relay every phone email in the channel, oldest first. With `live`
    /// false the relays are only listed. Returns the relayed calls.
    pub fn run(&self, live: bool) -> Result<Vec<Call>> {
        let mut messages = self.reader.history(&self.cfg.channel, HISTORY_LIMIT)?;
        messages.reverse();
        tracing::info!("found {} messages in {}", messages.len(), self.cfg.channel);
        let mut relayed = Vec::new();
        for message in &messages {
            let Some(call) = self.call_for(message) else {
                continue;
            };
            if !live {
                println!("  relay {}", call.summary());
                relayed.push(call);
                continue;
            }
            match self.relay(message, &call) {
                Ok(()) => {
                    self.reader.delete_message(&self.cfg.channel, &message.ts)?;
                    relayed.push(call);
                }
                Err(e) if !e.is_fatal() => tracing::error!("could not relay {}: {e}", call.summary()),
                Err(e) => return Err(e),
            }
        }
        Ok(relayed)
    }

    fn call_for(&self, message: &ChatMessage) -> Option<Call> {
        message.bot_id.as_ref()?;
        let email = message.files.first()?;
        let call = Call::from_subject(&email.title);
        if call.is_none() {
            tracing::error!("no phone number or call type in subject: {}", email.title);
        }
        call
    }

    fn relay(&self, message: &ChatMessage, call: &Call) -> Result<()> {
        let upload = match call.kind {
            CallKind::Voicemail => {
                let audio = message
                    .files
                    .first()
                    .and_then(|email| {
                        email.attachments.iter().find(|a| a.mimetype.contains("audio"))
                    })
                    .ok_or_else(|| RosterError::partial(call.summary(), "no audio attachment"))?;
                Some(Upload {
                    filename: audio.filename.clone(),
                    title: call.summary(),
                    alt_text: call.summary(),
                    data: self.poster.download(&audio.url)?,
                })
            }
            CallKind::Missed => None,
        };

        let blocks = section_with_context(&call.headline(), &local_time(&message.ts));
        let post = OutgoingMessage::new(&self.cfg.channel, call.summary())
            .with_blocks(blocks)
            .as_bot(&self.cfg.username, &self.cfg.icon_emoji);
        let ts = self.poster.post_message(&post)?;

        if let Some(upload) = upload {
            self.poster.upload_file(&self.cfg.channel, upload, Some(&ts))?;
        }
        Ok(())
    }
}
