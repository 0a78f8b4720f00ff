//! Channel clean-up: join notices, replies left under deleted messages, and
//! old chatter offered one message at a time.

use crate::chat::{ChatMessage, SLACKBOT};
use crate::config::PurgeConfig;
use crate::error::{Result, RosterError};
use crate::plan::Action;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

const JOIN_SUBTYPE: &str = "channel_join";

/// Placeholder text left where a thread root was deleted.
pub const DELETED_ROOT: &str = "This message was deleted.";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PurgePlan {
    /// Deleted as a batch.
    pub sweep: Vec<Action>,
    /// Old enough and not protected; each one is reviewed.
    pub review: Vec<Action>,
}

/// Posting time from a message timestamp (`seconds.sequence`).
pub fn posted_at(message: &ChatMessage) -> Result<DateTime<Utc>> {
    let label = || format!("message {}", message.ts);
    let secs: i64 = message
        .ts
        .split('.')
        .next()
        .unwrap_or_default()
        .parse()
        .map_err(|_| RosterError::partial(label(), "unreadable timestamp"))?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| RosterError::partial(label(), "timestamp out of range"))
}

pub struct Purge<'a> {
    pub channel: &'a str,
    pub cfg: &'a PurgeConfig,
    /// Chat user id to display name.
    pub names: &'a HashMap<String, String>,
    pub now: DateTime<Utc>,
}

impl Purge<'_> {
    /// Sort channel history into the sweep and the review list. `replies`
    /// fetches the thread under a message.
    pub fn plan<F>(&self, messages: &[ChatMessage], mut replies: F) -> Result<PurgePlan>
    where
        F: FnMut(&str) -> Result<Vec<ChatMessage>>,
    {
        let min_age = Duration::days(self.cfg.min_age_days);
        let mut plan = PurgePlan::default();
        for message in messages {
            if message.subtype.as_deref() == Some(JOIN_SUBTYPE) {
                plan.sweep.push(self.delete(message));
                continue;
            }
            if message.text == DELETED_ROOT {
                let thread = match replies(&message.ts) {
                    Ok(thread) => thread,
                    Err(e) if !e.is_fatal() => {
                        tracing::warn!("replies to {}: {e}", message.ts);
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                plan.sweep.extend(
                    thread
                        .iter()
                        .filter(|r| r.ts != message.ts && r.user.as_deref() != Some(SLACKBOT))
                        .map(|r| self.delete(r)),
                );
                continue;
            }

            let posted = match posted_at(message) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!("{e}");
                    continue;
                }
            };
            if self.now - posted < min_age {
                tracing::debug!("keeping {}: younger than {} days", message.ts, self.cfg.min_age_days);
                continue;
            }
            if message
                .user
                .as_ref()
                .is_some_and(|u| self.cfg.protected.contains(u))
            {
                tracing::debug!("keeping {}: protected user", message.ts);
                continue;
            }
            plan.review.push(self.delete(message));
        }
        tracing::info!(
            "{} message(s) to sweep, {} to review",
            plan.sweep.len(),
            plan.review.len()
        );
        Ok(plan)
    }

    fn delete(&self, message: &ChatMessage) -> Action {
        let author = match message.user.as_deref() {
            Some(id) => match self.names.get(id) {
                Some(name) => format!("{name} ({id})"),
                None => id.to_string(),
            },
            None => "unknown".to_string(),
        };
        Action::DeleteMessage {
            channel: self.channel.to_string(),
            ts: message.ts.clone(),
            author,
            text: message.text.clone(),
        }
    }
}
