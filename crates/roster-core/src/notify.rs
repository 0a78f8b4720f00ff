//! Staff notifications posted after an action goes through.

use crate::chat::{ChatClient, OutgoingMessage};
use crate::error::Result;
use crate::gate::Apply;
use crate::plan::Action;
use serde_json::Value;
use std::time::Duration;

/// Posts to the notification channel, optionally under a bot persona.
pub struct Notifier<'a> {
    chat: &'a ChatClient,
    channel: String,
    persona: Option<(String, String)>,
    quiet: bool,
}

impl<'a> Notifier<'a> {
    pub fn new(chat: &'a ChatClient, channel: &str) -> Self {
        Self {
            chat,
            channel: channel.to_string(),
            persona: None,
            quiet: false,
        }
    }

    pub fn as_bot(mut self, username: &str, icon_emoji: &str) -> Self {
        self.persona = Some((username.to_string(), icon_emoji.to_string()));
        self
    }

    /// Suppress every post.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn post(&self, text: &str, blocks: Option<Value>) -> Result<()> {
        if self.quiet {
            tracing::debug!("quiet: not posting \"{text}\"");
            return Ok(());
        }
        let mut msg = OutgoingMessage::new(&self.channel, text);
        if let Some(blocks) = blocks {
            msg = msg.with_blocks(blocks);
        }
        if let Some((username, icon)) = &self.persona {
            msg = msg.as_bot(username, icon);
        }
        self.chat.post_message(&msg)?;
        Ok(())
    }
}

/// Notification body for an applied action: text plus optional blocks.
pub type Render<'r> = dyn Fn(&Action) -> Option<(String, Option<Value>)> + 'r;

/// Wraps an applier and posts a notification for each action it applies.
/// A refused post is logged; an unreachable chat platform aborts.
pub struct Notifying<'a, 'r, A> {
    inner: A,
    notifier: &'a Notifier<'a>,
    render: &'r Render<'r>,
}

impl<'a, 'r, A: Apply> Notifying<'a, 'r, A> {
    pub fn new(inner: A, notifier: &'a Notifier<'a>, render: &'r Render<'r>) -> Self {
        Self {
            inner,
            notifier,
            render,
        }
    }
}

impl<A: Apply> Apply for Notifying<'_, '_, A> {
    fn apply(&mut self, action: &Action) -> Result<()> {
        self.inner.apply(action)?;
        if let Some((text, blocks)) = (self.render)(action) {
            if let Err(e) = self.notifier.post(&text, blocks) {
                if e.is_fatal() {
                    return Err(e);
                }
                tracing::error!("could not post notification: {e}");
            }
        }
        Ok(())
    }

    fn pause_for(&self, action: &Action) -> Option<Duration> {
        self.inner.pause_for(action)
    }
}
