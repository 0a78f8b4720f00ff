//! Routes each planned action to the client that owns it.

use crate::chat::ChatClient;
use crate::config::PauseConfig;
use crate::directory::DirectoryClient;
use crate::error::{Result, RosterError};
use crate::gate::Apply;
use crate::plan::Action;
use crate::tracker::{NewTask, TrackerClient};
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Applies actions against whichever clients the running task has opened.
/// An action whose client is missing is a validation error.
pub struct Executor<'a> {
    chat: Option<&'a ChatClient>,
    directory: Option<&'a DirectoryClient>,
    tracker: Option<&'a TrackerClient>,
    /// Custom field holding a contact's chat user id.
    chat_field: String,
    pause: PauseConfig,
}

impl<'a> Executor<'a> {
    pub fn new(pause: &PauseConfig) -> Self {
        Self {
            chat: None,
            directory: None,
            tracker: None,
            chat_field: String::new(),
            pause: pause.clone(),
        }
    }

    pub fn with_chat(mut self, chat: &'a ChatClient) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_directory(mut self, directory: &'a DirectoryClient, chat_field: &str) -> Self {
        self.directory = Some(directory);
        self.chat_field = chat_field.to_string();
        self
    }

    pub fn with_tracker(mut self, tracker: &'a TrackerClient) -> Self {
        self.tracker = Some(tracker);
        self
    }

    fn chat(&self) -> Result<&'a ChatClient> {
        self.chat
            .ok_or_else(|| RosterError::Validation("no chat client for this action".into()))
    }

    fn directory(&self) -> Result<&'a DirectoryClient> {
        self.directory
            .ok_or_else(|| RosterError::Validation("no directory client for this action".into()))
    }

    fn tracker(&self) -> Result<&'a TrackerClient> {
        self.tracker
            .ok_or_else(|| RosterError::Validation("no tracker client for this action".into()))
    }
}

impl Apply for Executor<'_> {
    fn apply(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Invite { channel, user } => {
                self.chat()?.invite(channel, std::slice::from_ref(user))
            }
            Action::Link {
                contact, chat_user, ..
            } => {
                let field = self.chat_field.as_str();
                let body = json!({ "custom_fields": { field: chat_user } });
                self.directory()?.update_contact(*contact, &body)
            }
            Action::SetStatus { user, text, emoji } => self.chat()?.set_status(user, text, emoji),
            Action::ClearStatus { user } => self.chat()?.set_status(user, "", ""),
            Action::SetTitle { user, title } => {
                self.chat()?.set_profile_field(user, "title", title)
            }
            Action::ClearTitle { user } => self.chat()?.set_profile_field(user, "title", ""),
            Action::CorrectContact { contact, fields } => {
                let body: Map<String, Value> = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                self.directory()?
                    .update_contact(*contact, &Value::Object(body))
            }
            Action::AddToGroup { contact, group } => {
                self.directory()?.add_to_group(*group, *contact)
            }
            Action::CreateGroup { label } => {
                let group = self.directory()?.create_group(label)?;
                tracing::debug!("created group {} ({})", group.label, group.id);
                Ok(())
            }
            Action::CreateTask {
                project,
                story,
                subject,
                status,
                ..
            } => self.tracker()?.create_task(&NewTask {
                project: *project,
                user_story: *story,
                status: *status,
                subject: subject.clone(),
            }),
            Action::CreateEvent { details, .. } => {
                let event = self.directory()?.create_event(details)?;
                tracing::debug!("created event {} ({})", event.name, event.id);
                Ok(())
            }
            Action::SetContactField {
                contact,
                field,
                value,
            } => {
                let body = json!({ "custom_fields": { field.as_str(): value } });
                self.directory()?.update_contact(*contact, &body)
            }
            Action::DeleteMessage { channel, ts, .. } => self.chat()?.delete_message(channel, ts),
        }
    }

    fn pause_for(&self, action: &Action) -> Option<Duration> {
        match action {
            Action::SetStatus { .. }
            | Action::ClearStatus { .. }
            | Action::SetTitle { .. }
            | Action::ClearTitle { .. } => Some(self.pause.status_pause()),
            _ => Some(self.pause.default_pause()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DirectoryConfig;
    use mockito::Matcher;

    fn no_pause() -> PauseConfig {
        PauseConfig {
            default_secs: 0,
            status_secs: 0,
        }
    }

    #[test]
    fn link_writes_the_chat_custom_field() {
        let mut server = mockito::Server::new();
        let m = server
            .mock("PUT", "/contacts/7")
            .match_query(Matcher::Any)
            .match_body(Matcher::Json(json!({"custom_fields": {"slack_f": "U1"}})))
            .create();
        let dir = DirectoryClient::new(&DirectoryConfig {
            base_url: server.url(),
            token: "t".into(),
            domain: None,
            fields: Default::default(),
            groups: Default::default(),
            ignore: vec![],
        });
        let mut exec = Executor::new(&no_pause()).with_directory(&dir, "slack_f");
        exec.apply(&Action::Link {
            contact: 7,
            chat_user: "U1".into(),
            method: crate::plan::LinkMethod::EmailMatch,
        })
        .unwrap();
        m.assert();
    }

    #[test]
    fn missing_client_is_fatal() {
        let mut exec = Executor::new(&no_pause());
        let err = exec
            .apply(&Action::ClearStatus { user: "U1".into() })
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn profile_changes_use_the_status_pause() {
        let pause = PauseConfig::default();
        let exec = Executor::new(&pause);
        assert_eq!(
            exec.pause_for(&Action::ClearTitle { user: "U".into() }),
            Some(Duration::from_secs(3))
        );
        assert_eq!(
            exec.pause_for(&Action::CreateGroup { label: "x".into() }),
            Some(Duration::from_secs(1))
        );
    }
}
