use crate::config::{ContactId, GroupId};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

// ---------------------------------------------------------------------------
// OrderedSet
// ---------------------------------------------------------------------------

/// Set that remembers first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedSet {
    items: Vec<String>,
    seen: HashSet<String>,
}

impl OrderedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `item`; returns false if it was already present.
    pub fn insert(&mut self, item: impl Into<String>) -> bool {
        let item = item.into();
        if self.seen.contains(&item) {
            return false;
        }
        self.seen.insert(item.clone());
        self.items.push(item);
        true
    }

    pub fn extend<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for item in items {
            self.insert(item);
        }
    }

    pub fn remove(&mut self, item: &str) -> bool {
        if self.seen.remove(item) {
            self.items.retain(|i| i != item);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, item: &str) -> bool {
        self.seen.contains(item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for OrderedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = OrderedSet::new();
        set.extend(iter);
        set
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMethod {
    EmailMatch,
    Manual,
}

impl LinkMethod {
    pub fn describe(self) -> &'static str {
        match self {
            LinkMethod::EmailMatch => "automated email address matching",
            LinkMethod::Manual => "manual entry",
        }
    }
}

/// One corrective operation against an external system.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Invite {
        channel: String,
        user: String,
    },
    Link {
        contact: ContactId,
        chat_user: String,
        method: LinkMethod,
    },
    SetStatus {
        user: String,
        text: String,
        emoji: String,
    },
    ClearStatus {
        user: String,
    },
    SetTitle {
        user: String,
        title: String,
    },
    ClearTitle {
        user: String,
    },
    CorrectContact {
        contact: ContactId,
        fields: BTreeMap<String, String>,
    },
    AddToGroup {
        contact: ContactId,
        group: GroupId,
    },
    CreateGroup {
        label: String,
    },
    CreateTask {
        project: u64,
        story: u64,
        story_status: u64,
        subject: String,
        status: u64,
    },
    CreateEvent {
        name: String,
        start_at: String,
        details: serde_json::Value,
    },
    SetContactField {
        contact: ContactId,
        field: String,
        value: String,
    },
    DeleteMessage {
        channel: String,
        ts: String,
        author: String,
        text: String,
    },
}

const SNIPPET_CHARS: usize = 60;

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Invite { channel, user } => write!(f, "invite {user} to #{channel}"),
            Action::Link {
                contact,
                chat_user,
                method,
            } => write!(
                f,
                "link contact {contact} to chat user {chat_user} ({})",
                method.describe()
            ),
            Action::SetStatus { user, text, emoji } => {
                write!(f, "set status of {user} to {emoji} {text}")
            }
            Action::ClearStatus { user } => write!(f, "clear status of {user}"),
            Action::SetTitle { user, title } => write!(f, "set title of {user} to \"{title}\""),
            Action::ClearTitle { user } => write!(f, "clear title of {user}"),
            Action::CorrectContact { contact, fields } => {
                let list: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("{k}=\"{v}\""))
                    .collect();
                write!(f, "correct contact {contact}: {}", list.join(", "))
            }
            Action::AddToGroup { contact, group } => {
                write!(f, "add contact {contact} to group {group}")
            }
            Action::CreateGroup { label } => write!(f, "create group \"{label}\""),
            Action::CreateTask {
                story,
                subject,
                status,
                ..
            } => write!(f, "create task \"{subject}\" (status {status}) on story {story}"),
            Action::CreateEvent { name, start_at, .. } => {
                write!(f, "create event {name} ({start_at})")
            }
            Action::SetContactField {
                contact,
                field,
                value,
            } => write!(f, "set {field} of contact {contact} to \"{value}\""),
            Action::DeleteMessage {
                channel,
                ts,
                author,
                text,
            } => {
                let mut snippet: String = text.chars().take(SNIPPET_CHARS).collect();
                if text.chars().count() > SNIPPET_CHARS {
                    snippet.push_str("...");
                }
                write!(f, "delete message {ts} by {author} in #{channel}: \"{snippet}\"")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Additive diff: one action for each identity in `desired` that is not in
/// `observed`, in `desired` order. Identities only in `observed` are left
/// alone; nothing is ever removed.
pub fn plan_additions<F>(desired: &OrderedSet, observed: &HashSet<String>, mut make: F) -> Vec<Action>
where
    F: FnMut(&str) -> Action,
{
    desired
        .iter()
        .filter(|id| !observed.contains(*id))
        .map(|id| make(id))
        .collect()
}

/// Channel invites for a single channel.
pub fn plan_invites(channel: &str, desired: &OrderedSet, observed: &HashSet<String>) -> Vec<Action> {
    plan_additions(desired, observed, |user| Action::Invite {
        channel: channel.to_string(),
        user: user.to_string(),
    })
}
