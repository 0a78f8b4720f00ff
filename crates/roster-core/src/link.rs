//! Link directory contacts to chat accounts by email address.

use crate::chat::{section_with_context, ChatUser};
use crate::config::{ContactId, DirectoryConfig};
use crate::directory::{contact_url, Contact, Membership};
use crate::identity::{email_key, index_unique};
use crate::plan::{Action, LinkMethod};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Contacts with no chat id yet, keyed by email.
pub fn unlinked_by_email<'a>(
    contacts: &'a [Contact],
    cfg: &DirectoryConfig,
) -> BTreeMap<String, &'a Contact> {
    let (index, errors) = index_unique(contacts, |c| {
        if c.custom_field(&cfg.fields.chat).is_some() {
            return None;
        }
        c.email_address.as_deref().and_then(email_key)
    });
    for e in errors {
        tracing::warn!("{e}");
    }
    index
}

pub fn chat_users_by_email(users: &[ChatUser]) -> BTreeMap<String, &ChatUser> {
    let (index, errors) = index_unique(users, |u| {
        if !u.is_person() || u.deleted {
            return None;
        }
        u.email().and_then(email_key)
    });
    for e in errors {
        tracing::warn!("{e}");
    }
    index
}

/// Contacts with at least one membership that is not expired.
pub fn active_contacts(memberships: &[Membership]) -> HashSet<ContactId> {
    memberships
        .iter()
        .filter(|m| !m.is_expired())
        .map(|m| m.contact_id)
        .collect()
}

#[derive(Debug, Default)]
pub struct LinkPlan<'a> {
    pub matched: Vec<Action>,
    /// Active members with no chat account under their email.
    pub unmatched_active: Vec<&'a Contact>,
}

pub fn plan<'a>(
    unlinked: &BTreeMap<String, &'a Contact>,
    chat_users: &BTreeMap<String, &ChatUser>,
    active: &HashSet<ContactId>,
) -> LinkPlan<'a> {
    let mut out = LinkPlan::default();
    for (email, contact) in unlinked {
        match chat_users.get(email) {
            Some(user) => {
                tracing::info!(
                    "match: {} ({}) and {} ({})",
                    contact.full_name(),
                    contact.id,
                    user.display(),
                    user.id
                );
                out.matched.push(Action::Link {
                    contact: contact.id,
                    chat_user: user.id.clone(),
                    method: LinkMethod::EmailMatch,
                });
            }
            None if active.contains(&contact.id) => out.unmatched_active.push(contact),
            None => {}
        }
    }
    out
}

pub fn manual_link(contact: &Contact, chat_user: &str) -> Action {
    Action::Link {
        contact: contact.id,
        chat_user: chat_user.trim().to_string(),
        method: LinkMethod::Manual,
    }
}

/// Notification for a completed link.
pub fn notice(
    action: &Action,
    names: &BTreeMap<ContactId, String>,
    domain: &str,
) -> Option<(String, Option<Value>)> {
    let Action::Link {
        contact,
        chat_user,
        method,
    } = action
    else {
        return None;
    };
    let name = names.get(contact).map(String::as_str).unwrap_or("contact");
    let text = format!(
        "Directory account <{}|{name}> has been linked to <@{chat_user}>",
        contact_url(domain, *contact)
    );
    let context = format!("This link was made by: {}", method.describe());
    Some((
        "Linked a directory account to a chat account".to_string(),
        Some(section_with_context(&text, &context)),
    ))
}
