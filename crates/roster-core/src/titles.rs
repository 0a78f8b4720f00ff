//! Profile titles copied from a directory custom field.

use crate::chat::ChatUser;
use crate::directory::Contact;
use crate::plan::Action;
use std::collections::BTreeMap;

/// Set titles that differ from the directory, and clear titles on chat
/// users the directory gives none.
pub fn plan(
    linked: &BTreeMap<String, &Contact>,
    title_field: &str,
    users: &[ChatUser],
) -> Vec<Action> {
    let wanted: BTreeMap<&str, &str> = linked
        .iter()
        .filter_map(|(id, c)| c.custom_field(title_field).map(|t| (id.as_str(), t)))
        .collect();
    let mut actions = Vec::new();
    for user in users.iter().filter(|u| u.is_person()) {
        let current = user.profile.title();
        match wanted.get(user.id.as_str()) {
            Some(title) if *title != current => actions.push(Action::SetTitle {
                user: user.id.clone(),
                title: title.to_string(),
            }),
            Some(_) => {}
            None if !current.is_empty() => {
                tracing::info!("removing title \"{current}\" from {}", user.id);
                actions.push(Action::ClearTitle {
                    user: user.id.clone(),
                })
            }
            None => {}
        }
    }
    actions
}

pub fn notice(action: &Action) -> Option<(String, Option<serde_json::Value>)> {
    match action {
        Action::SetTitle { user, title } => {
            Some((format!("Setting title \"{title}\" for <@{user}>"), None))
        }
        Action::ClearTitle { user } => Some((format!("Removed title from <@{user}>"), None)),
        _ => None,
    }
}
