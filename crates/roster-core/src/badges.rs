//! Profile status badges derived from directory groups.

use crate::chat::ChatUser;
use crate::config::{Config, GroupSets};
use crate::directory::Contact;
use crate::error::Result;
use crate::plan::Action;
use std::collections::BTreeMap;

/// Badge title for a contact: committee, then volunteer, then member.
/// Members without an induction get the `Uninducted` emoji but keep the
/// `Member` title.
pub fn badge_for(contact: &Contact, groups: &GroupSets) -> Option<(&'static str, &'static str)> {
    if contact.in_any(&groups.committee) {
        Some(("Committee", "Committee"))
    } else if contact.in_any(&groups.volunteer) {
        Some(("Volunteer", "Volunteer"))
    } else if contact.in_any(&groups.members) {
        if contact.in_any(&groups.member_induction) {
            Some(("Member", "Member"))
        } else {
            Some(("Member", "Uninducted"))
        }
    } else {
        None
    }
}

/// Status set/clear actions.
///
/// - chat users not linked in the directory lose any status they carry,
/// - linked users get the badge their groups call for, and lose their
///   status once they are in none of the badge groups,
/// - overrides win over both.
///
/// Users named in an override are never cleared.
pub fn plan(
    cfg: &Config,
    linked: &BTreeMap<String, &Contact>,
    users: &[ChatUser],
) -> Result<Vec<Action>> {
    let by_id: BTreeMap<&str, &ChatUser> = users
        .iter()
        .filter(|u| u.is_person())
        .map(|u| (u.id.as_str(), u))
        .collect();
    let overridden: Vec<&str> = cfg.badges.overrides.iter().map(|o| o.user.as_str()).collect();
    let mut actions = Vec::new();

    for (id, user) in &by_id {
        if overridden.contains(id) || linked.contains_key(*id) {
            continue;
        }
        push_clear(&mut actions, user);
    }

    for (id, contact) in linked {
        if overridden.contains(&id.as_str()) {
            continue;
        }
        let Some(user) = by_id.get(id.as_str()) else {
            tracing::warn!("{} ({id}/{}) is in the directory but not in chat", contact.name(), contact.id);
            continue;
        };
        let Some((title, emoji_key)) = badge_for(contact, &cfg.directory.groups) else {
            push_clear(&mut actions, user);
            continue;
        };
        let emoji = cfg.badge_emoji(emoji_key)?;
        push_if_changed(&mut actions, user, title, emoji);
    }

    for o in &cfg.badges.overrides {
        let Some(user) = by_id.get(o.user.as_str()) else {
            tracing::warn!("user {} not found in chat", o.user);
            continue;
        };
        let emoji = cfg.badge_emoji(&o.status)?;
        push_if_changed(&mut actions, user, &o.status, emoji);
    }
    Ok(actions)
}

fn push_clear(actions: &mut Vec<Action>, user: &ChatUser) {
    let p = &user.profile;
    if p.status_text().is_empty() && p.status_emoji().is_empty() {
        return;
    }
    tracing::info!("removing status \"{}\" from {}", p.status_text(), user.id);
    actions.push(Action::ClearStatus {
        user: user.id.clone(),
    });
}

fn push_if_changed(actions: &mut Vec<Action>, user: &ChatUser, text: &str, emoji: &str) {
    if user.profile.status_text() == text && user.profile.status_emoji() == emoji {
        tracing::debug!("{} is already marked as {text}", user.id);
        return;
    }
    actions.push(Action::SetStatus {
        user: user.id.clone(),
        text: text.to_string(),
        emoji: emoji.to_string(),
    });
}

pub fn notice(action: &Action) -> Option<(String, Option<serde_json::Value>)> {
    match action {
        Action::SetStatus { user, text, emoji } => {
            Some((format!("Set badge for <@{user}> to {emoji} {text}"), None))
        }
        Action::ClearStatus { user } => Some((format!("Removed badge from <@{user}>"), None)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::linked_contacts;

    const CONFIG: &str = r#"
directory:
  token: t
  fields: { chat: chat }
  groups:
    members: [1]
    committee: [2]
    volunteer: [3]
    member_induction: [4]
chat:
  bot_token: b
  notification_channel: C1
badges:
  statuses:
    Committee: ":star:"
    Volunteer: ":hammer:"
    Member: ":white_check_mark:"
    Uninducted: ":hourglass:"
  overrides:
    - user: UO
      status: Committee
"#;

    fn contacts() -> Vec<Contact> {
        serde_json::from_value(serde_json::json!([
            {"id": 1, "custom_fields": [{"id": "chat", "value": "UC"}], "groups": [{"id": 1}, {"id": 2}]},
            {"id": 2, "custom_fields": [{"id": "chat", "value": "UM"}], "groups": [{"id": 1}, {"id": 4}]},
            {"id": 3, "custom_fields": [{"id": "chat", "value": "UN"}], "groups": [{"id": 1}]},
            {"id": 4, "custom_fields": [{"id": "chat", "value": "UO"}], "groups": [{"id": 1}]},
            {"id": 7, "custom_fields": [{"id": "chat", "value": "UL"}], "groups": [{"id": 99}]},
            {"id": 8, "custom_fields": [{"id": "chat", "value": "UZ"}], "groups": [{"id": 99}]}
        ]))
        .unwrap()
    }

    fn users() -> Vec<ChatUser> {
        serde_json::from_value(serde_json::json!([
            {"id": "UC", "profile": {"status_text": "Member", "status_emoji": ":white_check_mark:"}},
            {"id": "UM", "profile": {"status_text": "Member", "status_emoji": ":white_check_mark:"}},
            {"id": "UN", "profile": {}},
            {"id": "UO", "profile": {}},
            {"id": "UX", "profile": {"status_text": "Member", "status_emoji": ":white_check_mark:"}},
            {"id": "UY", "profile": {}},
            {"id": "UL", "profile": {"status_text": "Member", "status_emoji": ":white_check_mark:"}},
            {"id": "UZ", "profile": {}},
            {"id": "USLACKBOT", "profile": {"status_text": "bot"}}
        ]))
        .unwrap()
    }

    #[test]
    fn reconciles_badges() {
        let cfg = Config::parse(CONFIG).unwrap();
        let contacts = contacts();
        let linked = linked_contacts(&contacts, &cfg.directory);
        let actions = plan(&cfg, &linked, &users()).unwrap();
        let summary: Vec<String> = actions.iter().map(|a| a.to_string()).collect();
        assert_eq!(
            summary,
            vec![
                "clear status of UX",
                "set status of UC to :star: Committee",
                "clear status of UL",
                "set status of UN to :hourglass: Member",
                "set status of UO to :star: Committee",
            ]
        );
    }

    #[test]
    fn lapsed_linked_member_loses_badge() {
        let cfg = Config::parse(CONFIG).unwrap();
        let contacts = contacts();
        let linked = linked_contacts(&contacts, &cfg.directory);
        let actions = plan(&cfg, &linked, &users()).unwrap();
        assert!(actions.contains(&Action::ClearStatus { user: "UL".into() }));
        assert!(!actions.iter().any(|a| matches!(a, Action::ClearStatus { user } if user == "UZ")));
    }
}
