//! Channel membership reconciliation: invite linked contacts into the
//! channels their directory groups map to.

use crate::chat::ChatClient;
use crate::config::DirectoryConfig;
use crate::directory::Contact;
use crate::error::Result;
use crate::identity::linked_contacts;
use crate::plan::{plan_invites, Action, OrderedSet};
use crate::policy::{ChannelPolicy, GroupMembers};
use std::collections::{BTreeMap, HashSet};

/// Group membership and active members among linked contacts.
#[derive(Debug, Default)]
pub struct DirectoryView {
    pub groups: GroupMembers,
    pub active_members: OrderedSet,
    /// Chat id → display name, for summaries.
    pub names: BTreeMap<String, String>,
}

impl DirectoryView {
    pub fn build(contacts: &[Contact], cfg: &DirectoryConfig) -> Self {
        let mut view = DirectoryView::default();
        for (chat_id, contact) in linked_contacts(contacts, cfg) {
            for group in contact.group_ids() {
                view.groups.entry(group).or_default().insert(chat_id.as_str());
            }
            if contact.in_any(&cfg.groups.members) {
                view.active_members.insert(chat_id.as_str());
            }
            view.names.insert(chat_id, contact.name());
        }
        tracing::info!(
            "loaded {} linked contacts in {} groups",
            view.names.len(),
            view.groups.len()
        );
        view
    }
}

/// Current members of every channel the policy covers. A failed fetch
/// aborts the run.
pub fn observe(
    chat: &ChatClient,
    policy: &ChannelPolicy,
) -> Result<BTreeMap<String, HashSet<String>>> {
    let mut observed = BTreeMap::new();
    for channel in policy.channels() {
        let members: HashSet<String> = chat.conversation_members(&channel)?.into_iter().collect();
        tracing::info!("got info for #{channel} with {} members", members.len());
        observed.insert(channel, members);
    }
    Ok(observed)
}

/// Invites for every channel, channels in policy order.
pub fn plan(
    policy: &ChannelPolicy,
    view: &DirectoryView,
    observed: &BTreeMap<String, HashSet<String>>,
) -> Vec<Action> {
    let empty = HashSet::new();
    let mut actions = Vec::new();
    for channel in policy.channels() {
        let desired = policy.desired(&channel, &view.groups, &view.active_members);
        let current = observed.get(&channel).unwrap_or(&empty);
        let invites = plan_invites(&channel, &desired, current);
        if !invites.is_empty() {
            tracing::info!("#{channel}: add {}", invites.len());
        }
        actions.extend(invites);
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelsConfig;

    fn dir_cfg() -> DirectoryConfig {
        serde_json::from_value(serde_json::json!({
            "token": "t",
            "fields": {"chat": "chat"},
            "groups": {"members": [100]},
            "ignore": [9]
        }))
        .unwrap()
    }

    fn contacts() -> Vec<Contact> {
        serde_json::from_value(serde_json::json!([
            {"id": 1, "display_name": "A", "custom_fields": [{"id": "chat", "value": "UA"}],
             "groups": [{"id": 10}, {"id": 100}]},
            {"id": 2, "display_name": "B", "custom_fields": [{"id": "chat", "value": "UB"}],
             "groups": [{"id": 10}]},
            {"id": 3, "display_name": "C", "custom_fields": [{"id": "chat", "value": "UC"}],
             "groups": [{"id": 11}, {"id": 100}]},
            {"id": 4, "display_name": "unlinked", "groups": [{"id": 10}]},
            {"id": 9, "display_name": "ignored", "custom_fields": [{"id": "chat", "value": "UI"}],
             "groups": [{"id": 10}]}
        ]))
        .unwrap()
    }

    #[test]
    fn view_keeps_linked_and_not_ignored() {
        let view = DirectoryView::build(&contacts(), &dir_cfg());
        assert_eq!(view.groups[&10].iter().collect::<Vec<_>>(), vec!["UA", "UB"]);
        assert_eq!(view.active_members.len(), 2);
        assert!(!view.names.contains_key("UI"));
    }

    #[test]
    fn plans_only_missing_members() {
        let cfg = ChannelsConfig {
            by_group: [(10, vec!["ops".to_string()])].into_iter().collect(),
            by_channel: [("ops".to_string(), vec![11])].into_iter().collect(),
            members: vec!["general".into()],
            ..Default::default()
        };
        let policy = ChannelPolicy::from_config(&cfg);
        let view = DirectoryView::build(&contacts(), &dir_cfg());
        let mut observed = BTreeMap::new();
        observed.insert("ops".to_string(), HashSet::from(["UB".to_string(), "UX".to_string()]));
        observed.insert("general".to_string(), HashSet::from(["UA".to_string()]));

        let actions = plan(&policy, &view, &observed);
        let summary: Vec<String> = actions.iter().map(|a| a.to_string()).collect();
        assert_eq!(
            summary,
            vec!["invite UA to #ops", "invite UC to #ops", "invite UC to #general"]
        );
    }

    #[test]
    fn observe_fails_on_unreachable_chat() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("POST", "/conversations.members")
            .with_status(503)
            .create();
        let chat = ChatClient::new(&server.url(), "xoxp");
        let policy = ChannelPolicy::from_config(&ChannelsConfig {
            members: vec!["general".into()],
            ..Default::default()
        });
        assert!(observe(&chat, &policy).unwrap_err().is_fatal());
    }
}
