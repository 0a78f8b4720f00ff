//! Desired-state computation from the static policy tables.

use crate::config::{ChannelsConfig, ExcludeList, GroupId, ReportsConfig};
use crate::error::{Result, RosterError};
use crate::plan::OrderedSet;
use std::collections::BTreeMap;

/// Group id → chat identities in that group (directory order).
pub type GroupMembers = BTreeMap<GroupId, OrderedSet>;

// ---------------------------------------------------------------------------
// ChannelPolicy
// ---------------------------------------------------------------------------

/// Normalised group↔channel mapping.
#[derive(Debug, Clone, Default)]
pub struct ChannelPolicy {
    by_channel: BTreeMap<String, Vec<GroupId>>,
    member_channels: Vec<String>,
    exclude: ExcludeList,
}

impl ChannelPolicy {
    pub fn from_config(cfg: &ChannelsConfig) -> Self {
        let mut by_channel: BTreeMap<String, Vec<GroupId>> = BTreeMap::new();
        let mut add = |channel: &str, group: GroupId| {
            let groups = by_channel.entry(channel.to_string()).or_default();
            if !groups.contains(&group) {
                groups.push(group);
            }
        };
        for (group, channels) in &cfg.by_group {
            for channel in channels {
                add(channel, *group);
            }
        }
        for (channel, groups) in &cfg.by_channel {
            for group in groups {
                add(channel, *group);
            }
        }
        Self {
            by_channel,
            member_channels: cfg.members.clone(),
            exclude: cfg.exclude.clone(),
        }
    }

    /// Every channel the policy reconciles: group-mapped first, then the
    /// all-members channels.
    pub fn channels(&self) -> Vec<String> {
        let mut out: OrderedSet = self.by_channel.keys().map(String::as_str).collect();
        out.extend(self.member_channels.iter().map(String::as_str));
        out.iter().map(str::to_string).collect()
    }

    pub fn groups_for(&self, channel: &str) -> &[GroupId] {
        self.by_channel
            .get(channel)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Identities that should be in `channel`:
    /// `(⋃ members(group) ∪ active members if member channel) − exclude`.
    pub fn desired(
        &self,
        channel: &str,
        groups: &GroupMembers,
        active_members: &OrderedSet,
    ) -> OrderedSet {
        let mut desired = OrderedSet::new();
        for group in self.groups_for(channel) {
            match groups.get(group) {
                Some(members) if !members.is_empty() => desired.extend(members.iter()),
                _ => tracing::error!("group {group} has no members or does not exist"),
            }
        }
        if self.member_channels.iter().any(|c| c == channel) {
            desired.extend(active_members.iter());
        }
        apply_exclusions(desired, &self.exclude, groups)
    }
}

/// Remove excluded identities and every member of an excluded group.
pub fn apply_exclusions(
    mut desired: OrderedSet,
    exclude: &ExcludeList,
    groups: &GroupMembers,
) -> OrderedSet {
    for id in &exclude.identities {
        desired.remove(id);
    }
    for group in &exclude.groups {
        if let Some(members) = groups.get(group) {
            for id in members.iter() {
                desired.remove(id);
            }
        }
    }
    desired
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

pub const ALL_REPORTS: &str = "all";

/// Group ids for a named report. `all` is the union of every report, each
/// group once, minus the exclude list.
pub fn report_groups(cfg: &ReportsConfig, name: &str) -> Result<Vec<GroupId>> {
    if name == ALL_REPORTS {
        let mut out = Vec::new();
        for groups in cfg.groups.values() {
            for g in groups {
                if !out.contains(g) && !cfg.exclude.contains(g) {
                    out.push(*g);
                }
            }
        }
        return Ok(out);
    }
    cfg.groups
        .get(name)
        .cloned()
        .ok_or_else(|| RosterError::Validation(format!("report {name} not found in config")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
