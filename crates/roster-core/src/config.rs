use crate::error::{Result, RosterError};
use crate::paths;
use crate::trigger::TriggerAction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub type GroupId = u64;
pub type ContactId = u64;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DirectoryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_directory_url")]
    pub base_url: String,
    pub token: String,
    /// Organisation subdomain used for contact links; fetched when absent.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub fields: FieldIds,
    #[serde(default)]
    pub groups: GroupSets,
    /// Contacts never considered by chat-facing syncs.
    #[serde(default)]
    pub ignore: Vec<ContactId>,
}

fn default_directory_url() -> String {
    "https://api.tidyhq.com/v1".to_string()
}

/// Custom field ids on directory contacts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldIds {
    #[serde(default)]
    pub chat: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupSets {
    #[serde(default)]
    pub members: Vec<GroupId>,
    #[serde(default)]
    pub committee: Vec<GroupId>,
    #[serde(default)]
    pub volunteer: Vec<GroupId>,
    #[serde(default)]
    pub member_induction: Vec<GroupId>,
}

// ---------------------------------------------------------------------------
// ChatConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_url")]
    pub base_url: String,
    /// Token acting as a person; needed for profile changes and invites.
    #[serde(default)]
    pub user_token: String,
    pub bot_token: String,
    /// App-level token for the event stream.
    #[serde(default)]
    pub app_token: Option<String>,
    pub notification_channel: String,
    #[serde(default)]
    pub trigger_channel: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn default_chat_url() -> String {
    "https://slack.com/api".to_string()
}

// ---------------------------------------------------------------------------
// TrackerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_tracker_project")]
    pub project: String,
    #[serde(default = "default_tracker_tag")]
    pub tag: String,
    #[serde(default = "default_template_subject")]
    pub template_subject: String,
}

fn default_tracker_project() -> String {
    "Attendee".to_string()
}

fn default_tracker_tag() -> String {
    "bot-managed".to_string()
}

fn default_template_subject() -> String {
    "Template".to_string()
}

// ---------------------------------------------------------------------------
// CalendarConfig / AutomationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_calendar_url")]
    pub base_url: String,
    pub calendar_id: String,
    pub api_key: String,
    #[serde(default = "default_event_limit")]
    pub max_results: u32,
}

fn default_calendar_url() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_event_limit() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    pub base_url: String,
    pub token: String,
    #[serde(default)]
    pub entities: AutomationEntities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationEntities {
    #[serde(default = "default_purifier_level")]
    pub purifier_level: String,
    #[serde(default = "default_purifier_fan")]
    pub purifier_fan: String,
    #[serde(default = "default_elab_lights")]
    pub elab_lights: String,
    #[serde(default = "default_foyer_lights")]
    pub foyer_lights: String,
}

fn default_purifier_level() -> String {
    "number.design_purifier_fan_level".to_string()
}

fn default_purifier_fan() -> String {
    "fan.design_purifier".to_string()
}

fn default_elab_lights() -> String {
    "switch.iw_relay_electronics_lab_lights".to_string()
}

fn default_foyer_lights() -> String {
    "switch.foyer_lights".to_string()
}

impl Default for AutomationEntities {
    fn default() -> Self {
        Self {
            purifier_level: default_purifier_level(),
            purifier_fan: default_purifier_fan(),
            elab_lights: default_elab_lights(),
            foyer_lights: default_foyer_lights(),
        }
    }
}

// ---------------------------------------------------------------------------
// ExpiryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryConfig {
    /// Membership level ids whose memberships are checked.
    #[serde(default)]
    pub levels: Vec<u64>,
    /// Memberships ending within this many days get a warning.
    #[serde(default = "default_warn_days")]
    pub warn_days: i64,
    #[serde(default)]
    pub billing: BillingConfig,
}

fn default_warn_days() -> i64 {
    2
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            levels: Vec::new(),
            warn_days: default_warn_days(),
            billing: BillingConfig::default(),
        }
    }
}

/// Billing-cycle placement for contacts whose membership is about to lapse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Earliest accepted day count (negative = days until expiry).
    #[serde(default = "default_window_start")]
    pub window_start: i64,
    #[serde(default)]
    pub window_end: i64,
    /// Expiry days of month before this go to the first billing group.
    #[serde(default = "default_split_day")]
    pub split_day: u32,
    #[serde(default)]
    pub rules: Vec<BillingRule>,
}

fn default_window_start() -> i64 {
    -35
}

fn default_split_day() -> u32 {
    16
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            window_start: default_window_start(),
            window_end: 0,
            split_day: default_split_day(),
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRule {
    pub name: String,
    pub level: u64,
    pub groups: Vec<GroupId>,
}

// ---------------------------------------------------------------------------
// Policy tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub by_group: BTreeMap<GroupId, Vec<String>>,
    #[serde(default)]
    pub by_channel: BTreeMap<String, Vec<GroupId>>,
    /// Channels every active member belongs in.
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub exclude: ExcludeList,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeList {
    #[serde(default)]
    pub identities: Vec<String>,
    #[serde(default)]
    pub groups: Vec<GroupId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    #[serde(default = "default_report_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<GroupId>>,
    #[serde(default)]
    pub exclude: Vec<GroupId>,
}

fn default_report_prefix() -> String {
    "Machine Operator - ".to_string()
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            prefix: default_report_prefix(),
            groups: BTreeMap::new(),
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventReportsConfig {
    #[serde(default)]
    pub template: Option<PathBuf>,
    #[serde(default)]
    pub reports: BTreeMap<String, Vec<u64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRule {
    #[serde(default)]
    pub functions: Vec<TriggerAction>,
    /// Chat users messaged when the pattern fires.
    #[serde(default)]
    pub notify: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BadgesConfig {
    /// Status text → emoji.
    #[serde(default)]
    pub statuses: BTreeMap<String, String>,
    #[serde(default)]
    pub overrides: Vec<StatusOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusOverride {
    pub user: String,
    pub status: String,
}

pub const BADGE_TITLES: &[&str] = &["Committee", "Volunteer", "Member", "Uninducted"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Public URL of the document store.
    pub base_url: String,
    #[serde(default = "default_document_username")]
    pub username: String,
    #[serde(default = "default_document_icon")]
    pub icon_emoji: String,
}

fn default_document_username() -> String {
    "Receipts".to_string()
}

fn default_document_icon() -> String {
    ":receipt:".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadsConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default = "default_marker")]
    pub marker: String,
}

fn default_marker() -> String {
    "heavy_check_mark".to_string()
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            channel: None,
            marker: default_marker(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallsConfig {
    pub channel: String,
    #[serde(default = "default_calls_username")]
    pub username: String,
    #[serde(default = "default_calls_icon")]
    pub icon_emoji: String,
}

fn default_calls_username() -> String {
    "Phone Assistant".to_string()
}

fn default_calls_icon() -> String {
    ":phone:".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeConfig {
    #[serde(default)]
    pub channel: Option<String>,
    /// Messages younger than this are never offered for deletion.
    #[serde(default = "default_purge_min_age")]
    pub min_age_days: i64,
    /// Chat users whose messages are always kept.
    #[serde(default)]
    pub protected: Vec<String>,
}

fn default_purge_min_age() -> i64 {
    14
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            channel: None,
            min_age_days: default_purge_min_age(),
            protected: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseConfig {
    #[serde(default = "default_pause_secs")]
    pub default_secs: u64,
    /// Profile updates are rated to roughly 30 calls a minute.
    #[serde(default = "default_status_pause_secs")]
    pub status_secs: u64,
}

fn default_pause_secs() -> u64 {
    1
}

fn default_status_pause_secs() -> u64 {
    3
}

impl Default for PauseConfig {
    fn default() -> Self {
        Self {
            default_secs: default_pause_secs(),
            status_secs: default_status_pause_secs(),
        }
    }
}

impl PauseConfig {
    pub fn default_pause(&self) -> Duration {
        Duration::from_secs(self.default_secs)
    }

    pub fn status_pause(&self) -> Duration {
        Duration::from_secs(self.status_secs)
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub directory: DirectoryConfig,
    pub chat: ChatConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker: Option<TrackerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<CalendarConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation: Option<AutomationConfig>,
    #[serde(default)]
    pub expiry: ExpiryConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
    #[serde(default)]
    pub event_reports: EventReportsConfig,
    #[serde(default)]
    pub triggers: BTreeMap<String, TriggerRule>,
    #[serde(default)]
    pub badges: BadgesConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentConfig>,
    #[serde(default)]
    pub downloads: DownloadsConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calls: Option<CallsConfig>,
    #[serde(default)]
    pub purge: PurgeConfig,
    #[serde(default)]
    pub pause: PauseConfig,
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(RosterError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(&path)?;
        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(data)?;
        Ok(cfg)
    }

    pub fn tracker(&self) -> Result<&TrackerConfig> {
        self.tracker
            .as_ref()
            .ok_or_else(|| RosterError::Validation("no 'tracker' section in config".into()))
    }

    pub fn calendar(&self) -> Result<&CalendarConfig> {
        self.calendar
            .as_ref()
            .ok_or_else(|| RosterError::Validation("no 'calendar' section in config".into()))
    }

    pub fn automation(&self) -> Result<&AutomationConfig> {
        self.automation
            .as_ref()
            .ok_or_else(|| RosterError::Validation("no 'automation' section in config".into()))
    }

    pub fn document(&self) -> Result<&DocumentConfig> {
        self.document
            .as_ref()
            .ok_or_else(|| RosterError::Validation("no 'document' section in config".into()))
    }

    pub fn calls(&self) -> Result<&CallsConfig> {
        self.calls
            .as_ref()
            .ok_or_else(|| RosterError::Validation("no 'calls' section in config".into()))
    }

    /// Emoji for a badge status; unknown statuses are a validation error.
    pub fn badge_emoji(&self, status: &str) -> Result<&str> {
        self.badges
            .statuses
            .get(status)
            .map(|s| s.as_str())
            .ok_or_else(|| RosterError::Validation(format!("invalid status: {status}")))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        if self.directory.token.trim().is_empty() {
            error("directory.token is empty".to_string());
        }
        if self.chat.bot_token.trim().is_empty() {
            error("chat.bot_token is empty".to_string());
        }

        if !self.badges.statuses.is_empty() {
            for title in BADGE_TITLES {
                if !self.badges.statuses.contains_key(*title) {
                    error(format!("badges.statuses is missing '{title}'"));
                }
            }
        }
        for o in &self.badges.overrides {
            if !self.badges.statuses.contains_key(&o.status) {
                error(format!(
                    "override for '{}' uses unknown status '{}'",
                    o.user, o.status
                ));
            }
        }

        let uses_automation = self
            .triggers
            .values()
            .any(|t| t.functions.iter().any(|f| f.needs_automation()));
        if uses_automation && self.automation.is_none() {
            error("triggers call the automation hub but no 'automation' section exists".into());
        }

        for (i, rule) in self.expiry.billing.rules.iter().enumerate() {
            if rule.groups.is_empty() {
                error(format!("billing rule {i} ('{}') has no groups", rule.name));
            }
        }

        if self.expiry.warn_days < 1 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "expiry.warn_days={} disables expiry warnings",
                    self.expiry.warn_days
                ),
            });
        }

        for (pattern, rule) in &self.triggers {
            if rule.functions.is_empty() && rule.notify.is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("trigger '{pattern}' has no functions and no one to notify"),
                });
            }
        }
        if !self.triggers.is_empty() && self.chat.trigger_channel.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "triggers are configured but chat.trigger_channel is not set".into(),
            });
        }

        if self.reports.groups.contains_key("all") {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "report name 'all' is reserved and shadows the combined report".into(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
directory:
  token: dir-token
chat:
  bot_token: xoxb-1
  notification_channel: C100
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = Config::parse(MINIMAL).unwrap();
        assert_eq!(cfg.directory.base_url, "https://api.tidyhq.com/v1");
        assert_eq!(cfg.expiry.warn_days, 2);
        assert_eq!(cfg.expiry.billing.window_start, -35);
        assert_eq!(cfg.expiry.billing.split_day, 16);
        assert_eq!(cfg.pause.status_pause(), Duration::from_secs(3));
        assert_eq!(cfg.reports.prefix, "Machine Operator - ");
        assert_eq!(cfg.purge.min_age_days, 14);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn unknown_trigger_action_fails_load() {
        let yaml = format!(
            "{MINIMAL}triggers:\n  purify:\n    functions: [purify, make_coffee]\n"
        );
        let err = Config::parse(&yaml).unwrap_err();
        assert!(err.to_string().contains("make_coffee"));
    }

    #[test]
    fn automation_required_for_hub_triggers() {
        let yaml = format!("{MINIMAL}triggers:\n  purify:\n    functions: [purify]\n");
        let cfg = Config::parse(&yaml).unwrap();
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("automation")));
    }

    #[test]
    fn badge_overrides_must_name_known_status() {
        let yaml = format!(
            "{MINIMAL}badges:\n  statuses:\n    Committee: ':a:'\n    Volunteer: ':b:'\n    Member: ':c:'\n    Uninducted: ':d:'\n  overrides:\n    - user: U1\n      status: Wizard\n"
        );
        let cfg = Config::parse(&yaml).unwrap();
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("Wizard"));
        assert!(cfg.badge_emoji("Wizard").is_err());
        assert_eq!(cfg.badge_emoji("Member").unwrap(), ":c:");
    }

    #[test]
    fn channel_policy_tables_parse() {
        let yaml = format!(
            "{MINIMAL}channels:\n  by_group:\n    12: [C1, C2]\n  by_channel:\n    C3: [12, 13]\n  members: [C4]\n  exclude:\n    identities: [U9]\n    groups: [13]\n"
        );
        let cfg = Config::parse(&yaml).unwrap();
        assert_eq!(cfg.channels.by_group[&12], vec!["C1", "C2"]);
        assert_eq!(cfg.channels.by_channel["C3"], vec![12, 13]);
        assert_eq!(cfg.channels.exclude.groups, vec![13]);
    }

    #[test]
    fn missing_sections_are_validation_errors() {
        let cfg = Config::parse(MINIMAL).unwrap();
        assert!(matches!(cfg.tracker(), Err(RosterError::Validation(_))));
        assert!(matches!(cfg.calendar(), Err(RosterError::Validation(_))));
    }
}
