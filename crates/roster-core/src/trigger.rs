//! Actions fired by patterns seen in the trigger channel.

use crate::automation::AutomationClient;
use crate::config::{AutomationEntities, TriggerRule};
use crate::error::{Result, RosterError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// Closed set of trigger actions. Unknown names fail config load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerAction {
    /// Raise the purifier fan to 67% if its level is below 2.
    Purify,
    Elab,
    Foyer,
    /// Log only.
    Demo,
}

impl TriggerAction {
    pub fn needs_automation(self) -> bool {
        !matches!(self, TriggerAction::Demo)
    }

    pub fn name(self) -> &'static str {
        match self {
            TriggerAction::Purify => "purify",
            TriggerAction::Elab => "elab",
            TriggerAction::Foyer => "foyer",
            TriggerAction::Demo => "demo",
        }
    }

    /// Run the action. Returns true if the hub was changed.
    pub fn run(
        self,
        hub: Option<&AutomationClient>,
        entities: &AutomationEntities,
    ) -> Result<bool> {
        let hub = match (self, hub) {
            (TriggerAction::Demo, _) => {
                tracing::info!("demo trigger fired");
                return Ok(false);
            }
            (_, Some(hub)) => hub,
            (_, None) => {
                tracing::error!("trigger {} needs the automation hub", self.name());
                return Ok(false);
            }
        };
        match self {
            TriggerAction::Purify => {
                let raw = hub.state(&entities.purifier_level)?;
                let level: f64 = raw.trim().parse().map_err(|_| {
                    RosterError::partial(
                        format!("purifier level {}", entities.purifier_level),
                        format!("not a number: '{raw}'"),
                    )
                })?;
                tracing::debug!("purifier level is {level}");
                if level >= 2.0 {
                    return Ok(false);
                }
                hub.call_service(
                    "fan",
                    "turn_on",
                    &json!({"entity_id": entities.purifier_fan, "percentage": 67}),
                )?;
                tracing::info!("turned on air purifier");
                Ok(true)
            }
            TriggerAction::Elab => switch_on(hub, &entities.elab_lights),
            TriggerAction::Foyer => switch_on(hub, &entities.foyer_lights),
            TriggerAction::Demo => Ok(false),
        }
    }
}

fn switch_on(hub: &AutomationClient, entity: &str) -> Result<bool> {
    hub.call_service("switch", "turn_on", &json!({"entity_id": entity}))?;
    tracing::info!("{entity} turned on");
    Ok(true)
}

/// Patterns whose text occurs anywhere in `haystack`, in config order.
pub fn matching<'a>(
    triggers: &'a BTreeMap<String, TriggerRule>,
    haystack: &str,
) -> Vec<(&'a str, &'a TriggerRule)> {
    triggers
        .iter()
        .filter(|(pattern, _)| !pattern.is_empty() && haystack.contains(pattern.as_str()))
        .map(|(p, r)| (p.as_str(), r))
        .collect()
}
