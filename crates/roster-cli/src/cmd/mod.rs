pub mod add_groups;
pub mod badges;
pub mod check_expiry;
pub mod config;
pub mod correct_names;
pub mod download_files;
pub mod event_report;
pub mod export_events;
pub mod link_accounts;
pub mod list_files;
pub mod listen;
pub mod membership_snapshot;
pub mod notify_document;
pub mod operator_report;
pub mod purge_channel;
pub mod relay_calls;
pub mod repeat_event;
pub mod sync_channels;
pub mod sync_tasks;
pub mod titles;
pub mod titles_file;

use anyhow::Context;
use roster_core::config::Config;
use roster_core::gate::{Gate, GateMode, GateOutcome, GateState, Prompt};
use std::path::Path;

/// Global flags every task sees.
#[derive(Debug, Clone, Copy)]
pub struct Flags {
    pub live: bool,
    pub cron: bool,
    pub quiet: bool,
    pub json: bool,
}

impl Flags {
    pub fn mode(self) -> GateMode {
        GateMode::from_flags(self.live, self.cron)
    }
}

pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load(root).context("failed to load config")
}

pub fn gate<'p>(flags: Flags, config: &Config, prompt: &'p mut dyn Prompt) -> Gate<'p> {
    Gate::new(flags.mode(), config.pause.default_pause(), prompt)
}

/// One-line summary of a gate run.
pub fn summarize(outcome: &GateOutcome, planned: usize) {
    match outcome.state {
        GateState::Planned if planned > 0 => {
            println!("{planned} change(s) planned. Run with --live to apply.")
        }
        GateState::Planned => println!("Nothing to do."),
        GateState::Rejected if outcome.applied.is_empty() => println!("No changes made."),
        GateState::Rejected | GateState::Confirmed | GateState::Applied => {
            println!("{} of {planned} change(s) applied.", outcome.applied.len());
        }
    }
    if outcome.failed > 0 {
        println!("{} change(s) failed; see the log above.", outcome.failed);
    }
}
