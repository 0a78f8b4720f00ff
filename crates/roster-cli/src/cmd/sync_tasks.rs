use super::{gate, load_config, summarize, Flags};
use anyhow::Context;
use roster_core::executor::Executor;
use roster_core::gate::{GateState, StdinPrompt};
use roster_core::ledger::Ledger;
use roster_core::paths;
use roster_core::plan::Action;
use roster_core::task_sync;
use roster_core::tracker::TrackerClient;
use std::path::Path;

pub fn run(root: &Path, flags: Flags) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let tracker_cfg = config.tracker()?;
    let tracker = TrackerClient::login(tracker_cfg).context("failed to log in to the tracker")?;

    let projects = tracker.projects()?;
    let project = task_sync::find_project(&projects, tracker_cfg)?;
    let stories = tracker.stories(project.id)?;
    let templates = task_sync::load_templates(&tracker, &stories, tracker_cfg)?;
    tracing::info!("loaded {} templates", templates.len());

    let mut ledger = Ledger::load(&paths::ledger_path(root))?;
    let plans = task_sync::plan(project, &stories, &templates, tracker_cfg, &ledger);
    let actions: Vec<Action> = plans.iter().flat_map(|p| p.actions.clone()).collect();

    let mut prompt = StdinPrompt;
    let mut gate = gate(flags, &config, &mut prompt);
    let mut executor = Executor::new(&config.pause).with_tracker(&tracker);
    let outcome = gate.run(&actions, &mut executor)?;

    if outcome.state == GateState::Applied {
        task_sync::record(&plans, &outcome.applied, &mut ledger);
    }
    if ledger.is_dirty() {
        ledger.save().context("failed to save ledger")?;
    }
    summarize(&outcome, actions.len());
    Ok(())
}
