use super::{gate, load_config, summarize, Flags};
use anyhow::Context;
use roster_core::directory::DirectoryClient;
use roster_core::executor::Executor;
use roster_core::gate::StdinPrompt;
use roster_core::names;
use roster_core::plan::Action;
use std::path::Path;

pub fn run(root: &Path, flags: Flags) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let directory = DirectoryClient::new(&config.directory);
    let contacts = directory
        .contacts()
        .context("failed to load directory contacts")?;

    let actions: Vec<Action> = contacts.iter().filter_map(names::plan_corrections).collect();
    tracing::info!(
        "{} of {} contacts need correcting",
        actions.len(),
        contacts.len()
    );

    let mut prompt = StdinPrompt;
    let mut gate = gate(flags, &config, &mut prompt);
    let mut executor =
        Executor::new(&config.pause).with_directory(&directory, &config.directory.fields.chat);
    let outcome = gate.confirm_each(&actions, &mut executor)?;
    summarize(&outcome, actions.len());
    Ok(())
}
