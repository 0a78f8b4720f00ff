use super::{gate, load_config, summarize, Flags};
use anyhow::Context;
use roster_core::directory::DirectoryClient;
use roster_core::executor::Executor;
use roster_core::gate::{GateMode, Prompt, StdinPrompt};
use roster_core::groups;
use std::path::Path;

pub fn run(
    root: &Path,
    flags: Flags,
    prefix: Option<&str>,
    names: &[String],
) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let directory = DirectoryClient::new(&config.directory);
    let mut prompt = StdinPrompt;

    let prefix = groups::normalize_prefix(prefix.unwrap_or(groups::DEFAULT_PREFIX));
    let mut wanted = groups::parse_names(&names.join(","));
    if wanted.is_empty() && flags.mode() != GateMode::Automatic {
        let answer = prompt.ask(&format!("Group names to create under \"{prefix}\" (comma separated):"));
        wanted = groups::parse_names(answer.as_deref().unwrap_or_default());
    }
    if wanted.is_empty() {
        anyhow::bail!("no group names given");
    }

    let existing = directory.groups().context("failed to load groups")?;
    let actions = groups::plan(&prefix, &wanted, &existing);

    let mut gate = gate(flags, &config, &mut prompt);
    let mut executor =
        Executor::new(&config.pause).with_directory(&directory, &config.directory.fields.chat);
    let outcome = gate.run(&actions, &mut executor)?;
    summarize(&outcome, actions.len());
    Ok(())
}
