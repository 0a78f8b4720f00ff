use super::{gate, load_config, summarize, Flags};
use anyhow::Context;
use roster_core::channels::{self, DirectoryView};
use roster_core::chat::ChatClient;
use roster_core::directory::DirectoryClient;
use roster_core::executor::Executor;
use roster_core::gate::StdinPrompt;
use roster_core::policy::ChannelPolicy;
use std::path::Path;

pub fn run(root: &Path, flags: Flags) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let directory = DirectoryClient::new(&config.directory);
    let chat = ChatClient::user(&config.chat).context("channel invites act as a person")?;

    let contacts = directory
        .contacts()
        .context("failed to load directory contacts")?;
    let view = DirectoryView::build(&contacts, &config.directory);
    let policy = ChannelPolicy::from_config(&config.channels);
    let observed = channels::observe(&chat, &policy).context("failed to load channel members")?;
    let actions = channels::plan(&policy, &view, &observed);

    let mut prompt = StdinPrompt;
    let mut gate = gate(flags, &config, &mut prompt);
    let mut executor = Executor::new(&config.pause).with_chat(&chat);
    let outcome = gate.run(&actions, &mut executor)?;
    summarize(&outcome, actions.len());
    Ok(())
}
