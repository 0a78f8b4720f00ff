use super::{gate, load_config, summarize, Flags};
use anyhow::Context;
use roster_core::badges;
use roster_core::chat::ChatClient;
use roster_core::directory::DirectoryClient;
use roster_core::executor::Executor;
use roster_core::gate::StdinPrompt;
use roster_core::identity::linked_contacts;
use roster_core::notify::{Notifier, Notifying};
use std::path::Path;

pub fn run(root: &Path, flags: Flags) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let directory = DirectoryClient::new(&config.directory);
    let bot = ChatClient::bot(&config.chat);
    let user = ChatClient::user(&config.chat).context("profile changes act as a person")?;

    let contacts = directory
        .contacts()
        .context("failed to load directory contacts")?;
    let users = bot.users().context("failed to load chat users")?;
    let linked = linked_contacts(&contacts, &config.directory);
    let actions = badges::plan(&config, &linked, &users)?;

    let notifier = Notifier::new(&bot, &config.chat.notification_channel).quiet(flags.quiet);
    let executor = Executor::new(&config.pause).with_chat(&user);
    let mut applier = Notifying::new(executor, &notifier, &badges::notice);

    let mut prompt = StdinPrompt;
    let mut gate = gate(flags, &config, &mut prompt);
    let outcome = gate.run(&actions, &mut applier)?;
    summarize(&outcome, actions.len());
    Ok(())
}
