use super::{gate, load_config, summarize, Flags};
use anyhow::Context;
use roster_core::chat::ChatClient;
use roster_core::directory::DirectoryClient;
use roster_core::executor::Executor;
use roster_core::gate::StdinPrompt;
use roster_core::identity::linked_contacts;
use roster_core::notify::{Notifier, Notifying};
use roster_core::titles;
use std::path::Path;

pub fn run(root: &Path, flags: Flags) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let title_field = &config.directory.fields.title;
    if title_field.is_empty() {
        anyhow::bail!("directory.fields.title must name the custom field holding titles");
    }
    let directory = DirectoryClient::new(&config.directory);
    let bot = ChatClient::bot(&config.chat);
    let user = ChatClient::user(&config.chat).context("profile changes act as a person")?;

    let contacts = directory
        .contacts()
        .context("failed to load directory contacts")?;
    let users = bot.users().context("failed to load chat users")?;
    let linked = linked_contacts(&contacts, &config.directory);
    let actions = titles::plan(&linked, title_field, &users);

    let notifier = Notifier::new(&bot, &config.chat.notification_channel).quiet(flags.quiet);
    let executor = Executor::new(&config.pause).with_chat(&user);
    let mut applier = Notifying::new(executor, &notifier, &titles::notice);

    let mut prompt = StdinPrompt;
    let mut gate = gate(flags, &config, &mut prompt);
    let outcome = gate.run(&actions, &mut applier)?;
    summarize(&outcome, actions.len());
    Ok(())
}
