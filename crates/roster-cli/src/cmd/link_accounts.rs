use super::{gate, load_config, summarize, Flags};
use anyhow::Context;
use roster_core::chat::ChatClient;
use roster_core::config::ContactId;
use roster_core::directory::{resolve_domain, DirectoryClient};
use roster_core::executor::Executor;
use roster_core::gate::{GateMode, StdinPrompt};
use roster_core::link;
use roster_core::notify::{Notifier, Notifying};
use roster_core::plan::Action;
use std::collections::BTreeMap;
use std::path::Path;

pub fn run(root: &Path, flags: Flags) -> anyhow::Result<()> {
    let config = load_config(root)?;
    if config.directory.fields.chat.is_empty() {
        anyhow::bail!("directory.fields.chat must name the custom field holding chat ids");
    }
    let directory = DirectoryClient::new(&config.directory);
    let chat = ChatClient::bot(&config.chat);
    let domain = resolve_domain(&directory, &config.directory)?;

    let contacts = directory
        .contacts()
        .context("failed to load directory contacts")?;
    let memberships = directory
        .memberships()
        .context("failed to load memberships")?;
    let users = chat.users().context("failed to load chat users")?;

    let unlinked = link::unlinked_by_email(&contacts, &config.directory);
    let chat_users = link::chat_users_by_email(&users);
    let active = link::active_contacts(&memberships);
    let plan = link::plan(&unlinked, &chat_users, &active);
    tracing::info!(
        "{} unlinked contacts, {} matched by email",
        unlinked.len(),
        plan.matched.len()
    );

    let names: BTreeMap<ContactId, String> =
        contacts.iter().map(|c| (c.id, c.full_name())).collect();
    let render = |a: &Action| link::notice(a, &names, &domain);
    let notifier = Notifier::new(&chat, &config.chat.notification_channel).quiet(flags.quiet);
    let executor =
        Executor::new(&config.pause).with_directory(&directory, &config.directory.fields.chat);
    let mut applier = Notifying::new(executor, &notifier, &render);

    let mut prompt = StdinPrompt;
    let mut gate = gate(flags, &config, &mut prompt);
    let outcome = gate.confirm_each(&plan.matched, &mut applier)?;
    summarize(&outcome, plan.matched.len());

    if plan.unmatched_active.is_empty() {
        return Ok(());
    }
    if gate.mode != GateMode::Interactive {
        for contact in &plan.unmatched_active {
            tracing::info!(
                "no chat account matches active member {} ({})",
                contact.full_name(),
                contact.id
            );
        }
        return Ok(());
    }

    let mut manual = Vec::new();
    for contact in &plan.unmatched_active {
        let question = format!(
            "No chat account matches {} <{}>. Chat user id (blank to skip):",
            contact.full_name(),
            contact.email_address.as_deref().unwrap_or("no email")
        );
        if let Some(user) = gate.prompt().ask(&question) {
            manual.push(link::manual_link(contact, &user));
        }
    }
    let outcome = gate.confirm_each(&manual, &mut applier)?;
    summarize(&outcome, manual.len());
    Ok(())
}
