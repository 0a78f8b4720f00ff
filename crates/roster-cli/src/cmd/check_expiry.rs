use super::{gate, load_config, summarize, Flags};
use anyhow::Context;
use chrono::Local;
use roster_core::chat::{post_webhook, ChatClient};
use roster_core::directory::{resolve_domain, DirectoryClient};
use roster_core::executor::Executor;
use roster_core::expiry;
use roster_core::gate::StdinPrompt;
use roster_core::notify::Notifier;
use roster_core::RosterError;
use std::path::Path;

pub fn run(root: &Path, flags: Flags, billing: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let directory = DirectoryClient::new(&config.directory);
    let domain = resolve_domain(&directory, &config.directory)?;
    let chat = ChatClient::bot(&config.chat);
    let notifier = Notifier::new(&chat, &config.chat.notification_channel).quiet(flags.quiet);
    let today = Local::now().date_naive();

    let mut notices = Vec::new();
    let mut actions = Vec::new();
    for level in &config.expiry.levels {
        let memberships = directory
            .level_memberships(*level)
            .with_context(|| format!("failed to load memberships for level {level}"))?;
        tracing::info!("checking {} memberships of level {level}", memberships.len());
        let rule = config
            .expiry
            .billing
            .rules
            .iter()
            .find(|r| billing && r.level == *level);

        for membership in &memberships {
            let days = match expiry::days_since(membership, today) {
                Ok(days) => days,
                Err(e) if !e.is_fatal() => {
                    tracing::warn!("{e}");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let due = expiry::classify(days, &config.expiry);
            let place = rule.filter(|r| {
                expiry::billing_group(r, &config.expiry.billing, days, today).is_some()
            });
            if due.is_none() && place.is_none() {
                continue;
            }

            let contact = match directory.contact(membership.contact_id) {
                Ok(c) => c,
                Err(e @ RosterError::PartialData { .. }) => {
                    tracing::warn!("{e}");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if let Some(due) = due {
                notices.push(expiry::notice(due, &contact, &domain));
            }
            if let Some(rule) = place {
                let all = directory.contact_memberships(contact.id)?;
                let newest = match expiry::newest_days(&all, today) {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::warn!("contact {}: {e}", contact.id);
                        continue;
                    }
                };
                actions.extend(expiry::plan_billing(
                    &contact,
                    rule,
                    &config.expiry.billing,
                    newest,
                    today,
                ));
            }
        }
    }

    for text in &notices {
        if !flags.mode().is_live() {
            println!("  notify: {text}");
            continue;
        }
        match (&config.chat.webhook_url, flags.quiet) {
            (_, true) => tracing::debug!("quiet: not posting \"{text}\""),
            (Some(url), false) => post_webhook(url, text)?,
            (None, false) => notifier.post(text, None)?,
        }
    }
    println!("{} expiry notice(s).", notices.len());

    if billing {
        let mut prompt = StdinPrompt;
        let mut gate = gate(flags, &config, &mut prompt);
        let mut executor =
            Executor::new(&config.pause).with_directory(&directory, &config.directory.fields.chat);
        let outcome = gate.run(&actions, &mut executor)?;
        summarize(&outcome, actions.len());
    }
    Ok(())
}
