use super::{gate, load_config, summarize, Flags};
use anyhow::Context;
use chrono::Utc;
use roster_core::chat::ChatClient;
use roster_core::executor::Executor;
use roster_core::gate::StdinPrompt;
use roster_core::purge::Purge;
use std::collections::HashMap;
use std::path::Path;

const HISTORY_LIMIT: u32 = 999;

pub fn run(root: &Path, flags: Flags, channel: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let channel = channel
        .map(str::to_string)
        .or_else(|| config.purge.channel.clone())
        .context("no channel given and purge.channel is not set")?;

    let user = ChatClient::user(&config.chat).context("deleting other people's messages acts as a person")?;
    let me = user.auth_test().context("failed to identify the chat user")?;
    println!("Connected to chat as \"{}\" with ID {}", me.user, me.user_id);

    let names: HashMap<String, String> = user
        .users()
        .context("failed to load chat users")?
        .iter()
        .map(|u| (u.id.clone(), u.display().to_string()))
        .collect();
    let history = user
        .history(&channel, HISTORY_LIMIT)
        .with_context(|| format!("failed to load history of {channel}"))?;
    println!("Found {} messages in channel {channel}", history.len());

    let purge = Purge {
        channel: &channel,
        cfg: &config.purge,
        names: &names,
        now: Utc::now(),
    };
    let plan = purge.plan(&history, |ts| user.replies(&channel, ts))?;

    let mut prompt = StdinPrompt;
    let mut gate = gate(flags, &config, &mut prompt);
    let mut executor = Executor::new(&config.pause).with_chat(&user);
    let swept = gate.run(&plan.sweep, &mut executor)?;
    summarize(&swept, plan.sweep.len());
    if !plan.review.is_empty() {
        println!("{} older message(s) to review:", plan.review.len());
        let reviewed = gate.review_each(&plan.review, &mut executor)?;
        summarize(&reviewed, plan.review.len());
    }
    Ok(())
}
