use super::{gate, load_config, summarize, Flags};
use anyhow::Context;
use roster_core::directory::{DirectoryClient, Event, EventQuery};
use roster_core::events;
use roster_core::executor::Executor;
use roster_core::gate::{GateMode, Prompt, StdinPrompt};
use std::path::Path;
use std::str::FromStr;

pub fn run(
    root: &Path,
    flags: Flags,
    event: Option<u64>,
    every: Option<i64>,
    count: Option<u32>,
) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let directory = DirectoryClient::new(&config.directory);
    let mut prompt = StdinPrompt;
    let can_ask = flags.mode() != GateMode::Automatic;

    let event = match event {
        Some(id) => directory
            .event(id)
            .with_context(|| format!("failed to load event {id}"))?,
        None if can_ask => pick_event(&directory, &mut prompt)?,
        None => anyhow::bail!("--event is required with --cron"),
    };
    let every = match every {
        Some(n) => n,
        None if can_ask => ask_number(&mut prompt, "How often should this event repeat? (in days):")?,
        None => anyhow::bail!("--every is required with --cron"),
    };
    let count = match count {
        Some(n) => n,
        None if can_ask => ask_number(&mut prompt, "How many events should be created?:")?,
        None => anyhow::bail!("--count is required with --cron"),
    };

    let actions = events::plan_repeats(&event, every, count)?;
    let mut gate = gate(flags, &config, &mut prompt);
    let mut executor =
        Executor::new(&config.pause).with_directory(&directory, &config.directory.fields.chat);
    let outcome = gate.run(&actions, &mut executor)?;
    summarize(&outcome, actions.len());
    Ok(())
}

fn pick_event(directory: &DirectoryClient, prompt: &mut dyn Prompt) -> anyhow::Result<Event> {
    let all = directory
        .events(&EventQuery::default())
        .context("failed to load events")?;
    let newest = events::newest(&all);
    if newest.is_empty() {
        anyhow::bail!("the directory has no events to copy");
    }
    println!("Select an event:");
    for (i, e) in newest.iter().enumerate() {
        println!("{i}: {} ({})", e.name, e.start_at);
    }
    let index: usize = ask_number(prompt, "Enter the number of the event:")?;
    let picked = newest
        .get(index)
        .cloned()
        .with_context(|| format!("no event numbered {index}"))?;
    println!("You selected {}", picked.name);
    Ok(picked)
}

fn ask_number<T: FromStr>(prompt: &mut dyn Prompt, question: &str) -> anyhow::Result<T> {
    let answer = prompt
        .ask(question)
        .with_context(|| format!("no answer to \"{question}\""))?;
    answer
        .parse()
        .map_err(|_| anyhow::anyhow!("'{answer}' is not a number"))
}
